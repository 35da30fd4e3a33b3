//! Pending request tracker
//!
//! Holds tracked requests between the moment their request envelope is sent
//! and the moment OBS replies. Entries live in insertion order behind one
//! lock, shared by the MIDI side (registering) and the WebSocket side
//! (resolving).
//!
//! There is no timeout: a request OBS never answers, or answers with an
//! error, stays here until the process exits.

use parking_lot::Mutex;
use tracing::debug;

use crate::command::TrackedCommand;

/// First correlation id handed out
pub const FIRST_MESSAGE_ID: u64 = 2;

/// A tracked request waiting for its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub message_id: u64,
    /// Binding action, used as the follow-up template
    pub action: String,
    pub kind: TrackedCommand,
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    entries: Vec<PendingRequest>,
}

/// Correlation-id allocator and pending entry list
#[derive(Debug)]
pub struct PendingRequests {
    inner: Mutex<Inner>,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: FIRST_MESSAGE_ID,
                entries: Vec::new(),
            }),
        }
    }

    /// Allocate the next id and register an entry under it, in one step
    pub fn register(&self, action: impl Into<String>, kind: TrackedCommand) -> u64 {
        let mut inner = self.inner.lock();
        let message_id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(PendingRequest {
            message_id,
            action: action.into(),
            kind,
        });
        debug!(message_id, %kind, pending = inner.entries.len(), "Registered pending request");
        message_id
    }

    /// Register an entry under an explicit id.
    ///
    /// The allocator is moved past `message_id` so later `register` calls
    /// never hand it out again.
    pub fn insert(&self, message_id: u64, action: impl Into<String>, kind: TrackedCommand) {
        let mut inner = self.inner.lock();
        inner.next_id = inner.next_id.max(message_id.saturating_add(1));
        inner.entries.push(PendingRequest {
            message_id,
            action: action.into(),
            kind,
        });
        debug!(message_id, %kind, pending = inner.entries.len(), "Registered pending request");
    }

    /// Remove and return the first entry registered under `message_id`
    pub fn take(&self, message_id: u64) -> Option<PendingRequest> {
        let mut inner = self.inner.lock();
        let index = inner
            .entries
            .iter()
            .position(|e| e.message_id == message_id)?;
        let entry = inner.entries.remove(index);
        debug!(message_id, pending = inner.entries.len(), "Removed pending request");
        Some(entry)
    }

    /// Drop an entry whose request never left the process
    pub fn cancel(&self, message_id: u64) -> bool {
        self.take(message_id).is_some()
    }

    pub fn contains(&self, message_id: u64) -> bool {
        self.inner.lock().entries.iter().any(|e| e.message_id == message_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Discard everything, returning how many entries were still waiting
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        dropped
    }
}
