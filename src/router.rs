//! Router - maps MIDI events to OBS messages and follows up on replies
//!
//! The Router is the explicit context shared by both event sources:
//! - MIDI events are looked up in the binding table and dispatched
//!   (`dispatch.rs`)
//! - OBS replies are matched to pending requests and turned into
//!   follow-up messages (`replies.rs`)
//!
//! All state that both sides touch lives in [`PendingRequests`], which is
//! internally locked, so a `Router` can be shared by `Arc` across threads.

mod dispatch;
mod replies;


use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bindings::BindingStore;
use crate::drivers::Outbound;
use crate::pending::PendingRequests;

pub use dispatch::Dispatch;
pub use replies::{cache_bust, Resolution, CACHE_BUST_MARKER};

/// Main router holding the binding lookup, the outbound sink and the
/// pending request tracker
pub struct Router {
    bindings: Arc<dyn BindingStore>,
    outbound: Arc<dyn Outbound>,
    pending: PendingRequests,
}

impl Router {
    pub fn new(bindings: Arc<dyn BindingStore>, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            bindings,
            outbound,
            pending: PendingRequests::new(),
        }
    }

    /// Requests still waiting for a reply
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Discard every pending request.
    ///
    /// Entries are process-local; nothing survives a restart.
    pub fn shutdown(&self) {
        let abandoned = self.pending.clear();
        if abandoned > 0 {
            warn!("Discarding {} request(s) OBS never answered", abandoned);
        } else {
            debug!("No pending requests at shutdown");
        }
        info!("Router stopped");
    }
}
