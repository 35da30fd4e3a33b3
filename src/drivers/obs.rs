//! OBS Studio WebSocket client
//!
//! Speaks the obs-websocket 4.x text protocol: every message is a JSON text
//! frame, requests carry a `message-id` and replies echo it back.
//!
//! The connection is split into two tasks:
//! - a writer draining an unbounded queue, so senders never block
//! - a reader forwarding every text frame to the event loop
//!
//! There is no reconnection; when OBS goes away the reader reports
//! [`ObsInbound::Closed`] and the bridge shuts down.

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use super::Outbound;
use crate::config::ObsConfig;
use crate::error::StartupError;

/// How long shutdown waits for the close frame to go out
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Inbound traffic from OBS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObsInbound {
    /// A text frame (reply or event)
    Message(String),
    /// The socket closed; carries the reason when one is known
    Closed(Option<String>),
}

#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

/// Cloneable handle queueing text frames for OBS
#[derive(Debug, Clone)]
pub struct ObsSender {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Outbound for ObsSender {
    fn send_text(&self, text: String) -> Result<()> {
        trace!("📤 OBS ← {}", text);
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| anyhow!("OBS connection is closed"))
    }
}

/// Running WebSocket connection
pub struct ObsConnection {
    url: String,
    tx: mpsc::UnboundedSender<Outgoing>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ObsConnection {
    /// Connect to OBS and start the reader/writer tasks.
    ///
    /// Inbound frames are delivered on `inbound_tx`.
    pub async fn connect(
        config: &ObsConfig,
        inbound_tx: mpsc::Sender<ObsInbound>,
    ) -> Result<(Self, ObsSender), StartupError> {
        let url = config.url();
        info!("🎬 Connecting to OBS at {}", url);

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| StartupError::ObsUnavailable {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();

        let writer = tokio::spawn(async move {
            while let Some(outgoing) = rx.recv().await {
                match outgoing {
                    Outgoing::Text(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            error!("Websocket error: {}", e);
                            break;
                        }
                    }
                    Outgoing::Close => {
                        if let Err(e) = sink.send(Message::Close(None)).await {
                            debug!("Close frame not sent: {}", e);
                        }
                        break;
                    }
                }
            }
            let _ = sink.close().await;
            debug!("OBS writer stopped");
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        trace!("📥 OBS → {}", text);
                        if inbound_tx.send(ObsInbound::Message(text)).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.to_string());
                    }
                    Some(Ok(other)) => trace!("Ignoring non-text frame: {:?}", other),
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                }
            };
            let _ = inbound_tx.send(ObsInbound::Closed(reason)).await;
            debug!("OBS reader stopped");
        });

        info!("✅ Successfully connected to OBS");
        let sender = ObsSender { tx: tx.clone() };
        Ok((
            Self {
                url,
                tx,
                writer,
                reader,
            },
            sender,
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a close frame and stop both tasks
    pub async fn close(self) {
        debug!("Attempting to close OBS connection");
        if self.tx.send(Outgoing::Close).is_err() {
            warn!("OBS writer already stopped");
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, self.writer).await {
            Ok(_) => info!("OBS connection has been closed successfully"),
            Err(_) => warn!("OBS did not acknowledge close within {:?}", CLOSE_TIMEOUT),
        }
        self.reader.abort();
    }
}
