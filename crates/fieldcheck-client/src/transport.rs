//! Message-oriented duplex channel boundary.
//!
//! The connection manager does not speak WebSocket directly; it dials
//! through a [`Connector`] and receives a [`ChannelHandle`]: a sender into
//! the channel's write task plus a receiver of inbound channel events. The
//! production [`WsConnector`] adapts `tokio-tungstenite`; tests substitute
//! in-memory connectors.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;

/// Capacity of the per-channel send and event queues.
const CHANNEL_QUEUE: usize = 64;

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing or the handshake failed.
    #[error("connect failed: {0}")]
    Connect(String),
}

/// An event produced by the live channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A complete inbound text frame.
    Message(String),
    /// The channel reported an error; closure usually follows.
    Error(String),
    /// The channel closed.
    Closed,
}

/// A live duplex channel: a handle to its write task and its event stream.
#[derive(Debug)]
pub struct ChannelHandle {
    /// Outbound text frames. Dropping the sender closes the channel.
    pub outbound: mpsc::Sender<String>,
    /// Inbound events, ending with [`ChannelEvent::Closed`].
    pub events: mpsc::Receiver<ChannelEvent>,
}

/// Dials new channels for the connection manager.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a channel, resolving only once it is ready to send.
    async fn connect(&self) -> Result<ChannelHandle, TransportError>;
}

/// `tokio-tungstenite` WebSocket connector.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connector dialing the given `ws://` / `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The endpoint this connector dials.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<ChannelHandle, TransportError> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url = %self.url, "websocket connected");

        let (mut sink, mut stream) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_QUEUE);
        let (event_tx, events) = mpsc::channel::<ChannelEvent>(CHANNEL_QUEUE);

        // Write task: drains the queue, sends a Close frame when the
        // sender side is dropped.
        let _ = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        // Read task: forwards text frames and terminates with Closed.
        let _ = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if event_tx
                            .send(ChannelEvent::Message(text.to_string()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary
                    Err(e) => {
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        Ok(ChannelHandle { outbound, events })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_keeps_url() {
        let connector = WsConnector::new("ws://localhost:9443/safetycheck");
        assert_eq!(connector.url(), "ws://localhost:9443/safetycheck");
    }

    #[test]
    fn connect_error_display() {
        let err = TransportError::Connect("refused".to_owned());
        assert_eq!(err.to_string(), "connect failed: refused");
    }

    #[test]
    fn channel_event_equality() {
        assert_eq!(
            ChannelEvent::Message("a".to_owned()),
            ChannelEvent::Message("a".to_owned())
        );
        assert_ne!(ChannelEvent::Closed, ChannelEvent::Error("x".to_owned()));
    }

    #[tokio::test]
    async fn ws_connect_to_unreachable_endpoint_fails() {
        // Port 1 is essentially never listening.
        let connector = WsConnector::new("ws://127.0.0.1:1/");
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
