//! Duplex transport abstraction and the WebSocket implementation.
//!
//! The session task never touches a socket directly; it talks to a
//! [`TransportLink`], a pair of unbounded channels carrying text frames.
//! [`WsTransport`] bridges such a link onto a tokio-tungstenite WebSocket
//! with one writer and one reader task. Tests substitute their own
//! [`Transport`] with scripted links.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::protocol::Message};

use crate::connection::Identity;
use crate::error::TransportError;

/// Both halves of one live connection, from the session's point of view.
///
/// Dropping all senders feeding `rx` is how the transport signals
/// disconnection; the session observes it as end-of-stream.
pub struct TransportLink {
    /// Outbound text frames toward the server.
    pub tx: mpsc::UnboundedSender<String>,
    /// Inbound text frames from the server.
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Connects a duplex, server-push-capable link for an identity.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, identity: &Identity) -> Result<TransportLink, TransportError>;
}

/// The production transport: one WebSocket, single wire mode, no fallback
/// polling.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// # Arguments
    ///
    /// * `url` - WebSocket endpoint, e.g. `ws://127.0.0.1:8080/realtime`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, identity: &Identity) -> Result<TransportLink, TransportError> {
        let url = format!("{}?token={}", self.url, identity.token);

        let (ws_stream, _response) = match connect_async(&url).await {
            Ok(result) => result,
            Err(e) => {
                if let tungstenite::Error::Http(resp) = &e
                    && resp.status() == tungstenite::http::StatusCode::UNAUTHORIZED
                {
                    return Err(TransportError::Unauthorized);
                }
                return Err(TransportError::Connect(e.to_string()));
            }
        };

        tracing::info!("connected to {}", self.url);

        let (mut sink, mut stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        // Writer: drain outbound frames into the socket.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    tracing::warn!("failed to send frame: {}", e);
                    break;
                }
            }
        });

        // Reader: forward text frames, drop in_tx on close or error so the
        // session sees end-of-stream.
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Ok(_) => {
                        // Binary and control frames are not part of the
                        // protocol; ping/pong is handled by tungstenite.
                    }
                    Err(e) => {
                        tracing::warn!("websocket read error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(TransportLink { tx: out_tx, rx: in_rx })
    }
}
