//! Error types for the real-time client.

use thiserror::Error;

/// Failures establishing or driving the duplex transport.
///
/// These never cross the public handle boundary; the session absorbs them
/// into reconnection attempts and connection-health state actions.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server rejected the credential during the handshake.
    #[error("unauthorized: the identity credential was rejected")]
    Unauthorized,

    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),
}
