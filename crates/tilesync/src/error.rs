//! Unified error type for the tilesync client.

use tilesync_protocol::ProtocolError;
use tilesync_session::SessionError;
use tilesync_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TilesyncError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session has been stopped.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configured endpoint is not a WebSocket URL.
    #[error("invalid endpoint {0:?}: expected a ws:// or wss:// URL")]
    InvalidEndpoint(String),
}
