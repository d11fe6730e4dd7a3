//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a single message could not be turned
//! into bytes or back. It never says anything about the connection.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or
    /// wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A direction code outside `0..=3`.
    #[error("invalid direction code {0}, expected 0-3")]
    InvalidDirection(u8),

    /// The message parsed but violates protocol rules, e.g. a grid that
    /// is not 4×4 or a tile whose value is not a power of two.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
