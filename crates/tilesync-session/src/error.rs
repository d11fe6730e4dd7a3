//! Error types for the session layer.

/// Errors returned by [`SessionHandle`](crate::SessionHandle).
///
/// Connection trouble is never reported here: drops, failed connects and
/// undecodable payloads are handled inside the session and only show up
/// as [`ConnectionState`](crate::ConnectionState) changes and log lines.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session task is no longer running, either because
    /// [`stop`](crate::SessionHandle::stop) was called or because it
    /// exited on its own.
    #[error("session stopped")]
    Stopped,
}
