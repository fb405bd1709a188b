//! Error types for the container registry and lifecycle engine.

/// Alias for `Result<T, hold_engine::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by registry and lifecycle operations, matching the
/// taxonomy that the API dispatcher maps to HTTP status codes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Caller-supplied input was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// A container or image was not found.
    #[error("{0}")]
    NotFound(String),

    /// The requested transition violates the state machine.
    #[error("{0}")]
    Conflict(String),

    /// Filesystem or socket error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A clone/mount/pivot/exec syscall failed.
    #[error("syscall failed: {0}")]
    Syscall(#[from] nix::Error),

    /// Container record JSON was malformed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An image or layer store operation failed.
    #[error(transparent)]
    Store(#[from] hold_store::Error),

    /// Unexpected internal error.
    #[error("{0}")]
    Internal(String),
}
