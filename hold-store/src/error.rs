//! Error types for layer store and image catalog operations.

/// Alias for `Result<T, hold_store::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the layer store and image catalog.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A referenced layer or image does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller-supplied input was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// Filesystem error while reading or writing store data.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Sidecar or metadata JSON was malformed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
