//! Error types for the build executor.

/// Alias for `Result<T, hold_build::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while executing a build recipe.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The recipe could not be parsed.
    #[error(transparent)]
    Recipe(#[from] hold_recipe::Error),

    /// A layer or catalog operation failed.
    #[error(transparent)]
    Store(#[from] hold_store::Error),

    /// A referenced base image or context path was missing.
    #[error("{0}")]
    NotFound(String),

    /// Caller-supplied input was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// A `RUN` step exited with a non-zero status.
    #[error("RUN failed at line {line}: {argument} (status {status})")]
    RunFailed {
        /// Source line of the failing instruction.
        line: usize,
        /// The shell command that was run.
        argument: String,
        /// The process exit status, or -1 if terminated by a signal.
        status: i32,
    },

    /// Filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A namespace/chroot syscall failed.
    #[error("syscall failed: {0}")]
    Syscall(#[from] nix::Error),
}
