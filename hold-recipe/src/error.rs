//! Error types for recipe parsing.

/// Alias for `Result<T, hold_recipe::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while parsing a build recipe.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The recipe contained no instructions.
    #[error("recipe is empty")]
    Empty,

    /// The first instruction was not `FROM`.
    #[error("first instruction must be FROM, got {0} at line {1}")]
    MissingFrom(String, usize),

    /// The recipe file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
