//! Maps errors from every dependent crate to an HTTP status code and a
//! `{"error": "..."}` body.

/// Alias for `Result<T, hold::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified dispatcher-layer error. Wraps each library crate's error type
/// and adds the two cases only the daemon itself produces (unknown routes,
/// malformed request bodies).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A container registry or lifecycle engine operation failed.
    #[error(transparent)]
    Engine(#[from] hold_engine::Error),

    /// A layer store or image catalog operation failed.
    #[error(transparent)]
    Store(#[from] hold_store::Error),

    /// A build executor operation failed.
    #[error(transparent)]
    Build(#[from] hold_build::Error),

    /// The recipe could not be parsed.
    #[error(transparent)]
    Recipe(#[from] hold_recipe::Error),

    /// Caller-supplied input (a request body, query string, or path) was
    /// invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// No route matches the requested method and path.
    #[error("{0}")]
    NotFound(String),

    /// An unexpected internal failure, including blocking-task panics.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// The HTTP status code this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::Engine(e) => engine_status(e),
            Self::Store(e) => store_status(e),
            Self::Build(e) => build_status(e),
            Self::Recipe(_) | Self::InvalidArgument(_) => 400,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Serializes this error as the `{"error": "..."}` body returned on
    /// every non-2xx response.
    pub fn to_body(&self) -> Vec<u8> {
        serde_json::to_vec(&hold_api::ApiError::new(self.to_string()))
            .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec())
    }
}

fn engine_status(e: &hold_engine::Error) -> u16 {
    match e {
        hold_engine::Error::InvalidArgument(_) => 400,
        hold_engine::Error::NotFound(_) => 404,
        hold_engine::Error::Conflict(_) => 409,
        hold_engine::Error::Io(_)
        | hold_engine::Error::Syscall(_)
        | hold_engine::Error::Json(_)
        | hold_engine::Error::Store(_)
        | hold_engine::Error::Internal(_) => 500,
    }
}

fn store_status(e: &hold_store::Error) -> u16 {
    match e {
        hold_store::Error::NotFound(_) => 404,
        hold_store::Error::InvalidArgument(_) => 400,
        hold_store::Error::Io(_) | hold_store::Error::Json(_) => 500,
    }
}

fn build_status(e: &hold_build::Error) -> u16 {
    match e {
        hold_build::Error::NotFound(_) => 404,
        hold_build::Error::InvalidArgument(_) => 400,
        hold_build::Error::Recipe(_)
        | hold_build::Error::Store(_)
        | hold_build::Error::RunFailed { .. }
        | hold_build::Error::Io(_)
        | hold_build::Error::Syscall(_) => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = Error::NotFound("no such route".to_owned());
        assert_eq!(err.status(), 404);
        let body: serde_json::Value = serde_json::from_slice(&err.to_body()).unwrap();
        assert_eq!(body["error"], "no such route");
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let err = Error::from(hold_engine::Error::Conflict("already running".to_owned()));
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn invalid_argument_maps_to_400() {
        let err = Error::InvalidArgument("missing t= query parameter".to_owned());
        assert_eq!(err.status(), 400);
    }
}
