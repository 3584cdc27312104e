//! Error types for sbx-core

use std::path::{Path, PathBuf};

use crate::report::Outcome;

/// Result type for sbx-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or running a sync
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither selectors nor `--all` were given
    #[error("no component names provided; use --all to select every component")]
    NoSelectors,

    /// Unknown name matching mode
    #[error("invalid match mode {mode:?} (expected exact, prefix, or glob)")]
    InvalidMatchMode { mode: String },

    /// Space IDs must be positive
    #[error("a valid space ID is required (got {space})")]
    InvalidSpace { space: u64 },

    /// The schema directory holds no usable component files
    #[error("no matching component files found in {}", dir.display())]
    NoComponents { dir: PathBuf },

    /// A glob selector failed to compile
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// File system failure at a known path
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failure at a known path
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Error from the management API gateway
    #[error(transparent)]
    Api(#[from] sbx_api::ApiError),

    /// Configuration file could not be read or parsed
    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_cancelled())
    }

    /// How a run that stopped with this error is classified
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::NoSelectors
            | Self::InvalidMatchMode { .. }
            | Self::InvalidSpace { .. }
            | Self::NoComponents { .. }
            | Self::Glob { .. }
            | Self::Config { .. } => Outcome::Invalid,
            Self::Api(sbx_api::ApiError::MissingToken) => Outcome::Invalid,
            Self::Api(sbx_api::ApiError::Cancelled) => Outcome::Cancelled,
            Self::Api(_) => Outcome::ApiFailure,
            Self::Io { .. } | Self::Json { .. } => Outcome::ExecutionFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_api::ApiError;

    #[test]
    fn test_input_errors_are_invalid() {
        assert_eq!(Error::NoSelectors.outcome(), Outcome::Invalid);
        assert_eq!(Error::InvalidSpace { space: 0 }.outcome(), Outcome::Invalid);
        assert_eq!(Error::Api(ApiError::MissingToken).outcome(), Outcome::Invalid);
    }

    #[test]
    fn test_api_errors_are_api_failures() {
        let err = Error::from(ApiError::from_response(500, b""));
        assert_eq!(err.outcome(), Outcome::ApiFailure);
        assert_eq!(err.outcome().exit_code(), 2);
    }

    #[test]
    fn test_cancellation_is_distinct() {
        let err = Error::from(ApiError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.outcome(), Outcome::Cancelled);
    }

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io("/tmp/x.json", std::io::Error::other("disk full"));
        assert!(err.to_string().contains("/tmp/x.json"));
        assert_eq!(err.outcome(), Outcome::ExecutionFailure);
    }
}
