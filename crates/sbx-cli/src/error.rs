//! Error types for sbx-cli

use sbx_core::Outcome;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from sbx-core
    #[error(transparent)]
    Core(#[from] sbx_core::Error),

    /// Error from sbx-api
    #[error(transparent)]
    Api(#[from] sbx_api::ApiError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            CliError::Core(e) => e.outcome(),
            CliError::Api(e) => sbx_core::Error::Api(e.clone()).outcome(),
            CliError::Io(_) => Outcome::ExecutionFailure,
            CliError::User { .. } => Outcome::Invalid,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_api::ApiError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::user("bad").exit_code(), 1);
        assert_eq!(CliError::from(ApiError::MissingToken).exit_code(), 1);
        assert_eq!(CliError::from(ApiError::Transport("reset".into())).exit_code(), 2);
        assert_eq!(CliError::from(ApiError::Cancelled).exit_code(), 3);
        assert_eq!(CliError::from(std::io::Error::other("disk")).exit_code(), 3);
        assert_eq!(CliError::from(sbx_core::Error::NoSelectors).exit_code(), 1);
    }

    #[test]
    fn test_user_error_display() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
