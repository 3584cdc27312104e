//! Error types for sbx-limiter

/// Result type for limiter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while waiting for a token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The caller's cancellation token fired before a token was available
    #[error("Rate limiter wait cancelled")]
    Cancelled,
}
