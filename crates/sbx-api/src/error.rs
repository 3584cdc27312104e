//! Error types for sbx-api

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the management API gateway.
///
/// The type is `Clone` so one failed creation can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No credential was configured
    #[error("management token is required (flag --token or SB_MGMT_TOKEN)")]
    MissingToken,

    /// The API answered with a non-success status
    #[error("{}", describe_status(*status, message))]
    Status {
        status: u16,
        message: String,
        body: String,
    },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// A success response could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A request payload could not be encoded
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The request was rejected before it was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller's cancellation token fired
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Build a status error from a raw response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        Self::Status {
            status,
            message: decode_error_message(body),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// HTTP status, if the API answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt may succeed (transport failures, 429, 5xx)
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    pub fn is_validation(&self) -> bool {
        self.status() == Some(422)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<sbx_limiter::Error> for ApiError {
    fn from(err: sbx_limiter::Error) -> Self {
        match err {
            sbx_limiter::Error::Cancelled => Self::Cancelled,
        }
    }
}

fn describe_status(status: u16, message: &str) -> String {
    if message.is_empty() {
        format!("API request failed with status {}", status)
    } else {
        format!("API request failed with status {}: {}", status, message)
    }
}

/// Extract a human readable message from an error body.
///
/// Understands `{"message": ".."}` and `{"error": {"message": ".."}}`.
pub fn decode_error_message(body: &[u8]) -> String {
    let Ok(envelope) = serde_json::from_slice::<serde_json::Value>(body) else {
        return String::new();
    };
    envelope
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| {
            envelope
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        })
        .unwrap_or_default()
        .to_string()
}
