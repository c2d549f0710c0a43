use thiserror::Error;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("backend error{}: {message}", code_suffix(.code))]
    Server {
        code: Option<String>,
        message: String,
    },

    #[error("device is not registered")]
    UnknownDevice,

    #[error("question not found")]
    UnknownQuestion,

    #[error("device already voted on this question")]
    AlreadyVoted,

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
}

impl BackendError {
    /// True for failures that may succeed when retried unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return BackendError::Serialization(err.to_string());
        }
        match err.status() {
            Some(status) => BackendError::HttpStatus(status),
            None => BackendError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}
