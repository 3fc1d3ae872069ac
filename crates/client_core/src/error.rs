use reqwest::StatusCode;
use shared::error::extract_detail;
use thiserror::Error;

/// Which backend call failed; decides the fallback wording when the server
/// gives no `detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadUrl,
    Ask,
}

impl Operation {
    fn failure_prefix(self) -> &'static str {
        match self {
            Operation::LoadUrl => "Failed to load URL:",
            Operation::Ask => "Failed to get response:",
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    /// Builds the error for a non-2xx response, preferring the server's
    /// `detail` over the status reason phrase.
    pub fn rejected(operation: Operation, status: StatusCode, body: &[u8]) -> Self {
        let message = extract_detail(body).unwrap_or_else(|| {
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            format!("{} {reason}", operation.failure_prefix())
        });
        Self::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Rejected { status, .. } => Some(*status),
            BackendError::Transport(err) => err.status().map(|s| s.as_u16()),
            BackendError::MalformedResponse(_) => None,
        }
    }
}
