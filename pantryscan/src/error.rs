use thiserror::Error;

/// Result type for upload-flow operations.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur while driving the upload workflow.
///
/// Every variant funnels through the same boundary and renders uniformly as
/// `Error: <message>`; none are retried.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Network failure or rejected request
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `/upload` answered with JSON that does not match the recognition schema
    #[error("Invalid response format from /upload")]
    InvalidUploadResponse,

    /// `/submit-result` answered with JSON that does not match `{message}`
    #[error("Invalid response format from /submit-result")]
    InvalidSubmitResponse,

    /// The backend refused the upload and said why
    #[error("{0}")]
    Rejected(String),

    /// File extension outside the jpg/jpeg/png allowlist
    #[error("Invalid file type")]
    InvalidFileType,

    /// Image file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A submission is already in flight
    #[error("An upload is already in progress")]
    Busy,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
