//! Client configuration.

/// Configuration for talking to the recognition backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Base URL of the backend (e.g., "http://127.0.0.1:5000")
    pub base_url: String,

    /// Path of the upload endpoint
    pub upload_path: String,

    /// Path of the submit-result endpoint
    pub submit_path: String,

    /// Timeout for each individual request in milliseconds
    pub timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            upload_path: "/upload".to_string(),
            submit_path: "/submit-result".to_string(),
            timeout_ms: 30_000, // 30 second timeout
        }
    }
}

impl UploadConfig {
    /// Configuration pointing at the given backend, defaults elsewhere.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Full URL of the upload endpoint.
    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url, self.upload_path)
    }

    /// Full URL of the submit-result endpoint.
    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, self.submit_path)
    }
}
