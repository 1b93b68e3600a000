//! Backend client abstraction for the two wire exchanges.
//!
//! The `UploadApi` trait separates wire transport from response
//! interpretation, enabling mock implementations in tests. Implementations
//! return the raw status and body; decoding lives with the flow driver.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::UploadConfig;
use crate::error::Result;
use crate::preview::ImageFile;
use crate::types::SubmitResultRequest;

/// Raw response from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

/// Trait for the two exchanges of the upload workflow.
///
/// # Example
/// ```ignore
/// let api = ReqwestUploadApi::new(UploadConfig::default());
/// let response = api.upload(&image).await?;
/// println!("Status: {}, Body: {}", response.status, response.body);
/// ```
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// POST the image as multipart form data to the upload endpoint.
    ///
    /// The file travels in a part named `image`, with its file name and MIME
    /// type attached.
    ///
    /// # Errors
    /// Returns an error if the request fails due to network issues or times out.
    async fn upload(&self, image: &ImageFile) -> Result<ApiResponse>;

    /// POST the accepted recognition as JSON to the submit-result endpoint.
    ///
    /// # Errors
    /// Returns an error if the request fails due to network issues or times out.
    async fn submit_result(&self, submission: &SubmitResultRequest) -> Result<ApiResponse>;
}

// ============================================================================
// Production implementation using reqwest
// ============================================================================

/// Production client that talks to a real backend.
pub struct ReqwestUploadApi {
    client: reqwest::Client,
    config: UploadConfig,
}

impl ReqwestUploadApi {
    /// Create a new reqwest-based client for the configured backend.
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

#[async_trait]
impl UploadApi for ReqwestUploadApi {
    #[tracing::instrument(skip(self, image), fields(file_name = %image.file_name()))]
    async fn upload(&self, image: &ImageFile) -> Result<ApiResponse> {
        let url = self.config.upload_url();

        tracing::debug!(
            url = %url,
            bytes = image.bytes().len(),
            "Uploading image"
        );

        let part = reqwest::multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string());
        let part = match image.mime() {
            Some(mime) => part.mime_str(mime)?,
            None => part,
        };
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::info!(
            status = status,
            response_len = body.len(),
            "Upload request completed"
        );

        Ok(ApiResponse { status, body })
    }

    #[tracing::instrument(skip(self, submission), fields(object_name = %submission.object_name))]
    async fn submit_result(&self, submission: &SubmitResultRequest) -> Result<ApiResponse> {
        let url = self.config.submit_url();

        tracing::debug!(url = %url, "Submitting recognition result");

        let response = self
            .client
            .post(&url)
            .json(submission)
            .timeout(self.timeout())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::info!(
            status = status,
            response_len = body.len(),
            "Submit request completed"
        );

        Ok(ApiResponse { status, body })
    }
}

// ============================================================================
// Test/mock implementation
// ============================================================================

use parking_lot::Mutex;

use crate::error::UploadError;

/// Mock client for testing.
///
/// Canned responses are returned in FIFO order per endpoint; every call is
/// recorded for later inspection.
#[derive(Default)]
pub struct MockUploadApi {
    upload_responses: Mutex<Vec<Result<ApiResponse>>>,
    submit_responses: Mutex<Vec<Result<ApiResponse>>>,
    calls: Mutex<Vec<MockCall>>,
}

/// Record of a call made to the mock client.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload {
        file_name: String,
        bytes: Vec<u8>,
    },
    SubmitResult {
        body: serde_json::Value,
    },
}

impl MockUploadApi {
    /// Create a new mock client with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `upload` call.
    pub fn push_upload_response(&self, response: Result<ApiResponse>) {
        self.upload_responses.lock().push(response);
    }

    /// Queue a response for the next `submit_result` call.
    pub fn push_submit_response(&self, response: Result<ApiResponse>) {
        self.submit_responses.lock().push(response);
    }

    /// All calls made to this mock, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl UploadApi for MockUploadApi {
    async fn upload(&self, image: &ImageFile) -> Result<ApiResponse> {
        self.calls.lock().push(MockCall::Upload {
            file_name: image.file_name().to_string(),
            bytes: image.bytes().to_vec(),
        });

        let mut responses = self.upload_responses.lock();
        if responses.is_empty() {
            return Err(UploadError::Internal(
                "no mock response configured for /upload".to_string(),
            ));
        }
        responses.remove(0)
    }

    async fn submit_result(&self, submission: &SubmitResultRequest) -> Result<ApiResponse> {
        self.calls.lock().push(MockCall::SubmitResult {
            body: serde_json::to_value(submission)?,
        });

        let mut responses = self.submit_responses.lock();
        if responses.is_empty() {
            return Err(UploadError::Internal(
                "no mock response configured for /submit-result".to_string(),
            ));
        }
        responses.remove(0)
    }
}
