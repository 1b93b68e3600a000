//! Wire types for the recognition backend.
//!
//! `/upload` answers with a recognition payload; the accepted recognition is
//! posted back to `/submit-result`. Bodies are decoded in two steps so the
//! failure modes stay distinct: invalid JSON is a parse error, valid JSON with
//! an unexpected shape is a validation error.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, UploadError};

/// A unique identifier for one run of the upload flow.
///
/// Uses a short, readable format like "upload_abc123xy" instead of full UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Create a new random upload ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Convert to a short, readable string format.
    ///
    /// Takes the first 8 hex characters of the UUID and formats as "upload_xxxxxxxx".
    pub fn to_short_string(&self) -> String {
        let hex = format!("{:x}", self.0.as_u128());
        format!("upload_{}", &hex[..8])
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UploadId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

/// Decoded `/upload` response payload.
///
/// The canonical shape carries the recognition as a `"<count>, <object name>"`
/// string. The legacy field-based shape predates the string contract and is
/// still accepted; it normalizes into the same [`Recognition`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UploadResponse {
    /// Canonical shape: `{"content": "<count>, <object name>"}`
    Content { content: String },

    /// Legacy shape: `{"amount": <int>, "groceryItem": "<name>"}`
    Legacy {
        amount: i64,
        #[serde(rename = "groceryItem")]
        grocery_item: String,
    },

    /// Server-side rejection, e.g. `{"error": "No file part"}`
    Rejection { error: String },
}

/// A recognition result: how many of which object the backend saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognition {
    /// Number of objects in the image
    pub count: i64,

    /// Name of the recognized object (e.g. "apple")
    pub object_name: String,
}

impl Recognition {
    /// Parse the canonical `"<count>, <object name>"` pair.
    ///
    /// Exactly two `", "`-separated parts with an integer first part;
    /// anything else is `None`.
    pub fn parse(content: &str) -> Option<Self> {
        let parts: Vec<&str> = content.split(", ").collect();
        if parts.len() != 2 {
            return None;
        }
        let count = parts[0].trim().parse::<i64>().ok()?;
        Some(Self {
            count,
            object_name: parts[1].to_string(),
        })
    }
}

impl std::fmt::Display for Recognition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.count, self.object_name)
    }
}

/// Body for `POST /submit-result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub count: i64,
    pub object_name: String,
}

impl From<&Recognition> for SubmitResultRequest {
    fn from(recognition: &Recognition) -> Self {
        Self {
            count: recognition.count,
            object_name: recognition.object_name.clone(),
        }
    }
}

/// Body of the `/submit-result` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResultResponse {
    pub message: String,
}

/// Interpret an `/upload` response body as a recognition.
///
/// A server-reported `{"error": ...}` payload surfaces as [`UploadError::Rejected`]
/// with the server's own message. Status codes do not short-circuit decoding;
/// the body is the authoritative signal.
pub fn decode_upload_response(body: &str) -> Result<Recognition> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let response: UploadResponse =
        serde_json::from_value(value).map_err(|_| UploadError::InvalidUploadResponse)?;

    match response {
        UploadResponse::Content { content } => {
            Recognition::parse(&content).ok_or(UploadError::InvalidUploadResponse)
        }
        UploadResponse::Legacy {
            amount,
            grocery_item,
        } => Ok(Recognition {
            count: amount,
            object_name: grocery_item,
        }),
        UploadResponse::Rejection { error } => Err(UploadError::Rejected(error)),
    }
}

/// Interpret a `/submit-result` response body.
pub fn decode_submit_response(body: &str) -> Result<SubmitResultResponse> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    serde_json::from_value(value).map_err(|_| UploadError::InvalidSubmitResponse)
}
