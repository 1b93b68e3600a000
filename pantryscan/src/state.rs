//! Upload flow lifecycle and its mapping to display instructions.
//!
//! The flow progresses through explicit states; a pure [`render`] function
//! maps each state to the display instructions a UI shell applies verbatim.
//! Nothing else toggles indicator visibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Recognition, UploadId};

/// The current state of the upload flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    /// No flow has started, or the last one was cleared
    Idle,

    /// The image is being sent to `/upload`
    Uploading {
        /// When the upload request started
        started_at: DateTime<Utc>,
    },

    /// The recognition came back; the result is being submitted
    Processing {
        /// The accepted recognition
        recognition: Recognition,
        /// When the submit request started
        started_at: DateTime<Utc>,
    },

    /// The backend confirmed the submitted result
    Done {
        /// Confirmation message from `/submit-result`
        message: String,
        /// When the flow completed
        completed_at: DateTime<Utc>,
    },

    /// The flow failed
    Error {
        /// Message shown to the user
        message: String,
        /// When the flow failed
        failed_at: DateTime<Utc>,
    },
}

impl UploadState {
    /// Enter the Uploading state now.
    pub fn uploading() -> Self {
        UploadState::Uploading {
            started_at: Utc::now(),
        }
    }

    /// Enter the Processing state now with an accepted recognition.
    pub fn processing(recognition: Recognition) -> Self {
        UploadState::Processing {
            recognition,
            started_at: Utc::now(),
        }
    }

    /// Enter the Done state now.
    pub fn done(message: impl Into<String>) -> Self {
        UploadState::Done {
            message: message.into(),
            completed_at: Utc::now(),
        }
    }

    /// Enter the Error state now.
    pub fn error(message: impl Into<String>) -> Self {
        UploadState::Error {
            message: message.into(),
            failed_at: Utc::now(),
        }
    }

    /// Check if this state is terminal (Done or Error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Done { .. } | UploadState::Error { .. })
    }

    /// Check if a request is in flight (Uploading or Processing).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadState::Uploading { .. } | UploadState::Processing { .. }
        )
    }
}

/// An update event, emitted whenever the flow changes state.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// The flow run that was updated
    pub upload_id: UploadId,
    /// The new state of the flow
    pub state: UploadState,
}

/// Display instructions for a UI shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    /// Loading indicator visibility
    pub loading: bool,
    /// Processing indicator visibility
    pub processing: bool,
    /// Text for the result area
    pub result: String,
    /// Data URL for the image preview, when one has been selected
    pub image_preview: Option<String>,
}

/// Map a flow state (plus the independent preview slot) to display instructions.
pub fn render(state: &UploadState, preview: Option<&str>) -> Display {
    let image_preview = preview.map(str::to_string);

    match state {
        UploadState::Idle => Display {
            loading: false,
            processing: false,
            result: String::new(),
            image_preview,
        },
        UploadState::Uploading { .. } => Display {
            loading: true,
            processing: false,
            result: String::new(),
            image_preview,
        },
        UploadState::Processing { recognition, .. } => Display {
            loading: false,
            processing: true,
            result: recognition.to_string(),
            image_preview,
        },
        UploadState::Done { message, .. } => Display {
            loading: false,
            processing: false,
            result: format!("Result: {}", message),
            image_preview,
        },
        UploadState::Error { message, .. } => Display {
            loading: false,
            processing: false,
            result: format!("Error: {}", message),
            image_preview,
        },
    }
}
