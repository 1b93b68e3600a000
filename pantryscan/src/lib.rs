//! Client for a grocery-photo recognition backend.
//!
//! This crate drives the upload-and-display workflow:
//! - Reads a selected image and encodes an inline preview (data URL)
//! - Uploads the image as multipart form data to `/upload`
//! - Interprets the `"<count>, <object name>"` recognition response
//! - Submits the accepted result to `/submit-result` and surfaces the confirmation
//! - Models the flow as an explicit state machine with a pure render function
//!
//! # Example
//! ```ignore
//! use pantryscan::{UploadConfig, UploadController};
//!
//! let controller = UploadController::new(UploadConfig::default());
//!
//! // Inline preview for the selected file
//! let data_url = controller.preview("apple.jpg").await?;
//!
//! // Run the flow; state updates stream out as it progresses
//! let mut updates = controller.subscribe();
//! let message = controller.submit("apple.jpg").await?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod preview;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::UploadConfig;
pub use controller::UploadController;
pub use error::{Result, UploadError};
pub use http::{ApiResponse, MockUploadApi, ReqwestUploadApi, UploadApi};
pub use preview::ImageFile;
pub use state::{render, Display, StateUpdate, UploadState};
pub use types::{
    Recognition, SubmitResultRequest, SubmitResultResponse, UploadId, UploadResponse,
};
