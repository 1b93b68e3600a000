//! The upload flow driver.
//!
//! `UploadController` owns the flow state, the preview slot, and the update
//! channel. The whole flow is one async task with strictly sequential awaits
//! and a single error boundary; every failure lands in the `Error` state.
//! A one-permit semaphore keeps a second submission from overlapping an
//! in-flight flow.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use parking_lot::RwLock;
use tokio::sync::{broadcast, Semaphore};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::http::{ReqwestUploadApi, UploadApi};
use crate::preview::ImageFile;
use crate::state::{render, Display, StateUpdate, UploadState};
use crate::types::{
    decode_submit_response, decode_upload_response, SubmitResultRequest, UploadId,
};

/// Drives the preview and upload operations against a backend.
pub struct UploadController<A: UploadApi> {
    api: Arc<A>,
    state: RwLock<UploadState>,
    preview: RwLock<Option<String>>,
    updates_tx: broadcast::Sender<StateUpdate>,
    in_flight: Semaphore,
}

impl UploadController<ReqwestUploadApi> {
    /// Controller backed by a real HTTP client.
    pub fn new(config: UploadConfig) -> Self {
        Self::with_api(Arc::new(ReqwestUploadApi::new(config)))
    }
}

impl<A: UploadApi> UploadController<A> {
    /// Controller over any backend implementation.
    ///
    /// The update channel buffers 64 events; a receiver that falls behind
    /// loses the oldest ones.
    pub fn with_api(api: Arc<A>) -> Self {
        let (updates_tx, _) = broadcast::channel(64);
        Self {
            api,
            state: RwLock::new(UploadState::Idle),
            preview: RwLock::new(None),
            updates_tx,
            in_flight: Semaphore::new(1),
        }
    }

    /// Current flow state.
    pub fn state(&self) -> UploadState {
        self.state.read().clone()
    }

    /// Current display instructions.
    pub fn display(&self) -> Display {
        let state = self.state.read();
        let preview = self.preview.read();
        render(&state, preview.as_deref())
    }

    /// Subscribe to state updates.
    ///
    /// Returns a stream that emits a [`StateUpdate`] on every transition.
    pub fn subscribe(&self) -> Pin<Box<dyn Stream<Item = StateUpdate> + Send>> {
        let rx = self.updates_tx.subscribe();
        Box::pin(BroadcastStream::new(rx).filter_map(|result| result.ok()))
    }

    /// Clear a terminal state back to `Idle`. No-op while a flow is active.
    pub fn reset(&self) {
        let mut state = self.state.write();
        if !state.is_active() {
            *state = UploadState::Idle;
        }
    }

    /// Read an image and publish its inline preview.
    ///
    /// Independent of the upload flow; only the preview display slot is shared.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn preview(&self, path: impl AsRef<Path>) -> Result<String> {
        let image = ImageFile::read(path.as_ref()).await?;
        let data_url = image.to_data_url();
        *self.preview.write() = Some(data_url.clone());

        debug!(bytes = image.bytes().len(), "Preview updated");
        Ok(data_url)
    }

    /// Run the upload flow for an image on disk.
    ///
    /// Returns the backend's confirmation message. Every failure transitions
    /// the flow to `Error` and is also returned to the caller. A call made
    /// while another flow is in flight fails with [`UploadError::Busy`]
    /// without touching the in-flight state.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn submit(&self, path: impl AsRef<Path>) -> Result<String> {
        let _permit = self
            .in_flight
            .try_acquire()
            .map_err(|_| UploadError::Busy)?;

        let upload_id = UploadId::new();
        info!(upload_id = %upload_id, "Starting upload flow");

        match self.run_flow(upload_id, path.as_ref()).await {
            Ok(message) => {
                self.transition(upload_id, UploadState::done(message.clone()));
                info!(upload_id = %upload_id, "Upload flow completed");
                Ok(message)
            }
            Err(e) => {
                warn!(upload_id = %upload_id, error = %e, "Upload flow failed");
                self.transition(upload_id, UploadState::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// The flow body. Errors propagate to the boundary in `submit`.
    async fn run_flow(&self, upload_id: UploadId, path: &Path) -> Result<String> {
        let image = ImageFile::read(path).await?;
        if image.mime().is_none() {
            return Err(UploadError::InvalidFileType);
        }

        self.transition(upload_id, UploadState::uploading());
        let response = self.api.upload(&image).await?;
        let recognition = decode_upload_response(&response.body)?;

        self.transition(upload_id, UploadState::processing(recognition.clone()));
        let submission = SubmitResultRequest::from(&recognition);
        let response = self.api.submit_result(&submission).await?;
        let confirmation = decode_submit_response(&response.body)?;

        Ok(confirmation.message)
    }

    fn transition(&self, upload_id: UploadId, state: UploadState) {
        *self.state.write() = state.clone();
        debug!(upload_id = %upload_id, state = ?state, "State transition");
        let _ = self.updates_tx.send(StateUpdate { upload_id, state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ApiResponse, MockCall, MockUploadApi};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn canned(status: u16, body: serde_json::Value) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status,
            body: body.to_string(),
        })
    }

    fn write_image(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"fake image bytes").unwrap();
        path
    }

    async fn collect_until_terminal(
        stream: &mut Pin<Box<dyn Stream<Item = StateUpdate> + Send>>,
    ) -> Vec<UploadState> {
        let mut states = Vec::new();
        while let Ok(Some(update)) =
            tokio::time::timeout(Duration::from_millis(500), stream.next()).await
        {
            let terminal = update.state.is_terminal();
            states.push(update.state);
            if terminal {
                break;
            }
        }
        states
    }

    #[tokio::test]
    async fn test_flow_happy_path() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"content": "3, apple"})));
        api.push_submit_response(canned(200, json!({"message": "ok"})));

        let controller = UploadController::with_api(api.clone());
        let mut updates = controller.subscribe();

        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let message = controller.submit(&image).await.unwrap();
        assert_eq!(message, "ok");

        let states = collect_until_terminal(&mut updates).await;
        assert_eq!(states.len(), 3);
        assert!(matches!(states[0], UploadState::Uploading { .. }));
        match &states[1] {
            UploadState::Processing { recognition, .. } => {
                assert_eq!(recognition.count, 3);
                assert_eq!(recognition.object_name, "apple");
                // Intermediate display shows the raw recognition pair
                assert_eq!(render(&states[1], None).result, "3, apple");
            }
            other => panic!("expected Processing, got: {:?}", other),
        }
        assert!(matches!(states[2], UploadState::Done { .. }));

        // The second request carried the parsed recognition verbatim
        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            MockCall::SubmitResult {
                body: json!({"count": 3, "object_name": "apple"})
            }
        );

        let display = controller.display();
        assert!(!display.loading);
        assert!(!display.processing);
        assert_eq!(display.result, "Result: ok");
    }

    #[tokio::test]
    async fn test_flow_normalizes_legacy_shape() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"amount": 3, "groceryItem": "apple"})));
        api.push_submit_response(canned(200, json!({"message": "stored"})));

        let controller = UploadController::with_api(api.clone());
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let message = controller.submit(&image).await.unwrap();
        assert_eq!(message, "stored");

        let calls = api.calls();
        assert_eq!(
            calls[1],
            MockCall::SubmitResult {
                body: json!({"count": 3, "object_name": "apple"})
            }
        );
    }

    #[tokio::test]
    async fn test_flow_rejects_malformed_content() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"content": "banana"})));

        let controller = UploadController::with_api(api.clone());
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "banana.png");

        let err = controller.submit(&image).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidUploadResponse));

        // No second request was made
        assert_eq!(api.call_count(), 1);

        let display = controller.display();
        assert!(!display.loading);
        assert!(!display.processing);
        assert_eq!(display.result, "Error: Invalid response format from /upload");
    }

    #[tokio::test]
    async fn test_flow_surfaces_server_rejection() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(400, json!({"error": "No file part"})));

        let controller = UploadController::with_api(api);
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let err = controller.submit(&image).await.unwrap_err();
        assert!(matches!(err, UploadError::Rejected(_)));
        assert_eq!(controller.display().result, "Error: No file part");
    }

    #[tokio::test]
    async fn test_flow_reports_parse_error() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(Ok(ApiResponse {
            status: 200,
            body: "not json".to_string(),
        }));

        let controller = UploadController::with_api(api);
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let err = controller.submit(&image).await.unwrap_err();
        assert!(matches!(err, UploadError::Json(_)));

        let display = controller.display();
        assert!(!display.loading);
        assert!(!display.processing);
        assert!(display.result.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_flow_rejects_disallowed_extension() {
        let api = Arc::new(MockUploadApi::new());
        let controller = UploadController::with_api(api.clone());

        let dir = tempfile::tempdir().unwrap();
        let notes = write_image(&dir, "notes.txt");

        let err = controller.submit(&notes).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFileType));

        // Nothing went over the wire
        assert_eq!(api.call_count(), 0);
        assert_eq!(controller.display().result, "Error: Invalid file type");
    }

    #[tokio::test]
    async fn test_flow_rejects_bad_submit_shape() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"content": "2, pear"})));
        api.push_submit_response(canned(200, json!({"status": "ok"})));

        let controller = UploadController::with_api(api);
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "pear.jpg");

        let err = controller.submit(&image).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidSubmitResponse));
        assert_eq!(
            controller.display().result,
            "Error: Invalid response format from /submit-result"
        );
    }

    #[tokio::test]
    async fn test_preview_is_independent_of_flow_state() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"content": "banana"})));

        let controller = UploadController::with_api(api);
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.png");

        let data_url = controller.preview(&image).await.unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));

        let display = controller.display();
        assert_eq!(display.image_preview.as_deref(), Some(data_url.as_str()));

        // A failed flow keeps the preview visible
        let _ = controller.submit(&image).await;
        let display = controller.display();
        assert!(display.result.starts_with("Error: "));
        assert_eq!(display.image_preview.as_deref(), Some(data_url.as_str()));
    }

    #[tokio::test]
    async fn test_reset_clears_terminal_state() {
        let api = Arc::new(MockUploadApi::new());
        api.push_upload_response(canned(200, json!({"content": "1, plum"})));
        api.push_submit_response(canned(200, json!({"message": "ok"})));

        let controller = UploadController::with_api(api);
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "plum.jpg");

        controller.submit(&image).await.unwrap();
        assert!(controller.state().is_terminal());

        controller.reset();
        assert_eq!(controller.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn test_end_to_end_against_http_backend() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": "3, apple"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/submit-result"))
            .and(body_json(json!({"count": 3, "object_name": "apple"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "stored"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let controller =
            UploadController::new(UploadConfig::for_base_url(mock_server.uri()));
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let message = controller.submit(&image).await.unwrap();
        assert_eq!(message, "stored");
        assert_eq!(controller.display().result, "Result: stored");
    }

    #[tokio::test]
    async fn test_network_failure_hides_indicators() {
        // Grab a port nothing is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let controller = UploadController::new(UploadConfig::for_base_url(format!(
            "http://127.0.0.1:{}",
            port
        )));
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "apple.jpg");

        let err = controller.submit(&image).await.unwrap_err();
        assert!(matches!(err, UploadError::Http(_)));

        let display = controller.display();
        assert!(!display.loading);
        assert!(!display.processing);
        assert!(display.result.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_second_submission_while_in_flight_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": "2, pear"}))
                    .set_delay(Duration::from_millis(250)),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/submit-result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "stored"})))
            .mount(&mock_server)
            .await;

        let controller = Arc::new(UploadController::new(UploadConfig::for_base_url(
            mock_server.uri(),
        )));
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(&dir, "pear.jpg");

        let first = tokio::spawn({
            let controller = controller.clone();
            let image = image.clone();
            async move { controller.submit(&image).await }
        });

        // Let the first flow reach its in-flight await
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = controller.submit(&image).await;
        assert!(matches!(second, Err(UploadError::Busy)));

        // The in-flight flow is unperturbed and completes
        let message = first.await.unwrap().unwrap();
        assert_eq!(message, "stored");
        assert_eq!(controller.display().result, "Result: stored");
    }
}
