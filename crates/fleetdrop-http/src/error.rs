use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fleetdrop_ingest::{IngestError, PlacementError, ValidationError};
use thiserror::Error;
use tokio::task::JoinError;

/// Everything the upload route can fail with, mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Ingest(#[from] IngestError),

  #[error("malformed upload: {0}")]
  Multipart(#[from] MultipartError),

  #[error("failed to stage upload: {0}")]
  Staging(#[source] std::io::Error),

  #[error("ingestion timed out")]
  Timeout,

  #[error("ingestion task failed: {0}")]
  Task(#[from] JoinError),
}

impl ApiError {
  fn status_and_message(&self) -> (StatusCode, String) {
    use IngestError::{Placement, Validation};

    match self {
      Self::Ingest(Validation(e)) => {
        let message = match e {
          ValidationError::MissingField(_) => "Missing required parameters".to_string(),
          ValidationError::InvalidHardwareAddress(_) => "Invalid MAC address format".to_string(),
          ValidationError::UnsupportedContentType { .. } => {
            "Only text files are allowed".to_string()
          }
          ValidationError::InvalidPathSegment { field, .. } => {
            format!("Invalid path segment in {field}")
          }
        };
        (StatusCode::BAD_REQUEST, message)
      }
      Self::Ingest(Placement(PlacementError::NameCollision { .. })) => {
        (StatusCode::CONFLICT, "File already exists".to_string())
      }
      Self::Ingest(Placement(_)) | Self::Staging(_) | Self::Task(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to store upload".to_string(),
      ),
      Self::Multipart(e) => (e.status(), e.body_text()),
      Self::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Upload timed out".to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = self.status_and_message();

    // Client errors are expected traffic; server-side ones need an operator.
    if status.is_server_error() {
      tracing::error!(error = %self, "upload failed");
    } else {
      tracing::debug!(error = %self, %status, "upload rejected");
    }

    (status, message).into_response()
  }
}
