use std::path::PathBuf;

use thiserror::Error;

/// Why an upload was rejected before touching the store.
///
/// These are caller-input errors: the core never retries them, the uploader
/// has to resubmit a corrected request.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid hardware address: {0:?}")]
  InvalidHardwareAddress(String),

  /// The declared filename resolved to something other than `text/plain`,
  /// or to nothing at all.
  #[error("unsupported content type for {filename:?}: {}", content_type.unwrap_or("unknown"))]
  UnsupportedContentType {
    filename: String,
    content_type: Option<&'static str>,
  },

  #[error("{field} cannot be used as a path segment: {value:?}")]
  InvalidPathSegment { field: &'static str, value: String },
}

/// Why a validated upload could not be filed into the store.
#[derive(Debug, Error)]
pub enum PlacementError {
  #[error("failed to create directory {}: {source}", path.display())]
  DirectoryCreationFailed {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to move upload to {}: {source}", path.display())]
  MoveFailed {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The destination is already occupied. Existing artifacts are never overwritten.
  #[error("artifact already exists: {}", path.display())]
  NameCollision { path: PathBuf },
}

/// Failure of a full ingestion (validate, then place).
#[derive(Debug, Error)]
pub enum IngestError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Placement(#[from] PlacementError),
}

impl IngestError {
  /// True when the uploader sent something unacceptable, false when the store
  /// itself could not take the upload.
  pub fn is_client_error(&self) -> bool {
    matches!(self, Self::Validation(_))
  }
}
