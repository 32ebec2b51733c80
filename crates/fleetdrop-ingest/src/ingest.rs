use tracing::debug;

use crate::Placer;
use crate::error::IngestError;
use crate::place::{FsPlacer, StoredArtifact};
use crate::request::UploadRequest;
use crate::validate::validate;

/// Runs the full validate-then-place pipeline for one upload at a time.
///
/// Holds no state between calls besides its placer, so a single `Ingestor`
/// can be shared across threads.
pub struct Ingestor<P: Placer = FsPlacer> {
  placer: P,
}

impl<P: Placer> Ingestor<P> {
  pub fn new(placer: P) -> Self {
    Self { placer }
  }

  pub fn placer(&self) -> &P {
    &self.placer
  }

  /// Ingest one upload.
  ///
  /// On success the upload's temporary file has become the stored artifact.
  /// On any failure it has been removed.
  pub fn ingest(&self, request: UploadRequest) -> Result<StoredArtifact, IngestError> {
    let validated = validate(request).inspect_err(|e| debug!(error = %e, "upload rejected"))?;
    Ok(self.placer.place(validated)?)
  }
}
