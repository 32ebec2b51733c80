//! Fleetdrop Ingest
//!
//! This crate is the ingestion core of fleetdrop: it decides whether an
//! uploaded file is acceptable and, if so, files it into a deterministic
//! directory hierarchy keyed by the uploading agent's identity and the
//! current date.
//!
//! An ingestion is two steps:
//! - [`validate`] checks the identity fields and gates the content type.
//! - A [`Placer`] derives the [`StorageKey`] and moves the upload into place.
//!
//! [`Ingestor`] runs both. Every call is blocking and independent; callers
//! may run as many concurrently as they like.

mod address;
mod content_type;
mod error;
mod ingest;
mod key;
mod place;
mod request;
mod validate;

pub use address::HardwareAddress;
pub use content_type::{ACCEPTED_CONTENT_TYPE, resolve_content_type};
pub use error::{IngestError, PlacementError, ValidationError};
pub use ingest::Ingestor;
pub use key::{DateSource, FixedDate, StorageKey, SystemDate};
pub use place::{FsPlacer, StoredArtifact};
pub use request::{UploadRequest, UploadedFile, ValidatedRequest};
pub use validate::validate;

/// Store placement trait.
///
/// Implementations take ownership of a validated upload and either file it
/// into their store or make sure its temporary file is removed. They never
/// re-validate.
pub trait Placer: Send + Sync {
  fn place(&self, validated: ValidatedRequest) -> Result<StoredArtifact, PlacementError>;
}
