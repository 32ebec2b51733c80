use std::path::Path;

use tempfile::TempPath;

use crate::address::HardwareAddress;

/// A received upload, still in its temporary location.
///
/// The temporary file is owned through a [`TempPath`]: dropping an
/// `UploadedFile` deletes it. Only a successful placement moves it out of
/// reach of that cleanup.
#[derive(Debug)]
pub struct UploadedFile {
  pub path: TempPath,
  /// The filename the agent sent, used verbatim as the stored name.
  pub declared_filename: String,
}

impl UploadedFile {
  pub fn new(path: TempPath, declared_filename: impl Into<String>) -> Self {
    Self {
      path,
      declared_filename: declared_filename.into(),
    }
  }

  /// Current location of the temporary content.
  pub fn temp_path(&self) -> &Path {
    &self.path
  }
}

/// One upload as handed over by the transport layer. Consumed by a single
/// ingestion.
#[derive(Debug, Default)]
pub struct UploadRequest {
  pub hardware_address: Option<String>,
  pub agent_name: Option<String>,
  pub version: Option<String>,
  pub file: Option<UploadedFile>,
}

impl UploadRequest {
  pub fn new(
    hardware_address: impl Into<String>,
    agent_name: impl Into<String>,
    version: impl Into<String>,
    file: UploadedFile,
  ) -> Self {
    Self {
      hardware_address: Some(hardware_address.into()),
      agent_name: Some(agent_name.into()),
      version: Some(version.into()),
      file: Some(file),
    }
  }
}

/// An upload that passed every check and is ready to be placed.
///
/// Fields are carried unchanged from the request; normalization of the
/// hardware address happens at placement time.
#[derive(Debug)]
pub struct ValidatedRequest {
  pub hardware_address: HardwareAddress,
  pub agent_name: String,
  pub version: String,
  pub file: UploadedFile,
  /// The accepted content type, resolved from the declared filename.
  pub content_type: &'static str,
}
