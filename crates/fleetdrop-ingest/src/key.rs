use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::request::ValidatedRequest;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the ingest date.
pub trait DateSource: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// The current calendar date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDate;

impl DateSource for SystemDate {
  fn today(&self) -> NaiveDate {
    Utc::now().date_naive()
  }
}

/// Always the same date. Used for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedDate(pub NaiveDate);

impl DateSource for FixedDate {
  fn today(&self) -> NaiveDate {
    self.0
  }
}

/// Where an upload belongs in the store.
///
/// Directory layout under the store root:
/// ```text
/// {root}/
/// └── sensor1/                  agent name
///     └── version_2/            "version_" + version
///         └── 2024-03-01/       ingest date
///             └── AABBCCDDEEFF/ normalized hardware address
///                 └── log.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
  pub agent_name: String,
  pub version: String,
  pub ingest_date: NaiveDate,
  pub hardware_address: String,
}

impl StorageKey {
  pub fn new(request: &ValidatedRequest, ingest_date: NaiveDate) -> Self {
    Self {
      agent_name: request.agent_name.clone(),
      version: request.version.clone(),
      ingest_date,
      hardware_address: request.hardware_address.normalized(),
    }
  }

  /// Directory segments in hierarchy order.
  pub fn segments(&self) -> [String; 4] {
    [
      self.agent_name.clone(),
      format!("version_{}", self.version),
      self.ingest_date.format(DATE_FORMAT).to_string(),
      self.hardware_address.clone(),
    ]
  }

  /// The key's directory relative to the store root.
  pub fn relative_dir(&self) -> PathBuf {
    self.segments().iter().collect()
  }

  pub fn directory(&self, root: &Path) -> PathBuf {
    root.join(self.relative_dir())
  }
}
