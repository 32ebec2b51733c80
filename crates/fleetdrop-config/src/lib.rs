//! Fleetdrop Config
//!
//! This crate contains the serializable configuration types for fleetdrop.
//! A configuration names where accepted uploads are filed (the store root),
//! where in-flight uploads are staged before ingestion, and how the HTTP
//! service listens.
//!
//! Configuration can be built from:
//! - a data directory, via [`Config::for_data_dir`]
//! - a JSON file, via [`Config::load`]
//!
//! The store root is always handed to the ingestion core explicitly; nothing
//! in fleetdrop reads it from ambient process state.

mod error;
mod server;

pub use error::ConfigError;
pub use server::ServerConfig;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Root of the `<agent>/version_<v>/<date>/<address>/` hierarchy.
  pub store_root: PathBuf,

  /// Directory for uploads that have been received but not yet ingested.
  /// Keep it on the same volume as `store_root` so placement is a rename.
  pub staging_dir: PathBuf,

  #[serde(default)]
  pub server: ServerConfig,
}

impl Config {
  /// Default layout under a data directory: `{dir}/uploads` and `{dir}/staging`.
  pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
    let data_dir = data_dir.as_ref();
    Self {
      store_root: data_dir.join("uploads"),
      staging_dir: data_dir.join("staging"),
      server: ServerConfig::default(),
    }
  }

  /// Load a configuration from a JSON file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}
