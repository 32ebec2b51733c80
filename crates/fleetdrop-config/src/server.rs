use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the HTTP upload service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Address to listen on.
  pub bind: SocketAddr,

  /// Largest request body accepted on the upload route, in bytes.
  pub max_upload_bytes: usize,

  /// Optional bound on a single ingestion, measured from hand-off to the core.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ingest_timeout_ms: Option<u64>,
}

impl ServerConfig {
  pub fn ingest_timeout(&self) -> Option<Duration> {
    self.ingest_timeout_ms.map(Duration::from_millis)
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
      max_upload_bytes: 10 * 1024 * 1024,
      ingest_timeout_ms: None,
    }
  }
}
