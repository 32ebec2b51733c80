//! Fleetdrop HTTP
//!
//! The transport in front of the ingestion core. Agents `POST /upload` a
//! `multipart/form-data` body with the text fields `macAddress`, `botName`
//! and `version` plus a `file` part. The file part is streamed to the
//! staging directory and handed to the [`Ingestor`] together with the
//! identity fields; the outcome becomes the HTTP status.

mod error;
mod upload;

pub use error::ApiError;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use fleetdrop_config::Config;
use fleetdrop_ingest::{FsPlacer, Ingestor, Placer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the upload routes.
pub struct AppState<P: Placer = FsPlacer> {
  pub ingestor: Arc<Ingestor<P>>,
  /// Where incoming file parts are written before ingestion.
  pub staging_dir: PathBuf,
  pub ingest_timeout: Option<Duration>,
}

impl<P: Placer> AppState<P> {
  pub fn new(ingestor: Ingestor<P>, staging_dir: impl Into<PathBuf>) -> Self {
    Self {
      ingestor: Arc::new(ingestor),
      staging_dir: staging_dir.into(),
      ingest_timeout: None,
    }
  }

  pub fn with_ingest_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.ingest_timeout = timeout;
    self
  }
}

impl<P: Placer> Clone for AppState<P> {
  fn clone(&self) -> Self {
    Self {
      ingestor: Arc::clone(&self.ingestor),
      staging_dir: self.staging_dir.clone(),
      ingest_timeout: self.ingest_timeout,
    }
  }
}

/// Build the router: `GET /` answers a liveness text, `POST /upload` ingests.
pub fn router<P: Placer + 'static>(state: AppState<P>, max_upload_bytes: usize) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/upload", post(upload::upload::<P>))
    .layer(DefaultBodyLimit::max(max_upload_bytes))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn index() -> &'static str {
  "Hello World!"
}

/// Serve uploads per `config` until `cancel` fires.
pub async fn serve(config: &Config, cancel: CancellationToken) -> std::io::Result<()> {
  tokio::fs::create_dir_all(&config.staging_dir).await?;
  tokio::fs::create_dir_all(&config.store_root).await?;

  let ingestor = Ingestor::new(FsPlacer::new(&config.store_root));
  let state = AppState::new(ingestor, &config.staging_dir)
    .with_ingest_timeout(config.server.ingest_timeout());
  let app = router(state, config.server.max_upload_bytes);

  let listener = TcpListener::bind(config.server.bind).await?;
  info!(
    addr = %listener.local_addr()?,
    store_root = %config.store_root.display(),
    "fleetdrop listening"
  );

  axum::serve(listener, app)
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
}
