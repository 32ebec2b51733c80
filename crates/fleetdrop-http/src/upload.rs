use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use fleetdrop_ingest::{Placer, UploadRequest, UploadedFile};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

const MAC_ADDRESS_FIELD: &str = "macAddress";
const BOT_NAME_FIELD: &str = "botName";
const VERSION_FIELD: &str = "version";
const FILE_FIELD: &str = "file";

pub async fn upload<P: Placer + 'static>(
  State(state): State<AppState<P>>,
  mut multipart: Multipart,
) -> Result<Json<bool>, ApiError> {
  let request = read_request(&state.staging_dir, &mut multipart).await?;

  // The blocking task owns the upload. If the caller stops waiting, the task
  // still either places the file or removes it.
  let ingestor = Arc::clone(&state.ingestor);
  let task = tokio::task::spawn_blocking(move || ingestor.ingest(request));

  let joined = match state.ingest_timeout {
    Some(limit) => tokio::time::timeout(limit, task)
      .await
      .map_err(|_| ApiError::Timeout)?,
    None => task.await,
  };
  let stored = joined??;

  info!(path = %stored.relative_path().display(), "upload accepted");
  Ok(Json(true))
}

/// Decode the multipart body into an [`UploadRequest`]. Unknown fields are
/// skipped; a repeated field replaces the earlier one.
async fn read_request(
  staging_dir: &Path,
  multipart: &mut Multipart,
) -> Result<UploadRequest, ApiError> {
  let mut request = UploadRequest::default();

  while let Some(mut field) = multipart.next_field().await? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some(MAC_ADDRESS_FIELD) => request.hardware_address = Some(field.text().await?),
      Some(BOT_NAME_FIELD) => request.agent_name = Some(field.text().await?),
      Some(VERSION_FIELD) => request.version = Some(field.text().await?),
      Some(FILE_FIELD) => {
        let declared_filename = field.file_name().unwrap_or_default().to_string();
        let path = stage(staging_dir, &mut field).await?;
        request.file = Some(UploadedFile::new(path, declared_filename));
      }
      _ => {}
    }
  }

  Ok(request)
}

/// Stream a file part into a fresh temporary file in `staging_dir`.
async fn stage(staging_dir: &Path, field: &mut Field<'_>) -> Result<TempPath, ApiError> {
  let (file, path) = tempfile::Builder::new()
    .prefix("upload-")
    .tempfile_in(staging_dir)
    .map_err(ApiError::Staging)?
    .into_parts();

  let mut file = tokio::fs::File::from_std(file);
  while let Some(chunk) = field.chunk().await? {
    file.write_all(&chunk).await.map_err(ApiError::Staging)?;
  }
  file.flush().await.map_err(ApiError::Staging)?;

  Ok(path)
}
