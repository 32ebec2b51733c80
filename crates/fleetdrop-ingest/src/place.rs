use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{PathPersistError, PersistError, TempPath};
use tracing::{debug, info, warn};

use crate::Placer;
use crate::error::PlacementError;
use crate::key::{DateSource, StorageKey, SystemDate};
use crate::request::ValidatedRequest;

const STAGING_PREFIX: &str = ".staging-";

/// A file that has been filed into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
  /// Absolute (root-joined) location of the stored file.
  pub path: PathBuf,
  pub key: StorageKey,
  pub filename: String,
}

impl StoredArtifact {
  /// Location relative to the store root:
  /// `<agent>/version_<version>/<date>/<address>/<filename>`.
  pub fn relative_path(&self) -> PathBuf {
    self.key.relative_dir().join(&self.filename)
  }
}

/// Filesystem store placer.
///
/// Files each upload at `{root}/{key directory}/{declared filename}`. Missing
/// directories are created. An occupied destination is never replaced.
pub struct FsPlacer<D: DateSource = SystemDate> {
  root: PathBuf,
  dates: D,
}

impl FsPlacer<SystemDate> {
  /// Create a placer that dates uploads with the current UTC date.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self::with_date_source(root, SystemDate)
  }
}

impl<D: DateSource> FsPlacer<D> {
  pub fn with_date_source(root: impl Into<PathBuf>, dates: D) -> Self {
    Self {
      root: root.into(),
      dates,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl<D: DateSource> Placer for FsPlacer<D> {
  fn place(&self, validated: ValidatedRequest) -> Result<StoredArtifact, PlacementError> {
    let key = StorageKey::new(&validated, self.dates.today());
    let directory = key.directory(&self.root);

    // create_dir_all treats a segment created concurrently by someone else as success.
    fs::create_dir_all(&directory).map_err(|source| PlacementError::DirectoryCreationFailed {
      path: directory.clone(),
      source,
    })?;

    let filename = validated.file.declared_filename;
    let destination = directory.join(&filename);
    relocate(validated.file.path, &destination)?;

    info!(
      agent = %key.agent_name,
      version = %key.version,
      date = %key.ingest_date,
      path = %destination.display(),
      "upload stored"
    );

    Ok(StoredArtifact {
      path: destination,
      key,
      filename,
    })
  }
}

/// Move `source` to `destination` without ever replacing an existing file.
///
/// On one volume this is a single rename-without-replace. Across volumes the
/// bytes are copied into a staging file beside the destination, synced, and
/// only then given the destination name, so a partially written file is never
/// visible there. In every outcome `source` is gone afterwards.
pub(crate) fn relocate(source: TempPath, destination: &Path) -> Result<(), PlacementError> {
  let PathPersistError { error, path } = match source.persist_noclobber(destination) {
    Ok(()) => return Ok(()),
    Err(e) => e,
  };

  match error.kind() {
    io::ErrorKind::AlreadyExists => Err(PlacementError::NameCollision {
      path: destination.to_path_buf(),
    }),
    io::ErrorKind::CrossesDevices => {
      debug!(destination = %destination.display(), "upload is on another volume, copying");
      copy_then_persist(path, destination)
    }
    _ => Err(PlacementError::MoveFailed {
      path: destination.to_path_buf(),
      source: error,
    }),
  }
}

fn copy_then_persist(source: TempPath, destination: &Path) -> Result<(), PlacementError> {
  let move_failed = |source: io::Error| PlacementError::MoveFailed {
    path: destination.to_path_buf(),
    source,
  };

  let directory = destination.parent().unwrap_or(Path::new("."));
  let mut staging = tempfile::Builder::new()
    .prefix(STAGING_PREFIX)
    .tempfile_in(directory)
    .map_err(move_failed)?;

  let mut reader = File::open(&source).map_err(move_failed)?;
  io::copy(&mut reader, staging.as_file_mut()).map_err(move_failed)?;
  staging.as_file().sync_all().map_err(move_failed)?;
  drop(reader);

  match staging.persist_noclobber(destination) {
    Ok(_) => {}
    Err(PersistError { error, .. }) if error.kind() == io::ErrorKind::AlreadyExists => {
      return Err(PlacementError::NameCollision {
        path: destination.to_path_buf(),
      });
    }
    Err(PersistError { error, .. }) => return Err(move_failed(error)),
  }

  let source_path = source.to_path_buf();
  if let Err(e) = source.close() {
    warn!(path = %source_path.display(), error = %e, "failed to remove source after copy");
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::address::HardwareAddress;
  use crate::key::FixedDate;
  use crate::request::UploadedFile;
  use chrono::NaiveDate;
  use tempfile::{NamedTempFile, TempDir};

  fn temp_upload(dir: &Path, content: &[u8]) -> TempPath {
    let temp = NamedTempFile::new_in(dir).unwrap();
    fs::write(temp.path(), content).unwrap();
    temp.into_temp_path()
  }

  fn validated(dir: &Path, filename: &str, content: &[u8]) -> ValidatedRequest {
    ValidatedRequest {
      hardware_address: HardwareAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(),
      agent_name: "sensor1".to_string(),
      version: "2".to_string(),
      file: UploadedFile::new(temp_upload(dir, content), filename),
      content_type: "text/plain",
    }
  }

  fn placer(root: &Path) -> FsPlacer<FixedDate> {
    FsPlacer::with_date_source(root, FixedDate(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
  }

  #[test]
  fn test_place_builds_layout() {
    let staging = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    let stored = placer(root.path())
      .place(validated(staging.path(), "log.txt", b"hello"))
      .unwrap();

    assert_eq!(
      stored.relative_path(),
      PathBuf::from("sensor1/version_2/2024-03-01/AABBCCDDEEFF/log.txt")
    );
    assert_eq!(stored.path, root.path().join(stored.relative_path()));
    assert_eq!(fs::read(&stored.path).unwrap(), b"hello");
    assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
  }

  #[test]
  fn test_place_creates_missing_root() {
    let staging = TempDir::new().unwrap();
    let base = TempDir::new().unwrap();
    let root = base.path().join("not").join("yet");

    let stored = placer(&root)
      .place(validated(staging.path(), "log.txt", b"x"))
      .unwrap();
    assert!(stored.path.starts_with(&root));
    assert!(stored.path.is_file());
  }

  #[test]
  fn test_hyphenated_address_is_normalized() {
    let staging = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut request = validated(staging.path(), "log.txt", b"x");
    request.hardware_address = HardwareAddress::parse("aa-bb-cc-dd-ee-ff").unwrap();

    let stored = placer(root.path()).place(request).unwrap();
    assert_eq!(stored.key.hardware_address, "aabbccddeeff");
  }

  #[test]
  fn test_collision_keeps_existing_bytes() {
    let staging = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let placer = placer(root.path());

    let first = placer
      .place(validated(staging.path(), "log.txt", b"first"))
      .unwrap();
    let err = placer
      .place(validated(staging.path(), "log.txt", b"second"))
      .unwrap_err();

    assert!(matches!(err, PlacementError::NameCollision { ref path } if *path == first.path));
    assert_eq!(fs::read(&first.path).unwrap(), b"first");
    assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
  }

  #[test]
  fn test_directory_creation_failure() {
    let staging = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    // A regular file where the agent directory should be.
    fs::write(root.path().join("sensor1"), b"in the way").unwrap();

    let err = placer(root.path())
      .place(validated(staging.path(), "log.txt", b"x"))
      .unwrap_err();
    assert!(matches!(err, PlacementError::DirectoryCreationFailed { .. }));
    assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
  }

  #[test]
  fn test_move_failure_when_source_vanished() {
    let staging = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let request = validated(staging.path(), "log.txt", b"x");
    fs::remove_file(request.file.temp_path()).unwrap();

    let err = placer(root.path()).place(request).unwrap_err();
    assert!(matches!(err, PlacementError::MoveFailed { .. }));
  }

  #[test]
  fn test_copy_then_persist_leaves_no_staging_file() {
    let staging = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source = temp_upload(staging.path(), b"copied bytes");
    let source_path = source.to_path_buf();
    let destination = target.path().join("log.txt");

    copy_then_persist(source, &destination).unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"copied bytes");
    assert!(!source_path.exists());
    let names: Vec<_> = fs::read_dir(target.path())
      .unwrap()
      .map(|e| e.unwrap().file_name())
      .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("log.txt")]);
  }

  #[test]
  fn test_copy_then_persist_collision() {
    let staging = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let destination = target.path().join("log.txt");
    fs::write(&destination, b"original").unwrap();
    let source = temp_upload(staging.path(), b"intruder");
    let source_path = source.to_path_buf();

    let err = copy_then_persist(source, &destination).unwrap_err();

    assert!(matches!(err, PlacementError::NameCollision { .. }));
    assert_eq!(fs::read(&destination).unwrap(), b"original");
    assert!(!source_path.exists());
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 1);
  }
}
