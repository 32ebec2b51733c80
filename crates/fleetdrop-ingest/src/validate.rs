use std::io;

use tracing::{debug, warn};

use crate::address::HardwareAddress;
use crate::content_type::{is_accepted, resolve_content_type};
use crate::error::ValidationError;
use crate::request::{UploadRequest, UploadedFile, ValidatedRequest};

/// Check an upload request, short-circuiting on the first failure.
///
/// Checks run in this order:
/// 1. hardware address, agent name, version and file are all present
/// 2. the hardware address is well formed
/// 3. the declared filename resolves to `text/plain`
/// 4. agent name, version and filename are each a single path segment
///
/// A rejected upload's temporary file never outlives this call. On a content
/// type rejection it is removed explicitly; on every other rejection it goes
/// away with the dropped request.
pub fn validate(request: UploadRequest) -> Result<ValidatedRequest, ValidationError> {
  let UploadRequest {
    hardware_address,
    agent_name,
    version,
    file,
  } = request;

  let hardware_address = required(hardware_address, "hardware_address")?;
  let agent_name = required(agent_name, "agent_name")?;
  let version = required(version, "version")?;
  let file = file.ok_or(ValidationError::MissingField("file"))?;

  let hardware_address = HardwareAddress::parse(&hardware_address)?;

  let content_type = resolve_content_type(&file.declared_filename);
  if !is_accepted(content_type) {
    let filename = file.declared_filename.clone();
    debug!(filename = %filename, content_type = ?content_type, "rejecting upload by content type");
    discard(file);
    return Err(ValidationError::UnsupportedContentType {
      filename,
      content_type,
    });
  }

  check_segment("agent_name", &agent_name)?;
  check_segment("version", &version)?;
  check_segment("filename", &file.declared_filename)?;

  Ok(ValidatedRequest {
    hardware_address,
    agent_name,
    version,
    file,
    content_type: crate::content_type::ACCEPTED_CONTENT_TYPE,
  })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
  match value {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(ValidationError::MissingField(field)),
  }
}

/// Names that end up as directory or file names must not be able to leave
/// their slot in the hierarchy.
fn check_segment(field: &'static str, value: &str) -> Result<(), ValidationError> {
  let escapes = value == "."
    || value == ".."
    || value.contains(['/', '\\', '\0']);
  if escapes {
    return Err(ValidationError::InvalidPathSegment {
      field,
      value: value.to_string(),
    });
  }
  Ok(())
}

/// Delete a rejected upload. A file that is already gone counts as deleted.
fn discard(file: UploadedFile) {
  let path = file.temp_path().to_path_buf();
  match file.path.close() {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => warn!(path = %path.display(), error = %e, "failed to remove rejected upload"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::{NamedTempFile, TempDir};

  fn upload(dir: &TempDir, filename: &str) -> UploadedFile {
    let temp = NamedTempFile::new_in(dir.path()).unwrap();
    std::fs::write(temp.path(), b"line one\n").unwrap();
    UploadedFile::new(temp.into_temp_path(), filename)
  }

  fn request(dir: &TempDir, address: &str, filename: &str) -> UploadRequest {
    UploadRequest::new(address, "sensor1", "2", upload(dir, filename))
  }

  #[test]
  fn test_valid_request_passes_fields_through() {
    let dir = TempDir::new().unwrap();
    let validated = validate(request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt")).unwrap();

    assert_eq!(validated.hardware_address.as_str(), "AA:BB:CC:DD:EE:FF");
    assert_eq!(validated.agent_name, "sensor1");
    assert_eq!(validated.version, "2");
    assert_eq!(validated.file.declared_filename, "log.txt");
    assert_eq!(validated.content_type, "text/plain");
    assert!(validated.file.temp_path().exists());
  }

  #[test]
  fn test_each_missing_field_is_reported() {
    let dir = TempDir::new().unwrap();

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.hardware_address = None;
    assert!(matches!(validate(req), Err(ValidationError::MissingField("hardware_address"))));

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.agent_name = Some(String::new());
    assert!(matches!(validate(req), Err(ValidationError::MissingField("agent_name"))));

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.version = None;
    assert!(matches!(validate(req), Err(ValidationError::MissingField("version"))));

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.file = None;
    assert!(matches!(validate(req), Err(ValidationError::MissingField("file"))));
  }

  #[test]
  fn test_missing_field_wins_over_later_checks() {
    let dir = TempDir::new().unwrap();
    // Bad address and bad content type, but the missing version is reported first.
    let mut req = request(&dir, "zz:11:22:33:44:55", "photo.jpg");
    req.version = None;
    assert!(matches!(validate(req), Err(ValidationError::MissingField("version"))));
  }

  #[test]
  fn test_invalid_address_checked_before_content_type() {
    let dir = TempDir::new().unwrap();
    let err = validate(request(&dir, "zz:11:22:33:44:55", "photo.jpg")).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidHardwareAddress(_)));
  }

  #[test]
  fn test_unsupported_content_type_removes_temp_file() {
    let dir = TempDir::new().unwrap();
    let req = request(&dir, "AA:BB:CC:DD:EE:FF", "photo.jpg");
    let temp = req.file.as_ref().unwrap().temp_path().to_path_buf();

    let err = validate(req).unwrap_err();
    match err {
      ValidationError::UnsupportedContentType {
        filename,
        content_type,
      } => {
        assert_eq!(filename, "photo.jpg");
        assert_eq!(content_type, Some("image/jpeg"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
    assert!(!temp.exists());
    assert!(!temp.exists());
  }

  #[test]
  fn test_unresolvable_content_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = validate(request(&dir, "AA:BB:CC:DD:EE:FF", "README")).unwrap_err();
    assert!(matches!(
      err,
      ValidationError::UnsupportedContentType {
        content_type: None,
        ..
      }
    ));
  }

  #[test]
  fn test_discard_tolerates_already_removed_file() {
    let dir = TempDir::new().unwrap();
    let req = request(&dir, "AA:BB:CC:DD:EE:FF", "photo.png");
    std::fs::remove_file(req.file.as_ref().unwrap().temp_path()).unwrap();

    let err = validate(req).unwrap_err();
    assert!(matches!(err, ValidationError::UnsupportedContentType { .. }));
  }

  #[test]
  fn test_rejects_segments_that_escape_the_store() {
    let dir = TempDir::new().unwrap();

    let err = validate(request(&dir, "AA:BB:CC:DD:EE:FF", "../escape.txt")).unwrap_err();
    assert!(matches!(
      err,
      ValidationError::InvalidPathSegment {
        field: "filename",
        ..
      }
    ));

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.agent_name = Some("..".to_string());
    assert!(matches!(
      validate(req),
      Err(ValidationError::InvalidPathSegment {
        field: "agent_name",
        ..
      })
    ));

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.version = Some("1\\2".to_string());
    assert!(matches!(
      validate(req),
      Err(ValidationError::InvalidPathSegment { field: "version", .. })
    ));
  }

  #[test]
  fn test_rejected_requests_leave_no_temp_files() {
    let dir = TempDir::new().unwrap();

    let mut req = request(&dir, "AA:BB:CC:DD:EE:FF", "log.txt");
    req.agent_name = None;
    let _ = validate(req);
    let _ = validate(request(&dir, "not-a-mac", "log.txt"));
    let _ = validate(request(&dir, "AA:BB:CC:DD:EE:FF", "a/b.txt"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }
}
