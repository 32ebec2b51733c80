//! Content-type gate.
//!
//! The type is resolved from the declared filename's extension only; the
//! uploaded bytes are never inspected.

use std::path::Path;

/// The only content type fleetdrop accepts.
pub const ACCEPTED_CONTENT_TYPE: &str = "text/plain";

/// Resolve the content type of a filename from its extension.
pub fn resolve_content_type(filename: &str) -> Option<&'static str> {
  Path::new(filename)
    .extension()
    .and_then(|ext| ext.to_str())
    .and_then(|ext| mime_guess::from_ext(ext).first_raw())
}

pub fn is_accepted(content_type: Option<&str>) -> bool {
  content_type == Some(ACCEPTED_CONTENT_TYPE)
}
