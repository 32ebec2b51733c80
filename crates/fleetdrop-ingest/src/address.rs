use std::fmt;

use crate::error::ValidationError;

const OCTETS: usize = 6;

/// A hardware (MAC) address exactly as the agent supplied it.
///
/// Accepted form is six two-digit hexadecimal groups separated uniformly by
/// `:` or `-`, in any letter case. The supplied text is kept unchanged;
/// [`HardwareAddress::normalized`] gives the separator-free form used in
/// store paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareAddress {
  raw: String,
}

impl HardwareAddress {
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    let invalid = || ValidationError::InvalidHardwareAddress(raw.to_string());

    let separator = match raw.as_bytes().get(2) {
      Some(b':') => ':',
      Some(b'-') => '-',
      _ => return Err(invalid()),
    };

    let groups: Vec<&str> = raw.split(separator).collect();
    if groups.len() != OCTETS {
      return Err(invalid());
    }

    let well_formed = groups
      .iter()
      .all(|group| group.len() == 2 && group.bytes().all(|b| b.is_ascii_hexdigit()));
    if !well_formed {
      return Err(invalid());
    }

    Ok(Self {
      raw: raw.to_string(),
    })
  }

  /// The address as supplied.
  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// The twelve hex digits with separators removed. Case is preserved.
  pub fn normalized(&self) -> String {
    self.raw.chars().filter(|c| *c != ':' && *c != '-').collect()
  }
}

impl fmt::Display for HardwareAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}
