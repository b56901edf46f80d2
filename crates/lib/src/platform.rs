//! Target platform identification.
//!
//! The engine needs exactly two facts about the machine it builds on: a
//! stable triple to embed in cache fingerprints (an artifact built for
//! one target must never satisfy another) and the OS family, which
//! selects the compiler-flag layer of the build environment.

use std::fmt;

/// OS family of a build target.
///
/// Drives the compiler-flag layer in the environment builder and names
/// the OS half of the fingerprint triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
  Linux,
  Darwin,
  Windows,
}

impl OsFamily {
  fn name(self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Darwin => "darwin",
      Self::Windows => "windows",
    }
  }
}

/// The platform a run builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  /// OS family.
  pub os: OsFamily,

  /// Architecture identifier as the compiler reports it (`x86_64`,
  /// `aarch64`, ...). Carried as an opaque string; only the triple
  /// consumes it.
  pub arch: &'static str,
}

impl Platform {
  /// Detect the platform the engine is running on.
  ///
  /// Returns `None` on OS families the engine has no flag layer for.
  pub fn current() -> Option<Self> {
    let os = match std::env::consts::OS {
      "linux" => OsFamily::Linux,
      "macos" => OsFamily::Darwin,
      "windows" => OsFamily::Windows,
      _ => return None,
    };

    Some(Self {
      os,
      arch: std::env::consts::ARCH,
    })
  }

  /// The triple embedded in cache fingerprints, e.g. `x86_64-linux`.
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os.name())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn current_platform_is_supported() {
    let platform = Platform::current().unwrap();
    assert!(!platform.arch.is_empty());
  }

  #[test]
  fn triple_is_arch_then_os() {
    let platform = Platform {
      os: OsFamily::Linux,
      arch: "x86_64",
    };
    assert_eq!(platform.triple(), "x86_64-linux");
  }

  #[test]
  fn darwin_names_the_macos_family() {
    let platform = Platform {
      os: OsFamily::Darwin,
      arch: "aarch64",
    };
    assert_eq!(platform.triple(), "aarch64-darwin");
  }
}
