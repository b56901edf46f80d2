//! Hashing utilities for cache fingerprints and download verification.
//!
//! This module provides:
//! - `Fingerprint`: a truncated 20-character hash used as cache key material
//! - `ContentHash`: a full 64-character hash for content verification
//! - `hash_file()` / `hash_bytes()`: SHA-256 helpers

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::FINGERPRINT_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A truncated content hash identifying one build of a component.
///
/// The fingerprint is a 20-character truncated SHA-256 of the
/// JSON-serialized input. This provides sufficient collision resistance
/// while keeping log lines and cache files readable.
///
/// # Format
///
/// Lowercase hexadecimal, e.g. `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash any serializable value into a [`Fingerprint`].
pub trait Hashable: Serialize {
  fn compute_fingerprint(&self) -> Result<Fingerprint, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    Ok(Fingerprint(full[..FINGERPRINT_PREFIX_LEN].to_string()))
  }
}

/// A full 64-character SHA-256 hash for content verification.
///
/// Unlike `Fingerprint`, which is truncated for readability, `ContentHash`
/// keeps the full digest for verifying downloaded artifacts against a
/// descriptor-declared checksum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA-256 hash of the file.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA-256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
