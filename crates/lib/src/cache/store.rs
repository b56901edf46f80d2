//! Persistent cache index storage.
//!
//! # Storage Layout
//!
//! ```text
//! {cache_dir}/
//! └── index.json          # CacheIndex: version + per-component entries
//! ```
//!
//! Writes are atomic (write to temp, then rename). A missing, unreadable,
//! or version-mismatched index degrades to an empty one with a warning —
//! cache corruption means "build everything", never a failed run.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::{APP_NAME, CACHE_INDEX_VERSION};
use crate::util::hash::Fingerprint;

/// Index file name within the cache directory.
const INDEX_FILENAME: &str = "index.json";

/// Errors raised by cache persistence.
///
/// Load-side problems are handled internally by degrading to an empty
/// index; this type surfaces only on save.
#[derive(Debug, Error)]
pub enum CacheError {
  /// Failed to create the cache directory.
  #[error("failed to create cache directory: {0}")]
  CreateDir(#[source] io::Error),

  /// Failed to write the index.
  #[error("failed to write cache index: {0}")]
  Write(#[source] io::Error),

  /// Failed to serialize the index.
  #[error("failed to serialize cache index: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Outcome marker for one successfully built component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
  /// Version the component was built at.
  pub version: String,

  /// Fingerprint of the descriptor, platform, and dependency fingerprints
  /// at build time.
  pub fingerprint: Fingerprint,

  /// Unix timestamp of the successful build.
  pub built_at: u64,
}

/// The on-disk cache index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheIndex {
  /// Format version; a mismatch discards the index.
  pub version: u32,

  /// Entries keyed by component name.
  pub entries: BTreeMap<String, CacheEntry>,
}

impl Default for CacheIndex {
  fn default() -> Self {
    Self {
      version: CACHE_INDEX_VERSION,
      entries: BTreeMap::new(),
    }
  }
}

impl CacheIndex {
  /// Whether a component must be rebuilt.
  ///
  /// Returns `false` only when an entry exists with a fingerprint equal to
  /// the freshly computed one; any mismatch or absence forces a rebuild.
  pub fn should_build(&self, name: &str, fingerprint: &Fingerprint) -> bool {
    match self.entries.get(name) {
      Some(entry) => entry.fingerprint != *fingerprint,
      None => true,
    }
  }

  /// Record a successful build.
  pub fn record_success(&mut self, name: &str, version: &str, fingerprint: Fingerprint, built_at: u64) {
    self.entries.insert(
      name.to_string(),
      CacheEntry {
        version: version.to_string(),
        fingerprint,
        built_at,
      },
    );
  }

  /// Number of recorded entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether the index has no entries.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Manages the cache index on disk.
#[derive(Debug, Clone)]
pub struct CacheStore {
  /// Directory holding `index.json`.
  base_path: PathBuf,
}

impl CacheStore {
  /// Create a store rooted at the given directory.
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  /// Create a store at the default location (see [`default_cache_root`]).
  pub fn default_store() -> Self {
    Self::new(default_cache_root())
  }

  /// The store's base directory (for diagnostics).
  pub fn base_path(&self) -> &PathBuf {
    &self.base_path
  }

  fn index_path(&self) -> PathBuf {
    self.base_path.join(INDEX_FILENAME)
  }

  /// Load the cache index.
  ///
  /// Never fails: a missing index is empty, and an unreadable or
  /// incompatible one is discarded with a warning so the run proceeds as a
  /// full rebuild.
  pub fn load(&self) -> CacheIndex {
    let path = self.index_path();

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no cache index, starting empty");
        return CacheIndex::default();
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "unreadable cache index, rebuilding everything");
        return CacheIndex::default();
      }
    };

    let index: CacheIndex = match serde_json::from_str(&content) {
      Ok(index) => index,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "corrupt cache index, rebuilding everything");
        return CacheIndex::default();
      }
    };

    if index.version != CACHE_INDEX_VERSION {
      warn!(
        found = index.version,
        expected = CACHE_INDEX_VERSION,
        "cache index version mismatch, rebuilding everything"
      );
      return CacheIndex::default();
    }

    debug!(entries = index.entries.len(), "cache index loaded");
    index
  }

  /// Save the cache index.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, index: &CacheIndex) -> Result<(), CacheError> {
    fs::create_dir_all(&self.base_path).map_err(CacheError::CreateDir)?;

    let path = self.index_path();
    let temp_path = self.base_path.join("index.json.tmp");

    let content = serde_json::to_string_pretty(index).map_err(CacheError::Serialize)?;
    fs::write(&temp_path, &content).map_err(CacheError::Write)?;
    fs::rename(&temp_path, &path).map_err(CacheError::Write)?;

    Ok(())
  }
}

/// Resolve the default cache root.
///
/// `OMNIBUILD_CACHE_DIR` wins when set. Otherwise the user cache
/// directory gets an `omnibuild` subdirectory: `%LOCALAPPDATA%` on
/// Windows, `$XDG_CACHE_HOME` or `~/.cache` elsewhere. With no usable
/// base the root lands under the system temp directory.
pub fn default_cache_root() -> PathBuf {
  if let Some(dir) = std::env::var_os("OMNIBUILD_CACHE_DIR") {
    return PathBuf::from(dir);
  }

  #[cfg(windows)]
  let base = std::env::var_os("LOCALAPPDATA").map(PathBuf::from);

  #[cfg(not(windows))]
  let base = std::env::var_os("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")));

  base.unwrap_or_else(std::env::temp_dir).join(APP_NAME)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn fingerprint(s: &str) -> Fingerprint {
    Fingerprint(s.to_string())
  }

  #[test]
  fn missing_index_loads_empty() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::new(temp.path().to_path_buf());

    let index = store.load();
    assert!(index.is_empty());
    assert_eq!(index.version, CACHE_INDEX_VERSION);
  }

  #[test]
  fn save_and_reload_round_trips() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::new(temp.path().to_path_buf());

    let mut index = CacheIndex::default();
    index.record_success("ruby", "3.4.1", fingerprint("aaaa"), 1_700_000_000);
    store.save(&index).unwrap();

    let reloaded = store.load();
    assert_eq!(reloaded, index);
    assert_eq!(reloaded.entries["ruby"].version, "3.4.1");
  }

  #[test]
  fn corrupt_index_degrades_to_empty() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(INDEX_FILENAME), "{ not json").unwrap();

    let store = CacheStore::new(temp.path().to_path_buf());
    let index = store.load();
    assert!(index.is_empty());
  }

  #[test]
  fn version_mismatch_degrades_to_empty() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join(INDEX_FILENAME),
      r#"{ "version": 999, "entries": {} }"#,
    )
    .unwrap();

    let store = CacheStore::new(temp.path().to_path_buf());
    let index = store.load();
    assert!(index.is_empty());
    assert_eq!(index.version, CACHE_INDEX_VERSION);
  }

  #[test]
  fn should_build_on_absent_entry() {
    let index = CacheIndex::default();
    assert!(index.should_build("ruby", &fingerprint("aaaa")));
  }

  #[test]
  fn should_build_on_fingerprint_mismatch() {
    let mut index = CacheIndex::default();
    index.record_success("ruby", "master", fingerprint("aaaa"), 0);

    assert!(index.should_build("ruby", &fingerprint("bbbb")));
    assert!(!index.should_build("ruby", &fingerprint("aaaa")));
  }

  #[test]
  fn record_success_overwrites_previous_entry() {
    let mut index = CacheIndex::default();
    index.record_success("ruby", "master", fingerprint("aaaa"), 100);
    index.record_success("ruby", "master", fingerprint("bbbb"), 200);

    assert_eq!(index.len(), 1);
    assert_eq!(index.entries["ruby"].fingerprint, fingerprint("bbbb"));
    assert_eq!(index.entries["ruby"].built_at, 200);
  }

  #[test]
  #[serial_test::serial]
  fn default_store_honors_env_override() {
    temp_env::with_var("OMNIBUILD_CACHE_DIR", Some("/custom/cache"), || {
      let store = CacheStore::default_store();
      assert_eq!(store.base_path(), &PathBuf::from("/custom/cache"));
    });
  }

  #[test]
  #[serial_test::serial]
  #[cfg(not(windows))]
  fn cache_root_prefers_xdg_cache_home() {
    temp_env::with_vars(
      [
        ("OMNIBUILD_CACHE_DIR", None::<&str>),
        ("XDG_CACHE_HOME", Some("/custom/cache")),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(default_cache_root(), PathBuf::from("/custom/cache/omnibuild"));
      },
    );
  }

  #[test]
  #[serial_test::serial]
  #[cfg(not(windows))]
  fn cache_root_falls_back_to_home() {
    temp_env::with_vars(
      [
        ("OMNIBUILD_CACHE_DIR", None::<&str>),
        ("XDG_CACHE_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(default_cache_root(), PathBuf::from("/home/user/.cache/omnibuild"));
      },
    );
  }
}
