//! Local path source acquisition.
//!
//! Resolves the declared path (tilde expansion, relative-to-manifest
//! resolution, canonicalization) and copies the tree into
//! `{workdir}/src`, so build steps never mutate the original location.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::FetchError;

/// Directory under the workdir that receives the copy.
const SRC_DIR: &str = "src";

/// Copy a local source tree into the workdir.
///
/// `base_dir` anchors relative paths (typically the manifest directory).
/// Returns the destination path.
pub fn fetch_path(path_str: &str, base_dir: &Path, workdir: &Path) -> Result<PathBuf, FetchError> {
  let source = resolve_path(path_str, base_dir)?;
  let dest = workdir.join(SRC_DIR);

  fs::create_dir_all(&dest).map_err(|e| FetchError::CreateDir(dest.clone(), e))?;

  copy_tree(&source, &dest)?;

  debug!(source = %source.display(), dest = %dest.display(), "copied local source");
  Ok(dest)
}

/// Resolve a path string to a canonical absolute path.
///
/// Handles:
/// - Tilde expansion (`~` -> home directory)
/// - Relative paths (resolved against `base_dir`)
/// - Validates the path exists
pub fn resolve_path(path_str: &str, base_dir: &Path) -> Result<PathBuf, FetchError> {
  let expanded = if path_str == "~" || path_str.starts_with("~/") {
    let home = home_dir().ok_or_else(|| FetchError::NoHome(path_str.to_string()))?;
    match path_str.strip_prefix("~/") {
      Some(rest) => home.join(rest),
      None => home,
    }
  } else {
    let candidate = PathBuf::from(path_str);
    if candidate.is_absolute() {
      candidate
    } else {
      base_dir.join(candidate)
    }
  };

  let canonical = dunce::canonicalize(&expanded).map_err(|e| {
    if e.kind() == std::io::ErrorKind::NotFound {
      FetchError::PathNotFound(expanded.clone())
    } else {
      FetchError::Canonicalize {
        path: expanded,
        source: e,
      }
    }
  })?;

  debug!(path = %canonical.display(), "resolved local source path");
  Ok(canonical)
}

/// Home directory used for `~` expansion in descriptor paths.
fn home_dir() -> Option<PathBuf> {
  #[cfg(windows)]
  return std::env::var_os("USERPROFILE").map(PathBuf::from);

  #[cfg(not(windows))]
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Copy a directory tree (or single file), preserving structure.
///
/// Symlinks are recreated on Unix and skipped elsewhere; special files are
/// skipped everywhere.
fn copy_tree(source: &Path, dest: &Path) -> Result<(), FetchError> {
  if source.is_file() {
    let target = dest.join(source.file_name().unwrap_or_default());
    fs::copy(source, &target).map_err(|e| FetchError::Copy {
      path: source.to_path_buf(),
      source: e,
    })?;
    return Ok(());
  }

  for entry in WalkDir::new(source) {
    let entry = entry.map_err(|e| FetchError::Copy {
      path: source.to_path_buf(),
      source: e.into(),
    })?;
    let entry_path = entry.path();

    let rel_path = entry_path.strip_prefix(source).unwrap_or(entry_path);
    if rel_path.as_os_str().is_empty() {
      continue;
    }
    let target = dest.join(rel_path);

    let file_type = entry.file_type();
    if file_type.is_dir() {
      fs::create_dir_all(&target).map_err(|e| FetchError::Copy {
        path: target.clone(),
        source: e,
      })?;
    } else if file_type.is_file() {
      fs::copy(entry_path, &target).map_err(|e| FetchError::Copy {
        path: entry_path.to_path_buf(),
        source: e,
      })?;
    } else if file_type.is_symlink() {
      #[cfg(unix)]
      {
        let link_target = fs::read_link(entry_path).map_err(|e| FetchError::Copy {
          path: entry_path.to_path_buf(),
          source: e,
        })?;
        std::os::unix::fs::symlink(&link_target, &target).map_err(|e| FetchError::Copy {
          path: target.clone(),
          source: e,
        })?;
      }
      #[cfg(not(unix))]
      {
        debug!(path = %entry_path.display(), "skipping symlink");
      }
    }
    // Sockets, devices, etc. are skipped
  }

  Ok(())
}
