//! Tarball source acquisition.
//!
//! Downloads land in `{workdir}/downloads/` and are verified against the
//! descriptor's SHA-256 when one is declared. A file already present with
//! a matching hash is reused without re-downloading.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::util::hash::hash_file;

use super::FetchError;

/// Fetch a tarball into the workdir.
///
/// Returns the path to the downloaded file.
pub async fn fetch_tarball(url: &str, sha256: Option<&str>, workdir: &Path) -> Result<PathBuf, FetchError> {
  info!(url, "fetching tarball");

  let downloads_dir = workdir.join("downloads");
  fs::create_dir_all(&downloads_dir)
    .await
    .map_err(|e| FetchError::CreateDir(downloads_dir.clone(), e))?;

  let filename = url_to_filename(url);
  let dest_path = downloads_dir.join(&filename);

  // Reuse an existing download when its hash still matches
  if let Some(expected) = sha256
    && dest_path.exists()
  {
    debug!(path = %dest_path.display(), "checking cached download");
    if let Ok(actual) = hash_file(&dest_path) {
      if actual.0 == expected {
        info!(path = %dest_path.display(), "using cached download");
        return Ok(dest_path);
      }
      debug!(expected, actual = %actual, "cached download hash mismatch, re-downloading");
    }
  }

  let response = reqwest::get(url).await.map_err(|e| FetchError::Download {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(FetchError::Download {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().await.map_err(|e| FetchError::Download {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  // Verify before writing anything to disk
  if let Some(expected) = sha256 {
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let actual = hex::encode(hasher.finalize());

    if actual != expected {
      return Err(FetchError::HashMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual,
      });
    }
  }

  let mut file = fs::File::create(&dest_path).await?;
  file.write_all(&bytes).await?;
  file.flush().await?;

  info!(path = %dest_path.display(), size = bytes.len(), "download complete");

  Ok(dest_path)
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it, falling back to a hash
/// of the URL when nothing usable remains.
fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_to_filename_simple() {
    assert_eq!(url_to_filename("https://example.com/pkg.tar.gz"), "pkg.tar.gz");
  }

  #[test]
  fn url_to_filename_strips_query() {
    assert_eq!(
      url_to_filename("https://example.com/pkg.tar.gz?token=abc"),
      "pkg.tar.gz"
    );
  }

  #[test]
  fn url_to_filename_sanitizes_special_chars() {
    assert_eq!(
      url_to_filename("https://example.com/pkg name.tar.gz"),
      "pkg_name.tar.gz"
    );
  }

  #[test]
  fn url_to_filename_fallback_for_empty() {
    let result = url_to_filename("https://example.com/");
    assert!(result.starts_with("download_"));
  }

  #[test]
  fn url_to_filename_release_asset() {
    assert_eq!(
      url_to_filename("https://github.com/org/repo/releases/download/v1.0.0/app-linux-x64.tar.gz"),
      "app-linux-x64.tar.gz"
    );
  }

  // Download tests require network access and live with the integration
  // suites, gated behind an explicit opt-in.
}
