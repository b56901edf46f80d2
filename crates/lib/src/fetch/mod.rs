//! Source acquisition for components.
//!
//! The engine treats source fetching as an opaque collaborator: given a
//! [`SourceSpec`] and a destination workdir, the source ends up on disk or
//! a [`FetchError`] explains why. Three provenance kinds are supported:
//!
//! - git repositories (cloned or incrementally fetched, revision resolved)
//! - tarball downloads (optionally SHA-256 verified, cached re-use)
//! - local paths (tilde-expanded, canonicalized, copied into the workdir)
//!
//! Archive extraction is intentionally out of scope: the contract is
//! "verified artifact present under the workdir", and unpacking belongs to
//! the component's own build steps.

mod git;
mod path;
mod tarball;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::registry::SourceSpec;

/// Errors raised while acquiring a component's source.
///
/// These are reported distinctly from build-step failures: a fetch problem
/// is not controlled by the component's build script.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to create a directory under the workdir.
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] std::io::Error),

  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to open an existing git checkout.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// Failed to fetch updates from the remote.
  #[error("failed to fetch from '{url}': {source}")]
  FetchRemote {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// No remote configured for an existing checkout.
  #[error("no remote configured for repository")]
  NoRemote,

  /// Failed to connect to the remote.
  #[error("failed to connect to remote '{url}': {source}")]
  Connect {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The requested revision does not exist.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// Failed to resolve HEAD.
  #[error("failed to resolve HEAD: {0}")]
  ResolveHead(String),

  /// HTTP download failed.
  #[error("download failed for {url}: {message}")]
  Download { url: String, message: String },

  /// Downloaded content did not match the declared checksum.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  /// A local source path does not exist.
  #[error("path does not exist: {0}")]
  PathNotFound(PathBuf),

  /// A source path starts with `~` but no home directory is set.
  #[error("cannot expand '~' in '{0}': no home directory")]
  NoHome(String),

  /// Failed to canonicalize a local source path.
  #[error("failed to resolve path '{path}': {source}")]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Failed to copy a local source tree.
  #[error("failed to copy '{path}': {source}")]
  Copy {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// I/O error during fetch.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A blocking fetch task failed to complete.
  #[error("fetch task failed: {0}")]
  Task(String),
}

/// A successfully acquired source.
#[derive(Debug, Clone)]
pub struct FetchedSource {
  /// Where the source landed under the workdir.
  pub path: PathBuf,

  /// Resolved revision for git sources (commit hash), `None` otherwise.
  pub rev: Option<String>,
}

/// Acquire a source into the component workdir.
///
/// Relative local paths resolve against `base_dir` (typically the manifest
/// directory). Blocking git and filesystem work runs on the blocking pool
/// so build workers stay responsive.
pub async fn fetch_source(
  spec: &SourceSpec,
  base_dir: &Path,
  workdir: &Path,
) -> Result<FetchedSource, FetchError> {
  match spec {
    SourceSpec::Git { url, rev } => {
      let url = url.clone();
      let rev = rev.clone();
      let workdir = workdir.to_path_buf();

      let (path, commit) =
        tokio::task::spawn_blocking(move || git::fetch_git(&url, rev.as_deref(), &workdir))
          .await
          .map_err(|e| FetchError::Task(e.to_string()))??;

      Ok(FetchedSource {
        path,
        rev: Some(commit),
      })
    }

    SourceSpec::Tarball { url, sha256 } => {
      let path = tarball::fetch_tarball(url, sha256.as_deref(), workdir).await?;
      Ok(FetchedSource { path, rev: None })
    }

    SourceSpec::Path { path } => {
      let path = path.clone();
      let base_dir = base_dir.to_path_buf();
      let workdir = workdir.to_path_buf();

      let dest = tokio::task::spawn_blocking(move || path::fetch_path(&path, &base_dir, &workdir))
        .await
        .map_err(|e| FetchError::Task(e.to_string()))??;

      Ok(FetchedSource {
        path: dest,
        rev: None,
      })
    }
  }
}
