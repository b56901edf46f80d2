//! Git source acquisition.
//!
//! Repositories are checked out under `{workdir}/src` with their `.git`
//! directories intact, so a rebuild of the same component fetches
//! incrementally instead of re-cloning.

use std::fs;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use tracing::{debug, info};

use super::FetchError;

/// Directory under the workdir that receives the checkout.
const SRC_DIR: &str = "src";

/// Fetch a git source into the workdir.
///
/// Clones on first acquisition; opens and fetches updates afterwards. The
/// requested revision (commit, tag, or branch) is resolved to a commit
/// hash; with no revision, HEAD is resolved instead.
///
/// Returns the checkout path and the resolved commit hash.
pub fn fetch_git(url: &str, rev: Option<&str>, workdir: &Path) -> Result<(PathBuf, String), FetchError> {
  let checkout = workdir.join(SRC_DIR);

  if !workdir.exists() {
    fs::create_dir_all(workdir).map_err(|e| FetchError::CreateDir(workdir.to_path_buf(), e))?;
  }

  let repo = if checkout.join(".git").exists() {
    debug!(path = %checkout.display(), "opening existing checkout");
    let repo = gix::open(&checkout).map_err(|e| FetchError::Open {
      path: checkout.clone(),
      source: Box::new(e),
    })?;

    fetch_updates(&repo, url)?;
    repo
  } else {
    info!(url, path = %checkout.display(), "cloning repository");
    clone_repo(url, &checkout)?
  };

  let commit_hash = resolve_revision(&repo, rev)?;

  debug!(rev = %commit_hash, "resolved revision");
  Ok((checkout, commit_hash))
}

/// Clone a repository to the given path, materializing the main worktree.
fn clone_repo(url: &str, dest: &Path) -> Result<gix::Repository, FetchError> {
  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| FetchError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(repo)
}

/// Fetch updates from the default remote.
fn fetch_updates(repo: &gix::Repository, url: &str) -> Result<(), FetchError> {
  debug!(url, "fetching updates");

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or(FetchError::NoRemote)?
    .map_err(|e| FetchError::Connect {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| FetchError::Connect {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| FetchError::FetchRemote {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::FetchRemote {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Resolve a revision spec to a commit hash, defaulting to HEAD.
fn resolve_revision(repo: &gix::Repository, rev: Option<&str>) -> Result<String, FetchError> {
  match rev {
    Some(rev_str) => {
      let spec = repo.rev_parse(rev_str).map_err(|_| FetchError::RevisionNotFound {
        rev: rev_str.to_string(),
      })?;

      let object_id = spec.single().ok_or_else(|| FetchError::RevisionNotFound {
        rev: format!("{} (ambiguous)", rev_str),
      })?;

      let commit = object_id.object().map_err(|e| FetchError::RevisionNotFound {
        rev: format!("{}: {}", rev_str, e),
      })?;

      Ok(commit.id.to_string())
    }
    None => {
      let mut head = repo.head().map_err(|e| FetchError::ResolveHead(e.to_string()))?;

      let commit = head
        .peel_to_commit()
        .map_err(|e| FetchError::ResolveHead(e.to_string()))?;

      Ok(commit.id.to_string())
    }
  }
}

// NOTE: Clone/fetch against real remotes requires network access; the
// resolution and copy logic is covered by the path and tarball tests.
