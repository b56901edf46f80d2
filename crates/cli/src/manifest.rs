//! Descriptor manifest loading.
//!
//! The engine consumes descriptors as plain data; this module is the CLI's
//! choice of authoring format: a JSON file with a `components` array.
//!
//! ```json
//! {
//!   "components": [
//!     {
//!       "name": "license-acceptance",
//!       "license": { "id": "Apache-2.0" },
//!       "source": { "type": "git", "url": "https://github.com/chef/license-acceptance.git" },
//!       "dependencies": ["ruby", "rubygems", "bundler"],
//!       "steps": [
//!         { "type": "run", "command": "bundle install", "cwd": "src/components/ruby" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use omnibuild_lib::registry::{ComponentDescriptor, Registry};

#[derive(Debug, Deserialize)]
struct ManifestFile {
  components: Vec<ComponentDescriptor>,
}

/// A manifest loaded into a registry, plus the directory it came from
/// (relative local source paths resolve against it).
#[derive(Debug)]
pub struct LoadedManifest {
  pub registry: Registry,
  pub dir: PathBuf,
}

/// Load a manifest file into a registry.
pub fn load_manifest(path: &Path) -> Result<LoadedManifest> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("failed to read manifest {}", path.display()))?;

  let manifest: ManifestFile = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse manifest {}", path.display()))?;

  let registry = Registry::from_descriptors(manifest.components)
    .with_context(|| format!("invalid manifest {}", path.display()))?;

  let dir = path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."));

  Ok(LoadedManifest { registry, dir })
}
