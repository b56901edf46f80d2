//! Component descriptor types.
//!
//! A [`ComponentDescriptor`] is the declarative description of one software
//! component: identity, licensing metadata, source provenance, dependency
//! names, and an ordered build procedure. Descriptors are authored outside
//! the engine (the CLI deserializes them from JSON) and consumed here as
//! plain data.
//!
//! # Serialization
//!
//! Every field is serde-serializable so descriptors can be:
//! - Loaded from manifest files
//! - Hashed into cache fingerprints
//! - Dry-run and inspected without execution

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_VERSION;
use crate::util::hash::Hashable;

/// License metadata for a component.
///
/// Carried through to the fingerprint but otherwise inert: license
/// acceptance and reporting are external concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
  /// License identifier (e.g., "Apache-2.0").
  pub id: String,

  /// References to the license text (URLs or paths relative to the source).
  #[serde(default)]
  pub files: Vec<String>,
}

/// Source provenance for a component. Exactly one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
  /// A git repository, optionally pinned to a revision (commit, tag, or
  /// branch). An unpinned source follows the remote HEAD.
  Git {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
  },

  /// A tarball download, optionally verified against a SHA-256 checksum.
  Tarball {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
  },

  /// A local path (absolute, tilde-prefixed, or relative to the manifest).
  Path { path: String },
}

/// One step of a component's build procedure.
///
/// Steps are tagged data variants rather than closures so the engine can
/// serialize them, include them in cache fingerprints, and dry-run them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepSpec {
  /// A shell command, with an optional working-directory override
  /// (relative paths resolve against the component workdir) and a
  /// per-step environment overlay.
  Run {
    command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
  },

  /// Acquire the component's declared source into the workdir.
  ///
  /// The executor prepends this implicitly when a descriptor has a
  /// `source` and its step list does not already lead with one.
  Fetch,

  /// Set an environment variable for all subsequent steps of this
  /// component.
  Env { key: String, value: String },
}

/// The declarative description of one software component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
  /// Unique component name. Non-empty, unique within a registry.
  pub name: String,

  /// Component version. Defaults to the symbolic "master" marker.
  #[serde(default = "default_version")]
  pub version: String,

  /// License metadata, if declared.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub license: Option<License>,

  /// Whether transitive dependency licensing is skipped for this
  /// component. Metadata only; carried into the fingerprint.
  #[serde(default)]
  pub skip_transitive_licensing: bool,

  /// Source provenance, if the component builds from fetched sources.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<SourceSpec>,

  /// Names of components that must be built before this one, in
  /// declaration order.
  #[serde(default)]
  pub dependencies: Vec<String>,

  /// Ordered build procedure.
  #[serde(default)]
  pub steps: Vec<StepSpec>,

  /// Component-level environment overrides, applied as the last layer of
  /// the build environment.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl Hashable for ComponentDescriptor {}

fn default_version() -> String {
  DEFAULT_VERSION.to_string()
}

impl ComponentDescriptor {
  /// Create a minimal descriptor with the default version and no steps.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: default_version(),
      license: None,
      skip_transitive_licensing: false,
      source: None,
      dependencies: Vec::new(),
      steps: Vec::new(),
      env: BTreeMap::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn version_defaults_to_master() {
    let json = r#"{ "name": "license-acceptance" }"#;
    let descriptor: ComponentDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(descriptor.version, "master");
    assert!(!descriptor.skip_transitive_licensing);
    assert!(descriptor.dependencies.is_empty());
  }

  #[test]
  fn source_kinds_deserialize() {
    let git: SourceSpec =
      serde_json::from_str(r#"{ "type": "git", "url": "https://example.com/repo.git" }"#).unwrap();
    assert!(matches!(git, SourceSpec::Git { rev: None, .. }));

    let tarball: SourceSpec = serde_json::from_str(
      r#"{ "type": "tarball", "url": "https://example.com/pkg.tar.gz", "sha256": "abc" }"#,
    )
    .unwrap();
    assert!(matches!(tarball, SourceSpec::Tarball { sha256: Some(_), .. }));

    let path: SourceSpec = serde_json::from_str(r#"{ "type": "path", "path": "~/src/pkg" }"#).unwrap();
    assert!(matches!(path, SourceSpec::Path { .. }));
  }

  #[test]
  fn step_kinds_deserialize() {
    let run: StepSpec = serde_json::from_str(
      r#"{ "type": "run", "command": "make install", "cwd": "components/ruby" }"#,
    )
    .unwrap();
    assert!(matches!(run, StepSpec::Run { cwd: Some(_), .. }));

    let fetch: StepSpec = serde_json::from_str(r#"{ "type": "fetch" }"#).unwrap();
    assert_eq!(fetch, StepSpec::Fetch);

    let env: StepSpec =
      serde_json::from_str(r#"{ "type": "env", "key": "CC", "value": "gcc" }"#).unwrap();
    assert!(matches!(env, StepSpec::Env { .. }));
  }

  #[test]
  fn full_descriptor_round_trips() {
    let json = r#"{
      "name": "license-acceptance",
      "license": { "id": "Apache-2.0", "files": ["http://www.apache.org/licenses/LICENSE-2.0"] },
      "skip_transitive_licensing": true,
      "source": { "type": "git", "url": "https://github.com/chef/license-acceptance.git" },
      "dependencies": ["ruby", "rubygems", "bundler"],
      "steps": [
        { "type": "run", "command": "bundle install --without development test", "cwd": "components/ruby" },
        { "type": "run", "command": "gem build license-acceptance.gemspec", "cwd": "components/ruby" }
      ]
    }"#;

    let descriptor: ComponentDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(descriptor.dependencies, vec!["ruby", "rubygems", "bundler"]);
    assert_eq!(descriptor.steps.len(), 2);
    assert!(descriptor.skip_transitive_licensing);

    let reserialized = serde_json::to_string(&descriptor).unwrap();
    let again: ComponentDescriptor = serde_json::from_str(&reserialized).unwrap();
    assert_eq!(descriptor, again);
  }
}
