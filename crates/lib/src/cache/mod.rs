//! Build cache: fingerprints and the persistent cache index.
//!
//! A component's fingerprint covers its serialized descriptor, the target
//! platform triple, and the fingerprints of its resolved dependencies in
//! declaration order. Any change to a descriptor therefore ripples through
//! every transitive dependent, and a cache entry built for one platform
//! never satisfies another.
//!
//! The index persists across runs with an explicit load-at-start /
//! flush-at-end lifecycle owned by the orchestrator.

pub mod store;

use serde::Serialize;

use crate::registry::ComponentDescriptor;
use crate::util::hash::{Fingerprint, HashError, Hashable};

pub use store::{CacheEntry, CacheError, CacheIndex, CacheStore, default_cache_root};

/// The material hashed into a component fingerprint.
#[derive(Serialize)]
struct FingerprintInput<'a> {
  descriptor: &'a ComponentDescriptor,
  platform: &'a str,
  /// (name, fingerprint) of each direct dependency, in declaration order.
  dependencies: Vec<(&'a str, &'a str)>,
}

impl Hashable for FingerprintInput<'_> {}

/// Compute a component's fingerprint.
///
/// `dep_fingerprints` must hold the already-computed fingerprints of the
/// component's direct dependencies, in declaration order — the resolver
/// guarantees dependencies are processed first.
pub fn component_fingerprint(
  descriptor: &ComponentDescriptor,
  platform: &str,
  dep_fingerprints: &[(&str, &Fingerprint)],
) -> Result<Fingerprint, HashError> {
  let input = FingerprintInput {
    descriptor,
    platform,
    dependencies: dep_fingerprints
      .iter()
      .map(|(name, fp)| (*name, fp.0.as_str()))
      .collect(),
  };

  input.compute_fingerprint()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::StepSpec;

  fn descriptor(name: &str) -> ComponentDescriptor {
    let mut d = ComponentDescriptor::new(name);
    d.steps = vec![StepSpec::Run {
      command: "make".to_string(),
      cwd: None,
      env: Default::default(),
    }];
    d
  }

  #[test]
  fn identical_input_identical_fingerprint() {
    let d = descriptor("ruby");
    let a = component_fingerprint(&d, "x86_64-linux", &[]).unwrap();
    let b = component_fingerprint(&d, "x86_64-linux", &[]).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn descriptor_change_changes_fingerprint() {
    let base = descriptor("ruby");
    let mut changed = base.clone();
    changed.version = "3.4.1".to_string();

    let a = component_fingerprint(&base, "x86_64-linux", &[]).unwrap();
    let b = component_fingerprint(&changed, "x86_64-linux", &[]).unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn step_change_changes_fingerprint() {
    let base = descriptor("ruby");
    let mut changed = base.clone();
    changed.steps.push(StepSpec::Run {
      command: "make check".to_string(),
      cwd: None,
      env: Default::default(),
    });

    let a = component_fingerprint(&base, "x86_64-linux", &[]).unwrap();
    let b = component_fingerprint(&changed, "x86_64-linux", &[]).unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn platform_changes_fingerprint() {
    let d = descriptor("ruby");
    let linux = component_fingerprint(&d, "x86_64-linux", &[]).unwrap();
    let darwin = component_fingerprint(&d, "aarch64-darwin", &[]).unwrap();
    assert_ne!(linux, darwin);
  }

  #[test]
  fn dependency_fingerprint_change_propagates() {
    let d = descriptor("app");
    let dep_old = Fingerprint("aaaaaaaaaaaaaaaaaaaa".to_string());
    let dep_new = Fingerprint("bbbbbbbbbbbbbbbbbbbb".to_string());

    let a = component_fingerprint(&d, "x86_64-linux", &[("lib", &dep_old)]).unwrap();
    let b = component_fingerprint(&d, "x86_64-linux", &[("lib", &dep_new)]).unwrap();
    assert_ne!(a, b);
  }
}
