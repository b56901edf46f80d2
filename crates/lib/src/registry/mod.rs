//! Component registry.
//!
//! The registry holds every known component descriptor keyed by name. It is
//! the leaf dependency of the resolver and orchestrator: descriptors go in
//! once, then the registry is immutable and freely shared.
//!
//! Declaration order is preserved so that plan resolution can break ties
//! between independent subtrees deterministically.

pub mod types;

use std::collections::HashMap;

use thiserror::Error;

pub use types::{ComponentDescriptor, License, SourceSpec, StepSpec};

/// Errors raised while populating a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// A descriptor declared an empty name.
  #[error("component name must not be empty")]
  EmptyName,

  /// Two descriptors declared the same name.
  #[error("duplicate component name: {0}")]
  DuplicateName(String),
}

/// All known component descriptors, keyed by name.
///
/// Names are stored separately from the descriptor arena so iteration
/// follows declaration order while lookups stay O(1).
#[derive(Debug, Default, Clone)]
pub struct Registry {
  /// Component names in declaration order.
  names: Vec<String>,

  /// Descriptor arena keyed by name.
  components: HashMap<String, ComponentDescriptor>,
}

impl Registry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a registry from descriptors in declaration order.
  pub fn from_descriptors(
    descriptors: impl IntoIterator<Item = ComponentDescriptor>,
  ) -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    for descriptor in descriptors {
      registry.insert(descriptor)?;
    }
    Ok(registry)
  }

  /// Insert a descriptor.
  ///
  /// # Errors
  ///
  /// Returns `EmptyName` for a blank name and `DuplicateName` if the name
  /// is already registered. Dependencies are not validated here; dangling
  /// references surface at resolution time.
  pub fn insert(&mut self, descriptor: ComponentDescriptor) -> Result<(), RegistryError> {
    if descriptor.name.is_empty() {
      return Err(RegistryError::EmptyName);
    }
    if self.components.contains_key(&descriptor.name) {
      return Err(RegistryError::DuplicateName(descriptor.name));
    }

    self.names.push(descriptor.name.clone());
    self.components.insert(descriptor.name.clone(), descriptor);
    Ok(())
  }

  /// Look up a descriptor by name.
  pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
    self.components.get(name)
  }

  /// Whether a component with this name is registered.
  pub fn contains(&self, name: &str) -> bool {
    self.components.contains_key(name)
  }

  /// Component names in declaration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(|s| s.as_str())
  }

  /// Number of registered components.
  pub fn len(&self) -> usize {
    self.names.len()
  }

  /// Whether the registry is empty.
  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_and_get() {
    let mut registry = Registry::new();
    registry.insert(ComponentDescriptor::new("ruby")).unwrap();

    assert!(registry.contains("ruby"));
    assert_eq!(registry.get("ruby").unwrap().name, "ruby");
    assert!(registry.get("bundler").is_none());
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn rejects_empty_name() {
    let mut registry = Registry::new();
    let result = registry.insert(ComponentDescriptor::new(""));
    assert!(matches!(result, Err(RegistryError::EmptyName)));
    assert!(registry.is_empty());
  }

  #[test]
  fn rejects_duplicate_name() {
    let mut registry = Registry::new();
    registry.insert(ComponentDescriptor::new("ruby")).unwrap();

    let result = registry.insert(ComponentDescriptor::new("ruby"));
    assert!(matches!(result, Err(RegistryError::DuplicateName(name)) if name == "ruby"));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn names_preserve_declaration_order() {
    let registry = Registry::from_descriptors([
      ComponentDescriptor::new("zlib"),
      ComponentDescriptor::new("openssl"),
      ComponentDescriptor::new("ruby"),
    ])
    .unwrap();

    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["zlib", "openssl", "ruby"]);
  }
}
