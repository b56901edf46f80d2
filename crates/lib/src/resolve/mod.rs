//! Dependency resolution.
//!
//! This module turns a requested set of component names into a
//! [`ResolvedPlan`]: an ordering in which every dependency appears strictly
//! before its dependents.
//!
//! # Algorithm Overview
//!
//! 1. Walk the requested names in the order given
//! 2. Depth-first over each component's declared dependencies, in
//!    declaration order
//! 3. Emit a component post-order, after all of its dependencies
//! 4. Memoize emitted components so shared dependencies appear once
//! 5. Track an in-progress mark per node; revisiting one is a cycle,
//!    reported with the full cycle path
//!
//! Ties between independent subtrees follow declaration order, so identical
//! input always yields an identical plan. The build cache relies on this.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::registry::Registry;

/// Errors raised during plan resolution.
///
/// All of these are fatal to the run: no partial plan is usable.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A requested component is not in the registry.
  #[error("unknown component: {name}")]
  UnknownComponent { name: String },

  /// A component declares a dependency that is not in the registry.
  #[error("component '{referrer}' depends on unknown component '{name}'")]
  MissingDependency { referrer: String, name: String },

  /// The dependency graph contains a cycle.
  #[error("dependency cycle detected: {}", path.join(" -> "))]
  Cycle { path: Vec<String> },
}

/// A topologically valid build order over the requested components.
///
/// Every dependency of a component appears strictly earlier than the
/// component itself, and no component appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
  names: Vec<String>,
}

impl ResolvedPlan {
  /// Component names in build order.
  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// Iterate component names in build order.
  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(|s| s.as_str())
  }

  /// Position of a component in the plan.
  pub fn position(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }

  /// Whether the plan contains a component.
  pub fn contains(&self, name: &str) -> bool {
    self.names.iter().any(|n| n == name)
  }

  /// Number of components in the plan.
  pub fn len(&self) -> usize {
    self.names.len()
  }

  /// Whether the plan is empty.
  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

/// Visitation state for one node during the depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  InProgress,
  Done,
}

/// Resolve the requested components against the registry.
///
/// Produces a [`ResolvedPlan`] covering the requested components and all
/// of their transitive dependencies.
///
/// # Errors
///
/// - [`ResolveError::UnknownComponent`] if a requested name is absent
/// - [`ResolveError::MissingDependency`] if a dependency reference dangles
/// - [`ResolveError::Cycle`] if the dependency graph contains a cycle
pub fn resolve(requested: &[String], registry: &Registry) -> Result<ResolvedPlan, ResolveError> {
  let mut walker = Walker {
    registry,
    marks: HashMap::new(),
    stack: Vec::new(),
    order: Vec::new(),
  };

  for name in requested {
    if !registry.contains(name) {
      return Err(ResolveError::UnknownComponent { name: name.clone() });
    }
    walker.visit(name)?;
  }

  debug!(components = walker.order.len(), "plan resolved");

  Ok(ResolvedPlan { names: walker.order })
}

struct Walker<'a> {
  registry: &'a Registry,
  marks: HashMap<String, Mark>,
  /// Current DFS path, used to name cycles.
  stack: Vec<String>,
  order: Vec<String>,
}

impl Walker<'_> {
  fn visit(&mut self, name: &str) -> Result<(), ResolveError> {
    match self.marks.get(name) {
      Some(Mark::Done) => return Ok(()),
      Some(Mark::InProgress) => {
        // The cycle is the stack suffix starting at the first occurrence
        // of this node, closed by the node itself.
        let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
        let mut path: Vec<String> = self.stack[start..].to_vec();
        path.push(name.to_string());
        return Err(ResolveError::Cycle { path });
      }
      None => {}
    }

    // Requested names are checked by resolve(); anything reached from here
    // is a dependency edge, so absence is a dangling reference.
    let descriptor = self
      .registry
      .get(name)
      .expect("visited component must be registered");

    self.marks.insert(name.to_string(), Mark::InProgress);
    self.stack.push(name.to_string());

    for dep in &descriptor.dependencies {
      if !self.registry.contains(dep) {
        return Err(ResolveError::MissingDependency {
          referrer: name.to_string(),
          name: dep.clone(),
        });
      }
      self.visit(dep)?;
    }

    self.stack.pop();
    self.marks.insert(name.to_string(), Mark::Done);
    self.order.push(name.to_string());
    Ok(())
  }
}
