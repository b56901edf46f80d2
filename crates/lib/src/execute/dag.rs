//! Execution DAG for wave scheduling.
//!
//! The resolver's [`ResolvedPlan`] is a total order; for parallel
//! execution the orchestrator needs the underlying partial order. This
//! module rebuilds it as a petgraph digraph over component names and
//! computes execution waves: groups of components whose dependencies all
//! live in earlier waves, and which can therefore build concurrently.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::registry::Registry;
use crate::resolve::ResolvedPlan;

use super::types::OrchestrateError;

/// A dependency DAG over the components of one resolved plan.
pub struct PlanDag {
  /// The underlying graph; edges run from dependency to dependent.
  graph: DiGraph<String, ()>,

  /// Map from component name to node index.
  nodes: HashMap<String, NodeIndex>,

  /// Plan position per component, for deterministic wave ordering.
  positions: HashMap<String, usize>,
}

impl PlanDag {
  /// Build the DAG for a resolved plan.
  ///
  /// The plan guarantees every dependency is present, so edge insertion
  /// never dangles.
  pub fn from_plan(plan: &ResolvedPlan, registry: &Registry) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();
    let mut positions = HashMap::new();

    for (position, name) in plan.iter().enumerate() {
      let idx = graph.add_node(name.to_string());
      nodes.insert(name.to_string(), idx);
      positions.insert(name.to_string(), position);
    }

    for name in plan.iter() {
      let dependent_idx = nodes[name];
      let descriptor = registry.get(name).expect("planned component must be registered");

      for dep in &descriptor.dependencies {
        let dep_idx = nodes[dep.as_str()];
        graph.add_edge(dep_idx, dependent_idx, ());
      }
    }

    Self {
      graph,
      nodes,
      positions,
    }
  }

  /// Get components organized into parallel execution waves.
  ///
  /// Each wave contains components that can build in parallel because all
  /// their dependencies are in previous waves. Within a wave, components
  /// keep plan order so repeated runs schedule identically.
  pub fn waves(&self) -> Result<Vec<Vec<String>>, OrchestrateError> {
    // Kahn's algorithm variant computing levels
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    let mut node_level: HashMap<NodeIndex, usize> = HashMap::new();

    for idx in self.graph.node_indices() {
      in_degree.insert(idx, self.graph.neighbors_directed(idx, Direction::Incoming).count());
    }

    let mut current_level = 0;
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();

      // A plan is acyclic by construction; this only fires on internal
      // inconsistency.
      if ready.is_empty() {
        return Err(OrchestrateError::CycleDetected);
      }

      for &idx in &ready {
        node_level.insert(idx, current_level);
        remaining.remove(&idx);

        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      current_level += 1;
    }

    let max_level = node_level.values().copied().max().unwrap_or(0);
    let mut waves: Vec<Vec<String>> = vec![Vec::new(); max_level + 1];

    for idx in self.graph.node_indices() {
      if let Some(&level) = node_level.get(&idx) {
        waves[level].push(self.graph[idx].clone());
      }
    }

    for wave in &mut waves {
      wave.sort_by_key(|name| self.positions[name]);
    }
    waves.retain(|w| !w.is_empty());

    Ok(waves)
  }

  /// Direct dependencies of a component.
  pub fn dependencies(&self, name: &str) -> Vec<String> {
    let Some(&idx) = self.nodes.get(name) else {
      return Vec::new();
    };

    let mut deps: Vec<String> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep_idx| self.graph[dep_idx].clone())
      .collect();

    deps.sort_by_key(|dep| self.positions[dep]);
    deps
  }

  /// Whether a component has any dependencies.
  pub fn has_dependencies(&self, name: &str) -> bool {
    self
      .nodes
      .get(name)
      .map(|&idx| self.graph.neighbors_directed(idx, Direction::Incoming).next().is_some())
      .unwrap_or(false)
  }

  /// Number of components in the DAG.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Whether the DAG is empty.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}
