//! Types for build execution.
//!
//! This module defines the per-component outcome types, the aggregated run
//! report, execution options, and the orchestrator error type.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::cache::default_cache_root;
use crate::consts::DEFAULT_INSTALL_DIR;
use crate::resolve::ResolveError;
use crate::util::hash::{Fingerprint, HashError};

/// Details of a failed build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
  /// Zero-based index of the failing step in the effective step list.
  pub index: usize,

  /// The command that failed (or a description for non-run steps).
  pub command: String,

  /// Exit code, if the process ran to completion.
  pub exit_code: Option<i32>,

  /// Captured stdout.
  pub stdout: String,

  /// Captured stderr.
  pub stderr: String,
}

/// Why a component's build failed.
///
/// Source-fetch problems are a distinct kind from step failures: they are
/// not controlled by the component's build script.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum BuildFailure {
  /// Source acquisition failed.
  #[error("source fetch failed: {message}")]
  Fetch { message: String },

  /// A build step exited unsuccessfully.
  #[error("step {} failed (exit code {:?}): {}", .0.index, .0.exit_code, .0.command)]
  Step(StepFailure),

  /// The component's working directory could not be prepared.
  #[error("workspace error: {message}")]
  Workspace { message: String },
}

/// Final outcome for one component in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ComponentStatus {
  /// Built successfully this run.
  Succeeded { fingerprint: Fingerprint },

  /// Skipped: the cache already holds this fingerprint.
  SkippedCached { fingerprint: Fingerprint },

  /// Attempted and failed.
  Failed { failure: BuildFailure },

  /// Never attempted because a dependency (or, under fail-fast, any
  /// earlier component) failed.
  Blocked { failed_dependency: String },
}

impl ComponentStatus {
  /// Whether this status counts as a good outcome.
  pub fn is_ok(&self) -> bool {
    matches!(self, ComponentStatus::Succeeded { .. } | ComponentStatus::SkippedCached { .. })
  }
}

/// Aggregated outcome of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  /// Component names in plan order.
  pub order: Vec<String>,

  /// Final status per component.
  pub statuses: BTreeMap<String, ComponentStatus>,
}

impl RunReport {
  /// Status of one component.
  pub fn status(&self, name: &str) -> Option<&ComponentStatus> {
    self.statuses.get(name)
  }

  /// Iterate components in plan order with their statuses.
  pub fn components(&self) -> impl Iterator<Item = (&str, &ComponentStatus)> {
    self
      .order
      .iter()
      .filter_map(|name| self.statuses.get(name).map(|s| (name.as_str(), s)))
  }

  /// Whether every component succeeded or was skipped-cached.
  pub fn is_success(&self) -> bool {
    self.statuses.values().all(ComponentStatus::is_ok)
  }

  pub fn succeeded(&self) -> usize {
    self.count(|s| matches!(s, ComponentStatus::Succeeded { .. }))
  }

  pub fn skipped(&self) -> usize {
    self.count(|s| matches!(s, ComponentStatus::SkippedCached { .. }))
  }

  pub fn failed(&self) -> usize {
    self.count(|s| matches!(s, ComponentStatus::Failed { .. }))
  }

  pub fn blocked(&self) -> usize {
    self.count(|s| matches!(s, ComponentStatus::Blocked { .. }))
  }

  fn count(&self, pred: impl Fn(&ComponentStatus) -> bool) -> usize {
    self.statuses.values().filter(|s| pred(s)).count()
  }
}

/// What happens to the rest of the run after a component fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
  /// Keep building branches that share no dependency on the failure.
  #[default]
  PerBranch,

  /// Stop scheduling everything after the first failure. In-flight steps
  /// run to completion; unstarted components are reported blocked.
  FailFast,
}

/// Configuration for an orchestrator run.
#[derive(Debug, Clone)]
pub struct RunOptions {
  /// Maximum number of components building in parallel.
  pub parallelism: usize,

  /// Failure propagation policy.
  pub failure_mode: FailureMode,

  /// Root directory for per-component working directories
  /// (`{build_root}/{name}`).
  pub build_root: PathBuf,

  /// Installation prefix holding the embedded toolchain; feeds the
  /// environment builder.
  pub install_dir: PathBuf,

  /// Directory the descriptor manifest was loaded from; anchors relative
  /// local source paths.
  pub manifest_dir: PathBuf,

  /// Directory holding the persistent cache index.
  pub cache_dir: PathBuf,

  /// Base environment visible to build steps before engine layers apply.
  pub base_env: BTreeMap<String, String>,

  /// Shell override for run steps. `None` uses the platform default.
  pub shell: Option<String>,
}

impl Default for RunOptions {
  fn default() -> Self {
    let cache_root = default_cache_root();
    Self {
      parallelism: num_cpus(),
      failure_mode: FailureMode::default(),
      build_root: cache_root.join("work"),
      install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
      manifest_dir: PathBuf::from("."),
      cache_dir: cache_root,
      base_env: BTreeMap::new(),
      shell: None,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Errors that abort a run before any component builds.
///
/// Component-scoped failures never surface here; they land in the
/// [`RunReport`] instead.
#[derive(Debug, Error)]
pub enum OrchestrateError {
  /// Plan resolution failed; no partial plan is usable.
  #[error("resolution error: {0}")]
  Resolve(#[from] ResolveError),

  /// Fingerprint computation failed.
  #[error("fingerprint error: {0}")]
  Fingerprint(#[from] HashError),

  /// The current platform is not supported.
  #[error("unsupported platform")]
  UnsupportedPlatform,

  /// Cycle detected while computing execution waves.
  #[error("dependency cycle detected")]
  CycleDetected,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fingerprint() -> Fingerprint {
    Fingerprint("aaaaaaaaaaaaaaaaaaaa".to_string())
  }

  fn report(entries: &[(&str, ComponentStatus)]) -> RunReport {
    RunReport {
      order: entries.iter().map(|(n, _)| n.to_string()).collect(),
      statuses: entries
        .iter()
        .map(|(n, s)| (n.to_string(), s.clone()))
        .collect(),
    }
  }

  #[test]
  fn empty_report_is_success() {
    let report = report(&[]);
    assert!(report.is_success());
    assert_eq!(report.succeeded(), 0);
  }

  #[test]
  fn report_with_only_good_outcomes_is_success() {
    let report = report(&[
      ("a", ComponentStatus::Succeeded { fingerprint: fingerprint() }),
      ("b", ComponentStatus::SkippedCached { fingerprint: fingerprint() }),
    ]);

    assert!(report.is_success());
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.skipped(), 1);
  }

  #[test]
  fn failed_component_fails_report() {
    let report = report(&[
      ("a", ComponentStatus::Succeeded { fingerprint: fingerprint() }),
      (
        "b",
        ComponentStatus::Failed {
          failure: BuildFailure::Step(StepFailure {
            index: 0,
            command: "make".to_string(),
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "no rule to make target".to_string(),
          }),
        },
      ),
      (
        "c",
        ComponentStatus::Blocked {
          failed_dependency: "b".to_string(),
        },
      ),
    ]);

    assert!(!report.is_success());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.blocked(), 1);
  }

  #[test]
  fn components_iterate_in_plan_order() {
    let report = report(&[
      ("zlib", ComponentStatus::Succeeded { fingerprint: fingerprint() }),
      ("ruby", ComponentStatus::Succeeded { fingerprint: fingerprint() }),
    ]);

    let names: Vec<_> = report.components().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["zlib", "ruby"]);
  }

  #[test]
  fn step_failure_message_carries_context() {
    let failure = BuildFailure::Step(StepFailure {
      index: 2,
      command: "gem build license-acceptance.gemspec".to_string(),
      exit_code: Some(1),
      stdout: String::new(),
      stderr: String::new(),
    });

    let message = failure.to_string();
    assert!(message.contains("step 2"));
    assert!(message.contains("gem build"));
  }

  #[test]
  fn default_options_have_positive_parallelism() {
    let options = RunOptions::default();
    assert!(options.parallelism >= 1);
    assert_eq!(options.failure_mode, FailureMode::PerBranch);
    assert!(options.shell.is_none());
  }
}
