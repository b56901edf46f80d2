//! Build orchestration.
//!
//! This module drives a whole run:
//! 1. Resolve the requested components into a plan
//! 2. Compute fingerprints in plan order (dependencies first)
//! 3. Load the cache index
//! 4. Execute the plan wave by wave with a bounded worker pool, skipping
//!    cached components and blocking the dependents of failures
//! 5. Record successes in the cache and flush it
//!
//! Component-scoped failures land in the [`RunReport`]; only
//! resolution-time problems abort the run itself.

pub mod dag;
pub mod steps;
pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, component_fingerprint};
use crate::envs::{EnvConfig, build_environment};
use crate::platform::Platform;
use crate::registry::Registry;
use crate::resolve::resolve;
use crate::util::hash::Fingerprint;

use dag::PlanDag;

pub use types::{
  BuildFailure, ComponentStatus, FailureMode, OrchestrateError, RunOptions, RunReport, StepFailure,
};

/// Build the requested components and everything they depend on.
///
/// # Errors
///
/// Returns an error only for resolution-time problems (unknown components,
/// dangling dependencies, cycles) and engine-internal failures. Build and
/// fetch failures are reported per component in the [`RunReport`].
pub async fn run(
  requested: &[String],
  registry: &Registry,
  options: &RunOptions,
) -> Result<RunReport, OrchestrateError> {
  let plan = resolve(requested, registry)?;
  info!(components = plan.len(), "plan resolved");

  let platform = Platform::current().ok_or(OrchestrateError::UnsupportedPlatform)?;
  let triple = platform.triple();

  // Fingerprints in plan order: every dependency is fingerprinted before
  // its dependents, so a change in a leaf ripples through the subtree.
  let mut fingerprints: HashMap<String, Fingerprint> = HashMap::new();
  for name in plan.iter() {
    let descriptor = registry.get(name).expect("planned component must be registered");
    let dep_fingerprints: Vec<(&str, &Fingerprint)> = descriptor
      .dependencies
      .iter()
      .map(|dep| (dep.as_str(), &fingerprints[dep.as_str()]))
      .collect();

    let fingerprint = component_fingerprint(descriptor, &triple, &dep_fingerprints)?;
    debug!(component = %name, fingerprint = %fingerprint, "fingerprint computed");
    fingerprints.insert(name.to_string(), fingerprint);
  }

  let store = CacheStore::new(options.cache_dir.clone());
  let mut index = store.load();

  let plan_dag = PlanDag::from_plan(&plan, registry);
  let waves = plan_dag.waves()?;
  info!(wave_count = waves.len(), "computed execution waves");

  let env_config = EnvConfig {
    install_dir: options.install_dir.clone(),
    platform,
  };

  let mut statuses: BTreeMap<String, ComponentStatus> = BTreeMap::new();
  let mut failed: HashSet<String> = HashSet::new();

  // Set when FailureMode::FailFast sees the first failure; names it so
  // later components can report what blocked them.
  let mut global_abort: Option<String> = None;

  let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, components = wave.len(), "scheduling wave");

    let mut to_build: Vec<String> = Vec::new();

    for name in wave {
      if let Some(abort_on) = &global_abort {
        warn!(component = %name, failed = %abort_on, "not scheduled, run aborted");
        statuses.insert(
          name.clone(),
          ComponentStatus::Blocked {
            failed_dependency: abort_on.clone(),
          },
        );
        continue;
      }

      if let Some(dep) = plan_dag.dependencies(name).into_iter().find(|d| failed.contains(d)) {
        warn!(component = %name, failed_dependency = %dep, "blocked by failed dependency");
        failed.insert(name.clone());
        statuses.insert(name.clone(), ComponentStatus::Blocked { failed_dependency: dep });
        continue;
      }

      let fingerprint = &fingerprints[name.as_str()];
      if index.should_build(name, fingerprint) {
        to_build.push(name.clone());
      } else {
        info!(component = %name, fingerprint = %fingerprint, "cached, skipping");
        statuses.insert(
          name.clone(),
          ComponentStatus::SkippedCached {
            fingerprint: fingerprint.clone(),
          },
        );
      }
    }

    if to_build.is_empty() {
      continue;
    }

    let mut join_set: JoinSet<(String, Result<(), BuildFailure>)> = JoinSet::new();

    for name in &to_build {
      let name = name.clone();
      let descriptor = registry
        .get(&name)
        .expect("planned component must be registered")
        .clone();
      let base_env = options.base_env.clone();
      let env_config = env_config.clone();
      let workdir = options.build_root.join(&name);
      let manifest_dir = options.manifest_dir.clone();
      let shell = options.shell.clone();
      let semaphore = semaphore.clone();

      join_set.spawn(async move {
        let _permit = semaphore.acquire().await.unwrap();

        let env = build_environment(&descriptor, &base_env, &env_config);
        let result = steps::run_component(&descriptor, &env, &workdir, &manifest_dir, shell.as_deref()).await;

        (name, result)
      });
    }

    while let Some(join_result) = join_set.join_next().await {
      match join_result {
        Ok((name, Ok(()))) => {
          info!(component = %name, "build succeeded");

          let fingerprint = fingerprints[name.as_str()].clone();
          let version = &registry
            .get(&name)
            .expect("planned component must be registered")
            .version;
          index.record_success(&name, version, fingerprint.clone(), unix_now());
          statuses.insert(name, ComponentStatus::Succeeded { fingerprint });
        }
        Ok((name, Err(failure))) => {
          error!(component = %name, error = %failure, "build failed");

          failed.insert(name.clone());
          if options.failure_mode == FailureMode::FailFast && global_abort.is_none() {
            global_abort = Some(name.clone());
          }
          statuses.insert(name, ComponentStatus::Failed { failure });
        }
        Err(e) => {
          // A panic inside a build task; the component stays unreported
          // rather than poisoning the run.
          error!(error = %e, "build task panicked");
        }
      }
    }
  }

  if let Err(e) = store.save(&index) {
    warn!(error = %e, "failed to persist cache index");
  }

  let report = RunReport {
    order: plan.names().to_vec(),
    statuses,
  };

  info!(
    succeeded = report.succeeded(),
    skipped = report.skipped(),
    failed = report.failed(),
    blocked = report.blocked(),
    "run complete"
  );

  Ok(report)
}

fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}
