//! Implementation of the `omb build` command.
//!
//! Loads the descriptor manifest, resolves the requested components, and
//! drives the orchestrator. Prints a per-component report (text or JSON)
//! and exits non-zero if any component failed or was blocked.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use tracing::info;

use omnibuild_lib::cache::CacheStore;
use omnibuild_lib::execute::{self, BuildFailure, ComponentStatus, FailureMode, RunOptions, RunReport};

use crate::manifest::load_manifest;
use crate::output::{self, OutputFormat, symbols};

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Path to the component manifest
  #[arg(short, long, default_value = "omnibuild.json")]
  pub manifest: PathBuf,

  /// Components to build (default: every component in the manifest)
  pub components: Vec<String>,

  /// Maximum number of components building in parallel
  #[arg(short, long)]
  pub jobs: Option<usize>,

  /// Stop scheduling everything after the first failure
  #[arg(long)]
  pub fail_fast: bool,

  /// Root directory for per-component working directories
  #[arg(long)]
  pub build_root: Option<PathBuf>,

  /// Installation prefix holding the embedded toolchain
  #[arg(long)]
  pub install_dir: Option<PathBuf>,

  /// Directory holding the persistent cache index
  #[arg(long)]
  pub cache_dir: Option<PathBuf>,

  /// Shell used for run steps (default: /bin/sh, powershell on Windows)
  #[arg(long)]
  pub shell: Option<String>,

  /// Report format
  #[arg(long, value_enum, default_value_t)]
  pub format: OutputFormat,
}

/// Execute the build command.
pub fn cmd_build(args: &BuildArgs) -> Result<()> {
  let loaded = load_manifest(&args.manifest)?;

  let requested: Vec<String> = if args.components.is_empty() {
    loaded.registry.names().map(String::from).collect()
  } else {
    args.components.clone()
  };

  let mut options = RunOptions {
    manifest_dir: loaded.dir,
    cache_dir: args
      .cache_dir
      .clone()
      .unwrap_or_else(|| CacheStore::default_store().base_path().clone()),
    base_env: inherited_base_env(),
    shell: args.shell.clone(),
    ..RunOptions::default()
  };
  if let Some(jobs) = args.jobs {
    options.parallelism = jobs.max(1);
  }
  if args.fail_fast {
    options.failure_mode = FailureMode::FailFast;
  }
  if let Some(build_root) = &args.build_root {
    options.build_root = build_root.clone();
  }
  if let Some(install_dir) = &args.install_dir {
    options.install_dir = install_dir.clone();
  }

  info!(
    components = requested.len(),
    jobs = options.parallelism,
    "starting build"
  );

  let started = Instant::now();

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let report = rt
    .block_on(execute::run(&requested, &loaded.registry, &options))
    .context("build aborted")?;

  if args.format.is_json() {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
    println!();
    if report.is_success() {
      output::print_success(&format!(
        "{} built, {} cached in {}",
        report.succeeded(),
        report.skipped(),
        output::format_duration(started.elapsed())
      ));
    } else {
      output::print_error(&format!(
        "{} failed, {} blocked ({} built, {} cached)",
        report.failed(),
        report.blocked(),
        report.succeeded(),
        report.skipped()
      ));
    }
  }

  if !report.is_success() {
    std::process::exit(1);
  }

  Ok(())
}

/// Variables carried over from the caller's environment into the base
/// layer. Everything else is rebuilt by the environment builder, so builds
/// see the host toolchain without inheriting incidental shell state.
fn inherited_base_env() -> BTreeMap<String, String> {
  let mut base = BTreeMap::new();
  for key in ["PATH", "HOME", "TMPDIR"] {
    if let Ok(value) = std::env::var(key) {
      base.insert(key.to_string(), value);
    }
  }
  base
}

fn print_report(report: &RunReport) {
  for (name, status) in report.components() {
    match status {
      ComponentStatus::Succeeded { fingerprint } => {
        println!(
          "  {} {} {}",
          symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
          name,
          format!("({})", output::truncate_hash(&fingerprint.0))
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
        );
      }
      ComponentStatus::SkippedCached { .. } => {
        println!(
          "  {} {} {}",
          symbols::INFO.if_supports_color(Stream::Stdout, |s| s.cyan()),
          name,
          "(cached)".if_supports_color(Stream::Stdout, |s| s.dimmed())
        );
      }
      ComponentStatus::Failed { failure } => {
        println!(
          "  {} {} {}",
          symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
          name,
          format!("({})", failure).if_supports_color(Stream::Stdout, |s| s.red())
        );
        if let BuildFailure::Step(step) = failure {
          for line in step.stderr.lines().take(10) {
            println!("      {}", line.if_supports_color(Stream::Stdout, |s| s.dimmed()));
          }
        }
      }
      ComponentStatus::Blocked { failed_dependency } => {
        println!(
          "  {} {} {}",
          symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()),
          name,
          format!("(blocked by {})", failed_dependency)
            .if_supports_color(Stream::Stdout, |s| s.yellow())
        );
      }
    }
  }
}
