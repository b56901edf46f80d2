//! Step execution for one component.
//!
//! Runs a component's ordered build steps inside its scoped working
//! directory with the prepared environment:
//! - The workdir is created if absent and owned exclusively by this
//!   component's worker for the duration of the run
//! - A descriptor with a `source` gets an implicit leading fetch step
//!   unless its step list already leads with one
//! - Commands run through the platform shell with a cleared environment,
//!   so only the built [`BuildEnvironment`] (plus step overlays) is visible
//! - The first failing step aborts the remainder (fail-fast), carrying the
//!   step index, command, exit code, and captured output

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::envs::BuildEnvironment;
use crate::fetch::fetch_source;
use crate::registry::{ComponentDescriptor, StepSpec};

use super::types::{BuildFailure, StepFailure};

/// Captured result of one shell invocation.
#[derive(Debug)]
pub struct ShellOutput {
  pub exit_code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
  pub success: bool,
}

/// Run one command through the shell with exactly the given environment.
///
/// The process environment is cleared first; nothing leaks in from the
/// orchestrator's own environment.
pub async fn run_shell(
  command: &str,
  cwd: &Path,
  env: &BTreeMap<String, String>,
  shell: Option<&str>,
) -> std::io::Result<ShellOutput> {
  let (shell_cmd, shell_args) = get_shell(shell);

  debug!(shell = %shell_cmd, cwd = %cwd.display(), "spawning process");

  let output = Command::new(&shell_cmd)
    .args(&shell_args)
    .arg(command)
    .current_dir(cwd)
    .env_clear()
    .envs(env)
    .output()
    .await?;

  Ok(ShellOutput {
    exit_code: output.status.code(),
    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    success: output.status.success(),
  })
}

/// Execute a component's build steps in order.
///
/// Returns on the first failure; later steps are not attempted. Fetch
/// failures are reported as [`BuildFailure::Fetch`], distinct from script
/// failures.
pub async fn run_component(
  descriptor: &ComponentDescriptor,
  env: &BuildEnvironment,
  workdir: &Path,
  manifest_dir: &Path,
  shell: Option<&str>,
) -> Result<(), BuildFailure> {
  tokio::fs::create_dir_all(workdir)
    .await
    .map_err(|e| BuildFailure::Workspace {
      message: format!("failed to create workdir '{}': {}", workdir.display(), e),
    })?;

  let steps = effective_steps(descriptor);
  info!(component = %descriptor.name, steps = steps.len(), "executing build steps");

  // Component-local copy; Env steps and per-step overlays never touch the
  // shared BuildEnvironment.
  let mut local_env = env.to_map();

  for (index, step) in steps.iter().enumerate() {
    match step.as_ref() {
      StepSpec::Fetch => {
        let spec = descriptor.source.as_ref().ok_or_else(|| BuildFailure::Fetch {
          message: "component declares a fetch step but no source".to_string(),
        })?;

        info!(component = %descriptor.name, step = index, "fetching source");
        let fetched = fetch_source(spec, manifest_dir, workdir)
          .await
          .map_err(|e| BuildFailure::Fetch { message: e.to_string() })?;

        debug!(
          component = %descriptor.name,
          path = %fetched.path.display(),
          rev = fetched.rev.as_deref().unwrap_or("-"),
          "source acquired"
        );
      }

      StepSpec::Run {
        command,
        cwd,
        env: step_env,
      } => {
        let run_cwd = resolve_cwd(workdir, cwd.as_deref());

        let mut merged = local_env.clone();
        for (key, value) in step_env {
          merged.insert(key.clone(), value.clone());
        }

        info!(component = %descriptor.name, step = index, cmd = %command, "running step");

        let output = match run_shell(command, &run_cwd, &merged, shell).await {
          Ok(output) => output,
          Err(e) => {
            return Err(BuildFailure::Step(StepFailure {
              index,
              command: command.clone(),
              exit_code: None,
              stdout: String::new(),
              stderr: e.to_string(),
            }));
          }
        };

        if !output.success {
          if !output.stderr.is_empty() {
            debug!(stderr = %output.stderr, "step stderr");
          }
          return Err(BuildFailure::Step(StepFailure {
            index,
            command: command.clone(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
          }));
        }

        if !output.stdout.is_empty() {
          debug!(stdout = %output.stdout.trim_end(), "step output");
        }
      }

      StepSpec::Env { key, value } => {
        debug!(component = %descriptor.name, step = index, key = %key, "setting step environment");
        local_env.insert(key.clone(), value.clone());
      }
    }
  }

  Ok(())
}

/// The step list actually executed: the declared steps, with an implicit
/// leading fetch when the descriptor has a source and does not already
/// start with one.
fn effective_steps(descriptor: &ComponentDescriptor) -> Vec<Cow<'_, StepSpec>> {
  let mut steps: Vec<Cow<'_, StepSpec>> = Vec::with_capacity(descriptor.steps.len() + 1);

  let leads_with_fetch = matches!(descriptor.steps.first(), Some(StepSpec::Fetch));
  if descriptor.source.is_some() && !leads_with_fetch {
    steps.push(Cow::Owned(StepSpec::Fetch));
  }

  steps.extend(descriptor.steps.iter().map(Cow::Borrowed));
  steps
}

/// Resolve a step's working directory against the component workdir.
fn resolve_cwd(workdir: &Path, cwd: Option<&str>) -> PathBuf {
  match cwd {
    Some(dir) => {
      let candidate = PathBuf::from(dir);
      if candidate.is_absolute() {
        candidate
      } else {
        workdir.join(candidate)
      }
    }
    None => workdir.to_path_buf(),
  }
}

/// Get the shell command and arguments for the current platform.
///
/// Interactive shells may source profile files that modify the
/// environment, which would break isolation, so the default is always
/// `/bin/sh` (Unix) or `powershell.exe` (Windows) rather than `$SHELL`.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      // Assume Unix-style shell (bash, sh, zsh, etc.)
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
