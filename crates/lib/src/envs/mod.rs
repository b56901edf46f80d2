//! Build-environment construction.
//!
//! Each component's build steps run inside a [`BuildEnvironment`] produced
//! here by layering, in a fixed order:
//!
//! 1. Base environment (caller-filtered process env)
//! 2. Embedded toolchain paths (`{install_dir}/embedded/bin` prepended to PATH)
//! 3. Standard compiler flags for the target platform
//! 4. Component-specific overrides from the descriptor
//!
//! Later layers shadow earlier ones on key collision. Every layer is a pure
//! function of its inputs, so identical descriptors and base environments
//! always produce byte-identical results. The result is immutable; the
//! step executor works on its own copies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::platform::{OsFamily, Platform};
use crate::registry::ComponentDescriptor;

/// Separator used when prepending to PATH-like variables.
#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Settings the environment layers draw from.
#[derive(Debug, Clone)]
pub struct EnvConfig {
  /// Installation prefix holding the embedded toolchain
  /// (`{install_dir}/embedded/{bin,include,lib}`).
  pub install_dir: PathBuf,

  /// Target platform, selects the compiler-flag layer.
  pub platform: Platform,
}

/// An immutable variable mapping handed to the step executor.
///
/// Backed by a `BTreeMap` so iteration order (and serialization) is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEnvironment {
  vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
  /// Look up a variable.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(|v| v.as_str())
  }

  /// Iterate variables in sorted key order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// The underlying mapping.
  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }

  /// A mutable copy for step-local overlays.
  pub fn to_map(&self) -> BTreeMap<String, String> {
    self.vars.clone()
  }

  /// Number of variables.
  pub fn len(&self) -> usize {
    self.vars.len()
  }

  /// Whether the environment is empty.
  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }
}

/// Build the environment for one component.
///
/// Pure construction: no filesystem access, no step output observed.
pub fn build_environment(
  descriptor: &ComponentDescriptor,
  base: &BTreeMap<String, String>,
  config: &EnvConfig,
) -> BuildEnvironment {
  let mut vars = base.clone();

  apply_embedded_path(&mut vars, &config.install_dir);
  apply_compiler_flags(&mut vars, &config.install_dir, config.platform.os);

  for (key, value) in &descriptor.env {
    vars.insert(key.clone(), value.clone());
  }

  BuildEnvironment { vars }
}

/// Prepend the embedded toolchain bin directory to PATH.
fn apply_embedded_path(vars: &mut BTreeMap<String, String>, install_dir: &Path) {
  let embedded_bin = install_dir.join("embedded").join("bin");
  let embedded_bin = embedded_bin.to_string_lossy();

  let path = match vars.get("PATH") {
    Some(existing) if !existing.is_empty() => {
      format!("{}{}{}", embedded_bin, PATH_SEPARATOR, existing)
    }
    _ => embedded_bin.to_string(),
  };

  vars.insert("PATH".to_string(), path);
}

/// Set the standard compiler flags pointing at the embedded prefix.
fn apply_compiler_flags(vars: &mut BTreeMap<String, String>, install_dir: &Path, os: OsFamily) {
  let include_dir = install_dir.join("embedded").join("include");
  let lib_dir = install_dir.join("embedded").join("lib");
  let include_dir = include_dir.to_string_lossy();
  let lib_dir = lib_dir.to_string_lossy();

  let cflags = format!("-I{} -O2", include_dir);

  match os {
    OsFamily::Linux => {
      vars.insert("CFLAGS".to_string(), cflags.clone());
      vars.insert("CXXFLAGS".to_string(), cflags.clone());
      vars.insert("CPPFLAGS".to_string(), cflags);
      vars.insert(
        "LDFLAGS".to_string(),
        format!("-Wl,-rpath,{} -L{}", lib_dir, lib_dir),
      );
      vars.insert("LD_RUN_PATH".to_string(), lib_dir.to_string());
      vars.insert(
        "PKG_CONFIG_PATH".to_string(),
        format!("{}/pkgconfig", lib_dir),
      );
    }
    OsFamily::Darwin => {
      vars.insert("CFLAGS".to_string(), cflags.clone());
      vars.insert("CXXFLAGS".to_string(), cflags.clone());
      vars.insert("CPPFLAGS".to_string(), cflags);
      vars.insert("LDFLAGS".to_string(), format!("-L{}", lib_dir));
      vars.insert(
        "PKG_CONFIG_PATH".to_string(),
        format!("{}/pkgconfig", lib_dir),
      );
    }
    // MSVC toolchains do not read these variables; the embedded PATH is
    // the only platform layer on Windows.
    OsFamily::Windows => {}
  }
}
