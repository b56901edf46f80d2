//! Implementation of the `omb plan` command.
//!
//! Resolves the requested components and prints the build order without
//! executing anything. Resolution errors (cycles, dangling dependencies)
//! surface here exactly as they would at the start of a build.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use omnibuild_lib::resolve::resolve;

use crate::manifest::load_manifest;
use crate::output::{self, symbols};

/// Execute the plan command.
pub fn cmd_plan(manifest_path: &Path, components: &[String]) -> Result<()> {
  let loaded = load_manifest(manifest_path)?;

  let requested: Vec<String> = if components.is_empty() {
    loaded.registry.names().map(String::from).collect()
  } else {
    components.to_vec()
  };

  let plan = match resolve(&requested, &loaded.registry) {
    Ok(plan) => plan,
    Err(e) => {
      output::print_error(&e.to_string());
      std::process::exit(1);
    }
  };

  if plan.is_empty() {
    output::print_info("nothing to build");
    return Ok(());
  }

  println!("Build order ({} components):", plan.len());
  for (position, name) in plan.iter().enumerate() {
    let descriptor = loaded.registry.get(name).expect("planned component is registered");

    let deps = if descriptor.dependencies.is_empty() {
      String::new()
    } else {
      format!(
        " {} {}",
        symbols::ARROW,
        descriptor.dependencies.join(", ")
      )
    };

    println!(
      "  {:>3}. {}{}",
      position + 1,
      name,
      deps.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  Ok(())
}
