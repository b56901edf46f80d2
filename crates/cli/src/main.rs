//! omnibuild CLI entry point.

mod cmd;
mod manifest;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::BuildArgs;

/// omb - dependency-ordered build orchestrator for declarative components
#[derive(Parser)]
#[command(name = "omb")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build components from a manifest
  Build(BuildArgs),

  /// Show the resolved build order without building
  Plan {
    /// Path to the component manifest
    #[arg(short, long, default_value = "omnibuild.json")]
    manifest: PathBuf,

    /// Components to plan (default: every component in the manifest)
    components: Vec<String>,
  },

  /// Show platform, directories, and cache summary
  Status,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("omb=debug,omnibuild_lib=debug")
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt().with_env_filter(filter).without_time().init();

  match &cli.command {
    Commands::Build(args) => cmd::cmd_build(args),
    Commands::Plan { manifest, components } => cmd::cmd_plan(manifest, components),
    Commands::Status => cmd::cmd_status(),
  }
}
