//! omnibuild-lib: Core engine for omnibuild
//!
//! This crate provides the build-orchestration engine:
//! - `Registry`: all known component descriptors, keyed by name
//! - `resolve`: dependency-ordered plans with cycle detection
//! - `envs`: layered, deterministic build environments
//! - `cache`: content fingerprints and the persistent cache index
//! - `fetch`: source acquisition (git, tarball, local path)
//! - `execute`: wave-parallel step execution and the run report

pub mod cache;
pub mod consts;
pub mod envs;
pub mod execute;
pub mod fetch;
pub mod platform;
pub mod registry;
pub mod resolve;
pub mod util;
