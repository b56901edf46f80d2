//! CLI command implementations.

pub mod build;
pub mod plan;
pub mod status;

pub use build::{BuildArgs, cmd_build};
pub use plan::cmd_plan;
pub use status::cmd_status;
