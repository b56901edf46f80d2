//! Implementation of the `omb status` command.
//!
//! Prints the detected platform, the engine directories, and a summary of
//! the cache index.

use anyhow::Result;

use omnibuild_lib::cache::CacheStore;
use omnibuild_lib::platform::Platform;

use crate::output;

/// Execute the status command.
pub fn cmd_status() -> Result<()> {
  println!("omnibuild v{}", env!("CARGO_PKG_VERSION"));
  println!();

  match Platform::current() {
    Some(platform) => println!("  Platform:  {}", platform.triple()),
    None => output::print_warning("unsupported platform"),
  }

  let store = CacheStore::default_store();
  println!("  Cache dir: {}", store.base_path().display());

  let index = store.load();
  println!("  Cached:    {} component(s)", index.len());

  for (name, entry) in &index.entries {
    println!(
      "    {} {} ({})",
      name,
      entry.version,
      output::truncate_hash(&entry.fingerprint.0)
    );
  }

  Ok(())
}
