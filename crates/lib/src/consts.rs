//! Crate-wide constants.

/// Application name used for platform directories and env var prefixes.
pub const APP_NAME: &str = "omnibuild";

/// Number of hex characters kept from a full SHA-256 when forming a
/// [`Fingerprint`](crate::util::hash::Fingerprint).
pub const FINGERPRINT_PREFIX_LEN: usize = 20;

/// Symbolic version marker used when a descriptor declares no version.
pub const DEFAULT_VERSION: &str = "master";

/// Default installation prefix holding the embedded toolchain.
#[cfg(not(windows))]
pub const DEFAULT_INSTALL_DIR: &str = "/opt/omnibuild";
#[cfg(windows)]
pub const DEFAULT_INSTALL_DIR: &str = "C:\\omnibuild";

/// On-disk cache index format version.
pub const CACHE_INDEX_VERSION: u32 = 1;
