//! Crate-wide constants.

pub const APP_NAME: &str = "imgcache";

/// Default number of hex characters kept from a SHA-256 digest.
pub const DEFAULT_HASH_PREFIX_LEN: usize = 6;

/// Bounds accepted for a configured hash prefix length.
pub const MIN_HASH_PREFIX_LEN: usize = 4;
pub const MAX_HASH_PREFIX_LEN: usize = 64;

/// Recipe name whose version also covers every script and config file.
pub const SHARED_SCRIPTS_RECIPE: &str = "scripts";

pub const RECIPE_EXTENSIONS: &[&str] = &["yaml", "yml"];
pub const SCRIPT_EXTENSIONS: &[&str] = &["py"];

pub const DEFAULT_CONFIG_FILENAME: &str = "imgcache.toml";
pub const DEFAULT_MANIFEST_FILENAME: &str = "builtcontainers.json";

/// Environment variable the CLI reads the registry token from.
pub const TOKEN_ENV_VAR: &str = "IMGCACHE_TOKEN";
