//! Subcommand implementations and the configuration plumbing they share.

mod build;
mod hash;
mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use imgcache_lib::config::{CacheConfig, FailurePolicy};
use imgcache_lib::consts::DEFAULT_CONFIG_FILENAME;
use imgcache_lib::registry::RegistryClient;
use imgcache_lib::run::RunError;

use crate::{ProjectArgs, RegistryArgs};

pub use build::{BuildOptions, cmd_build};
pub use hash::cmd_hash;
pub use plan::cmd_plan;

/// Load configuration and apply command-line overrides.
///
/// An explicit `--config` must exist. Without one, `./imgcache.toml` is used
/// when present and built-in defaults otherwise.
fn load_config(path: Option<&Path>, project: &ProjectArgs) -> Result<CacheConfig> {
  let mut config = match path {
    Some(path) => CacheConfig::load(path)?,
    None => {
      let cwd = std::env::current_dir().context("Failed to determine current directory")?;
      CacheConfig::load_or_default(&cwd.join(DEFAULT_CONFIG_FILENAME), &cwd)?
    }
  };

  if let Some(product) = &project.product {
    config.product = product.clone();
  }
  override_path(&mut config.paths.recipes, &project.recipes)?;
  override_path(&mut config.paths.scripts, &project.scripts)?;
  override_path(&mut config.paths.configs, &project.configs)?;
  override_path(&mut config.paths.definitions, &project.definitions)?;
  if let Some(backend) = project.backend {
    config.build.backend = backend;
  }
  if let Some(hash_length) = project.hash_length {
    config.build.hash_length = hash_length;
  }

  config.validate()?;
  Ok(config)
}

/// Command-line paths are relative to the working directory, not the config file.
fn override_path(target: &mut PathBuf, value: &Option<PathBuf>) -> Result<()> {
  if let Some(path) = value {
    *target = std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))?;
  }
  Ok(())
}

fn registry_client(config: &mut CacheConfig, registry: &RegistryArgs) -> Result<RegistryClient> {
  if let Some(timeout) = registry.timeout {
    config.registry.timeout_secs = timeout.as_secs().max(1);
  }
  RegistryClient::new(&config.registry, registry.token.clone()).context("Failed to create registry client")
}

fn failure_policy(keep_going: bool, configured: FailurePolicy) -> FailurePolicy {
  if keep_going { FailurePolicy::Skip } else { configured }
}

/// One-line diagnostic naming the recipe, version and stage of a failed run.
fn describe_failure(err: &RunError) -> String {
  let mut parts = Vec::new();
  if let Some(recipe) = err.recipe() {
    parts.push(format!("recipe {}", recipe));
  }
  if let Some(version) = err.version() {
    parts.push(format!("version {}", version));
  }
  parts.push(format!("stage {}", err.stage()));
  format!("Run failed ({}): {}", parts.join(", "), err)
}
