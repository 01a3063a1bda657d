//! Run configuration.
//!
//! Configuration comes from an optional TOML file (`imgcache.toml` by default)
//! with every field defaulted, so an empty file is valid. Relative paths are
//! resolved against the directory holding the config file. The registry token
//! is deliberately absent: it is injected by the caller at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_HASH_PREFIX_LEN, DEFAULT_MANIFEST_FILENAME, MAX_HASH_PREFIX_LEN, MIN_HASH_PREFIX_LEN};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

/// Which external builder drives image builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  #[default]
  Docker,
  Apptainer,
}

impl BackendKind {
  pub fn as_str(self) -> &'static str {
    match self {
      BackendKind::Docker => "docker",
      BackendKind::Apptainer => "apptainer",
    }
  }
}

impl std::str::FromStr for BackendKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "docker" => Ok(BackendKind::Docker),
      "apptainer" | "singularity" => Ok(BackendKind::Apptainer),
      other => Err(ConfigError::Invalid(format!("unknown build backend: {}", other))),
    }
  }
}

/// What to do when one recipe fails to resolve or build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
  /// Stop the run; no manifest is written.
  #[default]
  Abort,
  /// Record the failure, leave the recipe out of the manifest, keep going.
  Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
  pub recipes: PathBuf,
  pub scripts: PathBuf,
  pub configs: PathBuf,
  /// Directory holding `<recipe>.<ext>` container build definitions.
  pub definitions: PathBuf,
  /// Where exported artifacts are written.
  pub output: PathBuf,
  /// Manifest path; defaults to `<output>/builtcontainers.json`.
  pub manifest: Option<PathBuf>,
  /// Build context directory handed to the builder.
  pub context: PathBuf,
}

impl Default for PathsConfig {
  fn default() -> Self {
    Self {
      recipes: PathBuf::from("ViroConstrictor/workflow/envs"),
      scripts: PathBuf::from("ViroConstrictor/workflow/scripts"),
      configs: PathBuf::from("ViroConstrictor/workflow/files"),
      definitions: PathBuf::from("containers"),
      output: PathBuf::from("containers"),
      manifest: None,
      context: PathBuf::from("."),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// Base URL of the package API; `<api_base>/<image>/versions` is queried.
  pub api_base: String,
  pub media_type: String,
  pub api_version_header: String,
  pub api_version: String,
  pub timeout_secs: u64,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      api_base: "https://api.github.com/orgs/RIVM-bioinformatics/packages/container".to_string(),
      media_type: "application/vnd.github+json".to_string(),
      api_version_header: "X-GitHub-Api-Version".to_string(),
      api_version: "2022-11-28".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
  pub backend: BackendKind,
  /// Override for the builder executable (defaults to the backend name).
  pub program: Option<String>,
  pub on_failure: FailurePolicy,
  pub hash_length: usize,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      backend: BackendKind::default(),
      program: None,
      on_failure: FailurePolicy::default(),
      hash_length: DEFAULT_HASH_PREFIX_LEN,
    }
  }
}

/// Labels embedded into every built image.
///
/// `{product}` in any field is replaced with the product name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
  pub author: String,
  pub maintainer: String,
  pub contact: String,
  pub source_url: String,
}

impl Default for ProvenanceConfig {
  fn default() -> Self {
    Self {
      author: "RIVM-bioinformatics team".to_string(),
      maintainer: "RIVM-bioinformatics team".to_string(),
      contact: "ids-bioinformatics@rivm.nl".to_string(),
      source_url: "https://github.com/RIVM-bioinformatics/{product}".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Product name used to namespace image names (`<product>_<recipe>`).
  pub product: String,
  pub paths: PathsConfig,
  pub registry: RegistryConfig,
  pub build: BuildConfig,
  pub provenance: ProvenanceConfig,
  /// Directory relative paths are resolved against.
  #[serde(skip)]
  pub root: PathBuf,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      product: "ViroConstrictor".to_string(),
      paths: PathsConfig::default(),
      registry: RegistryConfig::default(),
      build: BuildConfig::default(),
      provenance: ProvenanceConfig::default(),
      root: PathBuf::from("."),
    }
  }
}

impl CacheConfig {
  /// Parse configuration from TOML text.
  pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: Box::new(e),
    })
  }

  /// Load a config file; relative paths resolve against its directory.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config = Self::from_toml(&content, path)?;
    config.root = path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
    Ok(config)
  }

  /// Load `path` if it exists, otherwise fall back to defaults rooted at `root`.
  pub fn load_or_default(path: &Path, root: &Path) -> Result<Self, ConfigError> {
    if path.is_file() {
      return Self::load(path);
    }
    Ok(Self {
      root: root.to_path_buf(),
      ..Self::default()
    })
  }

  /// Check values that cannot be expressed in the type system.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.product.trim().is_empty() {
      return Err(ConfigError::Invalid("product name must not be empty".to_string()));
    }
    if !(MIN_HASH_PREFIX_LEN..=MAX_HASH_PREFIX_LEN).contains(&self.build.hash_length) {
      return Err(ConfigError::Invalid(format!(
        "hash_length must be between {} and {}, got {}",
        MIN_HASH_PREFIX_LEN, MAX_HASH_PREFIX_LEN, self.build.hash_length
      )));
    }
    if self.registry.api_base.trim().is_empty() {
      return Err(ConfigError::Invalid("registry api_base must not be empty".to_string()));
    }
    Ok(())
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }

  pub fn recipes_dir(&self) -> PathBuf {
    self.resolve(&self.paths.recipes)
  }

  pub fn scripts_dir(&self) -> PathBuf {
    self.resolve(&self.paths.scripts)
  }

  pub fn configs_dir(&self) -> PathBuf {
    self.resolve(&self.paths.configs)
  }

  pub fn definitions_dir(&self) -> PathBuf {
    self.resolve(&self.paths.definitions)
  }

  pub fn output_dir(&self) -> PathBuf {
    self.resolve(&self.paths.output)
  }

  pub fn context_dir(&self) -> PathBuf {
    self.resolve(&self.paths.context)
  }

  pub fn manifest_path(&self) -> PathBuf {
    match &self.paths.manifest {
      Some(path) => self.resolve(path),
      None => self.output_dir().join(DEFAULT_MANIFEST_FILENAME),
    }
  }
}
