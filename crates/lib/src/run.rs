//! The build-cache pipeline.
//!
//! One sequential pass over every recipe:
//! 1. Collect recipes, scripts and configs, and check that every recipe has a
//!    build definition (configuration errors abort before anything is built)
//! 2. Compute one version per recipe
//! 3. Ask the registry whether `<image>:<version>` is already published
//! 4. Build and export only the absent ones
//! 5. Write the manifest of what was built, once, at the end
//!
//! Registry and build failures follow the configured [`FailurePolicy`]. Under
//! `Abort` the first failure ends the run and no manifest is written. Under
//! `Skip` the failing recipe is recorded in the report and left out of the
//! manifest.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::build::{BuildError, BuildOutcome, BuildStage, Orchestrator};
use crate::collect::{CollectError, FileSet, Recipe, collect_file_set, ensure_unique_names};
use crate::config::{CacheConfig, FailurePolicy};
use crate::manifest::{BuildManifest, ManifestError};
use crate::registry::{RegistryClient, RegistryError};
use crate::util::hash::HashError;
use crate::version::{HashEngine, VersionId};

/// What a run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
  /// Resolve against the registry but never build or write a manifest.
  Plan,
  /// Build every absent image and write the manifest.
  Build,
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
  Collect,
  Hash,
  Resolve,
  Build,
  Export,
  Manifest,
}

impl fmt::Display for RunStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RunStage::Collect => "collect",
      RunStage::Hash => "hash",
      RunStage::Resolve => "resolve",
      RunStage::Build => "build",
      RunStage::Export => "export",
      RunStage::Manifest => "manifest",
    };
    write!(f, "{}", s)
  }
}

impl From<BuildStage> for RunStage {
  fn from(stage: BuildStage) -> Self {
    match stage {
      BuildStage::Prepare | BuildStage::Build => RunStage::Build,
      BuildStage::Export => RunStage::Export,
    }
  }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("collect failed: {0}")]
  Collect(#[from] CollectError),

  #[error("hash failed: {0}")]
  Hash(#[from] HashError),

  #[error("resolve failed for recipe '{recipe}' at version {version}: {source}")]
  Resolve {
    recipe: String,
    version: VersionId,
    #[source]
    source: RegistryError,
  },

  #[error("{stage} failed for recipe '{recipe}' at version {version}: {source}")]
  Build {
    recipe: String,
    version: VersionId,
    stage: RunStage,
    #[source]
    source: BuildError,
  },

  #[error("manifest failed: {0}")]
  Manifest(#[from] ManifestError),
}

impl RunError {
  pub fn stage(&self) -> RunStage {
    match self {
      RunError::Collect(_) => RunStage::Collect,
      RunError::Hash(_) => RunStage::Hash,
      RunError::Resolve { .. } => RunStage::Resolve,
      RunError::Build { stage, .. } => *stage,
      RunError::Manifest(_) => RunStage::Manifest,
    }
  }

  /// Recipe the failure belongs to, when there is one.
  pub fn recipe(&self) -> Option<&str> {
    match self {
      RunError::Collect(CollectError::MissingBuildDefinition { recipe, .. }) => Some(recipe),
      RunError::Collect(CollectError::DuplicateRecipe { name, .. }) => Some(name),
      RunError::Resolve { recipe, .. } | RunError::Build { recipe, .. } => Some(recipe),
      _ => None,
    }
  }

  pub fn version(&self) -> Option<&VersionId> {
    match self {
      RunError::Resolve { version, .. } | RunError::Build { version, .. } => Some(version),
      _ => None,
    }
  }
}

/// What happened to one recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RecipeStatus {
  /// The version is already published.
  Cached,
  /// Built and exported during this run.
  Built(BuildOutcome),
  /// Absent from the registry; a plan run stops here.
  WouldBuild,
  /// Failed and skipped under the `skip` policy.
  Failed { stage: RunStage, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeReport {
  pub recipe: String,
  pub image: String,
  pub version: VersionId,
  #[serde(flatten)]
  pub status: RecipeStatus,
}

/// Summary of a whole run, in recipe order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
  pub mode: RunMode,
  pub entries: Vec<RecipeReport>,
  /// Where the manifest was written, if it was.
  pub manifest_path: Option<PathBuf>,
}

impl RunReport {
  fn new(mode: RunMode) -> Self {
    Self {
      mode,
      entries: Vec::new(),
      manifest_path: None,
    }
  }

  pub fn outcomes(&self) -> impl Iterator<Item = &BuildOutcome> {
    self.entries.iter().filter_map(|e| match &e.status {
      RecipeStatus::Built(outcome) => Some(outcome),
      _ => None,
    })
  }

  pub fn count(&self, pred: impl Fn(&RecipeStatus) -> bool) -> usize {
    self.entries.iter().filter(|e| pred(&e.status)).count()
  }

  pub fn built(&self) -> usize {
    self.count(|s| matches!(s, RecipeStatus::Built(_)))
  }

  pub fn cached(&self) -> usize {
    self.count(|s| matches!(s, RecipeStatus::Cached))
  }

  pub fn failed(&self) -> usize {
    self.count(|s| matches!(s, RecipeStatus::Failed { .. }))
  }

  pub fn has_failures(&self) -> bool {
    self.failed() > 0
  }
}

/// Collected inputs plus the recipes derived from them.
#[derive(Debug, Clone)]
pub struct Inputs {
  pub files: FileSet,
  pub recipes: Vec<Recipe>,
}

/// Collect the input files named by `config`.
///
/// `definition_extension` locates each recipe's build definition; existence
/// is not checked here. Recipes whose names collide are rejected.
pub fn collect_inputs(config: &CacheConfig, definition_extension: &str) -> Result<Inputs, CollectError> {
  let files = collect_file_set(&config.recipes_dir(), &config.scripts_dir(), &config.configs_dir())?;
  let definitions_dir = config.definitions_dir();
  let recipes: Vec<Recipe> = files
    .recipes
    .iter()
    .map(|path| Recipe::from_definition(path, &definitions_dir, definition_extension))
    .collect();
  ensure_unique_names(&recipes)?;
  Ok(Inputs { files, recipes })
}

/// Collect and hash every recipe without touching the registry.
pub fn compute_versions(config: &CacheConfig, definition_extension: &str) -> Result<Vec<(Recipe, VersionId)>, RunError> {
  let inputs = collect_inputs(config, definition_extension)?;
  let engine = HashEngine::new(config.build.hash_length);
  Ok(engine.compute_recipe_versions(&inputs.recipes, &inputs.files)?)
}

/// Run the pipeline for every recipe in `config`.
pub async fn run_pipeline(
  config: &CacheConfig,
  registry: &RegistryClient,
  orchestrator: &Orchestrator,
  mode: RunMode,
) -> Result<RunReport, RunError> {
  let extension = orchestrator.backend().definition_extension();
  let inputs = collect_inputs(config, extension)?;
  for recipe in &inputs.recipes {
    recipe.ensure_build_definition()?;
  }

  let engine = HashEngine::new(config.build.hash_length);
  let versions = engine.compute_recipe_versions(&inputs.recipes, &inputs.files)?;
  info!(
    recipes = versions.len(),
    scripts = inputs.files.scripts.len(),
    configs = inputs.files.configs.len(),
    ?mode,
    "starting run"
  );

  let policy = config.build.on_failure;
  let mut report = RunReport::new(mode);

  for (recipe, version) in versions {
    let image = orchestrator.image_for(&recipe, &version);
    let status = match process_recipe(registry, orchestrator, &recipe, &version, mode).await {
      Ok(status) => status,
      Err(err) if policy == FailurePolicy::Skip => {
        warn!(recipe = %recipe.name, %version, stage = %err.stage(), error = %err, "skipping failed recipe");
        RecipeStatus::Failed {
          stage: err.stage(),
          message: err.to_string(),
        }
      }
      Err(err) => {
        error!(recipe = %recipe.name, %version, stage = %err.stage(), "aborting run");
        return Err(err);
      }
    };

    report.entries.push(RecipeReport {
      recipe: recipe.name.clone(),
      image: image.name,
      version,
      status,
    });
  }

  if mode == RunMode::Build {
    let path = config.manifest_path();
    BuildManifest::from_outcomes(report.outcomes()).write(&path)?;
    report.manifest_path = Some(path);
  }

  info!(
    built = report.built(),
    cached = report.cached(),
    failed = report.failed(),
    "run finished"
  );
  Ok(report)
}

async fn process_recipe(
  registry: &RegistryClient,
  orchestrator: &Orchestrator,
  recipe: &Recipe,
  version: &VersionId,
  mode: RunMode,
) -> Result<RecipeStatus, RunError> {
  let image = orchestrator.image_for(recipe, version);

  let resolution = registry
    .resolve(&image.name, &image.version)
    .await
    .map_err(|source| RunError::Resolve {
      recipe: recipe.name.clone(),
      version: version.clone(),
      source,
    })?;

  if resolution.present {
    info!(image = %image, "already published, skipping build");
    return Ok(RecipeStatus::Cached);
  }
  if mode == RunMode::Plan {
    return Ok(RecipeStatus::WouldBuild);
  }

  let outcome = orchestrator
    .build(recipe, version)
    .await
    .map_err(|source| RunError::Build {
      recipe: recipe.name.clone(),
      version: version.clone(),
      stage: source.stage().into(),
      source,
    })?;
  Ok(RecipeStatus::Built(outcome))
}
