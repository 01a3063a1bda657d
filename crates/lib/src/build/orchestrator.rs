//! Single image build.
//!
//! For one `(recipe, version)` pair that the registry does not have yet:
//! 1. Write a temporary definition: the recipe's base definition verbatim
//!    followed by the backend's provenance block
//! 2. Run the builder against it, tagging the image `<image>:<version>`
//! 3. Export the image to the output directory for a later publish step
//!
//! The temporary definition and workspace are owned by `tempfile` guards and
//! are removed when `build` returns, on success and on every error path.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use tempfile::{NamedTempFile, TempDir};
use tokio::fs;
use tracing::{debug, info};

use crate::collect::Recipe;
use crate::config::{CacheConfig, ProvenanceConfig};
use crate::registry::image_name;
use crate::version::VersionId;

use super::backend::{BuildBackend, backend_for};
use super::execute::run_command;
use super::types::{BuildError, BuildOutcome, BuildStage, ExportStep, ImageRef, Provenance};

/// Drives one backend for every image built in a run.
#[derive(Debug)]
pub struct Orchestrator {
  backend: Box<dyn BuildBackend>,
  product: String,
  provenance: ProvenanceConfig,
  context_dir: PathBuf,
  output_dir: PathBuf,
}

impl Orchestrator {
  pub fn new(
    backend: Box<dyn BuildBackend>,
    product: impl Into<String>,
    provenance: ProvenanceConfig,
    context_dir: PathBuf,
    output_dir: PathBuf,
  ) -> Self {
    Self {
      backend,
      product: product.into(),
      provenance,
      context_dir,
      output_dir,
    }
  }

  /// Orchestrator using the backend selected in `config`.
  pub fn from_config(config: &CacheConfig) -> Self {
    Self::with_backend(config, backend_for(&config.build))
  }

  /// Orchestrator for `config` with an explicit backend.
  pub fn with_backend(config: &CacheConfig, backend: Box<dyn BuildBackend>) -> Self {
    Self::new(
      backend,
      config.product.clone(),
      config.provenance.clone(),
      config.context_dir(),
      config.output_dir(),
    )
  }

  pub fn backend(&self) -> &dyn BuildBackend {
    self.backend.as_ref()
  }

  /// Image reference a recipe is built under.
  pub fn image_for(&self, recipe: &Recipe, version: &VersionId) -> ImageRef {
    ImageRef::new(image_name(&self.product, &recipe.name), version.0.clone())
  }

  pub fn provenance_for(&self, version: &VersionId) -> Provenance {
    let expand = |s: &str| s.replace("{product}", &self.product);
    Provenance {
      product: self.product.clone(),
      version: version.0.clone(),
      author: expand(&self.provenance.author),
      maintainer: expand(&self.provenance.maintainer),
      contact: expand(&self.provenance.contact),
      source_url: expand(&self.provenance.source_url),
    }
  }

  /// Write the temporary definition for `recipe` at `version`.
  ///
  /// The base definition is copied byte for byte; it need not be UTF-8.
  pub async fn materialize_definition(&self, recipe: &Recipe, version: &VersionId) -> Result<NamedTempFile, BuildError> {
    let image = self.image_for(recipe, version);
    let io_err = |source| BuildError::Io {
      image: image.tag(),
      stage: BuildStage::Prepare,
      source,
    };

    let base = fs::read(&recipe.build_def_path).await.map_err(io_err)?;
    let block = self.backend.provenance_block(&self.provenance_for(version));

    let mut file = tempfile::Builder::new()
      .prefix(&format!("{}-", recipe.stem))
      .suffix(&format!(".{}", self.backend.definition_extension()))
      .tempfile()
      .map_err(io_err)?;
    file.write_all(&base).map_err(io_err)?;
    file.write_all(block.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;

    debug!(recipe = %recipe.name, path = %file.path().display(), "wrote temporary definition");
    Ok(file)
  }

  /// Build and export one image.
  pub async fn build(&self, recipe: &Recipe, version: &VersionId) -> Result<BuildOutcome, BuildError> {
    let image = self.image_for(recipe, version);
    let tag = image.tag();
    let started = Instant::now();
    info!(recipe = %recipe.name, image = %tag, backend = self.backend.name(), "building image");

    let definition = self.materialize_definition(recipe, version).await?;
    let workspace: TempDir = tempfile::Builder::new().prefix("imgcache-build-").tempdir().map_err(|source| BuildError::Io {
      image: tag.clone(),
      stage: BuildStage::Prepare,
      source,
    })?;

    let build_cmd = self
      .backend
      .build_command(definition.path(), &image, workspace.path(), &self.context_dir);
    run_command(&build_cmd, &self.context_dir, &tag, BuildStage::Build).await?;

    let export_err = |source| BuildError::Io {
      image: tag.clone(),
      stage: BuildStage::Export,
      source,
    };
    fs::create_dir_all(&self.output_dir).await.map_err(export_err)?;

    let step = self.backend.export(&image, workspace.path(), &self.output_dir);
    match &step {
      ExportStep::Command { command, .. } => {
        run_command(command, &self.context_dir, &tag, BuildStage::Export).await?;
      }
      ExportStep::Copy { from, to } => {
        fs::copy(from, to).await.map_err(export_err)?;
      }
    }

    let outcome = BuildOutcome {
      recipe: recipe.name.clone(),
      image,
      artifact: step.artifact().clone(),
      elapsed: started.elapsed(),
    };
    info!(image = %tag, artifact = %outcome.artifact.display(), "image built");
    Ok(outcome)
  }
}
