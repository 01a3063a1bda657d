//! Pluggable container builders.
//!
//! A backend knows the conventions of one external build tool: which file
//! extension its definitions use, how provenance labels are spelled, and
//! which commands build and export an image. It never runs anything itself;
//! the orchestrator executes the commands it describes.

use std::fmt::Debug;
use std::path::Path;

use crate::config::{BackendKind, BuildConfig};

use super::types::{CommandSpec, ExportStep, ImageRef, Provenance};

pub trait BuildBackend: Debug + Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &'static str;

  /// Extension of build definitions, without the dot.
  fn definition_extension(&self) -> &'static str;

  /// Text appended to the base definition.
  fn provenance_block(&self, provenance: &Provenance) -> String;

  /// Command that builds `image` from `definition`.
  fn build_command(&self, definition: &Path, image: &ImageRef, workspace: &Path, context: &Path) -> CommandSpec;

  /// How to persist the built image into `output_dir`.
  fn export(&self, image: &ImageRef, workspace: &Path, output_dir: &Path) -> ExportStep;
}

/// Select the backend named by configuration.
pub fn backend_for(config: &BuildConfig) -> Box<dyn BuildBackend> {
  match config.backend {
    BackendKind::Docker => Box::new(DockerBackend::new(config.program.clone())),
    BackendKind::Apptainer => Box::new(ApptainerBackend::new(config.program.clone())),
  }
}

fn path_arg(path: &Path) -> String {
  path.to_string_lossy().to_string()
}

/// Builds with `docker build` and exports with `docker save`.
#[derive(Debug, Clone)]
pub struct DockerBackend {
  program: String,
}

impl DockerBackend {
  pub fn new(program: Option<String>) -> Self {
    Self {
      program: program.unwrap_or_else(|| "docker".to_string()),
    }
  }
}

impl BuildBackend for DockerBackend {
  fn name(&self) -> &'static str {
    "docker"
  }

  fn definition_extension(&self) -> &'static str {
    "dockerfile"
  }

  fn provenance_block(&self, p: &Provenance) -> String {
    format!(
      "\n\nLABEL Author=\"{}\"\n\
       LABEL Maintainer=\"{}\"\n\
       LABEL Associated_pipeline=\"{}\"\n\
       LABEL version=\"{}\"\n\
       LABEL org.opencontainers.image.authors=\"{}\"\n\
       LABEL org.opencontainers.image.source={}\n",
      p.author, p.maintainer, p.product, p.version, p.contact, p.source_url
    )
  }

  fn build_command(&self, definition: &Path, image: &ImageRef, _workspace: &Path, context: &Path) -> CommandSpec {
    CommandSpec::new(&self.program)
      .arg("build")
      .args(["-t".to_string(), image.tag()])
      .args(["-f".to_string(), path_arg(definition)])
      .arg(path_arg(context))
      .args(["--network", "host", "--no-cache"])
  }

  fn export(&self, image: &ImageRef, _workspace: &Path, output_dir: &Path) -> ExportStep {
    let artifact = output_dir.join(format!("{}.tar", image.tag()));
    ExportStep::Command {
      command: CommandSpec::new(&self.program)
        .arg("save")
        .args(["-o".to_string(), path_arg(&artifact)])
        .arg(image.tag()),
      artifact,
    }
  }
}

/// Builds `.sif` images with `apptainer build`.
#[derive(Debug, Clone)]
pub struct ApptainerBackend {
  program: String,
}

impl ApptainerBackend {
  pub fn new(program: Option<String>) -> Self {
    Self {
      program: program.unwrap_or_else(|| "apptainer".to_string()),
    }
  }

  fn image_file(image: &ImageRef) -> String {
    format!("{}_{}.sif", image.name, image.version)
  }
}

impl BuildBackend for ApptainerBackend {
  fn name(&self) -> &'static str {
    "apptainer"
  }

  fn definition_extension(&self) -> &'static str {
    "def"
  }

  fn provenance_block(&self, p: &Provenance) -> String {
    format!(
      "\n\n%labels\n    \
       Author {}\n    \
       Maintainer {}\n    \
       Associated_pipeline {}\n    \
       version {}\n    \
       org.opencontainers.image.authors {}\n    \
       org.opencontainers.image.source {}\n",
      p.author, p.maintainer, p.product, p.version, p.contact, p.source_url
    )
  }

  fn build_command(&self, definition: &Path, image: &ImageRef, workspace: &Path, _context: &Path) -> CommandSpec {
    CommandSpec::new(&self.program)
      .args(["build", "--force"])
      .arg(path_arg(&workspace.join(Self::image_file(image))))
      .arg(path_arg(definition))
  }

  fn export(&self, image: &ImageRef, workspace: &Path, output_dir: &Path) -> ExportStep {
    let file = Self::image_file(image);
    ExportStep::Copy {
      from: workspace.join(&file),
      to: output_dir.join(file),
    }
  }
}
