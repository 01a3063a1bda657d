use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fully qualified image reference, `name:version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageRef {
  pub name: String,
  pub version: String,
}

impl ImageRef {
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
    }
  }

  /// The `name:version` tag handed to the builder.
  pub fn tag(&self) -> String {
    format!("{}:{}", self.name, self.version)
  }
}

impl std::fmt::Display for ImageRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.name, self.version)
  }
}

/// Labels appended to every temporary build definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
  pub product: String,
  pub version: String,
  pub author: String,
  pub maintainer: String,
  pub contact: String,
  pub source_url: String,
}

/// Stage of a build in which something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStage {
  Prepare,
  Build,
  Export,
}

impl std::fmt::Display for BuildStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      BuildStage::Prepare => "prepare",
      BuildStage::Build => "build",
      BuildStage::Export => "export",
    };
    write!(f, "{}", s)
  }
}

/// Errors that can occur while building one image.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Reading the base definition or writing temporary files failed.
  #[error("{stage} failed for {image}: {source}")]
  Io {
    image: String,
    stage: BuildStage,
    #[source]
    source: std::io::Error,
  },

  /// The builder could not be started.
  #[error("{stage} failed for {image}: could not run '{program}': {source}")]
  Spawn {
    image: String,
    stage: BuildStage,
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The builder exited unsuccessfully.
  #[error("{stage} failed for {image}: '{command}' exited with code {code:?}")]
  CommandFailed {
    image: String,
    stage: BuildStage,
    command: String,
    code: Option<i32>,
  },
}

impl BuildError {
  pub fn stage(&self) -> BuildStage {
    match self {
      BuildError::Io { stage, .. } | BuildError::Spawn { stage, .. } | BuildError::CommandFailed { stage, .. } => {
        *stage
      }
    }
  }
}

/// An external command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

impl std::fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// How a built image is persisted outside the temporary workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStep {
  /// Run a command that writes `artifact`.
  Command { command: CommandSpec, artifact: PathBuf },
  /// Copy a file produced in the workspace to `to`.
  Copy { from: PathBuf, to: PathBuf },
}

impl ExportStep {
  pub fn artifact(&self) -> &PathBuf {
    match self {
      ExportStep::Command { artifact, .. } => artifact,
      ExportStep::Copy { to, .. } => to,
    }
  }
}

/// One image built during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOutcome {
  pub recipe: String,
  pub image: ImageRef,
  /// Durable local location of the exported image.
  pub artifact: PathBuf,
  #[serde(with = "duration_secs")]
  pub elapsed: Duration,
}

mod duration_secs {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
  }
}
