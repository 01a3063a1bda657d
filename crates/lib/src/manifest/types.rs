use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::build::{BuildOutcome, ImageRef};

/// Errors that can occur while reading or writing the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to create manifest directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write manifest '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read manifest '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Images built in one run, in build order.
///
/// Serializes as a bare JSON array of `name:version` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildManifest {
  pub images: Vec<String>,
}

impl BuildManifest {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, image: &ImageRef) {
    self.images.push(image.tag());
  }

  /// Manifest listing the image of every outcome.
  pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a BuildOutcome>) -> Self {
    let mut manifest = Self::new();
    for outcome in outcomes {
      manifest.push(&outcome.image);
    }
    manifest
  }

  pub fn len(&self) -> usize {
    self.images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.images.is_empty()
  }
}
