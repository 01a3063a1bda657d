use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while querying the registry.
///
/// None of these are ever mapped to "present" or "absent": a failed lookup
/// leaves the build decision undecided.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// The HTTP client could not be created.
  #[error("failed to create registry client: {0}")]
  Client(String),

  /// The request could not be sent or the body could not be read.
  #[error("registry request to {url} failed: {message}")]
  Request { url: String, message: String },

  /// The registry answered with an unexpected status.
  #[error("registry returned HTTP {status} for {url}: {body}")]
  Status { url: String, status: u16, body: String },

  /// The response body does not have the expected shape.
  #[error("malformed registry response from {url}: {message}")]
  Malformed { url: String, message: String },
}

/// Tags already published for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryState {
  pub tags: BTreeSet<String>,
}

impl RegistryState {
  pub fn contains(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }

  /// Parse a package-versions response body.
  ///
  /// A list holds one entry per published version, each carrying its tags
  /// under `metadata.container.tags`. Any non-list value is the registry's
  /// way of saying the image has no versions yet.
  pub fn from_versions_response(body: &Value) -> Result<Self, String> {
    let Value::Array(versions) = body else {
      return Ok(Self::default());
    };

    let mut tags = BTreeSet::new();
    for (idx, version) in versions.iter().enumerate() {
      let version_tags = version
        .pointer("/metadata/container/tags")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("version entry {} has no metadata.container.tags list", idx))?;

      for tag in version_tags {
        let tag = tag
          .as_str()
          .ok_or_else(|| format!("version entry {} has a non-string tag: {}", idx, tag))?;
        tags.insert(tag.to_string());
      }
    }

    Ok(Self { tags })
  }
}

/// Outcome of checking one version against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
  pub present: bool,
}
