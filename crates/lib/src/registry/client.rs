//! HTTP client for the registry's package-versions endpoint.
//!
//! Issues `GET <api_base>/<image>/versions` with the registry's JSON media
//! type, an optional bearer token and the API version header.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::consts::APP_NAME;

use super::types::{RegistryError, RegistryState, Resolution};

/// Longest error body kept in [`RegistryError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Cut `body` to at most [`MAX_ERROR_BODY`] bytes on a char boundary.
fn truncate_body(mut body: String) -> String {
  if body.len() > MAX_ERROR_BODY {
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
      end -= 1;
    }
    body.truncate(end);
  }
  body
}

/// Image name for a recipe: `<product>_<recipe>`, lower-cased.
pub fn image_name(product: &str, recipe: &str) -> String {
  format!("{}_{}", product, recipe).to_lowercase()
}

/// Read-only client for published image versions.
#[derive(Debug, Clone)]
pub struct RegistryClient {
  http: reqwest::Client,
  api_base: String,
  media_type: String,
  api_version_header: String,
  api_version: String,
  token: Option<String>,
}

impl RegistryClient {
  /// Create a client from configuration and an explicitly injected token.
  pub fn new(config: &RegistryConfig, token: Option<String>) -> Result<Self, RegistryError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| RegistryError::Client(e.to_string()))?;

    Ok(Self {
      http,
      api_base: config.api_base.trim_end_matches('/').to_string(),
      media_type: config.media_type.clone(),
      api_version_header: config.api_version_header.clone(),
      api_version: config.api_version.clone(),
      token: token.filter(|t| !t.trim().is_empty()),
    })
  }

  /// URL listing the versions of `image`.
  pub fn versions_url(&self, image: &str) -> String {
    format!("{}/{}/versions", self.api_base, image)
  }

  /// Fetch every tag currently published for `image`.
  pub async fn fetch_tags(&self, image: &str) -> Result<RegistryState, RegistryError> {
    let url = self.versions_url(image);
    debug!(url = %url, "querying registry");

    let mut request = self
      .http
      .get(&url)
      .header(ACCEPT, &self.media_type)
      .header(self.api_version_header.as_str(), &self.api_version);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| RegistryError::Request {
      url: url.clone(),
      message: e.to_string(),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| RegistryError::Request {
      url: url.clone(),
      message: e.to_string(),
    })?;

    // A 404 carries the "package not found" object, which means no versions yet
    if !status.is_success() && status != StatusCode::NOT_FOUND {
      return Err(RegistryError::Status {
        url,
        status: status.as_u16(),
        body: truncate_body(body),
      });
    }

    let json: Value = serde_json::from_str(&body).map_err(|e| RegistryError::Malformed {
      url: url.clone(),
      message: e.to_string(),
    })?;

    let state =
      RegistryState::from_versions_response(&json).map_err(|message| RegistryError::Malformed { url, message })?;
    debug!(image, tags = state.tags.len(), "registry tags fetched");
    Ok(state)
  }

  /// Check whether `version` is already published for `image`.
  pub async fn resolve(&self, image: &str, version: &str) -> Result<Resolution, RegistryError> {
    let state = self.fetch_tags(image).await?;
    let present = state.contains(version);
    info!(image, version, present, "resolved registry state");
    Ok(Resolution { present })
  }
}
