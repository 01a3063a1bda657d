//! Reading and writing the manifest file.

use std::fs;
use std::path::Path;

use tracing::info;

use super::types::{BuildManifest, ManifestError};

impl BuildManifest {
  /// Write the manifest to `path`, replacing any previous file.
  ///
  /// Writes to a sibling temp file and renames it into place, so readers never
  /// observe a partial manifest.
  pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
    write_manifest(self, path)
  }

  /// Read a manifest written by [`BuildManifest::write`].
  pub fn read(path: &Path) -> Result<Self, ManifestError> {
    read_manifest(path)
  }
}

fn write_manifest(manifest: &BuildManifest, path: &Path) -> Result<(), ManifestError> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|source| ManifestError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  temp_name.push(".tmp");
  let temp_path = path.with_file_name(temp_name);

  let content = serde_json::to_string_pretty(manifest).map_err(ManifestError::Serialize)?;
  let write_err = |source| ManifestError::Write {
    path: path.to_path_buf(),
    source,
  };
  fs::write(&temp_path, content).map_err(write_err)?;
  fs::rename(&temp_path, path).map_err(write_err)?;

  info!(path = %path.display(), images = manifest.len(), "wrote manifest");
  Ok(())
}

fn read_manifest(path: &Path) -> Result<BuildManifest, ManifestError> {
  let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
    path: path.to_path_buf(),
    source,
  })
}
