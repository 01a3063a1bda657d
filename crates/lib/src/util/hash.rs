//! Hashing utilities for content-addressed versions.
//!
//! This module provides:
//! - `ContentHash`: a truncated SHA-256 hex digest of some bytes
//! - `hash_file()`: single file hashing, streamed
//! - `hash_bytes()`: arbitrary byte hashing
//!
//! Every function takes the prefix length explicitly so that callers can widen
//! the digest without touching anything else.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A truncated SHA-256 digest.
///
/// # Format
///
/// Lowercase hexadecimal, e.g. `"a1b2c3"` for the default 6-character prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn truncate(digest: impl AsRef<[u8]>, prefix_len: usize) -> ContentHash {
  let mut full = hex::encode(digest);
  full.truncate(prefix_len);
  ContentHash(full)
}

/// Hash arbitrary bytes, keeping the first `prefix_len` hex characters.
pub fn hash_bytes(data: &[u8], prefix_len: usize) -> ContentHash {
  truncate(Sha256::digest(data), prefix_len)
}

/// Hash a file's raw contents, keeping the first `prefix_len` hex characters.
pub fn hash_file(path: &Path, prefix_len: usize) -> Result<ContentHash, HashError> {
  let read_err = |source| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(truncate(hasher.finalize(), prefix_len))
}
