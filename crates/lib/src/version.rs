//! Version identifiers for recipes.
//!
//! A recipe's version is the truncated content hash of its own definition
//! file. The shared scripts recipe is the exception: scripts and config files
//! are copied into that image at build time, so its version also folds in a
//! merged hash of every script and config file.
//!
//! ```text
//! aux     = H(h(script_1) .. h(script_n) h(config_1) .. h(config_m))
//! version = h(recipe)               ordinary recipe
//! version = H(h(recipe) aux)        shared scripts recipe
//! ```
//!
//! Both lists are sorted by path before hashing. The merge concatenates hash
//! values only, in order, so it is order-sensitive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collect::{FileSet, Recipe, is_shared_scripts_recipe};
use crate::consts::DEFAULT_HASH_PREFIX_LEN;
use crate::util::hash::{ContentHash, HashError, hash_bytes, hash_file};

/// Content-derived version identifier of one recipe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub String);

impl std::fmt::Display for VersionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<ContentHash> for VersionId {
  fn from(hash: ContentHash) -> Self {
    VersionId(hash.0)
  }
}

/// Computes per-file hashes and per-recipe versions with a fixed prefix length.
#[derive(Debug, Clone, Copy)]
pub struct HashEngine {
  prefix_len: usize,
}

impl Default for HashEngine {
  fn default() -> Self {
    Self::new(DEFAULT_HASH_PREFIX_LEN)
  }
}

impl HashEngine {
  pub fn new(prefix_len: usize) -> Self {
    Self { prefix_len }
  }

  pub fn prefix_len(&self) -> usize {
    self.prefix_len
  }

  pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
    hash_bytes(data, self.prefix_len)
  }

  pub fn hash_file(&self, path: &Path) -> Result<ContentHash, HashError> {
    hash_file(path, self.prefix_len)
  }

  /// Hash each file, returning path -> hash sorted by path.
  pub fn hash_files(&self, paths: &[PathBuf]) -> Result<BTreeMap<PathBuf, ContentHash>, HashError> {
    paths
      .iter()
      .map(|path| Ok((path.clone(), self.hash_file(path)?)))
      .collect()
  }

  /// Hash the concatenation of `hashes`, in the given order.
  pub fn merge_hashes<'a>(&self, hashes: impl IntoIterator<Item = &'a ContentHash>) -> ContentHash {
    let joined: String = hashes.into_iter().map(ContentHash::as_str).collect();
    self.hash_bytes(joined.as_bytes())
  }

  /// Merged hash of every script then every config file, each sorted by path.
  pub fn auxiliary_merge_hash(&self, scripts: &[PathBuf], configs: &[PathBuf]) -> Result<ContentHash, HashError> {
    let script_hashes = self.hash_files(scripts)?;
    let config_hashes = self.hash_files(configs)?;
    Ok(self.merge_hashes(script_hashes.values().chain(config_hashes.values())))
  }

  /// Version of the shared scripts recipe given its own hash and the auxiliary hash.
  pub fn shared_version(&self, own: &ContentHash, auxiliary: &ContentHash) -> VersionId {
    self.merge_hashes([own, auxiliary]).into()
  }

  /// Compute the version of every recipe in `files`, keyed by recipe path.
  pub fn compute_versions(&self, files: &FileSet) -> Result<BTreeMap<PathBuf, VersionId>, HashError> {
    let mut recipes = files.recipes.clone();
    let mut scripts = files.scripts.clone();
    let mut configs = files.configs.clone();
    recipes.sort();
    scripts.sort();
    configs.sort();

    let auxiliary = self.auxiliary_merge_hash(&scripts, &configs)?;
    debug!(
      scripts = scripts.len(),
      configs = configs.len(),
      hash = %auxiliary,
      "computed auxiliary merge hash"
    );

    let mut versions = BTreeMap::new();
    for recipe in recipes {
      let own = self.hash_file(&recipe)?;
      let version = if is_shared_scripts_recipe(&recipe) {
        self.shared_version(&own, &auxiliary)
      } else {
        own.into()
      };
      debug!(recipe = %recipe.display(), version = %version, "computed recipe version");
      versions.insert(recipe, version);
    }

    Ok(versions)
  }

  /// Pair each recipe with its computed version, preserving recipe order.
  pub fn compute_recipe_versions(
    &self,
    recipes: &[Recipe],
    files: &FileSet,
  ) -> Result<Vec<(Recipe, VersionId)>, HashError> {
    let mut versions = self.compute_versions(files)?;
    let mut paired = Vec::with_capacity(recipes.len());
    for recipe in recipes {
      let version = match versions.remove(&recipe.definition_path) {
        Some(version) => version,
        None => self.hash_file(&recipe.definition_path)?.into(),
      };
      paired.push((recipe.clone(), version));
    }
    Ok(paired)
  }
}
