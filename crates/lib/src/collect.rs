//! File collection for version hashing.
//!
//! Enumerates the three inputs that define a reproducible environment:
//! - recipes: one level deep, filtered by recipe extension
//! - scripts: walked recursively, filtered by script extension
//! - configs: one level deep, every regular file
//!
//! All returned paths are absolute and sorted, since hash combination is
//! order-sensitive.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::consts::{RECIPE_EXTENSIONS, SCRIPT_EXTENSIONS, SHARED_SCRIPTS_RECIPE};

/// Errors that can occur while collecting input files.
#[derive(Debug, Error)]
pub enum CollectError {
  /// The input directory does not exist or is not a directory.
  #[error("input directory not found: {0}")]
  MissingDirectory(PathBuf),

  /// Failed to list a directory.
  #[error("failed to read directory '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Failed while walking a directory tree.
  #[error("failed to walk directory '{path}': {message}")]
  Walk { path: PathBuf, message: String },

  /// Two recipe files map to the same image name.
  #[error("recipes '{first}' and '{second}' both map to recipe name '{name}'")]
  DuplicateRecipe {
    name: String,
    first: PathBuf,
    second: PathBuf,
  },

  /// A recipe has no matching container build definition.
  #[error("build definition for recipe '{recipe}' not found: {path}")]
  MissingBuildDefinition { recipe: String, path: PathBuf },
}

/// The three disjoint file collections that feed the hash engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
  pub recipes: Vec<PathBuf>,
  pub scripts: Vec<PathBuf>,
  pub configs: Vec<PathBuf>,
}

/// One buildable environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Recipe {
  /// Lower-cased file stem, used in image names.
  pub name: String,
  /// File stem as found on disk, used to locate the build definition.
  pub stem: String,
  /// Path to the environment recipe file.
  pub definition_path: PathBuf,
  /// Path to the container build definition for this recipe.
  pub build_def_path: PathBuf,
}

impl Recipe {
  /// Derive a recipe from its definition file.
  ///
  /// The build definition is expected at `<definitions_dir>/<stem>.<extension>`.
  pub fn from_definition(definition_path: &Path, definitions_dir: &Path, extension: &str) -> Self {
    let stem = recipe_stem(definition_path);
    Self {
      name: stem.to_lowercase(),
      build_def_path: definitions_dir.join(format!("{}.{}", stem, extension)),
      stem,
      definition_path: definition_path.to_path_buf(),
    }
  }

  /// Fail if the build definition for this recipe is missing.
  pub fn ensure_build_definition(&self) -> Result<(), CollectError> {
    if self.build_def_path.is_file() {
      return Ok(());
    }
    Err(CollectError::MissingBuildDefinition {
      recipe: self.name.clone(),
      path: self.build_def_path.clone(),
    })
  }
}

/// File name with only the final extension removed (`qc.v2.yaml` -> `qc.v2`).
pub fn recipe_stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().to_string())
    .unwrap_or_default()
}

/// Whether `path` is the recipe whose version covers all scripts and configs.
///
/// Only the part before the first dot is compared, case-insensitively, so
/// `Scripts.yaml` and `scripts.env.yml` both qualify.
pub fn is_shared_scripts_recipe(path: &Path) -> bool {
  let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
  let head = name.split('.').next().unwrap_or_default();
  head.eq_ignore_ascii_case(SHARED_SCRIPTS_RECIPE)
}

/// Fail if two recipes share a lower-cased name.
pub fn ensure_unique_names(recipes: &[Recipe]) -> Result<(), CollectError> {
  let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
  for recipe in recipes {
    if let Some(first) = seen.insert(&recipe.name, &recipe.definition_path) {
      return Err(CollectError::DuplicateRecipe {
        name: recipe.name.clone(),
        first: first.to_path_buf(),
        second: recipe.definition_path.clone(),
      });
    }
  }
  Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    .unwrap_or(false)
}

fn ensure_dir(dir: &Path) -> Result<PathBuf, CollectError> {
  if !dir.is_dir() {
    return Err(CollectError::MissingDirectory(dir.to_path_buf()));
  }
  dunce::canonicalize(dir).map_err(|source| CollectError::Io {
    path: dir.to_path_buf(),
    source,
  })
}

/// List regular files directly inside `dir`.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
  let root = ensure_dir(dir)?;
  let io_err = |source| CollectError::Io {
    path: root.clone(),
    source,
  };

  let mut files = Vec::new();
  for entry in fs::read_dir(&root).map_err(io_err)? {
    let path = entry.map_err(io_err)?.path();
    if path.is_file() {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

/// Collect recipe files (one level deep, recipe extensions only).
pub fn collect_recipes(dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
  let recipes: Vec<PathBuf> = list_files(dir)?
    .into_iter()
    .filter(|p| has_extension(p, RECIPE_EXTENSIONS))
    .collect();
  debug!(dir = %dir.display(), count = recipes.len(), "collected recipes");
  Ok(recipes)
}

/// Collect script files (recursive, script extensions only).
pub fn collect_scripts(dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
  let root = ensure_dir(dir)?;
  let mut scripts = Vec::new();

  for entry in WalkDir::new(&root).sort_by_file_name() {
    let entry = entry.map_err(|e| CollectError::Walk {
      path: root.clone(),
      message: e.to_string(),
    })?;
    if entry.file_type().is_file() && has_extension(entry.path(), SCRIPT_EXTENSIONS) {
      scripts.push(entry.into_path());
    }
  }

  // WalkDir sorts per directory; sort again so ordering is by full path
  scripts.sort();
  debug!(dir = %dir.display(), count = scripts.len(), "collected scripts");
  Ok(scripts)
}

/// Collect config files (one level deep, any extension).
pub fn collect_configs(dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
  let configs = list_files(dir)?;
  debug!(dir = %dir.display(), count = configs.len(), "collected configs");
  Ok(configs)
}

/// Collect all three input sets.
pub fn collect_file_set(recipes_dir: &Path, scripts_dir: &Path, configs_dir: &Path) -> Result<FileSet, CollectError> {
  Ok(FileSet {
    recipes: collect_recipes(recipes_dir)?,
    scripts: collect_scripts(scripts_dir)?,
    configs: collect_configs(configs_dir)?,
  })
}
