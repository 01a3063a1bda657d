//! Implementation of the `imgcache hash` command.
//!
//! Collects and hashes every recipe offline and prints one version per recipe.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use imgcache_lib::build::backend_for;
use imgcache_lib::registry::image_name;
use imgcache_lib::run::compute_versions;

use crate::ProjectArgs;
use crate::output::{OutputFormat, print_error, print_json};

#[derive(Serialize)]
struct HashEntry {
  recipe: String,
  image: String,
  version: String,
}

pub fn cmd_hash(config_path: Option<&Path>, project: &ProjectArgs, output: OutputFormat) -> Result<()> {
  let config = super::load_config(config_path, project)?;
  let backend = backend_for(&config.build);

  let versions = match compute_versions(&config, backend.definition_extension()) {
    Ok(versions) => versions,
    Err(e) => {
      print_error(&super::describe_failure(&e));
      return Err(e.into());
    }
  };

  let entries: Vec<HashEntry> = versions
    .into_iter()
    .map(|(recipe, version)| HashEntry {
      image: image_name(&config.product, &recipe.name),
      recipe: recipe.name,
      version: version.0,
    })
    .collect();

  if output.is_json() {
    print_json(&entries)?;
  } else {
    let width = entries.iter().map(|e| e.recipe.len()).max().unwrap_or(0);
    for entry in &entries {
      println!("{:width$}  {}", entry.recipe, entry.version, width = width);
    }
  }

  Ok(())
}
