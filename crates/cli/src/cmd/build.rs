//! Implementation of the `imgcache build` command.
//!
//! Builds every image whose version is not yet published, exports it to the
//! output directory and writes the manifest of built images.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use imgcache_lib::build::Orchestrator;
use imgcache_lib::run::{RunMode, run_pipeline};

use crate::output::{
  OutputFormat, format_elapsed, print_error, print_json, print_recipes, print_stats, print_success, print_warning,
};
use crate::{ProjectArgs, RegistryArgs};

/// Settings only the build command takes.
#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
  pub output_dir: Option<PathBuf>,
  pub manifest: Option<PathBuf>,
  pub program: Option<String>,
  pub keep_going: bool,
}

pub fn cmd_build(
  config_path: Option<&Path>,
  project: &ProjectArgs,
  registry: &RegistryArgs,
  options: &BuildOptions,
  output: OutputFormat,
) -> Result<()> {
  let start = Instant::now();

  let mut config = super::load_config(config_path, project)?;
  super::override_path(&mut config.paths.output, &options.output_dir)?;
  if let Some(manifest) = &options.manifest {
    config.paths.manifest = Some(std::path::absolute(manifest).context("Invalid manifest path")?);
  }
  if let Some(program) = &options.program {
    config.build.program = Some(program.clone());
  }
  config.build.on_failure = super::failure_policy(options.keep_going, config.build.on_failure);

  let client = super::registry_client(&mut config, registry)?;
  let orchestrator = Orchestrator::from_config(&config);
  info!(
    product = %config.product,
    backend = orchestrator.backend().name(),
    policy = ?config.build.on_failure,
    "starting build"
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = match rt.block_on(run_pipeline(&config, &client, &orchestrator, RunMode::Build)) {
    Ok(report) => report,
    Err(e) => {
      print_error(&super::describe_failure(&e));
      return Err(e.into());
    }
  };

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_recipes(&report.entries);
    println!();
    if report.has_failures() {
      print_warning(&format!("Build finished with {} failed recipe(s)", report.failed()));
    } else {
      print_success("Build complete!");
    }
    let mut stats = vec![
      ("Built", report.built().to_string()),
      ("Published", report.cached().to_string()),
      ("Failed", report.failed().to_string()),
    ];
    if let Some(path) = &report.manifest_path {
      stats.push(("Manifest", path.display().to_string()));
    }
    stats.push(("Duration", format_elapsed(start.elapsed())));
    print_stats(&stats);
  }

  if report.has_failures() {
    bail!("{} recipe(s) failed to build", report.failed());
  }
  Ok(())
}
