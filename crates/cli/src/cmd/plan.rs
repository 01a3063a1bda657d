//! Implementation of the `imgcache plan` command.
//!
//! Resolves every recipe version against the registry and reports which
//! images a build would produce. Never builds and never writes a manifest.

use std::path::Path;

use anyhow::{Context, Result, bail};

use imgcache_lib::build::Orchestrator;
use imgcache_lib::run::{RecipeStatus, RunMode, run_pipeline};

use crate::output::{
  OutputFormat, print_error, print_info, print_json, print_recipes, print_stats, print_success, print_warning,
};
use crate::{ProjectArgs, RegistryArgs};

pub fn cmd_plan(
  config_path: Option<&Path>,
  project: &ProjectArgs,
  registry: &RegistryArgs,
  output: OutputFormat,
) -> Result<()> {
  let mut config = super::load_config(config_path, project)?;
  let client = super::registry_client(&mut config, registry)?;
  let orchestrator = Orchestrator::from_config(&config);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = match rt.block_on(run_pipeline(&config, &client, &orchestrator, RunMode::Plan)) {
    Ok(report) => report,
    Err(e) => {
      print_error(&super::describe_failure(&e));
      return Err(e.into());
    }
  };

  let missing = report.count(|s| matches!(s, RecipeStatus::WouldBuild));
  if output.is_json() {
    print_json(&report)?;
  } else {
    print_recipes(&report.entries);
    println!();
    if report.has_failures() {
      print_warning(&format!("Plan incomplete: {} recipe(s) could not be resolved", report.failed()));
    } else if missing == 0 {
      print_success("Every image is already published");
    } else {
      print_info(&format!("{} image(s) would be built", missing));
    }
    print_stats(&[
      ("Published", report.cached().to_string()),
      ("Missing", missing.to_string()),
      ("Failed", report.failed().to_string()),
    ]);
  }

  if report.has_failures() {
    bail!("{} recipe(s) could not be resolved", report.failed());
  }
  Ok(())
}
