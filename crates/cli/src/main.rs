use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imgcache_lib::config::BackendKind;
use imgcache_lib::consts::TOKEN_ENV_VAR;

mod cmd;
mod output;

use output::OutputFormat;

/// Content-addressed container image builds
#[derive(Parser)]
#[command(name = "imgcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the configuration file (default: ./imgcache.toml if present)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

/// Overrides for the project layout and build settings.
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectArgs {
  /// Product name used as image name prefix
  #[arg(long)]
  pub product: Option<String>,

  /// Directory holding environment recipes
  #[arg(long)]
  pub recipes: Option<PathBuf>,

  /// Directory holding scripts (searched recursively)
  #[arg(long)]
  pub scripts: Option<PathBuf>,

  /// Directory holding config files
  #[arg(long)]
  pub configs: Option<PathBuf>,

  /// Directory holding container build definitions
  #[arg(long)]
  pub definitions: Option<PathBuf>,

  /// Container builder
  #[arg(long)]
  pub backend: Option<BackendKind>,

  /// Number of hex characters kept from each hash
  #[arg(long)]
  pub hash_length: Option<usize>,
}

/// Registry access settings.
#[derive(Args, Debug, Default, Clone)]
pub struct RegistryArgs {
  /// Registry API token
  #[arg(long, env = TOKEN_ENV_VAR, hide_env_values = true)]
  pub token: Option<String>,

  /// Registry request timeout (e.g. "30s", "2m")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the version of every recipe without contacting the registry
  Hash {
    #[command(flatten)]
    project: ProjectArgs,
  },

  /// Show which images are missing from the registry (no builds)
  Plan {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    registry: RegistryArgs,
  },

  /// Build every missing image and write the manifest
  Build {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Directory exported images are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Manifest path (default: <output-dir>/builtcontainers.json)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Builder executable (default: backend name)
    #[arg(long)]
    program: Option<String>,

    /// Skip failing recipes instead of aborting the run
    #[arg(long)]
    keep_going: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cli.config.as_deref();
  match cli.command {
    Commands::Hash { project } => cmd::cmd_hash(config, &project, cli.output),
    Commands::Plan { project, registry } => cmd::cmd_plan(config, &project, &registry, cli.output),
    Commands::Build {
      project,
      registry,
      output_dir,
      manifest,
      program,
      keep_going,
    } => {
      let options = cmd::BuildOptions {
        output_dir,
        manifest,
        program,
        keep_going,
      };
      cmd::cmd_build(config, &project, &registry, &options, cli.output)
    }
  }
}
