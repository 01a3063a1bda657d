//! External command execution for builds.
//!
//! Builder processes inherit the caller's environment (container tools need
//! their usual PATH, sockets and credentials) and run in the build context
//! directory. Output is captured and forwarded to the log.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::{BuildError, BuildStage, CommandSpec};

/// Number of trailing stderr lines logged when a command fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Run `spec` in `cwd`, failing unless it exits zero.
///
/// Returns the trimmed stdout on success.
pub async fn run_command(spec: &CommandSpec, cwd: &Path, image: &str, stage: BuildStage) -> Result<String, BuildError> {
  info!(image, %stage, cmd = %spec, "running builder");

  let output = Command::new(&spec.program)
    .args(&spec.args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .output()
    .await
    .map_err(|source| BuildError::Spawn {
      image: image.to_string(),
      stage,
      program: spec.program.clone(),
      source,
    })?;

  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);

  if !output.status.success() {
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..].join("\n");
    if !tail.is_empty() {
      warn!(image, %stage, stderr = %tail, "builder stderr");
    }
    if !stdout.is_empty() {
      debug!(image, %stage, stdout = %stdout, "builder stdout");
    }

    return Err(BuildError::CommandFailed {
      image: image.to_string(),
      stage,
      command: spec.to_string(),
      code: output.status.code(),
    });
  }

  if !stderr.is_empty() {
    debug!(image, %stage, stderr = %stderr, "builder stderr");
  }

  Ok(stdout.trim().to_string())
}
