//! Test utilities for imgcache-lib.
//!
//! Provides a throwaway project layout on disk and a shell-driven build
//! backend that records every invocation instead of calling a real builder.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::build::{BuildBackend, CommandSpec, ExportStep, ImageRef, Provenance};
use crate::config::CacheConfig;

/// A project tree with `envs/`, `scripts/`, `files/` and `containers/`.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    for dir in ["envs", "scripts", "files", "containers", "out"] {
      fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    Self { temp }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the project root.
  pub fn write(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  /// Add a recipe plus its build definition for the script backend.
  pub fn recipe(&self, stem: &str, content: &str) {
    self.write(&format!("envs/{}.yaml", stem), content);
    self.write(&format!("containers/{}.def", stem), &format!("FROM base\n# recipe {}\n", stem));
  }

  /// Configuration pointing at this project.
  pub fn config(&self) -> CacheConfig {
    let mut config = CacheConfig {
      product: "product".to_string(),
      root: self.temp.path().to_path_buf(),
      ..CacheConfig::default()
    };
    config.paths.recipes = PathBuf::from("envs");
    config.paths.scripts = PathBuf::from("scripts");
    config.paths.configs = PathBuf::from("files");
    config.paths.definitions = PathBuf::from("containers");
    config.paths.output = PathBuf::from("out");
    config
  }

  pub fn log_path(&self) -> PathBuf {
    self.temp.path().join("builder.log")
  }

  /// Lines the script backend logged, one per build invocation.
  pub fn build_log(&self) -> Vec<String> {
    fs::read_to_string(self.log_path())
      .map(|s| s.lines().map(str::to_string).collect())
      .unwrap_or_default()
  }
}

/// Build backend that runs `/bin/sh` and logs `<tag> <definition> <workspace>`.
#[derive(Debug, Clone)]
pub struct ScriptBackend {
  pub log: PathBuf,
  pub fail_build_for: Option<String>,
  pub fail_export: bool,
}

impl ScriptBackend {
  pub fn new(log: PathBuf) -> Self {
    Self {
      log,
      fail_build_for: None,
      fail_export: false,
    }
  }

  fn image_file(image: &ImageRef) -> String {
    format!("{}_{}.img", image.name, image.version)
  }
}

impl BuildBackend for ScriptBackend {
  fn name(&self) -> &'static str {
    "script"
  }

  fn definition_extension(&self) -> &'static str {
    "def"
  }

  fn provenance_block(&self, p: &Provenance) -> String {
    format!("\n# product {}\n# version {}\n", p.product, p.version)
  }

  fn build_command(&self, definition: &Path, image: &ImageRef, workspace: &Path, _context: &Path) -> CommandSpec {
    let fail = self.fail_build_for.as_deref() == Some(image.name.as_str());
    let mut script = String::from("printf '%s %s %s\\n' \"$0\" \"$1\" \"$2\" >> \"$3\"");
    if fail {
      script.push_str("; exit 1");
    } else {
      script.push_str(&format!("; cp \"$1\" \"$2/{}\"", Self::image_file(image)));
    }
    CommandSpec::new("/bin/sh").args([
      "-c".to_string(),
      script,
      image.tag(),
      definition.to_string_lossy().to_string(),
      workspace.to_string_lossy().to_string(),
      self.log.to_string_lossy().to_string(),
    ])
  }

  fn export(&self, image: &ImageRef, workspace: &Path, output_dir: &Path) -> ExportStep {
    let file = Self::image_file(image);
    if self.fail_export {
      return ExportStep::Command {
        command: CommandSpec::new("/bin/sh").args(["-c", "exit 2"]),
        artifact: output_dir.join(file),
      };
    }
    ExportStep::Copy {
      from: workspace.join(&file),
      to: output_dir.join(file),
    }
  }
}

/// Parse one build log line into `(tag, definition, workspace)`.
pub fn parse_log_line(line: &str) -> (String, PathBuf, PathBuf) {
  let mut parts = line.splitn(3, ' ');
  let tag = parts.next().unwrap().to_string();
  let definition = PathBuf::from(parts.next().unwrap());
  let workspace = PathBuf::from(parts.next().unwrap());
  (tag, definition, workspace)
}
