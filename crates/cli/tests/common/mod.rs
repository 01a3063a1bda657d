//! Shared test helpers for CLI integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Version of a recipe containing `name: qc\n` at the default prefix length.
pub const QC_VERSION: &str = "ba1944";
/// Version of a recipe containing `name: align\n`.
pub const ALIGN_VERSION: &str = "394d13";

/// Get a Command for the imgcache binary with no ambient token.
pub fn imgcache_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("imgcache");
  cmd.env_remove("IMGCACHE_TOKEN").env_remove("RUST_LOG");
  cmd
}

/// Isolated project directory.
///
/// Layout mirrors a pipeline repository: `envs/`, `scripts/`, `files/` and
/// `containers/`, with exported images going to `out/`.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    for dir in ["envs", "scripts", "files", "containers"] {
      std::fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    Self { temp }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Add a recipe and its Dockerfile.
  pub fn recipe(&self, stem: &str, content: &str) {
    self.write_file(&format!("envs/{}.yaml", stem), content);
    self.write_file(&format!("containers/{}.dockerfile", stem), "FROM scratch\n");
  }

  pub fn config_path(&self) -> PathBuf {
    self.temp.path().join("imgcache.toml")
  }

  /// Write `imgcache.toml` pointing at `api_base` and `program`.
  pub fn write_config(&self, api_base: &str, program: &Path) {
    let content = format!(
      r#"product = "product"

[paths]
recipes = "envs"
scripts = "scripts"
configs = "files"
definitions = "containers"
output = "out"

[registry]
api_base = "{}"
timeout_secs = 5

[build]
backend = "docker"
program = "{}"
"#,
      api_base,
      program.display()
    );
    std::fs::write(self.config_path(), content).unwrap();
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.temp.path().join("out").join("builtcontainers.json")
  }

  pub fn builder_log(&self) -> Vec<String> {
    std::fs::read_to_string(self.temp.path().join("builder.log"))
      .map(|s| s.lines().map(str::to_string).collect())
      .unwrap_or_default()
  }

  /// Install a stand-in for `docker` that logs its arguments.
  ///
  /// `build` succeeds unless the tag contains `fail_tag`; `save -o <file>`
  /// creates the file.
  #[cfg(unix)]
  pub fn fake_docker(&self, fail_tag: Option<&str>) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let log = self.temp.path().join("builder.log");
    let fail = match fail_tag {
      Some(tag) => format!("case \"$3\" in *{}*) exit 1;; esac", tag),
      None => String::new(),
    };
    let script = format!(
      "#!/bin/sh\necho \"$@\" >> \"{}\"\ncase \"$1\" in\n  build)\n    {}\n    ;;\n  save)\n    : > \"$3\"\n    ;;\nesac\nexit 0\n",
      log.display(),
      fail
    );
    let path = self.temp.path().join("fake-docker");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }
}

/// Registry response listing one published tag.
pub fn tagged(tag: &str) -> String {
  format!(
    r#"[{{"id": 1, "metadata": {{"package_type": "container", "container": {{"tags": ["{}"]}}}}}}]"#,
    tag
  )
}
