//! End-to-end tests for `plan` and `build` against a mock registry and a
//! stand-in builder script.

#![cfg(unix)]

mod common;

use predicates::prelude::*;

use common::{ALIGN_VERSION, QC_VERSION, TestEnv, imgcache_cmd, tagged};

fn read_manifest(env: &TestEnv) -> Vec<String> {
  let content = std::fs::read_to_string(env.manifest_path()).unwrap();
  serde_json::from_str(&content).unwrap()
}

#[test]
fn build_skips_published_and_builds_missing() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_qc/versions")
    .with_status(200)
    .with_body(tagged(QC_VERSION))
    .create();
  server
    .mock("GET", "/product_align/versions")
    .with_status(404)
    .with_body(r#"{"message": "Package not found."}"#)
    .create();

  let env = TestEnv::new();
  env.recipe("qc", "name: qc\n");
  env.recipe("align", "name: align\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete!"))
    .stdout(predicate::str::contains(format!("product_qc:{} (published)", QC_VERSION)));

  let align = format!("product_align:{}", ALIGN_VERSION);
  assert_eq!(read_manifest(&env), vec![align.clone()]);
  assert!(env.root().join("out").join(format!("{}.tar", align)).exists());

  let log = env.builder_log();
  assert_eq!(log.len(), 2);
  assert!(log[0].starts_with(&format!("build -t {} -f ", align)));
  assert!(log[0].ends_with("--network host --no-cache"));
  assert!(log[1].starts_with("save -o "));
  assert!(!log.iter().any(|l| l.contains("product_qc")));
}

#[test]
fn token_is_sent_as_bearer() {
  let mut server = mockito::Server::new();
  let mock = server
    .mock("GET", "/product_qc/versions")
    .match_header("authorization", "Bearer from-env")
    .with_status(200)
    .with_body(tagged(QC_VERSION))
    .create();

  let env = TestEnv::new();
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .env("IMGCACHE_TOKEN", "from-env")
    .arg("--config")
    .arg(env.config_path())
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("Every image is already published"));

  mock.assert();
}

#[test]
fn plan_reports_missing_without_building() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_qc/versions")
    .with_status(200)
    .with_body("[]")
    .create();

  let env = TestEnv::new();
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .args(["--output", "json", "plan"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"would_build\""));

  assert!(env.builder_log().is_empty());
  assert!(!env.manifest_path().exists());
}

#[test]
fn build_failure_names_recipe_version_and_stage() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_align/versions")
    .with_status(200)
    .with_body("[]")
    .create();

  let env = TestEnv::new();
  env.recipe("align", "name: align\n");
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(Some("product_align"));
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains(format!(
      "recipe align, version {}, stage build",
      ALIGN_VERSION
    )));

  assert!(!env.manifest_path().exists());
  assert_eq!(env.builder_log().len(), 1);
}

#[test]
fn keep_going_builds_the_rest_and_exits_non_zero() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_align/versions")
    .with_status(200)
    .with_body("[]")
    .create();
  server
    .mock("GET", "/product_qc/versions")
    .with_status(200)
    .with_body("[]")
    .create();

  let env = TestEnv::new();
  env.recipe("align", "name: align\n");
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(Some("product_align"));
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .args(["build", "--keep-going"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("1 recipe(s) failed to build"));

  assert_eq!(read_manifest(&env), vec![format!("product_qc:{}", QC_VERSION)]);
}

#[test]
fn registry_error_aborts_before_building() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_qc/versions")
    .with_status(500)
    .with_body("internal error")
    .create();

  let env = TestEnv::new();
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("stage resolve"))
    .stderr(predicate::str::contains("HTTP 500"));

  assert!(env.builder_log().is_empty());
  assert!(!env.manifest_path().exists());
}

#[test]
fn missing_dockerfile_aborts_before_any_build() {
  let server = mockito::Server::new();

  let env = TestEnv::new();
  env.recipe("align", "name: align\n");
  env.write_file("envs/qc.yaml", "name: qc\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("recipe qc, stage collect"))
    .stderr(predicate::str::contains("qc.dockerfile"));

  assert!(env.builder_log().is_empty());
}

#[test]
fn plan_with_unresolved_recipe_exits_non_zero() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/product_qc/versions")
    .with_status(502)
    .with_body("bad gateway")
    .create();

  let env = TestEnv::new();
  env.recipe("qc", "name: qc\n");
  let docker = env.fake_docker(None);
  env.write_config(&server.url(), &docker);
  let mut config = std::fs::read_to_string(env.config_path()).unwrap();
  config.push_str("on_failure = \"skip\"\n");
  std::fs::write(env.config_path(), config).unwrap();

  imgcache_cmd()
    .arg("--config")
    .arg(env.config_path())
    .arg("plan")
    .assert()
    .failure()
    .stdout(predicate::str::contains("Every image is already published").not())
    .stderr(predicate::str::contains("Plan incomplete"))
    .stderr(predicate::str::contains("1 recipe(s) could not be resolved"));

  assert!(env.builder_log().is_empty());
}
