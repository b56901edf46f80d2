//! Smoke tests for the `omb` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_manifest(dir: &Path, content: &str) -> std::path::PathBuf {
  let path = dir.join("omnibuild.json");
  fs::write(&path, content).unwrap();
  path
}

fn omb() -> Command {
  Command::cargo_bin("omb").unwrap()
}

fn build_cmd(temp: &TempDir, manifest: &Path) -> Command {
  let mut cmd = omb();
  cmd
    .arg("build")
    .arg("--manifest")
    .arg(manifest)
    .arg("--cache-dir")
    .arg(temp.path().join("cache"))
    .arg("--build-root")
    .arg(temp.path().join("work"))
    .arg("--install-dir")
    .arg(temp.path().join("install"));
  cmd
}

#[test]
fn help_lists_subcommands() {
  omb()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("build"))
    .stdout(predicate::str::contains("plan"))
    .stdout(predicate::str::contains("status"));
}

#[test]
fn plan_prints_dependency_order() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{
      "components": [
        { "name": "app", "dependencies": ["lib"] },
        { "name": "lib" }
      ]
    }"#,
  );

  omb()
    .arg("plan")
    .arg("--manifest")
    .arg(&manifest)
    .assert()
    .success()
    .stdout(predicate::str::contains("1. lib"))
    .stdout(predicate::str::contains("2. app"));
}

#[test]
fn plan_reports_cycles() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{
      "components": [
        { "name": "a", "dependencies": ["b"] },
        { "name": "b", "dependencies": ["a"] }
      ]
    }"#,
  );

  omb()
    .arg("plan")
    .arg("--manifest")
    .arg(&manifest)
    .assert()
    .failure()
    .stderr(predicate::str::contains("cycle"));
}

#[test]
fn plan_reports_dangling_dependencies() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{ "components": [ { "name": "app", "dependencies": ["ghost"] } ] }"#,
  );

  omb()
    .arg("plan")
    .arg("--manifest")
    .arg(&manifest)
    .assert()
    .failure()
    .stderr(predicate::str::contains("ghost"));
}

#[test]
fn build_succeeds_and_then_hits_cache() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{
      "components": [
        { "name": "base", "steps": [ { "type": "run", "command": "exit 0" } ] },
        { "name": "app", "dependencies": ["base"], "steps": [ { "type": "run", "command": "exit 0" } ] }
      ]
    }"#,
  );

  build_cmd(&temp, &manifest)
    .assert()
    .success()
    .stdout(predicate::str::contains("2 built"));

  build_cmd(&temp, &manifest)
    .assert()
    .success()
    .stdout(predicate::str::contains("(cached)"));
}

#[test]
fn failing_build_exits_nonzero_and_blocks_dependents() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{
      "components": [
        { "name": "broken", "steps": [ { "type": "run", "command": "exit 1" } ] },
        { "name": "app", "dependencies": ["broken"], "steps": [ { "type": "run", "command": "exit 0" } ] }
      ]
    }"#,
  );

  build_cmd(&temp, &manifest)
    .assert()
    .failure()
    .stdout(predicate::str::contains("blocked by broken"));
}

#[test]
fn build_json_report_is_parseable() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(
    temp.path(),
    r#"{ "components": [ { "name": "only", "steps": [ { "type": "run", "command": "exit 0" } ] } ] }"#,
  );

  let output = build_cmd(&temp, &manifest)
    .arg("--format")
    .arg("json")
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
  assert_eq!(report["order"][0], "only");
  assert!(report["statuses"]["only"].get("Succeeded").is_some());
}

#[test]
fn missing_manifest_is_an_error() {
  let temp = TempDir::new().unwrap();

  omb()
    .arg("plan")
    .arg("--manifest")
    .arg(temp.path().join("nope.json"))
    .assert()
    .failure();
}
