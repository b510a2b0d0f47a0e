//! Integration tests for `fuse-resolve resolve --json` output.

use serial_test::serial;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "fuse-cli", "--bin", "fuse-resolve", "--"]);
    cmd
}

fn create_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let files = [
        ("index.js", ""),
        ("some1/index.js", ""),
        ("some4/index.tsx", ""),
        ("bar/Bar.tsx", ""),
        ("b/AnotherFile.ts", ""),
        (
            "node_modules/foo/package.json",
            r#"{"name":"foo","version":"1.0.0","main":"lib/main.js"}"#,
        ),
        ("node_modules/foo/lib/main.js", ""),
    ];
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn resolve_json(home: &Path, extra: &[&str]) -> (Output, serde_json::Value) {
    let output = cargo_bin()
        .arg("--json")
        .arg("resolve")
        .arg("--home")
        .arg(home)
        .args(extra)
        .output()
        .expect("Failed to run resolve command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    (output, json)
}

#[test]
#[serial]
fn test_resolve_json_shape() {
    let project = create_project();
    let (output, json) = resolve_json(project.path(), &["./some1", "./some4"]);

    assert!(output.status.success());
    assert_eq!(json["ok"], true);
    assert_eq!(json["schema_version"].as_u64(), Some(1));
    assert!(json["warnings"].as_array().unwrap().is_empty());

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["specifier"], "./some1");
    assert_eq!(results[0]["status"], "resolved");
    assert_eq!(results[0]["extension"], ".js");
    assert_eq!(results[0]["fuse_box_path"], "some1/index.js");
    assert!(results[0].get("forced_statement").is_none());

    assert_eq!(results[1]["extension"], ".tsx");
    assert_eq!(results[1]["fuse_box_path"], "some4/index.jsx");
    assert_eq!(results[1]["forced_statement"], "~/some4/index.jsx");
}

#[test]
#[serial]
fn test_resolve_json_alias_and_package() {
    let project = create_project();
    let (output, json) = resolve_json(
        project.path(),
        &["--alias", "ololo$=./some1", "ololo", "foo"],
    );

    assert!(output.status.success());
    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["forced_statement"], "~/some1/index.js");
    assert_eq!(results[1]["fuse_box_path"], "lib/main.js");
    assert_eq!(results[1]["package"]["name"], "foo");
    assert_eq!(results[1]["package"]["version"], "1.0.0");
}

#[test]
#[serial]
fn test_resolve_json_paths_file() {
    let project = create_project();
    let paths_file = project.path().join("paths.json");
    fs::write(&paths_file, r#"{"paths":{"@app/*":["a/*","b/*"]}}"#).unwrap();

    let (output, json) = resolve_json(
        project.path(),
        &["--paths", paths_file.to_str().unwrap(), "@app/AnotherFile"],
    );

    assert!(output.status.success());
    assert_eq!(json["results"][0]["fuse_box_path"], "b/AnotherFile.js");
}

#[test]
#[serial]
fn test_resolve_json_base_url() {
    let project = create_project();
    let (output, json) = resolve_json(
        project.path(),
        &["--base-url", project.path().to_str().unwrap(), "bar/Bar"],
    );

    assert!(output.status.success());
    assert_eq!(json["results"][0]["forced_statement"], "~/bar/Bar.jsx");
}

#[test]
#[serial]
fn test_resolve_json_external() {
    let project = create_project();
    let (output, json) = resolve_json(project.path(), &["https://cdn.example.com/lib.js"]);

    assert!(output.status.success());
    assert_eq!(json["results"][0]["status"], "external");
}

#[test]
#[serial]
fn test_resolve_json_unresolved_exits_2() {
    let project = create_project();
    let (output, json) = resolve_json(project.path(), &["./some1", "./missing"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json["ok"], false);

    let missing = &json["results"][1];
    assert_eq!(missing["status"], "unresolved");
    assert_eq!(missing["error_code"], "MODULE_NOT_FOUND");
    assert!(!missing["tried"].as_array().unwrap().is_empty());
}

#[test]
#[serial]
fn test_version_command() {
    let output = cargo_bin()
        .arg("version")
        .output()
        .expect("Failed to run version command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("fuse-resolve "));
}
