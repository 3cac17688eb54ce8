//! Integration tests for the set-versions CLI

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn create_fixture(root: Value, packages: &[(&str, Value)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("package.json"), root.to_string()).unwrap();

    for (dir, contents) in packages {
        let pkg = temp.path().join("packages").join(dir);
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), contents.to_string()).unwrap();
    }

    temp
}

/// Root at 2.0.0 listing `packages/*` as a plain sequence.
fn create_test_workspace() -> TempDir {
    create_fixture(
        json!({ "version": "2.0.0", "workspaces": ["packages/*"] }),
        &[
            ("a", json!({ "name": "pre-a", "version": "1.0.0" })),
            (
                "b",
                json!({
                    "name": "pre-b",
                    "version": "1.0.0",
                    "dependencies": {
                        "pre-a": "1.0.0",
                        "other-c": "1.0.0",
                        "other-d": "4.1.3"
                    }
                }),
            ),
            ("c", json!({ "name": "other-c", "version": "1.0.0" })),
        ],
    )
}

/// Root at 5.0.0 declaring `{ "packages": [...] }`.
fn create_packages_object_workspace() -> TempDir {
    create_fixture(
        json!({ "version": "5.0.0", "workspaces": { "packages": ["packages/*"] } }),
        &[
            ("a", json!({ "name": "pkg-a", "version": "1.0.0" })),
            (
                "b",
                json!({
                    "name": "pkg-b",
                    "version": "1.0.0",
                    "dependencies": { "pkg-a": "1.0.0" }
                }),
            ),
        ],
    )
}

fn set_versions(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_set-versions"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn read(workspace: &TempDir, relative: &str) -> Value {
    let content = fs::read_to_string(workspace.path().join(relative)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_version_and_files_args() {
    let workspace = create_packages_object_workspace();

    let output = set_versions(
        workspace.path(),
        &["5.0.0", "packages/a/package.json", "packages/b/package.json"],
    );

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let a = read(&workspace, "packages/a/package.json");
    let b = read(&workspace, "packages/b/package.json");
    assert_eq!(a["version"], "5.0.0");
    assert_eq!(b["version"], "5.0.0");
    assert_eq!(b["dependencies"]["pkg-a"], "5.0.0");
}

#[test]
fn test_workspaces_defaults_to_root_version() {
    let workspace = create_test_workspace();

    let output = set_versions(workspace.path(), &["--workspaces"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let b = read(&workspace, "packages/b/package.json");
    assert_eq!(read(&workspace, "packages/a/package.json")["version"], "2.0.0");
    assert_eq!(b["version"], "2.0.0");
    assert_eq!(read(&workspace, "packages/c/package.json")["version"], "2.0.0");
    assert_eq!(b["dependencies"]["pre-a"], "2.0.0");
    assert_eq!(b["dependencies"]["other-c"], "2.0.0");
    assert_eq!(b["dependencies"]["other-d"], "4.1.3");
}

#[test]
fn test_workspaces_reading_packages_object() {
    let workspace = create_packages_object_workspace();

    let output = set_versions(workspace.path(), &["--workspaces"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let b = read(&workspace, "packages/b/package.json");
    assert_eq!(read(&workspace, "packages/a/package.json")["version"], "5.0.0");
    assert_eq!(b["version"], "5.0.0");
    assert_eq!(b["dependencies"]["pkg-a"], "5.0.0");
}

#[test]
fn test_workspaces_with_version() {
    let workspace = create_test_workspace();

    let output = set_versions(workspace.path(), &["6.0.0", "--workspaces"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let b = read(&workspace, "packages/b/package.json");
    assert_eq!(read(&workspace, "package.json")["version"], "6.0.0");
    assert_eq!(read(&workspace, "packages/a/package.json")["version"], "6.0.0");
    assert_eq!(b["version"], "6.0.0");
    assert_eq!(read(&workspace, "packages/c/package.json")["version"], "6.0.0");
    assert_eq!(b["dependencies"]["pre-a"], "6.0.0");
    assert_eq!(b["dependencies"]["other-c"], "6.0.0");
    assert_eq!(b["dependencies"]["other-d"], "4.1.3");

    let root = fs::read_to_string(workspace.path().join("package.json")).unwrap();
    assert!(root.starts_with("{\n  \"version\": \"6.0.0\",\n  \"workspaces\": [\n"));
    assert!(root.ends_with("]\n}\n"));
}

#[test]
fn test_workspaces_from_subdirectory_with_cwd_flag() {
    let workspace = create_test_workspace();
    let elsewhere = TempDir::new().unwrap();
    let cwd = workspace.path().join("packages");

    let output = set_versions(
        elsewhere.path(),
        &["7.0.0", "--workspaces", "-C", cwd.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(read(&workspace, "package.json")["version"], "7.0.0");
    assert_eq!(read(&workspace, "packages/c/package.json")["version"], "7.0.0");
}

#[test]
fn test_dry_run() {
    let workspace = create_test_workspace();
    let before = fs::read_to_string(workspace.path().join("packages/b/package.json")).unwrap();

    let output = set_versions(workspace.path(), &["3.0.0", "--workspaces", "--dry-run"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dry run mode"));
    assert!(stdout.contains("pre-b"));
    assert!(stdout.contains("1.0.0 → 3.0.0"));

    let after = fs::read_to_string(workspace.path().join("packages/b/package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_check() {
    let workspace = create_test_workspace();

    let output = set_versions(workspace.path(), &["--workspaces", "--check"]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Out of sync"));

    let output = set_versions(workspace.path(), &["--workspaces"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let output = set_versions(workspace.path(), &["--workspaces", "--check"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("are at 2.0.0"));
}

#[test]
fn test_missing_workspaces_config_fails() {
    let workspace = create_fixture(json!({ "version": "1.0.0" }), &[]);

    let output = set_versions(workspace.path(), &["--workspaces"]);

    assert_eq!(output.status.code(), Some(2), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("workspaces configuration not found"));
}

#[test]
fn test_unreadable_manifest_fails_without_writes() {
    let workspace = create_test_workspace();
    fs::write(workspace.path().join("packages/c/package.json"), "not json").unwrap();
    let before = fs::read_to_string(workspace.path().join("packages/a/package.json")).unwrap();

    let output = set_versions(workspace.path(), &["9.0.0", "--workspaces"]);

    assert_eq!(output.status.code(), Some(3), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("packages/c/package.json"));
    let after = fs::read_to_string(workspace.path().join("packages/a/package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_version_required_without_workspaces() {
    let workspace = create_test_workspace();

    let output = set_versions(workspace.path(), &[]);

    assert_eq!(output.status.code(), Some(2), "{output:?}");
}

#[test]
fn test_check_flags_unformatted_manifests() {
    // Fixtures are written as compact JSON, already at the root version.
    let workspace = create_fixture(
        json!({ "version": "1.0.0", "workspaces": ["packages/*"] }),
        &[("a", json!({ "name": "pkg-a", "version": "1.0.0" }))],
    );

    let output = set_versions(workspace.path(), &["--workspaces", "--check"]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("formatting only"));

    let before = fs::read_to_string(workspace.path().join("packages/a/package.json")).unwrap();
    let output = set_versions(workspace.path(), &["--workspaces"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let after = fs::read_to_string(workspace.path().join("packages/a/package.json")).unwrap();
    assert_ne!(before, after);

    let output = set_versions(workspace.path(), &["--workspaces", "--check"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
}

#[test]
fn test_relative_cwd_flag_searches_above_process_dir() {
    let workspace = create_test_workspace();
    let tools = workspace.path().join("tools");
    fs::create_dir_all(tools.join("x")).unwrap();

    let output = set_versions(&tools, &["8.0.0", "--workspaces", "-C", "x"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(read(&workspace, "package.json")["version"], "8.0.0");
    assert_eq!(read(&workspace, "packages/b/package.json")["dependencies"]["pre-a"], "8.0.0");
}

#[test]
fn test_relative_cwd_flag_with_files() {
    let workspace = create_packages_object_workspace();

    let output = set_versions(
        workspace.path(),
        &["4.2.0", "-C", "packages", "a/package.json", "b/package.json"],
    );

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let b = read(&workspace, "packages/b/package.json");
    assert_eq!(read(&workspace, "packages/a/package.json")["version"], "4.2.0");
    assert_eq!(b["dependencies"]["pkg-a"], "4.2.0");
}
