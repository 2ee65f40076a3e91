use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn repograph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_repograph"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn assert_ok(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Repository with a default config, two linked files, and one ignored file.
fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.ts", "import { b } from './b';\n");
    write(root, "src/b.ts", "export const b = 1;\n");
    write(root, "dist/bundle.js", "require('../src/a');\n");
    assert_ok(&repograph(root, &["init", "--project-id", "shop"]));
    dir
}

#[test]
fn register_then_deps_reports_counts() {
    let dir = project();
    let root = dir.path();

    let registered = repograph(root, &["register"]);
    assert_ok(&registered);
    assert!(String::from_utf8_lossy(&registered.stdout).contains("Registered 2 files"));

    let deps = repograph(root, &["deps", "--format", "json"]);
    assert_ok(&deps);
    let summary: serde_json::Value = serde_json::from_slice(&deps.stdout).unwrap();
    assert_eq!(summary["imports"], 1);
    assert_eq!(summary["keyworded_files"], 2);

    let conn = rusqlite::Connection::open(root.join(".repograph/graph.db")).unwrap();
    let edges: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM imports WHERE project_id = 'shop'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(edges, 1);
}

#[test]
fn deps_without_known_files_is_a_clean_zero() {
    let dir = project();
    let deps = repograph(dir.path(), &["deps"]);
    assert_ok(&deps);
    assert!(String::from_utf8_lossy(&deps.stdout).contains("IMPORTS added=0, files keyworded=0"));
}

#[test]
fn missing_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = repograph(dir.path(), &["deps"]);
    assert!(!output.status.success());

    let output = repograph(dir.path(), &["deps", "--config", "nowhere.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere.toml"));
}

#[test]
fn categorize_merges_and_assigns() {
    let dir = project();
    let root = dir.path();
    assert_ok(&repograph(root, &["register"]));

    write(
        root,
        "cats.json",
        r#"[{"name": "Billing", "description": "Invoices", "url": "/billing"}, {"name": ""}]"#,
    );
    write(
        root,
        "assign.json",
        r#"[{"category": "Billing", "path": "src/a.ts", "confidence": 0.9}, {"category": "Billing", "path": "nope.ts"}]"#,
    );
    write(root, "routes.json", r#"["/reports"]"#);

    let output = repograph(
        root,
        &[
            "categorize",
            "--categories-json",
            "cats.json",
            "--assignments-json",
            "assign.json",
            "--auto-categories",
            "--routes",
            "routes.json",
            "--format",
            "json",
        ],
    );
    assert_ok(&output);
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // Reports comes from the route, Billing from the file.
    assert_eq!(summary["categories_total"], 2);
    assert_eq!(summary["categories_created"], 2);
    assert_eq!(summary["assigned"], 1);
}

#[test]
fn categorize_rejects_non_array_input() {
    let dir = project();
    write(dir.path(), "cats.json", r#"{"name": "Billing"}"#);
    let output = repograph(dir.path(), &["categorize", "--categories-json", "cats.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("JSON array"));
}
