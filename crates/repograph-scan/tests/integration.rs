//! Integration test: scan → extract → resolve on a small mixed-language repo.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use repograph_scan::{extract_imports, resolve_import, scan_tree, IgnoreRules, WorkingFile};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn make_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "web/src/main.ts",
        "import { render } from './render';\nimport { api } from '../lib/api';\nimport 'react';\n",
    );
    write(root, "web/src/render.tsx", "export const render = () => <div/>;\n");
    write(root, "web/src/render.js", "module.exports = {};\n");
    write(
        root,
        "web/lib/api/index.js",
        "const http = require('./http');\nmodule.exports = { api: http };\n",
    );
    write(root, "web/lib/api/http.cjs", "module.exports = {};\n");
    write(
        root,
        "site/index.php",
        "<?php\nuse App\\Models\\User;\nrequire_once 'inc/header.php';\n",
    );
    write(root, "site/inc/header.php", "<?php echo 'hi';\n");
    write(root, "App/Models/User.php", "<?php class User {}\n");
    write(root, "web/node_modules/react/index.js", "module.exports = {};\n");
    write(root, "web/build/main.js", "require('../src/main');\n");

    dir
}

fn resolve_all(files: &[WorkingFile]) -> HashSet<(String, String)> {
    let known: HashSet<String> = files.iter().map(|f| f.relative_path.clone()).collect();
    let mut edges = HashSet::new();
    for file in files {
        for specifier in extract_imports(file).into_imports() {
            if let Some(target) = resolve_import(file, &specifier, &known) {
                edges.insert((file.relative_path.clone(), target));
            }
        }
    }
    edges
}

#[test]
fn end_to_end_import_resolution() {
    let dir = make_repo();
    let rules = Arc::new(IgnoreRules::build(dir.path(), None).unwrap());
    let files: Vec<WorkingFile> = scan_tree(dir.path(), rules).collect();

    let paths: HashSet<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert!(!paths.contains("web/node_modules/react/index.js"));
    assert!(!paths.contains("web/build/main.js"));
    assert_eq!(paths.len(), 8, "{paths:?}");

    let edges = resolve_all(&files);
    let expected: HashSet<(String, String)> = [
        ("web/src/main.ts", "web/src/render.tsx"),
        ("web/src/main.ts", "web/lib/api/index.js"),
        ("web/lib/api/index.js", "web/lib/api/http.cjs"),
        ("site/index.php", "site/inc/header.php"),
        ("site/index.php", "App/Models/User.php"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();
    assert_eq!(edges, expected);
}

#[test]
fn extra_ignore_file_narrows_the_scan() {
    let dir = make_repo();
    let extra = dir.path().join("scan.ignore");
    fs::write(&extra, "site/\n").unwrap();

    let rules = Arc::new(IgnoreRules::build(dir.path(), Some(&extra)).unwrap());
    let files: Vec<WorkingFile> = scan_tree(dir.path(), rules).collect();
    assert!(files.iter().all(|f| !f.relative_path.starts_with("site/")));
    assert!(files.iter().any(|f| f.relative_path == "App/Models/User.php"));
}

#[test]
fn repeated_scans_are_identical() {
    let dir = make_repo();
    let scan = || {
        let rules = Arc::new(IgnoreRules::build(dir.path(), None).unwrap());
        let files: Vec<WorkingFile> = scan_tree(dir.path(), rules).collect();
        resolve_all(&files)
    };
    assert_eq!(scan(), scan());
}
