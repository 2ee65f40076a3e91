//! Integration tests: working tree → known files → persisted edges and keywords.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use repograph_core::{ContentIdentity, RepographError, RunSummary};
use repograph_deps::{DependencyDriller, GitBlobIdentity, IdentityProvider};
use repograph_store::{FileRecord, GraphStore, SqliteStore};

const PID: &str = "shop";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn driller(root: &Path) -> DependencyDriller<SqliteStore, GitBlobIdentity> {
    DependencyDriller::new(
        root,
        PID,
        None,
        SqliteStore::in_memory(100).unwrap(),
        GitBlobIdentity::new(root),
    )
    .unwrap()
}

fn identity(root: &Path, rel: &str) -> ContentIdentity {
    GitBlobIdentity::new(root).path_hashes(rel, PID).unwrap()
}

/// Mark only `paths` as known.
fn register_only<I: IdentityProvider>(d: &DependencyDriller<SqliteStore, I>, root: &Path, paths: &[&str]) {
    let records: Vec<FileRecord> = paths
        .iter()
        .map(|p| FileRecord {
            path: p.to_string(),
            identity: identity(root, p),
        })
        .collect();
    d.store().register_files(&records, PID).unwrap();
}

#[test]
fn two_file_example() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import { b } from './b';\nexport const a = b;\n");
    write(root, "b.ts", "export const b = 1;\n");

    let d = driller(root);
    register_only(&d, root, &["a.ts", "b.ts"]);

    let summary = d.run().unwrap();
    assert_eq!(
        summary,
        RunSummary {
            imports: 1,
            keyworded_files: 2
        }
    );

    let a = identity(root, "a.ts");
    let b = identity(root, "b.ts");
    let edges = d.store().imports_for(PID).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].src_merge_hash, a.merge_hash);
    assert_eq!(edges[0].src_hash, a.hash);
    assert_eq!(edges[0].dst_merge_hash, b.merge_hash);
    assert_eq!(edges[0].dst_hash, b.hash);

    let rows = d.store().keywords_for(PID).unwrap();
    assert_eq!(rows.len(), 2);
    let row_a = rows.iter().find(|r| r.merge_hash == a.merge_hash).unwrap();
    let row_b = rows.iter().find(|r| r.merge_hash == b.merge_hash).unwrap();
    assert!(row_a.keywords.contains(&"a".to_string()));
    assert!(row_b.keywords.contains(&"b".to_string()));
}

#[test]
fn repeated_imports_make_one_edge() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "main.ts",
        "import x from './util';\nimport { y } from './util';\nimport './util.ts';\n",
    );
    write(root, "util.ts", "export default 1; export const y = 2;\n");

    let d = driller(root);
    d.register().unwrap();
    assert_eq!(d.run().unwrap().imports, 1);
    assert_eq!(d.store().imports_for(PID).unwrap().len(), 1);
}

#[test]
fn ts_wins_over_js() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "main.ts", "import { foo } from './foo';\n");
    write(root, "foo.ts", "export const foo = 1;\n");
    write(root, "foo.js", "exports.foo = 1;\n");

    let d = driller(root);
    d.register().unwrap();
    d.run().unwrap();

    let edges = d.store().imports_for(PID).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].dst_merge_hash, identity(root, "foo.ts").merge_hash);
}

#[test]
fn ignored_directories_never_appear() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "main.js", "const dep = require('./node_modules/dep/index.js');\n");
    write(root, "node_modules/dep/index.js", "module.exports = 1;\n");

    let d = driller(root);
    // Known to the graph, but excluded from the scan.
    register_only(&d, root, &["main.js", "node_modules/dep/index.js"]);

    let summary = d.run().unwrap();
    assert_eq!(summary.imports, 0);
    assert_eq!(summary.keyworded_files, 1);
    let hidden = identity(root, "node_modules/dep/index.js");
    assert!(d
        .store()
        .keywords_for(PID)
        .unwrap()
        .iter()
        .all(|row| row.merge_hash != hidden.merge_hash));
}

#[test]
fn unknown_target_is_dropped_silently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import './b';\n");
    write(root, "b.ts", "export {};\n");

    let d = driller(root);
    register_only(&d, root, &["a.ts"]);

    let summary = d.run().unwrap();
    assert_eq!(summary.imports, 0);
    assert_eq!(summary.keyworded_files, 1);
}

#[test]
fn unknown_importer_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import './b';\n");
    write(root, "b.ts", "export {};\n");

    let d = driller(root);
    register_only(&d, root, &["b.ts"]);

    let summary = d.run().unwrap();
    assert_eq!(summary.imports, 0);
    assert_eq!(summary.keyworded_files, 1);
}

#[test]
fn unparseable_file_still_gets_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("blob.js"), [0xff, 0xfe, 0x00, 0x01]).unwrap();
    write(root, "ok.ts", "import './blob';\n");

    let d = driller(root);
    d.register().unwrap();
    let summary = d.run().unwrap();
    assert_eq!(summary.keyworded_files, 2);
    assert_eq!(summary.imports, 1);
}

#[test]
fn second_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "web/app.ts", "import { api } from './api';\nimport '../lib/log';\n");
    write(root, "web/api/index.ts", "export const api = 1;\n");
    write(root, "lib/log.js", "module.exports = console.log;\n");
    write(
        root,
        "site/page.php",
        "<?php\nrequire_once('partials/head.php');\n",
    );
    write(root, "site/partials/head.php", "<?php\n");

    let d = driller(root);
    d.register().unwrap();

    let first = d.run().unwrap();
    let edges = d.store().imports_for(PID).unwrap();
    let keywords = d.store().keywords_for(PID).unwrap();

    let second = d.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.imports, 3);
    assert_eq!(d.store().imports_for(PID).unwrap(), edges);
    assert_eq!(d.store().keywords_for(PID).unwrap(), keywords);
}

#[test]
fn empty_known_set_reports_zero() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ts", "import './b';\n");
    write(dir.path(), "b.ts", "");

    let d = driller(dir.path());
    assert_eq!(d.run().unwrap(), RunSummary::default());
    assert!(d.store().imports_for(PID).unwrap().is_empty());
}

/// Fails for one path, delegates the rest.
struct FlakyIdentity {
    inner: GitBlobIdentity,
    broken: &'static str,
}

impl IdentityProvider for FlakyIdentity {
    fn path_hashes(
        &self,
        relative_path: &str,
        project_id: &str,
    ) -> Result<ContentIdentity, RepographError> {
        if relative_path == self.broken {
            return Err(RepographError::Git("object database unavailable".into()));
        }
        self.inner.path_hashes(relative_path, project_id)
    }
}

#[test]
fn identity_failure_skips_only_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import './b';\nimport './c';\n");
    write(root, "b.ts", "");
    write(root, "c.ts", "");

    let d = DependencyDriller::new(
        root,
        PID,
        None,
        SqliteStore::in_memory(100).unwrap(),
        FlakyIdentity {
            inner: GitBlobIdentity::new(root),
            broken: "c.ts",
        },
    )
    .unwrap();
    register_only(&d, root, &["a.ts", "b.ts", "c.ts"]);

    let summary = d.run().unwrap();
    assert_eq!(summary.imports, 1);
    assert_eq!(summary.keyworded_files, 2);
}

#[test]
fn extra_ignore_file_applies() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import './gen/b';\n");
    write(root, "gen/b.ts", "");
    let extra = root.join("repograph.ignore");
    fs::write(&extra, "gen/\n").unwrap();

    let d = DependencyDriller::new(
        root,
        PID,
        Some(&extra),
        SqliteStore::in_memory(100).unwrap(),
        GitBlobIdentity::new(root),
    )
    .unwrap();
    assert_eq!(d.register().unwrap(), 1);
    assert_eq!(d.run().unwrap().imports, 0);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn logs_go_to_the_injected_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import './missing';\n");

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let d = driller(root).with_dispatch(tracing::Dispatch::new(subscriber));
    d.register().unwrap();
    d.run().unwrap();

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("registered working tree files"), "{output}");
    assert!(output.contains("unresolved import"), "{output}");
    assert!(output.contains("deps run complete"), "{output}");
}

#[test]
fn open_reads_config_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    write(base, "repo/a.ts", "import './b';\n");
    write(base, "repo/b.ts", "");
    write(
        base,
        "repograph.toml",
        "[store]\ndatabase = \"state/graph.db\"\n\n[project]\nrepo = \"repo\"\nproject_id = \"configured\"\n",
    );

    let config = base.join("repograph.toml");
    let d = DependencyDriller::open(&config, Some(PID.to_string()), None).unwrap();
    assert_eq!(d.project_id(), PID);
    assert_eq!(d.register().unwrap(), 2);
    assert_eq!(d.run().unwrap().imports, 1);
    assert!(base.join("state/graph.db").is_file());
}

#[test]
fn open_without_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = DependencyDriller::open(&dir.path().join("absent.toml"), None, None)
        .err()
        .unwrap();
    assert!(matches!(err, RepographError::FileNotFound(_)));
}
