//! Edge materialization: scan the working tree and persist import edges and
//! keyword rows for files the graph already knows.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repograph_core::{
    ContentIdentity, ImportEdge, KeywordRow, RepographConfig, RepographError, RunSummary,
};
use repograph_scan::{
    extract_imports, extract_keywords, resolve_import, scan_tree, IgnoreRules, ImportExtraction,
    WorkingFile,
};
use repograph_store::{FileRecord, GraphStore, SqliteStore};
use tracing::{debug, info, Dispatch};

use crate::identity::{GitBlobIdentity, IdentityProvider};

/// Static dependency and keyword extractor for one project's working tree.
///
/// All logging happens under the dispatch handed to [`with_dispatch`]
/// (or the one current at construction).
///
/// [`with_dispatch`]: DependencyDriller::with_dispatch
pub struct DependencyDriller<S = SqliteStore, I = GitBlobIdentity> {
    root: PathBuf,
    project_id: String,
    rules: Arc<IgnoreRules>,
    store: S,
    identity: I,
    dispatch: Dispatch,
}

impl DependencyDriller {
    /// Build a driller from a config file, applying caller overrides.
    ///
    /// # Errors
    ///
    /// Fails if the config is missing or invalid, the repository root does
    /// not exist, or the store cannot be opened.
    pub fn open(
        config_path: &Path,
        project_id: Option<String>,
        ignore_file: Option<PathBuf>,
    ) -> Result<Self, RepographError> {
        let config = RepographConfig::from_file(config_path)?.with_overrides(project_id, ignore_file);
        Self::from_config(&config)
    }

    /// Build a driller backed by the SQLite store and git blob identities.
    ///
    /// # Errors
    ///
    /// Same as [`DependencyDriller::open`], minus config loading.
    pub fn from_config(config: &RepographConfig) -> Result<Self, RepographError> {
        config.check()?;
        let store = SqliteStore::open(&config.store.database, config.store.batch_size)?;
        let root = canonical_root(&config.project.repo)?;
        let identity = GitBlobIdentity::new(&root);
        Self::new(
            root,
            config.project.project_id.clone(),
            config.project.ignore_file.as_deref(),
            store,
            identity,
        )
    }
}

impl<S: GraphStore, I: IdentityProvider> DependencyDriller<S, I> {
    /// Assemble a driller from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the ignore rules cannot be built.
    pub fn new(
        root: impl Into<PathBuf>,
        project_id: impl Into<String>,
        ignore_file: Option<&Path>,
        store: S,
        identity: I,
    ) -> Result<Self, RepographError> {
        let root = root.into();
        let rules = Arc::new(IgnoreRules::build(&root, ignore_file)?);
        Ok(Self {
            root,
            project_id: project_id.into(),
            rules,
            store,
            identity,
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        })
    }

    /// Route this driller's logging to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract static imports and keywords, then persist them.
    ///
    /// Only files whose identity is already known take part, as importer or
    /// target. Edges are deduplicated by endpoint identity. Keyword rows and
    /// edges are each handed to the store in a single batch call.
    ///
    /// # Errors
    ///
    /// Fails only when the store fails. Per-file problems are logged and
    /// skipped.
    pub fn run(&self) -> Result<RunSummary, RepographError> {
        tracing::dispatcher::with_default(&self.dispatch, || self.materialize())
    }

    /// Register every scanned file as a known file and return how many.
    ///
    /// # Errors
    ///
    /// Fails when the store fails.
    pub fn register(&self) -> Result<usize, RepographError> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let files = self.scan();
            let mut records: Vec<FileRecord> = self
                .identities(&files)
                .into_iter()
                .map(|(path, identity)| FileRecord { path, identity })
                .collect();
            records.sort_by(|a, b| a.path.cmp(&b.path));

            if !records.is_empty() {
                self.store.register_files(&records, &self.project_id)?;
            }
            info!(project_id = %self.project_id, files = records.len(), "registered working tree files");
            Ok(records.len())
        })
    }

    fn materialize(&self) -> Result<RunSummary, RepographError> {
        let known = self.store.load_known_files(&self.project_id)?;
        if known.is_empty() {
            info!(project_id = %self.project_id, "no known files for project, nothing to do");
            return Ok(RunSummary::default());
        }

        let files = self.scan();
        if files.is_empty() {
            info!(root = %self.root.display(), "no working tree files found");
            return Ok(RunSummary::default());
        }
        info!(files = files.len(), known = known.len(), "scanned working tree");

        let working_paths: HashSet<String> =
            files.iter().map(|f| f.relative_path.clone()).collect();
        let identities = self.identities(&files);
        let is_known = |path: &str| {
            identities
                .get(path)
                .filter(|id| known.contains_key(&id.merge_hash))
        };

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut edges: Vec<ImportEdge> = Vec::new();
        let mut keyword_rows: Vec<KeywordRow> = Vec::new();

        for file in &files {
            let Some(source) = is_known(&file.relative_path) else {
                continue;
            };

            keyword_rows.push(KeywordRow {
                merge_hash: source.merge_hash.clone(),
                hash: source.hash.clone(),
                keywords: extract_keywords(file),
            });

            let specifiers = match extract_imports(file) {
                ImportExtraction::Found(specifiers) => specifiers,
                ImportExtraction::Skipped(reason) => {
                    debug!(path = %file.relative_path, %reason, "no imports extracted");
                    continue;
                }
            };

            for specifier in specifiers {
                let Some(target_path) = resolve_import(file, &specifier, &working_paths) else {
                    debug!(path = %file.relative_path, %specifier, "unresolved import");
                    continue;
                };
                let Some(target) = is_known(&target_path) else {
                    debug!(path = %file.relative_path, target = %target_path, "import target not known");
                    continue;
                };

                let edge = ImportEdge {
                    src_merge_hash: source.merge_hash.clone(),
                    src_hash: source.hash.clone(),
                    dst_merge_hash: target.merge_hash.clone(),
                    dst_hash: target.hash.clone(),
                };
                let (src, dst) = edge.key();
                if seen.insert((src.to_string(), dst.to_string())) {
                    edges.push(edge);
                }
            }
        }

        if !keyword_rows.is_empty() {
            self.store.set_file_keywords(&keyword_rows, &self.project_id)?;
        }
        if !edges.is_empty() {
            self.store.index_imports(&edges, &self.project_id)?;
        }

        let summary = RunSummary {
            imports: edges.len(),
            keyworded_files: keyword_rows.len(),
        };
        info!(
            imports = summary.imports,
            keyworded_files = summary.keyworded_files,
            "deps run complete"
        );
        Ok(summary)
    }

    fn scan(&self) -> Vec<WorkingFile> {
        scan_tree(&self.root, Arc::clone(&self.rules)).collect()
    }

    /// Identity per scanned path. Files that cannot be hashed are left out.
    fn identities(&self, files: &[WorkingFile]) -> HashMap<String, ContentIdentity> {
        files
            .iter()
            .filter_map(|file| {
                match self.identity.path_hashes(&file.relative_path, &self.project_id) {
                    Ok(identity) => Some((file.relative_path.clone(), identity)),
                    Err(e) => {
                        debug!(path = %file.relative_path, error = %e, "skipping file without identity");
                        None
                    }
                }
            })
            .collect()
    }
}

pub(crate) fn canonical_root(repo: &Path) -> Result<PathBuf, RepographError> {
    std::fs::canonicalize(repo).map_err(|e| {
        RepographError::Config(format!(
            "repository root {} is not accessible: {e}",
            repo.display()
        ))
    })
}
