use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::ignore_rules::IgnoreRules;

/// File extensions (lowercase, with dot) whose imports can be extracted.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs", ".php"];

/// A scanned, non-ignored source file with a supported extension.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use repograph_scan::walker::WorkingFile;
///
/// let file = WorkingFile::new(PathBuf::from("/repo"), "src/app.TS");
/// assert_eq!(file.relative_path, "src/app.TS");
/// assert_eq!(file.extension, ".ts");
/// assert_eq!(file.absolute_path, PathBuf::from("/repo/src/app.TS"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingFile {
    /// `/`-separated path relative to the repository root.
    pub relative_path: String,
    /// Location on disk.
    pub absolute_path: PathBuf,
    /// Lowercased extension including the leading dot, or empty.
    pub extension: String,
}

impl WorkingFile {
    /// Describe the file at `relative_path` under `root`.
    pub fn new(root: PathBuf, relative_path: &str) -> Self {
        let absolute_path = relative_path
            .split('/')
            .fold(root, |acc, part| acc.join(part));
        Self {
            relative_path: relative_path.to_string(),
            absolute_path,
            extension: extension_of(relative_path),
        }
    }
}

/// Lowercased final extension of `path` with its leading dot, or `""`.
///
/// # Examples
///
/// ```
/// use repograph_scan::walker::extension_of;
///
/// assert_eq!(extension_of("lib/Util.PHP"), ".php");
/// assert_eq!(extension_of("Makefile"), "");
/// assert_eq!(extension_of(".eslintrc"), "");
/// ```
pub fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Whether `extension` (as returned by [`extension_of`]) is supported.
pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// Walk the working tree at `root`, yielding supported files lazily.
///
/// Directories matched by `rules` are pruned and never descended into, unless
/// a `!` rule could re-include something below them. Files are matched by the
/// same rules using their `/`-separated relative path.
/// Hidden files are not skipped unless a rule excludes them. The yield order
/// follows directory traversal and carries no meaning.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use repograph_scan::ignore_rules::IgnoreRules;
/// use repograph_scan::walker::scan_tree;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.ts"), "import './b';").unwrap();
/// std::fs::write(dir.path().join("notes.md"), "# notes").unwrap();
///
/// let rules = Arc::new(IgnoreRules::build(dir.path(), None).unwrap());
/// let files: Vec<_> = scan_tree(dir.path(), rules).collect();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].relative_path, "a.ts");
/// ```
pub fn scan_tree(root: &Path, rules: Arc<IgnoreRules>) -> impl Iterator<Item = WorkingFile> {
    let prune_root = root.to_path_buf();
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(relative) = relative_slash_path(&prune_root, entry.path()) else {
                return false;
            };
            let relative = Path::new(&relative);
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !rules.is_ignored(relative, is_dir) {
                return true;
            }
            is_dir && rules.may_reinclude_under(relative)
        })
        .build();

    let root = root.to_path_buf();
    walker.filter_map(move |entry| {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                return None;
            }
        };
        if !entry.file_type()?.is_file() {
            return None;
        }

        let relative = relative_slash_path(&root, entry.path())?;
        let extension = extension_of(&relative);
        if !is_supported_extension(&extension) {
            return None;
        }

        Some(WorkingFile {
            relative_path: relative,
            absolute_path: entry.path().to_path_buf(),
            extension,
        })
    })
}

/// `/`-joined path of `path` relative to `root`, independent of platform separators.
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
