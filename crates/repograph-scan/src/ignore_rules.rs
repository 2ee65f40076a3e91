use std::path::{Component, Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use repograph_core::RepographError;
use tracing::{debug, warn};

/// Directory names excluded from every scan, before any ignore file is read.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "node_modules",
    "dist",
    "build",
    "__pycache__",
    ".cache",
];

/// Compiled path-exclusion predicate for one repository.
///
/// Rules come from three ordered sources: [`DEFAULT_IGNORES`], the
/// repository's root `.gitignore`, and an optional extra ignore file. Matching
/// follows gitignore semantics, so later rules win and `!` re-includes.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use repograph_scan::ignore_rules::IgnoreRules;
///
/// let dir = tempfile::tempdir().unwrap();
/// let rules = IgnoreRules::build(dir.path(), None).unwrap();
/// assert!(rules.is_ignored(Path::new("node_modules"), true));
/// assert!(rules.is_ignored(Path::new("web/node_modules/react/index.js"), false));
/// assert!(!rules.is_ignored(Path::new("src/app.ts"), false));
/// ```
pub struct IgnoreRules {
    matcher: Gitignore,
    /// `!` patterns with the `!` removed, in file order.
    reincludes: Vec<String>,
}

impl IgnoreRules {
    /// Build the rule set for the repository at `root`.
    ///
    /// A missing `.gitignore` or extra file is not an error. Lines that fail to
    /// compile are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Ignore`] if the final matcher cannot be built,
    /// or [`RepographError::Io`] if an existing ignore file cannot be read.
    pub fn build(root: &Path, extra_ignore_file: Option<&Path>) -> Result<Self, RepographError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut reincludes = Vec::new();

        for name in DEFAULT_IGNORES {
            builder
                .add_line(None, &format!("{name}/"))
                .map_err(|e| RepographError::Ignore(e.to_string()))?;
        }
        for name in DEFAULT_IGNORES {
            builder
                .add_line(None, name)
                .map_err(|e| RepographError::Ignore(e.to_string()))?;
        }

        let gitignore = root.join(".gitignore");
        if gitignore.is_file() {
            add_file(&mut builder, &gitignore, &mut reincludes)?;
        }
        if let Some(extra) = extra_ignore_file {
            if extra.is_file() {
                add_file(&mut builder, extra, &mut reincludes)?;
            } else {
                debug!(path = %extra.display(), "extra ignore file not found, skipping");
            }
        }

        let matcher = builder
            .build()
            .map_err(|e| RepographError::Ignore(e.to_string()))?;
        Ok(Self {
            matcher,
            reincludes,
        })
    }

    /// Whether `relative_path` (relative to the repository root) is excluded.
    ///
    /// A path is excluded when it, or any of its parent directories, matches.
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        if relative_path.as_os_str().is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    /// Whether some `!` pattern could re-include a path below the directory
    /// `relative_dir`.
    ///
    /// An ignored directory must still be descended into when this holds,
    /// otherwise re-included files inside it are never seen. Patterns without
    /// an inner `/` match at any depth, and glob segments are assumed to match.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use repograph_scan::ignore_rules::IgnoreRules;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// std::fs::write(dir.path().join(".gitignore"), "generated/\n!generated/keep.ts\n").unwrap();
    /// let rules = IgnoreRules::build(dir.path(), None).unwrap();
    /// assert!(rules.may_reinclude_under(Path::new("generated")));
    /// assert!(!rules.may_reinclude_under(Path::new("vendor")));
    /// ```
    pub fn may_reinclude_under(&self, relative_dir: &Path) -> bool {
        let dir: Vec<String> = relative_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        self.reincludes
            .iter()
            .any(|pattern| pattern_may_reach(pattern, &dir))
    }
}

/// Whether `pattern` could match something at or below the directory `dir`.
fn pattern_may_reach(pattern: &str, dir: &[String]) -> bool {
    let pattern = pattern.trim_end_matches('/');
    let anchored = pattern.trim_start_matches('/');
    if !anchored.contains('/') && !pattern.starts_with('/') {
        return true;
    }
    for (segment, part) in anchored.split('/').zip(dir) {
        if segment.contains(['*', '?', '[']) {
            return true;
        }
        if segment != part {
            return false;
        }
    }
    true
}

/// Read an ignore file line by line, substituting undecodable bytes.
///
/// Accepted `!` patterns are appended to `reincludes`.
fn add_file(
    builder: &mut GitignoreBuilder,
    path: &Path,
    reincludes: &mut Vec<String>,
) -> Result<(), RepographError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let from = Some(PathBuf::from(path));
    for line in text.lines() {
        if let Err(e) = builder.add_line(from.clone(), line) {
            warn!(path = %path.display(), line, error = %e, "skipping invalid ignore pattern");
            continue;
        }
        if let Some(pattern) = line.strip_prefix('!') {
            let pattern = pattern.trim_end();
            if !pattern.is_empty() {
                reincludes.push(pattern.to_string());
            }
        }
    }
    Ok(())
}
