//! Maps raw import specifiers to repository-relative paths.
//!
//! Resolution is purely lexical against the set of scanned paths: no package
//! manager lookup, no path aliases, no filesystem access.

use std::collections::HashSet;
use std::path::Path;

use crate::walker::{extension_of, is_supported_extension, WorkingFile};

/// Extension resolution order for extensionless specifiers. TypeScript wins over
/// JavaScript when both exist.
pub const RESOLUTION_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".php"];

/// Resolve `specifier`, imported by `importer`, to a path in `known_paths`.
///
/// Returns `None` when the specifier does not point at a scanned file of this
/// repository; an unresolved specifier is not an error.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use std::path::PathBuf;
/// use repograph_scan::resolver::resolve_import;
/// use repograph_scan::walker::WorkingFile;
///
/// let known: HashSet<String> = ["src/a.ts", "src/b.ts", "src/b.js"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let importer = WorkingFile::new(PathBuf::from("/repo"), "src/a.ts");
///
/// assert_eq!(resolve_import(&importer, "./b", &known).as_deref(), Some("src/b.ts"));
/// assert_eq!(resolve_import(&importer, "react", &known), None);
/// ```
pub fn resolve_import(
    importer: &WorkingFile,
    specifier: &str,
    known_paths: &HashSet<String>,
) -> Option<String> {
    if specifier.is_empty() || specifier.starts_with("http://") || specifier.starts_with("https://")
    {
        return None;
    }

    let cleaned = specifier.trim().trim_matches(|c| c == '"' || c == '\'');
    if cleaned.is_empty() {
        return None;
    }

    if importer.extension == ".php" && cleaned.contains('\\') && !looks_like_path(cleaned) {
        if let Some(found) = resolve_php_namespace(cleaned, known_paths) {
            return Some(found);
        }
    }

    let base = match cleaned.strip_prefix('/') {
        Some(from_root) => normalize(from_root)?,
        None => {
            let importer_dir = Path::new(&importer.relative_path)
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            normalize(&format!("{importer_dir}/{cleaned}"))?
        }
    };

    candidate_paths(&base)
        .into_iter()
        .find(|candidate| known_paths.contains(candidate))
}

/// Candidate files for a base path, in priority order.
///
/// A base path that already has a supported extension is its own only
/// candidate. Otherwise every [`RESOLUTION_EXTENSIONS`] entry is tried as a
/// suffix, then as a directory `index` file. Any other suffix counts as part
/// of the name, so `ui/styles.css` and `app.component` are extended like
/// bare names and never match themselves.
///
/// # Examples
///
/// ```
/// use repograph_scan::resolver::candidate_paths;
///
/// assert_eq!(candidate_paths("lib/util.js"), vec!["lib/util.js"]);
///
/// let styles = candidate_paths("ui/styles.css");
/// assert_eq!(styles.len(), 14);
/// assert_eq!(styles[0], "ui/styles.css.ts");
/// assert!(!styles.contains(&"ui/styles.css".to_string()));
///
/// let candidates = candidate_paths("lib/util");
/// assert_eq!(candidates.len(), 14);
/// assert_eq!(candidates[0], "lib/util.ts");
/// assert_eq!(candidates[7], "lib/util/index.ts");
/// ```
pub fn candidate_paths(base: &str) -> Vec<String> {
    if is_supported_extension(&extension_of(base)) {
        return vec![base.to_string()];
    }
    let mut candidates: Vec<String> = RESOLUTION_EXTENSIONS
        .iter()
        .map(|ext| format!("{base}{ext}"))
        .collect();
    candidates.extend(
        RESOLUTION_EXTENSIONS
            .iter()
            .map(|ext| format!("{base}/index{ext}")),
    );
    candidates
}

fn looks_like_path(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with('/')
}

/// Map `App\Models\User` to `App/Models/User.php` or `App/Models/User/index.php`.
fn resolve_php_namespace(specifier: &str, known_paths: &HashSet<String>) -> Option<String> {
    let as_path = specifier.trim_start_matches('\\').replace('\\', "/");
    let base = normalize(&as_path)?;
    let file = Path::new(&base)
        .with_extension("php")
        .to_string_lossy()
        .into_owned();
    let index = format!("{base}/index.php");
    [file, index]
        .into_iter()
        .find(|candidate| known_paths.contains(candidate))
}

/// Collapse `.` and `..` segments and duplicate separators.
///
/// Returns `None` for an empty result or a path that climbs above the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
