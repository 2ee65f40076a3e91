use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content identity of a repository file, as produced by the hashing collaborator.
///
/// `merge_hash` is stable across content changes and is the join key for all
/// graph operations; `hash` identifies one specific content revision.
///
/// # Examples
///
/// ```
/// use repograph_core::ContentIdentity;
///
/// let id = ContentIdentity {
///     merge_hash: "m1".into(),
///     hash: "h1".into(),
/// };
/// assert_eq!(id.merge_hash, "m1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    /// Path-stable identity.
    pub merge_hash: String,
    /// Content revision identity.
    pub hash: String,
}

/// A directed static import from one known file to another.
///
/// # Examples
///
/// ```
/// use repograph_core::ImportEdge;
///
/// let edge = ImportEdge {
///     src_merge_hash: "a".into(),
///     src_hash: "a1".into(),
///     dst_merge_hash: "b".into(),
///     dst_hash: "b1".into(),
/// };
/// assert_eq!(edge.key(), ("a", "b"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportEdge {
    pub src_merge_hash: String,
    pub src_hash: String,
    pub dst_merge_hash: String,
    pub dst_hash: String,
}

impl ImportEdge {
    /// Deduplication key: the two endpoints' stable identities.
    pub fn key(&self) -> (&str, &str) {
        (&self.src_merge_hash, &self.dst_merge_hash)
    }
}

/// Topical keywords for one known file.
///
/// # Examples
///
/// ```
/// use repograph_core::KeywordRow;
///
/// let row = KeywordRow {
///     merge_hash: "m".into(),
///     hash: "h".into(),
///     keywords: vec!["checkout".into(), "cart".into()],
/// };
/// assert_eq!(row.keywords.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub merge_hash: String,
    pub hash: String,
    /// Ordered, deduplicated, lowercase; at most 20 entries.
    pub keywords: Vec<String>,
}

/// Counts reported by a dependency run.
///
/// # Examples
///
/// ```
/// use repograph_core::RunSummary;
///
/// let summary = RunSummary::default();
/// assert_eq!(summary.imports, 0);
/// assert_eq!(summary.keyworded_files, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of deduplicated import edges persisted.
    pub imports: usize,
    /// Number of keyword rows persisted.
    pub keyworded_files: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IMPORTS added={}, files keyworded={}",
            self.imports, self.keyworded_files
        )
    }
}

/// A repository category definition.
///
/// # Examples
///
/// ```
/// use repograph_core::CategorySpec;
///
/// let spec: CategorySpec = serde_json::from_str(r#"{"name": "Billing"}"#).unwrap();
/// assert_eq!(spec.name, "Billing");
/// assert!(spec.url.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

impl CategorySpec {
    /// A category with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A request to place one file in a category.
///
/// The file is identified either directly by `merge_hash` (and optionally
/// `hash`) or by its repository-relative `path`.
///
/// # Examples
///
/// ```
/// use repograph_core::FileCategoryAssignment;
///
/// let a: FileCategoryAssignment =
///     serde_json::from_str(r#"{"category": "Billing", "path": "src/cart.ts"}"#).unwrap();
/// assert_eq!(a.path.as_deref(), Some("src/cart.ts"));
/// assert!(a.merge_hash.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileCategoryAssignment {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub merge_hash: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// An assignment resolved to a known file identity, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCategoryRow {
    pub merge_hash: String,
    pub hash: Option<String>,
    pub category: String,
    pub confidence: Option<f64>,
}

/// Counts reported by a categorization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub categories_total: usize,
    pub categories_created: usize,
    pub assigned: usize,
}

/// Output format for command results.
///
/// # Examples
///
/// ```
/// use repograph_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary lines.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
