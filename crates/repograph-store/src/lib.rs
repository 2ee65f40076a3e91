//! Batch persistence for the repository knowledge graph.
//!
//! The dependency and category drivers talk to the graph through the
//! [`GraphStore`] trait: a handful of idempotent, project-scoped batch
//! upserts. [`SqliteStore`] is the bundled implementation.

pub mod sqlite;

use std::collections::HashMap;

use repograph_core::{
    CategorySpec, ContentIdentity, FileCategoryRow, ImportEdge, KeywordRow, RepographError,
};

pub use sqlite::SqliteStore;

/// A file node as registered by the history phase.
///
/// # Examples
///
/// ```
/// use repograph_core::ContentIdentity;
/// use repograph_store::FileRecord;
///
/// let record = FileRecord {
///     path: "src/app.ts".into(),
///     identity: ContentIdentity { merge_hash: "m".into(), hash: "h".into() },
/// };
/// assert_eq!(record.identity.merge_hash, "m");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Repository-relative path at registration time.
    pub path: String,
    pub identity: ContentIdentity,
}

/// Project-scoped batch operations on the graph store.
///
/// Every write is an idempotent merge: repeating a call with the same rows
/// leaves the store unchanged.
pub trait GraphStore {
    /// Known files of a project as `merge_hash -> hash`.
    fn load_known_files(&self, project_id: &str) -> Result<HashMap<String, String>, RepographError>;

    /// Register file nodes, replacing the content hash of existing ones.
    fn register_files(&self, files: &[FileRecord], project_id: &str) -> Result<(), RepographError>;

    /// Replace the keyword list of each row's file.
    fn set_file_keywords(&self, rows: &[KeywordRow], project_id: &str) -> Result<(), RepographError>;

    /// Merge import edges keyed by `(src_merge_hash, dst_merge_hash)`.
    fn index_imports(&self, edges: &[ImportEdge], project_id: &str) -> Result<(), RepographError>;

    /// Merge category nodes keyed by name.
    fn index_categories(
        &self,
        categories: &[CategorySpec],
        project_id: &str,
    ) -> Result<(), RepographError>;

    /// Existing categories of a project as `name -> url`.
    fn existing_categories(&self, project_id: &str)
        -> Result<HashMap<String, String>, RepographError>;

    /// Merge file-to-category assignments. Categories live under
    /// `category_project_id`, which may differ from the files' project.
    fn index_file_categories(
        &self,
        rows: &[FileCategoryRow],
        project_id: &str,
        category_project_id: &str,
    ) -> Result<(), RepographError>;
}
