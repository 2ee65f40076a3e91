//! SQLite implementation of the graph store.
//!
//! File nodes, keyword lists, import edges, and categories live in plain
//! tables keyed by project. Writes are chunked into transactions of
//! `batch_size` rows.

use std::collections::HashMap;
use std::path::Path;

use repograph_core::{CategorySpec, FileCategoryRow, ImportEdge, KeywordRow, RepographError};
use rusqlite::{params, Connection, Statement};
use tracing::debug;

use crate::{FileRecord, GraphStore};

/// SQLite-backed [`GraphStore`].
///
/// # Examples
///
/// ```
/// use repograph_store::{GraphStore, SqliteStore};
///
/// let store = SqliteStore::in_memory(100).unwrap();
/// assert!(store.load_known_files("shop").unwrap().is_empty());
/// ```
pub struct SqliteStore {
    conn: Connection,
    batch_size: usize,
}

impl SqliteStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates the parent directory and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Database`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use repograph_store::SqliteStore;
    ///
    /// let store = SqliteStore::open(Path::new(".repograph/graph.db"), 100).unwrap();
    /// ```
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, RepographError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RepographError::Database(format!("failed to create store directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| RepographError::Database(format!("failed to open database: {e}")))?;

        let store = Self {
            conn,
            batch_size: batch_size.max(1),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Database`] if schema creation fails.
    pub fn in_memory(batch_size: usize) -> Result<Self, RepographError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            RepographError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self {
            conn,
            batch_size: batch_size.max(1),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), RepographError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS files (
                    project_id TEXT NOT NULL,
                    merge_hash TEXT NOT NULL,
                    hash TEXT NOT NULL,
                    path TEXT,
                    PRIMARY KEY (project_id, merge_hash)
                );

                CREATE TABLE IF NOT EXISTS file_keywords (
                    project_id TEXT NOT NULL,
                    merge_hash TEXT NOT NULL,
                    hash TEXT NOT NULL,
                    keywords TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (project_id, merge_hash)
                );

                CREATE TABLE IF NOT EXISTS imports (
                    project_id TEXT NOT NULL,
                    src_merge_hash TEXT NOT NULL,
                    src_hash TEXT NOT NULL,
                    dst_merge_hash TEXT NOT NULL,
                    dst_hash TEXT NOT NULL,
                    PRIMARY KEY (project_id, src_merge_hash, dst_merge_hash)
                );

                CREATE TABLE IF NOT EXISTS repo_categories (
                    project_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    url TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (project_id, name)
                );

                CREATE TABLE IF NOT EXISTS file_categories (
                    project_id TEXT NOT NULL,
                    merge_hash TEXT NOT NULL,
                    hash TEXT,
                    category_project_id TEXT NOT NULL,
                    category TEXT NOT NULL,
                    confidence REAL,
                    PRIMARY KEY (project_id, merge_hash, category_project_id, category)
                );

                CREATE INDEX IF NOT EXISTS idx_imports_dst
                    ON imports(project_id, dst_merge_hash);
                ",
            )
            .map_err(|e| RepographError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Run `bind` for every row, committing one transaction per batch.
    fn write_batches<T>(
        &self,
        what: &str,
        sql: &str,
        rows: &[T],
        mut bind: impl FnMut(&mut Statement<'_>, &T) -> Result<(), RepographError>,
    ) -> Result<(), RepographError> {
        for (batch, chunk) in rows.chunks(self.batch_size).enumerate() {
            let tx = self.conn.unchecked_transaction().map_err(|e| {
                RepographError::Database(format!("failed to begin {what} batch: {e}"))
            })?;
            {
                let mut stmt = tx.prepare_cached(sql).map_err(|e| {
                    RepographError::Database(format!("failed to prepare {what} upsert: {e}"))
                })?;
                for row in chunk {
                    bind(&mut stmt, row)?;
                }
            }
            tx.commit().map_err(|e| {
                RepographError::Database(format!("failed to commit {what} batch: {e}"))
            })?;
            debug!(what, batch, rows = chunk.len(), "batch written");
        }
        Ok(())
    }

    /// All import edges of a project, ordered by endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Database`] on query failure.
    pub fn imports_for(&self, project_id: &str) -> Result<Vec<ImportEdge>, RepographError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT src_merge_hash, src_hash, dst_merge_hash, dst_hash FROM imports
                 WHERE project_id = ?1 ORDER BY src_merge_hash, dst_merge_hash",
            )
            .map_err(|e| RepographError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok(ImportEdge {
                    src_merge_hash: row.get(0)?,
                    src_hash: row.get(1)?,
                    dst_merge_hash: row.get(2)?,
                    dst_hash: row.get(3)?,
                })
            })
            .map_err(|e| RepographError::Database(format!("failed to query imports: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepographError::Database(format!("failed to read import row: {e}")))
    }

    /// All keyword rows of a project, ordered by `merge_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Database`] on query failure, or
    /// [`RepographError::Serialization`] if a stored keyword list is corrupt.
    pub fn keywords_for(&self, project_id: &str) -> Result<Vec<KeywordRow>, RepographError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT merge_hash, hash, keywords FROM file_keywords
                 WHERE project_id = ?1 ORDER BY merge_hash",
            )
            .map_err(|e| RepographError::Database(format!("failed to prepare query: {e}")))?;
        let raw = stmt
            .query_map(params![project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| RepographError::Database(format!("failed to query keywords: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepographError::Database(format!("failed to read keyword row: {e}")))?;

        raw.into_iter()
            .map(|(merge_hash, hash, keywords)| -> Result<KeywordRow, RepographError> {
                Ok(KeywordRow {
                    merge_hash,
                    hash,
                    keywords: serde_json::from_str(&keywords)?,
                })
            })
            .collect()
    }

    /// File-category assignments of a project, ordered by file then category.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Database`] on query failure.
    pub fn file_categories_for(
        &self,
        project_id: &str,
    ) -> Result<Vec<FileCategoryRow>, RepographError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT merge_hash, hash, category, confidence FROM file_categories
                 WHERE project_id = ?1 ORDER BY merge_hash, category",
            )
            .map_err(|e| RepographError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok(FileCategoryRow {
                    merge_hash: row.get(0)?,
                    hash: row.get(1)?,
                    category: row.get(2)?,
                    confidence: row.get(3)?,
                })
            })
            .map_err(|e| {
                RepographError::Database(format!("failed to query file categories: {e}"))
            })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(|e| {
            RepographError::Database(format!("failed to read file category row: {e}"))
        })
    }
}

impl GraphStore for SqliteStore {
    fn load_known_files(&self, project_id: &str) -> Result<HashMap<String, String>, RepographError> {
        let mut stmt = self
            .conn
            .prepare("SELECT merge_hash, hash FROM files WHERE project_id = ?1")
            .map_err(|e| RepographError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| RepographError::Database(format!("failed to query files: {e}")))?;

        let mut known = HashMap::new();
        for row in rows {
            let (merge_hash, hash) =
                row.map_err(|e| RepographError::Database(format!("failed to read file row: {e}")))?;
            if !merge_hash.is_empty() {
                known.insert(merge_hash, hash);
            }
        }
        Ok(known)
    }

    fn register_files(&self, files: &[FileRecord], project_id: &str) -> Result<(), RepographError> {
        self.write_batches(
            "file",
            "INSERT INTO files (project_id, merge_hash, hash, path) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, merge_hash) DO UPDATE SET hash = excluded.hash, path = excluded.path",
            files,
            |stmt, file| {
                stmt.execute(params![
                    project_id,
                    file.identity.merge_hash,
                    file.identity.hash,
                    file.path
                ])
                .map_err(|e| RepographError::Database(format!("failed to register file: {e}")))?;
                Ok(())
            },
        )
    }

    fn set_file_keywords(&self, rows: &[KeywordRow], project_id: &str) -> Result<(), RepographError> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.write_batches(
            "keyword",
            "INSERT INTO file_keywords (project_id, merge_hash, hash, keywords, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(project_id, merge_hash) DO UPDATE SET
                 hash = excluded.hash, keywords = excluded.keywords, updated_at = excluded.updated_at",
            rows,
            |stmt, row| {
                let keywords = serde_json::to_string(&row.keywords)?;
                stmt.execute(params![project_id, row.merge_hash, row.hash, keywords, updated_at])
                    .map_err(|e| {
                        RepographError::Database(format!("failed to upsert keywords: {e}"))
                    })?;
                Ok(())
            },
        )
    }

    fn index_imports(&self, edges: &[ImportEdge], project_id: &str) -> Result<(), RepographError> {
        self.write_batches(
            "import",
            "INSERT INTO imports (project_id, src_merge_hash, src_hash, dst_merge_hash, dst_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(project_id, src_merge_hash, dst_merge_hash) DO UPDATE SET
                 src_hash = excluded.src_hash, dst_hash = excluded.dst_hash",
            edges,
            |stmt, edge| {
                stmt.execute(params![
                    project_id,
                    edge.src_merge_hash,
                    edge.src_hash,
                    edge.dst_merge_hash,
                    edge.dst_hash
                ])
                .map_err(|e| RepographError::Database(format!("failed to upsert import: {e}")))?;
                Ok(())
            },
        )
    }

    fn index_categories(
        &self,
        categories: &[CategorySpec],
        project_id: &str,
    ) -> Result<(), RepographError> {
        self.write_batches(
            "category",
            "INSERT INTO repo_categories (project_id, name, description, url) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, name) DO UPDATE SET
                 description = excluded.description, url = excluded.url",
            categories,
            |stmt, category| {
                stmt.execute(params![
                    project_id,
                    category.name,
                    category.description,
                    category.url
                ])
                .map_err(|e| {
                    RepographError::Database(format!("failed to upsert category: {e}"))
                })?;
                Ok(())
            },
        )
    }

    fn existing_categories(
        &self,
        project_id: &str,
    ) -> Result<HashMap<String, String>, RepographError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, url FROM repo_categories WHERE project_id = ?1")
            .map_err(|e| RepographError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| RepographError::Database(format!("failed to query categories: {e}")))?;

        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| RepographError::Database(format!("failed to read category row: {e}")))
    }

    fn index_file_categories(
        &self,
        rows: &[FileCategoryRow],
        project_id: &str,
        category_project_id: &str,
    ) -> Result<(), RepographError> {
        self.write_batches(
            "file category",
            "INSERT INTO file_categories
                 (project_id, merge_hash, hash, category_project_id, category, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(project_id, merge_hash, category_project_id, category) DO UPDATE SET
                 hash = excluded.hash, confidence = excluded.confidence",
            rows,
            |stmt, row| {
                stmt.execute(params![
                    project_id,
                    row.merge_hash,
                    row.hash,
                    category_project_id,
                    row.category,
                    row.confidence
                ])
                .map_err(|e| {
                    RepographError::Database(format!("failed to upsert file category: {e}"))
                })?;
                Ok(())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::ContentIdentity;

    fn record(path: &str, merge_hash: &str, hash: &str) -> FileRecord {
        FileRecord {
            path: path.into(),
            identity: ContentIdentity {
                merge_hash: merge_hash.into(),
                hash: hash.into(),
            },
        }
    }

    fn edge(src: &str, dst: &str) -> ImportEdge {
        ImportEdge {
            src_merge_hash: src.into(),
            src_hash: format!("{src}-h"),
            dst_merge_hash: dst.into(),
            dst_hash: format!("{dst}-h"),
        }
    }

    #[test]
    fn registered_files_are_known_per_project() {
        let store = SqliteStore::in_memory(2).unwrap();
        store
            .register_files(
                &[record("a.ts", "ma", "ha"), record("b.ts", "mb", "hb"), record("c.ts", "mc", "hc")],
                "p1",
            )
            .unwrap();
        store.register_files(&[record("z.ts", "mz", "hz")], "p2").unwrap();

        let known = store.load_known_files("p1").unwrap();
        assert_eq!(known.len(), 3);
        assert_eq!(known["mb"], "hb");
        assert!(!known.contains_key("mz"));
    }

    #[test]
    fn re_registering_updates_hash() {
        let store = SqliteStore::in_memory(100).unwrap();
        store.register_files(&[record("a.ts", "ma", "h1")], "p").unwrap();
        store.register_files(&[record("a.ts", "ma", "h2")], "p").unwrap();
        let known = store.load_known_files("p").unwrap();
        assert_eq!(known.len(), 1);
        assert_eq!(known["ma"], "h2");
    }

    #[test]
    fn import_upserts_are_idempotent() {
        let store = SqliteStore::in_memory(1).unwrap();
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c")];
        store.index_imports(&edges, "p").unwrap();
        store.index_imports(&edges, "p").unwrap();

        let stored = store.imports_for("p").unwrap();
        assert_eq!(stored, edges);
        assert!(store.imports_for("other").unwrap().is_empty());
    }

    #[test]
    fn keywords_overwrite_previous_row() {
        let store = SqliteStore::in_memory(100).unwrap();
        let first = KeywordRow {
            merge_hash: "m".into(),
            hash: "h1".into(),
            keywords: vec!["cart".into(), "ts".into()],
        };
        let second = KeywordRow {
            merge_hash: "m".into(),
            hash: "h2".into(),
            keywords: vec!["checkout".into()],
        };
        store.set_file_keywords(&[first], "p").unwrap();
        store.set_file_keywords(&[second.clone()], "p").unwrap();

        assert_eq!(store.keywords_for("p").unwrap(), vec![second]);
    }

    #[test]
    fn categories_merge_by_name() {
        let store = SqliteStore::in_memory(100).unwrap();
        let billing = CategorySpec {
            name: "Billing".into(),
            description: "Invoices".into(),
            url: "/billing".into(),
        };
        store.index_categories(&[billing.clone()], "p").unwrap();
        store
            .index_categories(
                &[CategorySpec {
                    url: "/bills".into(),
                    ..billing
                }],
                "p",
            )
            .unwrap();

        let existing = store.existing_categories("p").unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing["Billing"], "/bills");
    }

    #[test]
    fn file_categories_upsert() {
        let store = SqliteStore::in_memory(100).unwrap();
        let row = FileCategoryRow {
            merge_hash: "m".into(),
            hash: Some("h".into()),
            category: "Billing".into(),
            confidence: Some(0.5),
        };
        store.index_file_categories(&[row.clone()], "p", "p").unwrap();
        let updated = FileCategoryRow {
            confidence: Some(0.9),
            ..row
        };
        store.index_file_categories(&[updated.clone()], "p", "p").unwrap();

        assert_eq!(store.file_categories_for("p").unwrap(), vec![updated]);
    }

    #[test]
    fn empty_batches_are_noops() {
        let store = SqliteStore::in_memory(100).unwrap();
        store.index_imports(&[], "p").unwrap();
        store.set_file_keywords(&[], "p").unwrap();
        assert!(store.imports_for("p").unwrap().is_empty());
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/graph.db");
        {
            let store = SqliteStore::open(&path, 10).unwrap();
            store.register_files(&[record("a.ts", "ma", "ha")], "p").unwrap();
        }
        let reopened = SqliteStore::open(&path, 10).unwrap();
        assert_eq!(reopened.load_known_files("p").unwrap().len(), 1);
    }
}
