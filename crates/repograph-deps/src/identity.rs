//! Content identity lookup for working-tree files.

use std::path::{Path, PathBuf};

use git2::{ObjectType, Oid};
use repograph_core::{ContentIdentity, RepographError};
use sha2::{Digest, Sha256};

/// Maps a repository-relative path to its graph identity.
pub trait IdentityProvider {
    /// Identity of `relative_path` within `project_id`.
    ///
    /// # Errors
    ///
    /// Implementations fail when the file's content cannot be hashed.
    fn path_hashes(
        &self,
        relative_path: &str,
        project_id: &str,
    ) -> Result<ContentIdentity, RepographError>;
}

/// Identity derived from the path and the file's git blob id.
///
/// `merge_hash` depends only on project and path, so it survives content
/// edits. `hash` is what `git hash-object` prints for the current content.
///
/// # Examples
///
/// ```
/// use repograph_deps::identity::{GitBlobIdentity, IdentityProvider};
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.ts"), "").unwrap();
///
/// let id = GitBlobIdentity::new(dir.path()).path_hashes("a.ts", "shop").unwrap();
/// // The empty blob.
/// assert_eq!(id.hash, "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
/// ```
#[derive(Debug, Clone)]
pub struct GitBlobIdentity {
    root: PathBuf,
}

impl GitBlobIdentity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl IdentityProvider for GitBlobIdentity {
    fn path_hashes(
        &self,
        relative_path: &str,
        project_id: &str,
    ) -> Result<ContentIdentity, RepographError> {
        let oid = Oid::hash_file(ObjectType::Blob, self.root.join(relative_path)).map_err(|e| {
            RepographError::Git(format!("failed to hash {relative_path}: {e}"))
        })?;

        Ok(ContentIdentity {
            merge_hash: merge_hash(project_id, relative_path),
            hash: oid.to_string(),
        })
    }
}

/// Hex SHA-256 of `project_id`, a NUL byte, and the relative path.
pub fn merge_hash(project_id: &str, relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(relative_path.as_bytes());
    format!("{:x}", hasher.finalize())
}
