//! Static dependency graph materialization for repograph.
//!
//! Ties the working-tree scanner to the graph store:
//! - [`identity`] — path to `{merge_hash, hash}` lookup
//! - [`driller`] — import edges and keyword rows for known files
//! - [`categories`] — category nodes and file assignments

pub mod categories;
pub mod driller;
pub mod identity;

pub use categories::{CategorizeRequest, CategoryGenerator, CategoryManager, RouteCategories};
pub use driller::DependencyDriller;
pub use identity::{GitBlobIdentity, IdentityProvider};
