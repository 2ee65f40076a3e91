//! Repository categories and file-to-category assignments.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use repograph_core::{
    CategorySpec, CategorySummary, FileCategoryAssignment, FileCategoryRow, RepographConfig,
    RepographError,
};
use repograph_store::{GraphStore, SqliteStore};
use tracing::{debug, info, Dispatch};

use crate::driller::canonical_root;
use crate::identity::{GitBlobIdentity, IdentityProvider};

/// Name of the fallback category every project carries.
pub const OTHER_CATEGORY: &str = "Other";

/// Produces category definitions for routes that have none yet.
pub trait CategoryGenerator {
    /// # Errors
    ///
    /// Implementations may fail; the error aborts the categorization.
    fn generate(&self, routes: &[String]) -> Result<Vec<CategorySpec>, RepographError>;
}

impl<F> CategoryGenerator for F
where
    F: Fn(&[String]) -> Vec<CategorySpec>,
{
    fn generate(&self, routes: &[String]) -> Result<Vec<CategorySpec>, RepographError> {
        Ok(self(routes))
    }
}

/// Names a category after its route's path segments.
///
/// # Examples
///
/// ```
/// use repograph_deps::categories::{CategoryGenerator, RouteCategories};
///
/// let specs = RouteCategories.generate(&["/admin/user-settings".to_string()]).unwrap();
/// assert_eq!(specs[0].name, "Admin User Settings");
/// assert_eq!(specs[0].url, "/admin/user-settings");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteCategories;

impl CategoryGenerator for RouteCategories {
    fn generate(&self, routes: &[String]) -> Result<Vec<CategorySpec>, RepographError> {
        Ok(routes
            .iter()
            .map(|route| CategorySpec {
                name: route_title(route),
                description: format!("Files serving {route}"),
                url: route.clone(),
            })
            .collect())
    }
}

fn route_title(route: &str) -> String {
    let words: Vec<String> = route
        .split(|c: char| c == '/' || c == '-' || c == '_')
        .filter(|w| !w.is_empty() && !w.starts_with(':') && !w.starts_with('{'))
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Home".to_string()
    } else {
        words.join(" ")
    }
}

/// Inputs for a combined categorization run.
#[derive(Debug, Clone, Default)]
pub struct CategorizeRequest {
    pub categories: Vec<CategorySpec>,
    pub assignments: Vec<FileCategoryAssignment>,
    /// Routes to check for missing categories. `None` skips that step.
    pub routes: Option<Vec<String>>,
    /// Project whose categories the assignments point at. Defaults to the
    /// manager's own project.
    pub category_project_id: Option<String>,
}

/// Manages category nodes and file membership for one project.
pub struct CategoryManager<S = SqliteStore, I = GitBlobIdentity> {
    project_id: String,
    store: S,
    identity: I,
    dispatch: Dispatch,
}

impl CategoryManager {
    /// Build a manager from a config file, optionally overriding the project.
    ///
    /// # Errors
    ///
    /// Fails if the config is missing or invalid, or the store cannot be opened.
    pub fn open(config_path: &Path, project_id: Option<String>) -> Result<Self, RepographError> {
        let config = RepographConfig::from_file(config_path)?.with_overrides(project_id, None);
        Self::from_config(&config)
    }

    /// # Errors
    ///
    /// Same as [`CategoryManager::open`], minus config loading.
    pub fn from_config(config: &RepographConfig) -> Result<Self, RepographError> {
        config.check()?;
        let store = SqliteStore::open(&config.store.database, config.store.batch_size)?;
        let root: PathBuf = canonical_root(&config.project.repo)?;
        Ok(Self::new(
            config.project.project_id.clone(),
            store,
            GitBlobIdentity::new(root),
        ))
    }
}

impl<S: GraphStore, I: IdentityProvider> CategoryManager<S, I> {
    pub fn new(project_id: impl Into<String>, store: S, identity: I) -> Self {
        Self {
            project_id: project_id.into(),
            store,
            identity,
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Route this manager's logging to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upsert the fallback [`OTHER_CATEGORY`].
    ///
    /// # Errors
    ///
    /// Fails when the store fails.
    pub fn ensure_other(&self) -> Result<(), RepographError> {
        let other = CategorySpec {
            name: OTHER_CATEGORY.into(),
            description: "Fallback category for uncategorized files".into(),
            url: "/other".into(),
        };
        self.store.index_categories(&[other], &self.project_id)
    }

    /// Upsert named categories. Specs without a name are skipped.
    ///
    /// `categories_created` counts names that did not exist before.
    ///
    /// # Errors
    ///
    /// Fails when the store fails.
    pub fn merge_categories(
        &self,
        categories: &[CategorySpec],
    ) -> Result<CategorySummary, RepographError> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            self.merge_into(categories, &self.project_id)
        })
    }

    /// Attach files to categories.
    ///
    /// Categories referenced by an assignment but missing under the target
    /// project are created first. An assignment names its file by explicit
    /// `merge_hash` or by `path`; assignments that map to no known file are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Fails when the store fails.
    pub fn assign_categories(
        &self,
        assignments: &[FileCategoryAssignment],
        category_project_id: Option<&str>,
    ) -> Result<CategorySummary, RepographError> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            self.assign(assignments, category_project_id)
        })
    }

    /// Create categories for routes that no existing category points at.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Category`] when routes are missing and no
    /// generator was supplied, or whatever the generator or store returns.
    pub fn auto_categories(
        &self,
        routes: &[String],
        generator: Option<&dyn CategoryGenerator>,
    ) -> Result<CategorySummary, RepographError> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let existing = self.store.existing_categories(&self.project_id)?;
            let urls: HashSet<&str> = existing
                .values()
                .map(String::as_str)
                .filter(|url| !url.is_empty())
                .collect();
            let missing: Vec<String> = routes
                .iter()
                .filter(|route| !route.is_empty() && !urls.contains(route.as_str()))
                .cloned()
                .collect();

            if missing.is_empty() {
                debug!("every route already has a category");
                return Ok(CategorySummary::default());
            }
            let generator = generator.ok_or_else(|| {
                RepographError::Category(
                    "a category generator is required to create categories for routes".into(),
                )
            })?;

            let generated = generator.generate(&missing)?;
            let merged = self.merge_into(&generated, &self.project_id)?;
            info!(created = merged.categories_created, "auto categories complete");
            Ok(merged)
        })
    }

    /// Run route, merge, and assignment steps in that order.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step.
    pub fn categorize(
        &self,
        request: &CategorizeRequest,
        generator: Option<&dyn CategoryGenerator>,
    ) -> Result<CategorySummary, RepographError> {
        let mut summary = CategorySummary::default();

        if let Some(routes) = &request.routes {
            summary = self.auto_categories(routes, generator)?;
        }
        if !request.categories.is_empty() {
            let merged = self.merge_categories(&request.categories)?;
            summary.categories_total += merged.categories_total;
            summary.categories_created += merged.categories_created;
        }
        if !request.assignments.is_empty() {
            let assigned = self
                .assign_categories(&request.assignments, request.category_project_id.as_deref())?;
            summary.assigned = assigned.assigned;
        }
        Ok(summary)
    }

    fn merge_into(
        &self,
        categories: &[CategorySpec],
        category_project_id: &str,
    ) -> Result<CategorySummary, RepographError> {
        self.ensure_other()?;
        let existing = self.store.existing_categories(category_project_id)?;

        let rows: Vec<CategorySpec> = categories
            .iter()
            .filter(|spec| !spec.name.is_empty())
            .cloned()
            .collect();
        let created: HashSet<&str> = rows
            .iter()
            .map(|spec| spec.name.as_str())
            .filter(|name| !existing.contains_key(*name))
            .collect();

        if !rows.is_empty() {
            self.store.index_categories(&rows, category_project_id)?;
        }
        debug!(total = rows.len(), created = created.len(), "categories merged");
        Ok(CategorySummary {
            categories_total: rows.len(),
            categories_created: created.len(),
            assigned: 0,
        })
    }

    fn assign(
        &self,
        assignments: &[FileCategoryAssignment],
        category_project_id: Option<&str>,
    ) -> Result<CategorySummary, RepographError> {
        self.ensure_other()?;
        let known = self.store.load_known_files(&self.project_id)?;
        if known.is_empty() {
            info!(project_id = %self.project_id, "no known files for project, nothing to assign");
            return Ok(CategorySummary::default());
        }

        let target = category_project_id.unwrap_or(self.project_id.as_str());
        let existing = self.store.existing_categories(target)?;
        let mut missing: Vec<CategorySpec> = Vec::new();
        for assignment in assignments {
            let name = assignment.category.as_str();
            if !name.is_empty()
                && !existing.contains_key(name)
                && !missing.iter().any(|spec| spec.name == name)
            {
                missing.push(CategorySpec::named(name));
            }
        }
        if !missing.is_empty() {
            self.merge_into(&missing, target)?;
        }

        let rows = self.normalize(assignments, &known);
        if !rows.is_empty() {
            self.store
                .index_file_categories(&rows, &self.project_id, target)?;
        }
        info!(assigned = rows.len(), "categorization complete");
        Ok(CategorySummary {
            assigned: rows.len(),
            ..CategorySummary::default()
        })
    }

    fn normalize(
        &self,
        assignments: &[FileCategoryAssignment],
        known: &HashMap<String, String>,
    ) -> Vec<FileCategoryRow> {
        let mut rows = Vec::new();
        for assignment in assignments {
            if assignment.category.is_empty() {
                debug!(?assignment, "assignment without category");
                continue;
            }

            let (merge_hash, hash) = match (&assignment.merge_hash, &assignment.path) {
                (Some(merge_hash), _) if !merge_hash.is_empty() => {
                    (merge_hash.clone(), assignment.hash.clone())
                }
                (_, Some(path)) if !path.is_empty() => {
                    match self.identity.path_hashes(path, &self.project_id) {
                        Ok(id) => (id.merge_hash, Some(id.hash)),
                        Err(e) => {
                            debug!(%path, error = %e, "assignment path has no identity");
                            continue;
                        }
                    }
                }
                _ => {
                    debug!(?assignment, "assignment names no file");
                    continue;
                }
            };

            if !known.contains_key(&merge_hash) {
                debug!(%merge_hash, "assignment file not known");
                continue;
            }
            rows.push(FileCategoryRow {
                merge_hash,
                hash,
                category: assignment.category.clone(),
                confidence: assignment.confidence,
            });
        }
        rows
    }
}
