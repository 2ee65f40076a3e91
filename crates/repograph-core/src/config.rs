use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RepographError;

/// Top-level configuration loaded from a repograph TOML file.
///
/// Holds the graph store connection settings and the project settings that
/// scope every store operation.
///
/// # Examples
///
/// ```
/// use repograph_core::RepographConfig;
///
/// let config = RepographConfig::default();
/// assert_eq!(config.store.batch_size, 100);
/// assert!(config.project.project_id.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepographConfig {
    /// Graph store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Project settings.
    #[serde(default)]
    pub project: ProjectConfig,
}

impl RepographConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// Relative paths inside the file are resolved against the directory that
    /// contains it.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::FileNotFound`] if `path` does not exist,
    /// [`RepographError::Io`] if it cannot be read, or
    /// [`RepographError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repograph_core::RepographConfig;
    /// use std::path::Path;
    ///
    /// let config = RepographConfig::from_file(Path::new("repograph.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, RepographError> {
        if !path.is_file() {
            return Err(RepographError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_relative_to(base);
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use repograph_core::RepographConfig;
    ///
    /// let toml = r#"
    /// [project]
    /// project_id = "shop"
    /// "#;
    /// let config = RepographConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.project.project_id, "shop");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RepographError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply caller overrides for the project identity and the extra ignore file.
    ///
    /// `None` keeps the configured value.
    pub fn with_overrides(mut self, project_id: Option<String>, ignore_file: Option<PathBuf>) -> Self {
        if let Some(pid) = project_id {
            self.project.project_id = pid;
        }
        if ignore_file.is_some() {
            self.project.ignore_file = ignore_file;
        }
        self
    }

    /// Validate required settings.
    ///
    /// # Errors
    ///
    /// Returns [`RepographError::Config`] when `project_id` or `repo` is empty
    /// or `batch_size` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use repograph_core::RepographConfig;
    ///
    /// let config = RepographConfig::default();
    /// assert!(config.check().is_err());
    /// ```
    pub fn check(&self) -> Result<(), RepographError> {
        if self.project.project_id.trim().is_empty() {
            return Err(RepographError::Config("project.project_id is required".into()));
        }
        if self.project.repo.as_os_str().is_empty() {
            return Err(RepographError::Config("project.repo is required".into()));
        }
        if self.store.batch_size == 0 {
            return Err(RepographError::Config(
                "store.batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        self.store.database = join_if_relative(base, &self.store.database);
        self.project.repo = join_if_relative(base, &self.project.repo);
        if let Some(ignore) = self.project.ignore_file.take() {
            self.project.ignore_file = Some(join_if_relative(base, &ignore));
        }
    }
}

fn join_if_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Graph store configuration.
///
/// # Examples
///
/// ```
/// use repograph_core::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.database.to_str(), Some(".repograph/graph.db"));
/// assert_eq!(config.batch_size, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite graph database (default: `.repograph/graph.db`).
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Rows written per batch transaction (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_database() -> PathBuf {
    PathBuf::from(".repograph/graph.db")
}

fn default_batch_size() -> usize {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            batch_size: default_batch_size(),
        }
    }
}

/// Project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Working tree root (default: `.`).
    #[serde(default = "default_repo")]
    pub repo: PathBuf,
    /// Identity that scopes every store operation. Required.
    #[serde(default)]
    pub project_id: String,
    /// Optional extra gitignore-style file applied after the repository's own.
    pub ignore_file: Option<PathBuf>,
}

fn default_repo() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            project_id: String::new(),
            ignore_file: None,
        }
    }
}
