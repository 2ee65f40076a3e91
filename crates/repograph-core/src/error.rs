use std::path::PathBuf;

/// Errors that can occur across the repograph crates.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to a `miette` report at the boundary.
///
/// Per-file extraction problems are not represented here: a file that cannot
/// be read or parsed is skipped, it never aborts a run.
///
/// # Examples
///
/// ```
/// use repograph_core::RepographError;
///
/// let err = RepographError::Config("project_id is required".into());
/// assert!(err.to_string().contains("project_id"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RepographError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(repograph::config))]
    Config(String),

    /// Ignore rule compilation failure.
    #[error("ignore rules error: {0}")]
    Ignore(String),

    /// Graph store failure.
    #[error("database error: {0}")]
    #[diagnostic(code(repograph::database))]
    Database(String),

    /// Git object hashing failure.
    #[error("git error: {0}")]
    Git(String),

    /// Invalid category input.
    #[error("category error: {0}")]
    Category(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(
        code(repograph::file_not_found),
        help("create a config with `repograph init` or pass --config")
    )]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RepographError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = RepographError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = RepographError::FileNotFound(PathBuf::from("/tmp/graph.toml"));
        assert!(err.to_string().contains("/tmp/graph.toml"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: RepographError = json_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
