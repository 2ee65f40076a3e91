//! Core types, configuration, and error handling for repograph.
//!
//! This crate provides the shared foundation used by the other repograph crates:
//! - [`RepographError`] — unified error type using `thiserror`
//! - [`RepographConfig`] — store and project configuration loaded from TOML
//! - Shared graph rows: [`ContentIdentity`], [`ImportEdge`], [`KeywordRow`],
//!   [`RunSummary`], and the category types

mod config;
mod error;
mod types;

pub use config::{ProjectConfig, RepographConfig, StoreConfig};
pub use error::RepographError;
pub use types::{
    CategorySpec, CategorySummary, ContentIdentity, FileCategoryAssignment, FileCategoryRow,
    ImportEdge, KeywordRow, OutputFormat, RunSummary,
};

/// A convenience `Result` type for repograph operations.
pub type Result<T> = std::result::Result<T, RepographError>;
