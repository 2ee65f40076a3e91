//! Working-tree scanning and static import extraction.
//!
//! Walks a repository under gitignore-style rules, parses JavaScript,
//! TypeScript, and PHP files with tree-sitter to collect raw import
//! specifiers, resolves those specifiers to repository-relative paths, and
//! derives topical keywords per file.
//!
//! - [`ignore_rules`] — composite exclusion predicate (defaults, `.gitignore`, extra file)
//! - [`walker`] — lazy, pruning tree scan yielding [`walker::WorkingFile`]s
//! - [`imports`] — per-language AST walkers producing raw specifiers
//! - [`resolver`] — specifier to path resolution with a fixed extension priority
//! - [`keywords`] — bounded keyword lists from paths and identifier patterns

pub mod ignore_rules;
pub mod imports;
pub mod keywords;
pub mod resolver;
pub mod walker;

pub use ignore_rules::IgnoreRules;
pub use imports::{extract_imports, ImportExtraction, ImportLanguage, SkipReason};
pub use keywords::extract_keywords;
pub use resolver::resolve_import;
pub use walker::{scan_tree, WorkingFile};
