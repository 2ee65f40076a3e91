use std::fmt;

use tree_sitter::{Node, Parser};

use crate::walker::{extension_of, WorkingFile};

/// Grammar used to extract imports from a file.
///
/// Each variant owns its own mapping from syntax node kinds to extracted
/// specifiers; only the tree traversal is shared.
///
/// # Examples
///
/// ```
/// use repograph_scan::imports::ImportLanguage;
///
/// assert_eq!(ImportLanguage::from_path("src/app.ts"), Some(ImportLanguage::TypeScript));
/// assert_eq!(ImportLanguage::from_path("src/View.tsx"), Some(ImportLanguage::Tsx));
/// assert_eq!(ImportLanguage::from_path("lib/util.cjs"), Some(ImportLanguage::JavaScript));
/// assert_eq!(ImportLanguage::from_path("index.php"), Some(ImportLanguage::Php));
/// assert_eq!(ImportLanguage::from_path("setup.py"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportLanguage {
    JavaScript,
    TypeScript,
    Tsx,
    Php,
}

impl ImportLanguage {
    /// Detect the grammar from a file name.
    pub fn from_path(path: &str) -> Option<Self> {
        match extension_of(path).as_str() {
            ".js" | ".jsx" | ".mjs" | ".cjs" => Some(ImportLanguage::JavaScript),
            ".ts" => Some(ImportLanguage::TypeScript),
            ".tsx" => Some(ImportLanguage::Tsx),
            ".php" => Some(ImportLanguage::Php),
            _ => None,
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            ImportLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            ImportLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ImportLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            ImportLanguage::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    /// Inspect a single node, appending any specifiers it carries.
    fn visit(self, node: Node, source: &[u8], imports: &mut Vec<String>) {
        match self {
            ImportLanguage::JavaScript | ImportLanguage::TypeScript | ImportLanguage::Tsx => {
                visit_js_like(node, source, imports);
            }
            ImportLanguage::Php => visit_php(node, source, imports),
        }
    }
}

/// Why a file contributed no imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No grammar is mapped to the file name.
    UnsupportedLanguage,
    /// The file could not be read.
    Unreadable(String),
    /// The grammar could not be loaded into a parser.
    GrammarUnavailable(String),
    /// The parser produced no tree.
    ParseFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedLanguage => write!(f, "unsupported language"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::GrammarUnavailable(e) => write!(f, "grammar unavailable: {e}"),
            SkipReason::ParseFailed => write!(f, "parse failed"),
        }
    }
}

/// Result of extracting imports from one file.
///
/// A skipped file is a normal outcome, never an error for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportExtraction {
    /// Raw specifiers in document order, quotes stripped.
    Found(Vec<String>),
    /// The file was not parsed.
    Skipped(SkipReason),
}

impl ImportExtraction {
    /// The extracted specifiers, empty when the file was skipped.
    pub fn into_imports(self) -> Vec<String> {
        match self {
            ImportExtraction::Found(imports) => imports,
            ImportExtraction::Skipped(_) => Vec::new(),
        }
    }
}

/// Read and parse `file`, returning its raw import specifiers.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use repograph_scan::imports::{extract_imports, ImportExtraction, SkipReason};
/// use repograph_scan::walker::WorkingFile;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.ts"), "import { b } from './b';").unwrap();
///
/// let file = WorkingFile::new(dir.path().to_path_buf(), "a.ts");
/// assert_eq!(extract_imports(&file), ImportExtraction::Found(vec!["./b".into()]));
///
/// let missing = WorkingFile::new(dir.path().to_path_buf(), "gone.ts");
/// assert!(matches!(extract_imports(&missing), ImportExtraction::Skipped(SkipReason::Unreadable(_))));
/// ```
pub fn extract_imports(file: &WorkingFile) -> ImportExtraction {
    let Some(language) = ImportLanguage::from_path(&file.relative_path) else {
        return ImportExtraction::Skipped(SkipReason::UnsupportedLanguage);
    };
    let source = match std::fs::read(&file.absolute_path) {
        Ok(bytes) => bytes,
        Err(e) => return ImportExtraction::Skipped(SkipReason::Unreadable(e.to_string())),
    };
    match extract_from_source(language, &source) {
        Ok(imports) => ImportExtraction::Found(imports),
        Err(reason) => ImportExtraction::Skipped(reason),
    }
}

/// Parse `source` with the grammar for `language` and collect specifiers.
///
/// Tree-sitter is error-tolerant, so imports are still found in files with
/// syntax errors elsewhere.
///
/// # Errors
///
/// Returns the [`SkipReason`] when no tree can be produced.
///
/// # Examples
///
/// ```
/// use repograph_scan::imports::{extract_from_source, ImportLanguage};
///
/// let src = b"const fs = require('fs');\nimport x from \"./x\";";
/// let imports = extract_from_source(ImportLanguage::JavaScript, src).unwrap();
/// assert_eq!(imports, vec!["fs", "./x"]);
/// ```
pub fn extract_from_source(
    language: ImportLanguage,
    source: &[u8],
) -> Result<Vec<String>, SkipReason> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| SkipReason::GrammarUnavailable(e.to_string()))?;

    let Some(tree) = parser.parse(source, None) else {
        return Err(SkipReason::ParseFailed);
    };

    let mut imports = Vec::new();
    for_each_node(tree.root_node(), |node| {
        language.visit(node, source, &mut imports);
    });
    Ok(imports)
}

/// Pre-order traversal of every node under `root`, including `root`.
fn for_each_node<'tree>(root: Node<'tree>, mut visit: impl FnMut(Node<'tree>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// `import ... from "x"` and `require("x")`.
fn visit_js_like(node: Node, source: &[u8], imports: &mut Vec<String>) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "string" {
                    imports.push(literal_text(&child, source));
                }
            }
        }
        "call_expression" => {
            let Some(callee) = node.child(0) else {
                return;
            };
            if callee.kind() != "identifier" || node_text(&callee, source) != "require" {
                return;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() != "arguments" {
                    continue;
                }
                let mut arg_cursor = child.walk();
                for arg in child.children(&mut arg_cursor) {
                    if arg.kind() == "string" {
                        imports.push(literal_text(&arg, source));
                    }
                }
            }
        }
        _ => {}
    }
}

/// `require`/`include` family and namespace `use` clauses.
///
/// Namespace clauses are recorded verbatim (`App\Models\User`); they are not
/// file paths and only resolve when a file happens to mirror the namespace.
fn visit_php(node: Node, source: &[u8], imports: &mut Vec<String>) {
    match node.kind() {
        "require_expression"
        | "require_once_expression"
        | "include_expression"
        | "include_once_expression" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "string" | "encapsed_string" => imports.push(literal_text(&child, source)),
                    "parenthesized_expression" => {
                        let mut inner_cursor = child.walk();
                        for inner in child.children(&mut inner_cursor) {
                            if matches!(inner.kind(), "string" | "encapsed_string") {
                                imports.push(literal_text(&inner, source));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        "namespace_use_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "namespace_use_clause" {
                    imports.push(node_text(&child, source));
                }
            }
        }
        _ => {}
    }
}

/// Text of a string literal node with surrounding quote characters removed.
fn literal_text(node: &Node, source: &[u8]) -> String {
    node_text(node, source)
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .to_string()
}

fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}
