use once_cell::sync::Lazy;
use regex::Regex;

use crate::walker::WorkingFile;

/// Maximum keywords kept per file.
pub const KEYWORD_LIMIT: usize = 20;

/// Only this many leading characters of a file are scanned for identifiers.
pub const SNIPPET_CHARS: usize = 5000;

/// Tokens too generic to describe a file.
pub const STOPWORDS: &[&str] = &[
    "", "src", "app", "apps", "lib", "dist", "build", "index", "test", "tests", "spec", "tmp",
    "public", "assets", "vendor", "data", "static",
];

static PATH_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\\/._-]+").expect("valid path separator pattern"));

static IDENTIFIER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"class\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"function\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"def\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"const\s+([A-Za-z_][A-Za-z0-9_]*)\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid identifier pattern"))
    .collect()
});

/// Keywords for a scanned file, reading its content from disk.
///
/// An unreadable file still yields its path keywords. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn extract_keywords(file: &WorkingFile) -> Vec<String> {
    let text = std::fs::read(&file.absolute_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    keywords_from(&file.relative_path, &text)
}

/// Keywords from a relative path and file text.
///
/// Path tokens come first, then identifiers from class, function, `def`, and
/// `const x =` forms in the first [`SNIPPET_CHARS`] characters. Tokens are
/// lowercased, stopwords dropped, first occurrence kept, and the list is cut
/// at [`KEYWORD_LIMIT`].
///
/// # Examples
///
/// ```
/// use repograph_scan::keywords::keywords_from;
///
/// let kw = keywords_from("src/billing/invoice-list.ts", "export class InvoiceList {}");
/// assert_eq!(kw, vec!["billing", "invoice", "list", "ts", "invoicelist"]);
/// ```
pub fn keywords_from(relative_path: &str, text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    let path_tokens = PATH_SEPARATORS.split(relative_path).map(str::to_string);
    let snippet = leading_chars(text, SNIPPET_CHARS);
    let identifiers = IDENTIFIER_PATTERNS.iter().flat_map(|pattern| {
        pattern
            .captures_iter(snippet)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
    });

    for token in path_tokens.chain(identifiers) {
        if keywords.len() >= KEYWORD_LIMIT {
            break;
        }
        let lower = token.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) || keywords.contains(&lower) {
            continue;
        }
        keywords.push(lower);
    }

    keywords
}

fn leading_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
