//! Query languages offered by the search front end.
//!
//! - `flex`: free text from users, healed by the sanitizer
//! - `full`: expert syntax, passed through but checked against the grammar
//! - `simple`: whitespace separated words that must all match

use super::sanitizer::Sanitizer;
use super::strict::parse_strict;
use crate::error::{QueryError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters the grammar treats as syntax
const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

const KEYWORDS: [&str; 3] = ["AND", "OR", "NOT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    #[default]
    Flex,
    Full,
    Simple,
}

impl QueryLanguage {
    pub const ALL: [QueryLanguage; 3] = [QueryLanguage::Flex, QueryLanguage::Full, QueryLanguage::Simple];

    pub fn name(&self) -> &'static str {
        match self {
            QueryLanguage::Flex => "flex",
            QueryLanguage::Full => "full",
            QueryLanguage::Simple => "simple",
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryLanguage {
    type Err = QueryError;

    /// Accepts the names case-insensitively; an empty name means `simple`
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flex" => Ok(QueryLanguage::Flex),
            "full" => Ok(QueryLanguage::Full),
            "simple" | "" => Ok(QueryLanguage::Simple),
            other => Err(QueryError::Config(format!(
                "unknown query language {other:?} (expected flex, full or simple)"
            ))),
        }
    }
}

/// Build the query string handed to the index for `text` in `language`
pub fn build_query(language: QueryLanguage, text: &str, sanitizer: &Sanitizer) -> Result<String> {
    match language {
        QueryLanguage::Flex => sanitizer.sanitize(text),
        QueryLanguage::Full => {
            parse_strict(text)?;
            Ok(text.to_string())
        }
        QueryLanguage::Simple => Ok(build_simple(text, &sanitizer.config().fallback)),
    }
}

/// Every distinct word, escaped, joined with `AND`
fn build_simple(text: &str, fallback: &str) -> String {
    let mut seen = FxHashSet::default();
    let terms: Vec<String> = text
        .split_whitespace()
        .filter(|word| seen.insert(*word))
        .map(escape_term)
        .collect();

    if terms.is_empty() {
        fallback.to_string()
    } else {
        terms.join(" AND ")
    }
}

/// Escape `word` so the grammar reads it as one literal term.
///
/// Special characters get a backslash; a bare keyword is quoted.
pub fn escape_term(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        return format!("\"{word}\"");
    }

    let mut escaped = String::with_capacity(word.len() * 2);
    for ch in word.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
