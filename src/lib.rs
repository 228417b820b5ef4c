//! # qheal - self-healing boolean query sanitizer
//!
//! qheal turns user-typed, often malformed search queries into valid
//! boolean expressions for a classic inverted-index query grammar
//! (`AND`/`OR`/`NOT`, `+`/`-` modifiers, quoted phrases with fuzziness,
//! parenthesized groups). Broken syntax is repaired, never reported.
//!
//! ## Architecture
//!
//! - [`lexer`] - regex-driven cursor and the query tokenizer
//! - [`query`] - token model, scope builder, fixed-point sanitizer, strict
//!   grammar and the query-language front end
//! - [`output`] - colored terminal output for the CLI
//! - [`utils`] - configuration and progress bars
//!
//! ## Quick Start
//!
//! ```
//! use qheal::sanitize;
//!
//! assert_eq!(sanitize("a AND AND b").unwrap(), "a AND b");
//! assert_eq!(sanitize("(a (b) c").unwrap(), "(a (b) c)");
//! assert_eq!(sanitize("+").unwrap(), "*");
//! ```
//!
//! Every output parses with [`query::parse_strict`] and is a fixed point:
//! sanitizing it again returns it unchanged.

pub mod error;
pub mod lexer;
pub mod output;
pub mod query;
pub mod utils;

pub use error::{QueryError, Result};
pub use query::{QueryLanguage, Sanitizer, build_query, parse_strict, sanitize};
pub use utils::SanitizerConfig;
