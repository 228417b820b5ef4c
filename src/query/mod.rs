pub mod language;
pub mod sanitizer;
pub mod scope;
pub mod strict;
pub mod token;

pub use language::{QueryLanguage, build_query, escape_term};
pub use sanitizer::{Sanitizer, sanitize};
pub use scope::{ScopeBuilder, build_scope, remove_disallowed_repeats};
pub use strict::{Query, QueryNode, is_valid, parse_strict};
pub use token::{BinaryOp, Scope, Token, TokenKind, UnaryOp};
