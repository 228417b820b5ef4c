//! Lexing: a generic regex cursor plus the boolean query grammar built on it.
//!
//! - [`cursor`] - [`LexerCursor`], anchored matching with scope push/pop and
//!   synthetic recovery captures
//! - [`capture`] - [`Capture`], one typed lexical match
//! - [`grammar`] - [`lex_query`], the self-healing query tokenizer

pub mod capture;
pub mod cursor;
pub mod grammar;

pub use capture::{Capture, CaptureKind, ScopeId};
pub use cursor::LexerCursor;
pub use grammar::lex_query;
