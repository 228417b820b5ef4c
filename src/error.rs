use thiserror::Error;

/// Result type alias for query sanitizing operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors surfaced by the lexer, sanitizer and strict grammar.
///
/// Malformed user input is never an error here: it gets repaired. Only the
/// hard safety limits and genuine programming/config faults reach callers.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Query too complex: more than {limit} captures")]
    TooComplex { limit: usize },

    #[error("Query did not stabilize after {iterations} sanitize iterations")]
    NoFixedPoint { iterations: usize },

    #[error("Invalid lexer pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        QueryError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// True when the input tripped one of the safety limits
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            QueryError::TooComplex { .. } | QueryError::NoFixedPoint { .. }
        )
    }
}
