use serde::Serialize;

/// Kind of lexical token a capture was recognized as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    /// `AND`, `OR`, `NOT`, `+`, `-`, `!`
    Operator,
    /// Bare term, possibly with wildcards and a fuzziness suffix
    Operand,
    /// A fragment of a quoted phrase (quotes included)
    Quote,
    OpenParen,
    CloseParen,
    Whitespace,
}

impl CaptureKind {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureKind::Operator => "OPERATOR",
            CaptureKind::Operand => "OPERAND",
            CaptureKind::Quote => "QUOTE",
            CaptureKind::OpenParen => "PAREN:OPEN",
            CaptureKind::CloseParen => "PAREN:CLOSE",
            CaptureKind::Whitespace => "WHITESPACE",
        }
    }
}

/// Opaque identity of one nesting scope opened by the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeId(pub(crate) u32);

/// One lexical match produced by [`LexerCursor`](super::LexerCursor)
#[derive(Debug, Clone, Serialize)]
pub struct Capture {
    /// `None` for input that was consumed but deliberately ignored
    pub kind: Option<CaptureKind>,
    /// Byte offset of the match in the input
    pub start: usize,
    /// Number of input bytes this capture consumed
    pub len: usize,
    /// Nesting depth at the time of the match
    pub depth: usize,
    /// Scope the capture belongs to (or opened/closed, for parentheses)
    pub scope: Option<ScopeId>,
    /// True for recovery tokens that were not backed by a real match
    pub synthetic: bool,
    literal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    forced: Option<String>,
}

impl Capture {
    pub(crate) fn matched(kind: Option<CaptureKind>, start: usize, literal: &str) -> Self {
        Self {
            kind,
            start,
            len: literal.len(),
            depth: 0,
            scope: None,
            synthetic: false,
            literal: literal.to_string(),
            forced: None,
        }
    }

    pub(crate) fn synthetic(kind: CaptureKind, start: usize, literal: &str, value: &str) -> Self {
        Self {
            kind: Some(kind),
            start,
            len: literal.len(),
            depth: 0,
            scope: None,
            synthetic: true,
            literal: literal.to_string(),
            forced: Some(value.to_string()),
        }
    }

    /// The value handed to later stages: the forced value if one was set,
    /// otherwise the literal matched text
    pub fn value(&self) -> &str {
        self.forced.as_deref().unwrap_or(&self.literal)
    }

    /// The text actually consumed from the input
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.forced = Some(value.into());
    }

    /// Vital captures feed the sanitizer; ignored input does not
    pub fn is_vital(&self) -> bool {
        self.kind.is_some()
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_defaults_to_literal() {
        let capture = Capture::matched(Some(CaptureKind::Operand), 3, "term");
        assert_eq!(capture.value(), "term");
        assert_eq!(capture.end(), 7);
        assert!(capture.is_vital());
        assert!(!capture.synthetic);
    }

    #[test]
    fn test_forced_value_wins() {
        let mut capture = Capture::matched(Some(CaptureKind::Whitespace), 0, "\t\n");
        capture.set_value(" ");
        assert_eq!(capture.value(), " ");
        assert_eq!(capture.literal(), "\t\n");
    }

    #[test]
    fn test_synthetic_capture() {
        let capture = Capture::synthetic(CaptureKind::Quote, 5, "", "\"");
        assert_eq!(capture.value(), "\"");
        assert_eq!(capture.len, 0);
        assert!(capture.synthetic);
    }

    #[test]
    fn test_ignored_capture_is_not_vital() {
        let capture = Capture::matched(None, 0, ")");
        assert!(!capture.is_vital());
    }
}
