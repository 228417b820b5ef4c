//! Capture stream to scope tree.
//!
//! Captures are first filtered for illegal repeats, then folded into a tree
//! of [`Scope`]s with one child scope per parenthesized group.

use super::token::{BinaryOp, Scope, Token, TokenKind, UnaryOp};
use crate::lexer::{Capture, CaptureKind};

/// Characters that may legitimately appear several times in a row
const REPEATABLE: [&str; 3] = ["\"", "(", ")"];

/// Drop captures that repeat illegally.
///
/// Only vital captures are kept. Values outside phrases are trimmed, with
/// pure whitespace collapsing to one space. An operator identical to the
/// last kept operator with only whitespace in between is dropped, as is any
/// capture equal to the one kept just before it (unless it is a repeatable
/// character).
pub fn remove_disallowed_repeats(captures: &[Capture]) -> Vec<Capture> {
    let mut kept: Vec<Capture> = Vec::with_capacity(captures.len());
    let mut last_operator: Option<String> = None;

    for capture in captures.iter().filter(|c| c.is_vital()) {
        let mut capture = capture.clone();

        // Phrase fragments are literal text; leave them alone
        if capture.kind == Some(CaptureKind::Quote) {
            last_operator = None;
            kept.push(capture);
            continue;
        }

        let trimmed = match capture.value().trim() {
            "" => " ".to_string(),
            t => t.to_string(),
        };
        if trimmed != capture.value() {
            capture.set_value(trimmed);
        }

        match capture.kind {
            Some(CaptureKind::Operator) => {
                if last_operator.as_deref() == Some(capture.value()) {
                    continue;
                }
                last_operator = Some(capture.value().to_string());
            }
            Some(CaptureKind::Whitespace) => {}
            _ => last_operator = None,
        }

        if let Some(previous) = kept.last()
            && previous.value() == capture.value()
            && !REPEATABLE.contains(&capture.value())
        {
            continue;
        }

        kept.push(capture);
    }

    kept
}

/// Builds the scope tree from filtered captures
#[derive(Debug)]
pub struct ScopeBuilder {
    root: Scope,
    open: Vec<Scope>,
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeBuilder {
    pub fn new() -> Self {
        Self {
            root: Scope::root(),
            open: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut Scope {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    /// Number of groups opened and not yet closed
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn push(&mut self, capture: &Capture) {
        let Some(kind) = capture.kind else {
            return;
        };
        let value = capture.value();

        match kind {
            CaptureKind::OpenParen => self.open.push(Scope::group()),
            CaptureKind::CloseParen => {
                // Unbalanced closes are dropped at the root
                if let Some(group) = self.open.pop() {
                    self.current().push(Token::scope(group));
                }
            }
            CaptureKind::Quote => {
                let scope = self.current();
                if let Some(Token {
                    kind: TokenKind::StringGroup(fragments),
                    ..
                }) = scope.children.last_mut()
                {
                    fragments.push(value.to_string());
                } else {
                    scope.push(Token::phrase(value));
                }
            }
            CaptureKind::Operator => {
                if let Some(op) = BinaryOp::from_symbol(value) {
                    self.current().push(Token::binary(op));
                } else if let Some(op) = UnaryOp::from_symbol(value) {
                    self.current().push(Token::unary(op));
                } else {
                    debug_assert!(false, "lexer produced unknown operator {value:?}");
                }
            }
            CaptureKind::Operand => self.current().push(Token::operand(value)),
            CaptureKind::Whitespace => self.current().push(Token::delimiter()),
        }
    }

    /// Close any group still open and return the root scope
    pub fn finish(mut self) -> Scope {
        while let Some(group) = self.open.pop() {
            self.current().push(Token::scope(group));
        }
        self.root
    }
}

/// Filter `captures` and fold them into a root scope
pub fn build_scope(captures: &[Capture]) -> Scope {
    let mut builder = ScopeBuilder::new();
    for capture in remove_disallowed_repeats(captures) {
        builder.push(&capture);
    }
    builder.finish()
}
