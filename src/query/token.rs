//! Expression tokens produced by the scope builder and rewritten by the
//! sanitizer.

use std::fmt;

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `NOT` or `!`
    Not,
    /// `-`
    Prohibit,
    /// `+`
    Require,
}

impl UnaryOp {
    /// Order in which the sanitizer binds prefix operators
    pub const BINDING_ORDER: [UnaryOp; 3] = [UnaryOp::Not, UnaryOp::Prohibit, UnaryOp::Require];

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "NOT" | "!" => Some(UnaryOp::Not),
            "-" => Some(UnaryOp::Prohibit),
            "+" => Some(UnaryOp::Require),
            _ => None,
        }
    }

    /// Rendered form (`NOT` is always written as `!`)
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Prohibit => "-",
            UnaryOp::Require => "+",
        }
    }
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

impl BinaryOp {
    /// Highest priority first
    pub const BINDING_ORDER: [BinaryOp; 2] = [BinaryOp::And, BinaryOp::Or];

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "AND" => Some(BinaryOp::And),
            "OR" => Some(BinaryOp::Or),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            BinaryOp::And => 90,
            BinaryOp::Or => 80,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TokenKind {
    /// Bare term
    Operand(String),
    /// Quote fragments that appeared back to back, rendered as one literal
    StringGroup(Vec<String>),
    Unary {
        op: UnaryOp,
        argument: Option<Box<Token>>,
    },
    Binary {
        op: BinaryOp,
        left: Option<Box<Token>>,
        right: Option<Box<Token>>,
    },
    Scope(Scope),
    /// Whitespace between tokens
    Delimiter,
}

/// A node of the query expression tree
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pad_right: bool,
}

impl Token {
    fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            pad_right: false,
        }
    }

    pub fn operand(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Operand(text.into()))
    }

    pub fn phrase(fragment: impl Into<String>) -> Self {
        Self::new(TokenKind::StringGroup(vec![fragment.into()]))
    }

    pub fn unary(op: UnaryOp) -> Self {
        Self::new(TokenKind::Unary { op, argument: None })
    }

    pub fn binary(op: BinaryOp) -> Self {
        Self::new(TokenKind::Binary {
            op,
            left: None,
            right: None,
        })
    }

    pub fn scope(scope: Scope) -> Self {
        Self::new(TokenKind::Scope(scope))
    }

    pub fn delimiter() -> Self {
        Self::new(TokenKind::Delimiter)
    }

    pub fn is_delimiter(&self) -> bool {
        matches!(self.kind, TokenKind::Delimiter)
    }

    pub fn is_unary(&self) -> bool {
        matches!(self.kind, TokenKind::Unary { .. })
    }

    /// Whether this token can stand as a value in a boolean expression
    pub fn is_operand(&self) -> bool {
        match &self.kind {
            TokenKind::Operand(text) => !text.is_empty(),
            TokenKind::StringGroup(fragments) => !fragments.is_empty(),
            TokenKind::Unary { argument, .. } => argument.as_ref().is_some_and(|a| a.is_operand()),
            TokenKind::Binary { left, right, .. } => {
                left.as_ref().is_some_and(|l| l.is_operand())
                    && right.as_ref().is_some_and(|r| r.is_operand())
            }
            TokenKind::Scope(scope) => scope.is_operand(),
            TokenKind::Delimiter => false,
        }
    }

    /// An operator still waiting for its operand(s)
    pub fn is_unbound_operator(&self) -> bool {
        match &self.kind {
            TokenKind::Unary { argument, .. } => argument.is_none(),
            TokenKind::Binary { left, right, .. } => left.is_none() || right.is_none(),
            _ => false,
        }
    }

    pub(crate) fn is_unbound_unary(&self, wanted: UnaryOp) -> bool {
        matches!(&self.kind, TokenKind::Unary { op, argument: None } if *op == wanted)
    }

    pub(crate) fn is_unbound_binary(&self, wanted: BinaryOp) -> bool {
        matches!(
            &self.kind,
            TokenKind::Binary { op, left: None, right: None } if *op == wanted
        )
    }

    pub(crate) fn bind_argument(&mut self, token: Token) {
        if let TokenKind::Unary { argument, .. } = &mut self.kind {
            *argument = Some(Box::new(token));
            // the argument carries any padding that follows
            self.pad_right = false;
        }
    }

    pub(crate) fn bind_operands(&mut self, lhs: Token, rhs: Token) {
        if let TokenKind::Binary { left, right, .. } = &mut self.kind {
            *left = Some(Box::new(lhs));
            *right = Some(Box::new(rhs));
            self.pad_right = false;
        }
    }

    pub fn has_pad_right(&self) -> bool {
        self.pad_right
    }

    pub(crate) fn set_pad_right(&mut self) {
        self.pad_right = true;
    }

    /// Text of the token without its own padding
    pub fn value(&self) -> String {
        match &self.kind {
            TokenKind::Operand(text) => text.clone(),
            TokenKind::StringGroup(fragments) => fragments.concat(),
            TokenKind::Unary { op, argument } => {
                let mut out = op.symbol().to_string();
                if let Some(argument) = argument {
                    out.push_str(&argument.render());
                }
                out
            }
            TokenKind::Binary { op, left, right } => {
                let mut out = String::new();
                if let Some(left) = left {
                    out.push_str(&left.render());
                    if !out.ends_with(' ') {
                        out.push(' ');
                    }
                }
                out.push_str(op.symbol());
                if let Some(right) = right {
                    out.push(' ');
                    out.push_str(&right.render());
                }
                out
            }
            TokenKind::Scope(scope) => scope.render(),
            TokenKind::Delimiter => " ".to_string(),
        }
    }

    /// Text of the token followed by its trailing pad, if any
    pub fn render(&self) -> String {
        let mut out = self.value();
        if self.pad_right && !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        out
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// An ordered group of tokens: a parenthesized group or the implicit
/// top-level scope
#[derive(Debug, Clone)]
pub struct Scope {
    pub(crate) children: Vec<Token>,
    parenthesized: bool,
    invalid: bool,
}

impl Scope {
    pub fn root() -> Self {
        Self {
            children: Vec::new(),
            parenthesized: false,
            invalid: false,
        }
    }

    pub fn group() -> Self {
        Self {
            children: Vec::new(),
            parenthesized: true,
            invalid: false,
        }
    }

    pub fn children(&self) -> &[Token] {
        &self.children
    }

    pub fn push(&mut self, token: Token) {
        self.children.push(token);
    }

    pub fn is_parenthesized(&self) -> bool {
        self.parenthesized
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub(crate) fn mark_invalid(&mut self) {
        self.invalid = true;
    }

    pub fn is_operand(&self) -> bool {
        !self.invalid && self.children.iter().any(Token::is_operand)
    }

    pub fn render(&self) -> String {
        if self.invalid {
            return String::new();
        }
        let inner: String = self.children.iter().map(Token::render).collect();
        let inner = inner.trim();
        if self.parenthesized {
            format!("({inner})")
        } else {
            inner.to_string()
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
