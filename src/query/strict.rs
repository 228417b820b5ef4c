//! Strict parser for the classic boolean query grammar.
//!
//! ```text
//! query    := clause ( conj? clause )*
//! conj     := AND | OR
//! clause   := modifier? primary
//! modifier := '+' | '-' | '!' | NOT
//! primary  := term | phrase | '(' query ')'
//! term     := ( [\w.*?] | '\' any )+ fuzzy?
//! phrase   := '"' ( '\' any | [^"\\] )* '"' fuzzy?
//! fuzzy    := '~' ( digits? '.'? digits )?
//! ```
//!
//! A term's fuzzy value is a similarity and may not exceed 1; a phrase's is
//! a slop and may be any number.
//!
//! Unlike the sanitizer this parser repairs nothing: any deviation is a
//! [`QueryError::Syntax`]. `AND` binds tighter than `OR`, and both bind
//! tighter than plain adjacency.

use crate::error::{QueryError, Result};
use crate::lexer::cursor::anchored;
use crate::lexer::grammar::{NOT_LOOKAHEAD, WORD_OPERATOR, is_term_similarity};
use std::fmt;

const TERM: &str = r"(?:[\w.*?]|\\(?s:.))+";
const FUZZY: &str = r"~(?:\d*\.?\d+)?";

/// Parsed query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub root: QueryNode,
}

/// Query AST node
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Bare term, possibly with wildcards
    Term {
        text: String,
        fuzziness: Option<String>,
    },
    /// Quoted phrase (text without the quotes)
    Phrase {
        text: String,
        fuzziness: Option<String>,
    },
    /// Parenthesized sub-query
    Group(Box<QueryNode>),
    /// `!` or `NOT`
    Not(Box<QueryNode>),
    /// `+`
    Required(Box<QueryNode>),
    /// `-`
    Prohibited(Box<QueryNode>),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    /// Clauses with no explicit conjunction
    Sequence(Vec<QueryNode>),
}

impl QueryNode {
    /// Number of terms and phrases under this node
    pub fn leaf_count(&self) -> usize {
        match self {
            QueryNode::Term { .. } | QueryNode::Phrase { .. } => 1,
            QueryNode::Group(inner)
            | QueryNode::Not(inner)
            | QueryNode::Required(inner)
            | QueryNode::Prohibited(inner) => inner.leaf_count(),
            QueryNode::And(nodes) | QueryNode::Or(nodes) | QueryNode::Sequence(nodes) => {
                nodes.iter().map(QueryNode::leaf_count).sum()
            }
        }
    }

    /// Maximum group nesting under this node
    pub fn group_depth(&self) -> usize {
        match self {
            QueryNode::Term { .. } | QueryNode::Phrase { .. } => 0,
            QueryNode::Group(inner) => 1 + inner.group_depth(),
            QueryNode::Not(inner) | QueryNode::Required(inner) | QueryNode::Prohibited(inner) => {
                inner.group_depth()
            }
            QueryNode::And(nodes) | QueryNode::Or(nodes) | QueryNode::Sequence(nodes) => {
                nodes.iter().map(QueryNode::group_depth).max().unwrap_or(0)
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, nodes: &[QueryNode]) -> fmt::Result {
    write!(f, "({name}")?;
    for node in nodes {
        write!(f, " {node}")?;
    }
    f.write_str(")")
}

/// S-expression form, e.g. `(OR (AND a b) (NOT c))`
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Term { text, fuzziness } => {
                write!(f, "{text}{}", fuzziness.as_deref().unwrap_or(""))
            }
            QueryNode::Phrase { text, fuzziness } => {
                write!(f, "\"{text}\"{}", fuzziness.as_deref().unwrap_or(""))
            }
            QueryNode::Group(inner) => write!(f, "(GROUP {inner})"),
            QueryNode::Not(inner) => write!(f, "(NOT {inner})"),
            QueryNode::Required(inner) => write!(f, "(REQUIRED {inner})"),
            QueryNode::Prohibited(inner) => write!(f, "(PROHIBITED {inner})"),
            QueryNode::And(nodes) => write_list(f, "AND", nodes),
            QueryNode::Or(nodes) => write_list(f, "OR", nodes),
            QueryNode::Sequence(nodes) => write_list(f, "SEQ", nodes),
        }
    }
}

/// Parse `input`, failing on anything outside the grammar
pub fn parse_strict(input: &str) -> Result<Query> {
    let mut parser = StrictParser::new(input);
    parser.parse()
}

/// Check `input` against the grammar without keeping the tree
pub fn is_valid(input: &str) -> bool {
    parse_strict(input).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conj {
    And,
    Or,
}

impl Conj {
    fn keyword(&self) -> &'static str {
        match self {
            Conj::And => "AND",
            Conj::Or => "OR",
        }
    }
}

struct StrictParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> StrictParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> Result<Query> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(QueryError::syntax(0, "empty query"));
        }

        let root = self.parse_sequence()?;

        self.skip_whitespace();
        if !self.is_eof() {
            return Err(self.unexpected());
        }
        Ok(Query { root })
    }

    fn parse_sequence(&mut self) -> Result<QueryNode> {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_eof() || self.peek_char() == Some(')') {
                break;
            }
            nodes.push(self.parse_or()?);
        }

        match nodes.len() {
            0 => Err(QueryError::syntax(self.pos, "expected a term")),
            1 => Ok(nodes.remove(0)),
            _ => Ok(QueryNode::Sequence(nodes)),
        }
    }

    fn parse_or(&mut self) -> Result<QueryNode> {
        let mut nodes = vec![self.parse_and()?];

        while self.consume_conj(Conj::Or)? {
            nodes.push(self.parse_and()?);
        }

        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            QueryNode::Or(nodes)
        })
    }

    fn parse_and(&mut self) -> Result<QueryNode> {
        let mut nodes = vec![self.parse_clause()?];

        while self.consume_conj(Conj::And)? {
            nodes.push(self.parse_clause()?);
        }

        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            QueryNode::And(nodes)
        })
    }

    fn parse_clause(&mut self) -> Result<QueryNode> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(QueryError::syntax(self.pos, "expected a term"));
        }
        if self.at_conj()? {
            return Err(QueryError::syntax(
                self.pos,
                format!("unexpected conjunction {:?}", self.word_at()),
            ));
        }

        let Some(modifier) = self.consume_modifier()? else {
            return self.parse_primary();
        };

        self.skip_whitespace();
        if self.is_eof() || self.peek_char() == Some(')') {
            return Err(QueryError::syntax(self.pos, "modifier without a term"));
        }
        if self.at_modifier()? {
            return Err(QueryError::syntax(self.pos, "modifiers cannot be stacked"));
        }

        let inner = Box::new(self.parse_primary()?);
        Ok(match modifier {
            '+' => QueryNode::Required(inner),
            '-' => QueryNode::Prohibited(inner),
            _ => QueryNode::Not(inner),
        })
    }

    fn parse_primary(&mut self) -> Result<QueryNode> {
        let open = self.pos;

        if self.consume_char('(') {
            self.skip_whitespace();
            if self.peek_char() == Some(')') {
                return Err(QueryError::syntax(open, "empty group"));
            }
            let inner = self.parse_sequence()?;
            self.skip_whitespace();
            if !self.consume_char(')') {
                return Err(QueryError::syntax(open, "unclosed group"));
            }
            return Ok(QueryNode::Group(Box::new(inner)));
        }

        if self.peek_char() == Some('"') {
            return self.parse_phrase();
        }

        if self.at_conj()? {
            return Err(QueryError::syntax(
                self.pos,
                format!("unexpected conjunction {:?}", self.word_at()),
            ));
        }

        match self.match_len(TERM)? {
            Some(len) => {
                let text = self.input[self.pos..self.pos + len].to_string();
                self.pos += len;
                let at = self.pos;
                let fuzziness = self.parse_fuzziness()?;
                if let Some(similarity) = fuzziness.as_deref().and_then(|f| f.strip_prefix('~'))
                    && !similarity.is_empty()
                    && !is_term_similarity(similarity)
                {
                    return Err(QueryError::syntax(
                        at,
                        format!("term similarity {similarity} is greater than 1"),
                    ));
                }
                Ok(QueryNode::Term { text, fuzziness })
            }
            None => Err(self.unexpected()),
        }
    }

    fn parse_phrase(&mut self) -> Result<QueryNode> {
        let open = self.pos;
        self.consume_char('"');
        let start = self.pos;

        loop {
            match self.peek_char() {
                None => return Err(QueryError::syntax(open, "unclosed phrase")),
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    if self.is_eof() {
                        return Err(QueryError::syntax(open, "unclosed phrase"));
                    }
                    self.advance();
                }
                Some(_) => self.advance(),
            }
        }

        let text = self.input[start..self.pos].to_string();
        self.consume_char('"');
        let fuzziness = self.parse_fuzziness()?;
        Ok(QueryNode::Phrase { text, fuzziness })
    }

    fn parse_fuzziness(&mut self) -> Result<Option<String>> {
        Ok(self.match_len(FUZZY)?.map(|len| {
            let fuzzy = self.input[self.pos..self.pos + len].to_string();
            self.pos += len;
            fuzzy
        }))
    }

    /// Skip whitespace and consume `conj` if it comes next
    fn consume_conj(&mut self, conj: Conj) -> Result<bool> {
        let start = self.pos;
        self.skip_whitespace();

        if self.at_conj()? && self.remaining().starts_with(conj.keyword()) {
            self.pos += conj.keyword().len();
            return Ok(true);
        }

        self.pos = start;
        Ok(false)
    }

    fn consume_modifier(&mut self) -> Result<Option<char>> {
        if self.match_len(NOT_LOOKAHEAD)?.is_some() {
            self.pos += "NOT".len();
            return Ok(Some('!'));
        }
        match self.peek_char() {
            Some(c @ ('+' | '-' | '!')) => {
                self.advance();
                Ok(Some(c))
            }
            _ => Ok(None),
        }
    }

    fn at_modifier(&self) -> Result<bool> {
        Ok(matches!(self.peek_char(), Some('+' | '-' | '!'))
            || self.match_len(NOT_LOOKAHEAD)?.is_some())
    }

    fn at_conj(&self) -> Result<bool> {
        Ok(self.match_len(WORD_OPERATOR)?.is_some())
    }

    fn match_len(&self, pattern: &str) -> Result<Option<usize>> {
        let regex = anchored(pattern)?;
        Ok(regex
            .find(self.remaining())
            .map(|m| m.end())
            .filter(|&len| len > 0))
    }

    fn unexpected(&self) -> QueryError {
        match self.peek_char() {
            Some(c) => QueryError::syntax(self.pos, format!("unexpected {c:?}")),
            None => QueryError::syntax(self.pos, "unexpected end of query"),
        }
    }

    fn word_at(&self) -> &str {
        let rest = self.remaining();
        let end = rest.find(|c: char| !c.is_alphanumeric()).unwrap_or(rest.len());
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(input: &str) -> String {
        parse_strict(input).unwrap().root.to_string()
    }

    fn rejects(input: &str) -> bool {
        matches!(parse_strict(input), Err(QueryError::Syntax { .. }))
    }

    #[test]
    fn test_simple_term() {
        let q = parse_strict("hello").unwrap();
        assert!(matches!(q.root, QueryNode::Term { ref text, fuzziness: None } if text == "hello"));
    }

    #[test]
    fn test_phrase() {
        let q = parse_strict("\"hello world\"~2").unwrap();
        assert_eq!(
            q.root,
            QueryNode::Phrase {
                text: "hello world".to_string(),
                fuzziness: Some("~2".to_string()),
            }
        );
    }

    #[test]
    fn test_fuzziness_forms() {
        assert_eq!(tree("roam~"), "roam~");
        assert_eq!(tree("roam~0.8"), "roam~0.8");
        assert_eq!(tree("\"quote\"~.1"), "\"quote\"~.1");
        assert_eq!(tree("roam~1"), "roam~1");
        assert_eq!(tree("\"quote\"~12"), "\"quote\"~12");
    }

    #[test]
    fn test_term_similarity_above_one_rejected() {
        assert!(rejects("roam~1.5"));
        assert!(rejects("roam~2"));
        assert!(rejects("a roam~1234.5"));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(tree("a AND b OR c"), "(OR (AND a b) c)");
        assert_eq!(tree("a OR b AND c"), "(OR a (AND b c))");
        assert_eq!(tree("a b AND c"), "(SEQ a (AND b c))");
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(tree("+a -b !c NOT d"), "(SEQ (REQUIRED a) (PROHIBITED b) (NOT c) (NOT d))");
    }

    #[test]
    fn test_groups() {
        assert_eq!(tree("(a OR b) AND c"), "(AND (GROUP (OR a b)) c)");
        assert_eq!(tree("a(b)"), "(SEQ a (GROUP b))");
        let q = parse_strict("((a) b)").unwrap();
        assert_eq!(q.root.group_depth(), 2);
        assert_eq!(q.root.leaf_count(), 2);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(tree(r"a\:b"), r"a\:b");
        assert_eq!(tree(r#""say \"hi\"""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_keywords_inside_words() {
        assert_eq!(tree("ANDROID OR NOTHING"), "(OR ANDROID NOTHING)");
    }

    #[test]
    fn test_rejects() {
        assert!(rejects(""));
        assert!(rejects("   "));
        assert!(rejects("AND a"));
        assert!(rejects("a AND"));
        assert!(rejects("a AND AND b"));
        assert!(rejects("a OR AND b"));
        assert!(rejects("+-a"));
        assert!(rejects("a +"));
        assert!(rejects("()"));
        assert!(rejects("(a"));
        assert!(rejects("a)"));
        assert!(rejects("\"open"));
        assert!(rejects("a:b"));
        assert!(rejects("a \\"));
    }

    #[test]
    fn test_error_position() {
        match parse_strict("a b)") {
            Err(QueryError::Syntax { position, .. }) => assert_eq!(position, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
