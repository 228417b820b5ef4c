//! Fixed-point query sanitizer.
//!
//! Each scope is rewritten in cycles: invalid tokens are removed, then
//! prefix operators bind their argument (`!`, `-`, `+`), then infix
//! operators bind both sides in priority order (`AND`, `OR`). Operators that
//! cannot bind are dropped. The whole lex/build/rewrite/render pipeline is
//! then repeated until the rendered query no longer changes.

use super::scope::build_scope;
use super::token::{BinaryOp, Scope, Token, TokenKind, UnaryOp};
use crate::error::{QueryError, Result};
use crate::lexer::{LexerCursor, lex_query};
use crate::utils::SanitizerConfig;
use lru::LruCache;
use rayon::prelude::*;
use std::iter::Peekable;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::{debug, trace, warn};

impl Scope {
    /// Rewrite this scope (children first) until a cycle stops shrinking it,
    /// then keep only valid operands. A scope left with nothing is marked
    /// invalid and renders as an empty string.
    pub(crate) fn sanitize(&mut self, max_passes: usize) {
        for child in &mut self.children {
            if let TokenKind::Scope(scope) = &mut child.kind {
                scope.sanitize(max_passes);
            }
        }

        for pass in 1..=max_passes {
            let before = self.children.len();
            self.rewrite_cycle();
            trace!(pass, before, after = self.children.len(), "scope rewrite cycle");
            if self.children.len() == before {
                break;
            }
        }

        debug_assert!(!self.children.iter().any(Token::is_delimiter));
        self.children.retain(Token::is_operand);
        if self.children.is_empty() {
            self.mark_invalid();
        }
    }

    fn rewrite_cycle(&mut self) {
        let mut tokens = std::mem::take(&mut self.children);
        tokens = remove_invalid(tokens);
        for op in UnaryOp::BINDING_ORDER {
            tokens = bind_unary(tokens, op);
        }
        for op in BinaryOp::BINDING_ORDER {
            tokens = bind_binary(tokens, op);
        }
        self.children = tokens;
    }
}

/// Move a dropped token's trailing pad onto the last emitted token
fn carry_pad(dropped: &Token, output: &mut [Token]) {
    if dropped.has_pad_right()
        && let Some(last) = output.last_mut()
    {
        last.set_pad_right();
    }
}

/// Skip delimiters, padding the last emitted token when something follows
fn skip_delimiters<I>(tokens: &mut Peekable<I>, output: &mut [Token])
where
    I: Iterator<Item = Token>,
{
    let mut skipped = false;
    while tokens.next_if(Token::is_delimiter).is_some() {
        skipped = true;
    }
    if skipped
        && tokens.peek().is_some()
        && let Some(last) = output.last_mut()
    {
        last.set_pad_right();
    }
}

/// Turn delimiters into padding and drop invalid non-operator tokens.
/// Unbound operators are kept for their binding pass.
fn remove_invalid(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    loop {
        skip_delimiters(&mut tokens, &mut output);
        let Some(token) = tokens.next() else {
            break;
        };
        if token.is_operand() || token.is_unbound_operator() {
            output.push(token);
        } else {
            carry_pad(&token, &mut output);
        }
    }
    output
}

fn bind_unary(tokens: Vec<Token>, op: UnaryOp) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    while let Some(mut token) = tokens.next() {
        if !token.is_unbound_unary(op) {
            output.push(token);
            continue;
        }

        skip_delimiters(&mut tokens, &mut output);
        // Modifiers do not stack: `+-a` keeps only `-a`
        match tokens.next_if(|next| next.is_operand() && !next.is_unary()) {
            Some(argument) => {
                token.bind_argument(argument);
                output.push(token);
            }
            None => carry_pad(&token, &mut output),
        }
    }
    output
}

fn bind_binary(tokens: Vec<Token>, op: BinaryOp) -> Vec<Token> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    while let Some(mut token) = tokens.next() {
        if !token.is_unbound_binary(op) {
            output.push(token);
            continue;
        }

        let left_ok = output.last().is_some_and(Token::is_operand);
        skip_delimiters(&mut tokens, &mut output);
        let right = if left_ok {
            tokens.next_if(Token::is_operand)
        } else {
            None
        };

        match right.and_then(|right| output.pop().map(|left| (left, right))) {
            Some((left, right)) => {
                token.bind_operands(left, right);
                output.push(token);
            }
            None => carry_pad(&token, &mut output),
        }
    }
    output
}

/// One lex/build/rewrite/render round
fn heal_once(query: &str, config: &SanitizerConfig) -> Result<(String, Scope)> {
    let cursor = lex_query(query, config.max_captures)?;
    let mut root = build_scope(cursor.captures());
    root.sanitize(config.max_scope_passes);

    let rendered = root.render();
    if rendered.is_empty() {
        return Ok((config.fallback.clone(), root));
    }
    Ok((rendered, root))
}

/// Repeat [`heal_once`] until the output equals its input
fn heal(query: &str, config: &SanitizerConfig) -> Result<(String, Scope)> {
    let mut current = query.to_string();

    for iteration in 1..=config.max_iterations {
        let (rendered, root) = heal_once(&current, config)?;
        if rendered == current {
            return Ok((rendered, root));
        }
        debug!(iteration, from = %current, to = %rendered, "sanitize iteration changed query");
        current = rendered;
    }

    warn!(
        query,
        iterations = config.max_iterations,
        "query did not reach a fixed point"
    );
    Err(QueryError::NoFixedPoint {
        iterations: config.max_iterations,
    })
}

/// Sanitize `query` with the default limits and no memo.
///
/// The result always parses with [`parse_strict`](super::strict::parse_strict)
/// and sanitizing it again returns it unchanged.
pub fn sanitize(query: &str) -> Result<String> {
    heal(query, &SanitizerConfig::default()).map(|(rendered, _)| rendered)
}

/// Configured sanitizer with a memo of recent results
pub struct Sanitizer {
    config: SanitizerConfig,
    cache: Option<Mutex<LruCache<String, String>>>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::with_valid_config(SanitizerConfig::default())
    }
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Result<Self> {
        config.validate()?;

        // The fallback is returned verbatim, so it must already be stable
        let (stable, _) = heal(&config.fallback, &config)?;
        if stable != config.fallback {
            return Err(QueryError::Config(format!(
                "fallback {:?} is not a sanitized query (sanitizes to {:?})",
                config.fallback, stable
            )));
        }

        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: SanitizerConfig) -> Self {
        let cache = NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Self { config, cache }
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn sanitize(&self, query: &str) -> Result<String> {
        if let Some(cache) = &self.cache
            && let Ok(mut cache) = cache.lock()
            && let Some(hit) = cache.get(query)
        {
            return Ok(hit.clone());
        }

        let (rendered, _) = heal(query, &self.config)?;

        if let Some(cache) = &self.cache
            && let Ok(mut cache) = cache.lock()
        {
            cache.put(query.to_string(), rendered.clone());
        }
        Ok(rendered)
    }

    /// Sanitize and return the final token tree alongside the rendered query
    pub fn sanitize_tree(&self, query: &str) -> Result<(String, Scope)> {
        heal(query, &self.config)
    }

    /// Lex `query` with this sanitizer's capture limit
    pub fn lex<'a>(&self, query: &'a str) -> Result<LexerCursor<'a>> {
        lex_query(query, self.config.max_captures)
    }

    /// Sanitize many queries in parallel; results keep the input order
    pub fn sanitize_batch<S>(&self, queries: &[S]) -> Vec<Result<String>>
    where
        S: AsRef<str> + Sync,
    {
        queries.par_iter().map(|q| self.sanitize(q.as_ref())).collect()
    }

    /// Number of memoized results
    pub fn cached(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(query: &str) -> String {
        sanitize(query).unwrap()
    }

    #[test]
    fn test_clean_queries_unchanged() {
        assert_eq!(s("a"), "a");
        assert_eq!(s("a b"), "a b");
        assert_eq!(s("a AND b OR c"), "a AND b OR c");
        assert_eq!(s("+a -b !c"), "+a -b !c");
        assert_eq!(s("\"hello world\"~2"), "\"hello world\"~2");
    }

    #[test]
    fn test_empty_inputs_fall_back() {
        assert_eq!(s(""), "*");
        assert_eq!(s("   "), "*");
        assert_eq!(s("+"), "*");
        assert_eq!(s("()"), "*");
        assert_eq!(s("AND OR"), "*");
    }

    #[test]
    fn test_duplicate_operators() {
        assert_eq!(s("a AND AND b"), "a AND b");
        assert_eq!(s("a OR OR b"), "a OR b");
        assert_eq!(s("a NOT NOT b"), "a !b");
    }

    #[test]
    fn test_dangling_operators() {
        assert_eq!(s("a AND"), "a");
        assert_eq!(s("AND a"), "a");
        assert_eq!(s("a +"), "a");
        assert_eq!(s("a OR AND b"), "a OR b");
    }

    #[test]
    fn test_not_renders_as_bang() {
        assert_eq!(s("NOT a"), "!a");
        assert_eq!(s("a AND NOT b"), "a AND !b");
    }

    #[test]
    fn test_modifiers_do_not_stack() {
        assert_eq!(s("+-a"), "-a");
        assert_eq!(s("NOT -a"), "-a");
    }

    #[test]
    fn test_separated_modifier_binds() {
        assert_eq!(s("a - b"), "a -b");
    }

    #[test]
    fn test_groups() {
        assert_eq!(s("(a (b) c"), "(a (b) c)");
        assert_eq!(s("a ) b ) c )"), "a b c");
        assert_eq!(s("(a AND)"), "(a)");
        assert_eq!(s("() a"), "a");
        assert_eq!(
            s("((a OR c) AND d) AND E OR (g AND h OR i)"),
            "((a OR c) AND d) AND E OR (g AND h OR i)"
        );
    }

    #[test]
    fn test_phrases() {
        assert_eq!(s("\"quote\""), "\"quote\"");
        assert_eq!(s("\""), "\"\"");
        assert_eq!(s("test \"quote\\"), "test \"quote\"");
    }

    #[test]
    fn test_unknown_characters_split_terms() {
        assert_eq!(s("title:rust"), "title rust");
    }

    #[test]
    fn test_idempotent() {
        for query in ["a AND", "(a (b", "NOT NOT", "\"x", "a OR (b AND) c"] {
            let once = s(query);
            assert_eq!(s(&once), once, "not idempotent for {query:?}");
        }
    }

    #[test]
    fn test_too_complex() {
        let query = "a ".repeat(300);
        assert!(matches!(
            sanitize(&query),
            Err(QueryError::TooComplex { limit: 256 })
        ));
    }

    #[test]
    fn test_sanitize_tree() {
        let sanitizer = Sanitizer::default();
        let (rendered, root) = sanitizer.sanitize_tree("a AND b").unwrap();
        assert_eq!(rendered, "a AND b");
        assert_eq!(root.children().len(), 1);
        assert!(matches!(
            root.children()[0].kind,
            TokenKind::Binary { op: BinaryOp::And, .. }
        ));
    }

    #[test]
    fn test_sanitizer_memo() {
        let sanitizer = Sanitizer::default();
        assert_eq!(sanitizer.sanitize("a AND").unwrap(), "a");
        assert_eq!(sanitizer.sanitize("a AND").unwrap(), "a");
        assert_eq!(sanitizer.cached(), 1);

        let uncached = Sanitizer::new(SanitizerConfig {
            cache_capacity: 0,
            ..Default::default()
        })
        .unwrap();
        uncached.sanitize("a").unwrap();
        assert_eq!(uncached.cached(), 0);
    }

    #[test]
    fn test_unstable_fallback_rejected() {
        let config = SanitizerConfig {
            fallback: "AND".into(),
            ..Default::default()
        };
        assert!(matches!(Sanitizer::new(config), Err(QueryError::Config(_))));
    }

    #[test]
    fn test_batch_keeps_order() {
        let sanitizer = Sanitizer::default();
        let results = sanitizer.sanitize_batch(&["a AND", "(b", "+"]);
        let results: Vec<String> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results, vec!["a", "(b)", "*"]);
    }

    #[test]
    fn test_no_fixed_point_within_iteration_cap() {
        let sanitizer = Sanitizer::new(SanitizerConfig {
            max_iterations: 1,
            ..SanitizerConfig::default()
        })
        .unwrap();

        // already stable: one pass is enough
        assert_eq!(sanitizer.sanitize("a AND b").unwrap(), "a AND b");

        let err = sanitizer.sanitize("a AND").unwrap_err();
        assert!(matches!(err, QueryError::NoFixedPoint { iterations: 1 }));
        assert!(err.is_limit());

        // failures are not memoized
        assert!(sanitizer.sanitize("a AND").is_err());
    }

    #[test]
    fn test_custom_limits() {
        let sanitizer = Sanitizer::new(SanitizerConfig {
            max_captures: 4,
            ..Default::default()
        })
        .unwrap();
        assert!(sanitizer.sanitize("a b c d e").unwrap_err().is_limit());
        assert_eq!(sanitizer.lex("ab").unwrap().captures().len(), 1);
    }
}
