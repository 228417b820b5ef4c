//! Regex-driven scanning cursor
//!
//! The cursor never backtracks: every attempt is an anchored match at the
//! current offset, and the offset only moves forward. Grammar drivers (see
//! [`grammar`](super::grammar)) compose the primitives below into a lexer.

use super::capture::{Capture, CaptureKind, ScopeId};
use crate::error::{QueryError, Result};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::debug;

/// Compiled patterns shared by every cursor, keyed by the unanchored source.
///
/// Handed out behind an `Arc` so every caller shares one regex and its
/// search cache pool; cloning a `Regex` would start a fresh pool.
static PATTERNS: LazyLock<RwLock<FxHashMap<String, Arc<Regex>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// Compile (or fetch) `pattern` anchored to the start of the haystack.
///
/// The `regex` crate has no `\G`, so anchoring is done by matching
/// `^(?:pattern)` against the unconsumed suffix of the input.
pub(crate) fn anchored(pattern: &str) -> Result<Arc<Regex>> {
    if let Ok(cache) = PATTERNS.read()
        && let Some(regex) = cache.get(pattern)
    {
        return Ok(Arc::clone(regex));
    }

    let regex = Arc::new(Regex::new(&format!("^(?:{pattern})"))?);
    if let Ok(mut cache) = PATTERNS.write() {
        // Another thread may have compiled it first; keep theirs
        let cached = cache
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&regex));
        return Ok(Arc::clone(cached));
    }
    Ok(regex)
}

/// Stateful scanner over one input string
#[derive(Debug)]
pub struct LexerCursor<'a> {
    input: &'a str,
    position: usize,
    captures: Vec<Capture>,
    stack: Vec<ScopeId>,
    next_scope: u32,
    max_captures: usize,
}

impl<'a> LexerCursor<'a> {
    pub fn new(input: &'a str, max_captures: usize) -> Self {
        Self {
            input,
            position: 0,
            captures: Vec::new(),
            stack: Vec::new(),
            next_scope: 0,
            max_captures,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn into_captures(self) -> Vec<Capture> {
        self.captures
    }

    pub fn last_capture(&self) -> Option<&Capture> {
        self.captures.last()
    }

    /// Captures that take part in sanitizing (ignored input filtered out)
    pub fn vital_captures(&self) -> impl Iterator<Item = &Capture> {
        self.captures.iter().filter(|c| c.is_vital())
    }

    /// Number of scopes opened and not yet closed
    pub fn open_depth(&self) -> usize {
        self.stack.len()
    }

    /// Length of a non-empty anchored match at the current offset
    fn match_len(&self, pattern: &str) -> Result<Option<usize>> {
        if self.is_eof() {
            return Ok(None);
        }
        let regex = anchored(pattern)?;
        Ok(regex
            .find(self.remaining())
            .map(|m| m.end())
            .filter(|&len| len > 0))
    }

    /// Look ahead without consuming or recording anything
    pub fn peek(&self, pattern: &str) -> Result<bool> {
        Ok(self.match_len(pattern)?.is_some())
    }

    /// Text `pattern` would match at the current offset, without consuming it
    pub fn peek_text(&self, pattern: &str) -> Result<Option<&'a str>> {
        Ok(self
            .match_len(pattern)?
            .map(|len| &self.input[self.position..self.position + len]))
    }

    /// Match `pattern` at the current offset; on success record a capture
    /// of `kind` and advance past it
    pub fn try_match(&mut self, kind: Option<CaptureKind>, pattern: &str) -> Result<bool> {
        let Some(len) = self.match_len(pattern)? else {
            return Ok(false);
        };
        self.take(kind, len)?;
        Ok(true)
    }

    /// Record the next `len` bytes as a capture of `kind` and advance past
    /// them. `len` is clamped to the remaining input and to a char boundary.
    pub fn take(&mut self, kind: Option<CaptureKind>, len: usize) -> Result<()> {
        let mut len = len.min(self.input.len() - self.position);
        while !self.input.is_char_boundary(self.position + len) {
            len -= 1;
        }
        if len == 0 {
            return Ok(());
        }

        let literal = &self.input[self.position..self.position + len];
        let mut capture = Capture::matched(kind, self.position, literal);
        capture.depth = self.stack.len();
        capture.scope = self.stack.last().copied();
        self.record(capture)?;
        self.position += len;
        Ok(())
    }

    /// Consume a match without it taking part in sanitizing
    pub fn ignore(&mut self, pattern: &str) -> Result<bool> {
        self.try_match(None, pattern)
    }

    /// Try to open a nested scope. Returns whether any scope is open
    /// afterwards, which lets callers keep looping inside an open group.
    pub fn try_push(&mut self, kind: CaptureKind, pattern: &str, depth: &mut usize) -> Result<bool> {
        if self.try_match(Some(kind), pattern)? {
            self.push_scope();
            *depth += 1;
        }
        Ok(!self.stack.is_empty())
    }

    /// Try to close the innermost scope. Returns whether every scope is
    /// closed afterwards.
    pub fn try_pop(&mut self, kind: CaptureKind, pattern: &str, depth: &mut usize) -> Result<bool> {
        if self.try_match(Some(kind), pattern)? {
            self.pop_scope();
            *depth = depth.saturating_sub(1);
        }
        Ok(self.stack.is_empty())
    }

    /// Inject a capture that no regex produced, used to repair the input
    /// (closing an unterminated phrase or group). Advances by at most
    /// `advance_by` characters and optionally closes the innermost scope.
    pub fn fake_match(
        &mut self,
        kind: CaptureKind,
        value: &str,
        advance_by: usize,
        pop: bool,
    ) -> Result<()> {
        let consumed: usize = self
            .remaining()
            .chars()
            .take(advance_by)
            .map(char::len_utf8)
            .sum();
        let literal = &self.input[self.position..self.position + consumed];

        debug!(kind = kind.label(), value, position = self.position, "synthetic capture");

        let mut capture = Capture::synthetic(kind, self.position, literal, value);
        capture.depth = self.stack.len();
        capture.scope = self.stack.last().copied();
        self.record(capture)?;
        self.position += consumed;

        if pop {
            self.pop_scope();
        }
        Ok(())
    }

    /// Force one character of progress when no rule accepts the input.
    ///
    /// The character is recorded as a separator so the tokens around it do
    /// not run together.
    pub fn force_skip(&mut self) -> Result<()> {
        self.skip_char(CaptureKind::Whitespace, " ")
    }

    /// Consume one character as a synthetic capture of `kind` carrying
    /// `value`. No-op at end of input.
    pub fn skip_char(&mut self, kind: CaptureKind, value: &str) -> Result<()> {
        if self.is_eof() {
            return Ok(());
        }
        self.fake_match(kind, value, 1, false)
    }

    fn record(&mut self, capture: Capture) -> Result<()> {
        if self.captures.len() >= self.max_captures {
            return Err(QueryError::TooComplex {
                limit: self.max_captures,
            });
        }
        self.captures.push(capture);
        Ok(())
    }

    fn push_scope(&mut self) {
        let id = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.stack.push(id);

        if let Some(last) = self.captures.last_mut() {
            last.depth = self.stack.len();
            last.scope = Some(id);
        }
    }

    fn pop_scope(&mut self) {
        let depth = self.stack.len();
        let popped = self.stack.pop();

        if let Some(last) = self.captures.last_mut() {
            last.depth = depth;
            last.scope = popped;
        }
    }
}
