//! Query grammar driver
//!
//! Tokenizes a boolean query into captures. The driver never fails on
//! malformed input: unterminated phrases and groups are closed with
//! synthetic captures, stray `)` are ignored and characters no rule accepts
//! are turned into separators.

use super::capture::CaptureKind;
use super::cursor::LexerCursor;
use crate::error::Result;
use tracing::debug;

const WHITESPACE: &str = r"\s+";
const PAREN_OPEN: &str = r"\(";
const PAREN_CLOSE: &str = r"\)";

const QUOTE: &str = "\"";
/// Closing quote with an optional proximity/fuzziness suffix (`"..."~2`)
const QUOTE_CLOSE: &str = r#""(?:~(?:\d{0,4}\.\d{1,4}|\d{1,4}))?"#;
const ESCAPED_QUOTE: &str = r#"\\""#;
/// Any other backslash escape inside a phrase, or a trailing backslash
const ORPHAN_BACKSLASH: &str = r"\\(?s:.)?";
const PHRASE_TEXT: &str = r#"[^\\"]+"#;

const SINGLE_CHAR_OPERATOR: &str = r"[+\-!]";
/// Symbolic conjunctions, recorded under their keyword
const SYMBOL_AND: &str = "&&";
const SYMBOL_OR: &str = r"\|\|";
pub(crate) const WORD_OPERATOR: &str = r"(?:AND|OR)\b";
/// `NOT` only counts when nothing that could extend an operand follows
pub(crate) const NOT_LOOKAHEAD: &str = r"NOT(?:$|[^\w.*?])";
const NOT_OPERATOR: &str = "NOT";

const OPERAND: &str = r"[\w.*?]+";
/// Operand with a numeric `~` suffix; the suffix is validated before use
const FUZZY_OPERAND: &str = r"[\w.*?]+~[\d.]*\d";
/// Most fractional digits kept on a term similarity
const MAX_SIMILARITY_DIGITS: usize = 4;

/// Whether `value`, the text after a term's `~`, is a similarity the
/// classic grammar accepts: a number no greater than 1.
pub(crate) fn is_term_similarity(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(|v| (0.0..=1.0).contains(&v))
}

/// Tokenize `input`, failing only when more than `max_captures` captures
/// would be produced.
pub fn lex_query(input: &str, max_captures: usize) -> Result<LexerCursor<'_>> {
    let mut cursor = LexerCursor::new(input, max_captures);

    while !cursor.is_eof() {
        let start = cursor.position();

        if extract_content(&mut cursor)? {
            continue;
        }

        // A closing paren with no open group
        cursor.ignore(PAREN_CLOSE)?;

        let mut closures_required = 0usize;
        while !cursor.is_eof() {
            let step = cursor.position();

            if !cursor.try_push(CaptureKind::OpenParen, PAREN_OPEN, &mut closures_required)? {
                break;
            }
            if extract_content(&mut cursor)? {
                continue;
            }
            if cursor.try_pop(CaptureKind::CloseParen, PAREN_CLOSE, &mut closures_required)? {
                break;
            }
            if cursor.position() == step {
                cursor.force_skip()?;
            }
        }

        while closures_required > 0 {
            closures_required -= 1;
            cursor.fake_match(CaptureKind::CloseParen, ")", 0, true)?;
        }

        if cursor.position() == start {
            cursor.force_skip()?;
        }
    }

    Ok(cursor)
}

/// Whitespace, a phrase, then an operator or an operand. Returns whether
/// anything was consumed.
fn extract_content(cursor: &mut LexerCursor<'_>) -> Result<bool> {
    let start = cursor.position();

    cursor.try_match(Some(CaptureKind::Whitespace), WHITESPACE)?;
    extract_phrase(cursor)?;
    if !extract_operator(cursor)? {
        extract_operand(cursor)?;
    }

    Ok(cursor.position() > start)
}

fn extract_phrase(cursor: &mut LexerCursor<'_>) -> Result<bool> {
    if !cursor.peek(QUOTE)? {
        return Ok(false);
    }
    cursor.try_match(Some(CaptureKind::Quote), QUOTE)?;

    loop {
        if cursor.is_eof() {
            cursor.fake_match(CaptureKind::Quote, QUOTE, 0, false)?;
            return Ok(true);
        }
        if cursor.try_match(Some(CaptureKind::Quote), QUOTE_CLOSE)? {
            return Ok(true);
        }
        if cursor.try_match(Some(CaptureKind::Quote), ESCAPED_QUOTE)? {
            continue;
        }
        if cursor.ignore(ORPHAN_BACKSLASH)? {
            continue;
        }
        if cursor.try_match(Some(CaptureKind::Quote), PHRASE_TEXT)? {
            continue;
        }
        // Every character is a quote, a backslash or phrase text, so this
        // only guards against a pattern regression
        cursor.force_skip()?;
    }
}

fn extract_operator(cursor: &mut LexerCursor<'_>) -> Result<bool> {
    if cursor.try_match(Some(CaptureKind::Operator), SINGLE_CHAR_OPERATOR)? {
        return Ok(true);
    }
    if cursor.try_match(Some(CaptureKind::Operator), WORD_OPERATOR)? {
        return Ok(true);
    }
    if cursor.peek(SYMBOL_AND)? {
        cursor.fake_match(CaptureKind::Operator, "AND", 2, false)?;
        return Ok(true);
    }
    if cursor.peek(SYMBOL_OR)? {
        cursor.fake_match(CaptureKind::Operator, "OR", 2, false)?;
        return Ok(true);
    }
    if cursor.peek(NOT_LOOKAHEAD)? {
        return cursor.try_match(Some(CaptureKind::Operator), NOT_OPERATOR);
    }
    Ok(false)
}

/// A term, keeping a `~` similarity suffix only when it is at most 1 with
/// no more than four fractional digits. Any other suffix is dropped.
fn extract_operand(cursor: &mut LexerCursor<'_>) -> Result<bool> {
    let Some(fuzzy) = cursor.peek_text(FUZZY_OPERAND)? else {
        return cursor.try_match(Some(CaptureKind::Operand), OPERAND);
    };
    let Some((term, similarity)) = fuzzy.split_once('~') else {
        return cursor.try_match(Some(CaptureKind::Operand), OPERAND);
    };

    let fraction_digits = similarity.split_once('.').map_or(0, |(_, f)| f.len());
    if fraction_digits <= MAX_SIMILARITY_DIGITS && is_term_similarity(similarity) {
        cursor.take(Some(CaptureKind::Operand), fuzzy.len())?;
    } else {
        debug!(similarity, "dropping out of range term similarity");
        cursor.take(Some(CaptureKind::Operand), term.len())?;
        cursor.take(None, fuzzy.len() - term.len())?;
    }
    Ok(true)
}
