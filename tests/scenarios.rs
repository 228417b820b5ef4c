//! End-to-end repair scenarios. Every output must also parse with the strict
//! grammar and be stable under a second sanitize.

use qheal::query::{QueryNode, parse_strict};
use qheal::{QueryError, sanitize};

fn assert_heals(input: &str, expected: &str) {
    let sanitized = sanitize(input).unwrap();
    assert_eq!(sanitized, expected, "sanitizing {input:?}");

    if let Err(e) = parse_strict(&sanitized) {
        panic!("{sanitized:?} (from {input:?}) is not valid: {e}");
    }
    assert_eq!(sanitize(&sanitized).unwrap(), sanitized, "{input:?} is not stable");
}

#[test]
fn test_phrase_unchanged() {
    assert_heals("\"quote\"", "\"quote\"");
}

#[test]
fn test_two_phrases() {
    assert_heals("\"quote\" \"quote\"", "\"quote\" \"quote\"");
    assert_heals("\"a b\" AND \"c d\"", "\"a b\" AND \"c d\"");
}

#[test]
fn test_phrase_fuzziness() {
    assert_heals("\"quote\"~.1", "\"quote\"~.1");
    assert_heals("\"quote\"~1", "\"quote\"~1");
    assert_heals("roam~0.8 foam~1", "roam~0.8 foam~1");
}

#[test]
fn test_term_similarity_above_one_dropped() {
    assert_heals("roam~0.8 foam~2", "roam~0.8 foam");
    assert_heals("roam~1.5", "roam");
    assert_heals("roam~1234.5 AND x", "roam AND x");
}

#[test]
fn test_symbolic_conjunctions() {
    assert_heals("a && b", "a AND b");
    assert_heals("a || b && c", "a OR b AND c");
    assert_heals("a &&", "a");
    assert_heals("a & b | c", "a b c");
}

#[test]
fn test_unterminated_phrase() {
    assert_heals("test \"quote hello test", "test \"quote hello test\"");
    assert_heals("test \"quote\\", "test \"quote\"");
    assert_heals("\"", "\"\"");
}

#[test]
fn test_orphan_escape_in_phrase() {
    assert_heals("test \"quote\\3\"", "test \"quote\"");
}

#[test]
fn test_escaped_quote_kept() {
    assert_heals(r#""say \"hi\"""#, r#""say \"hi\"""#);
}

#[test]
fn test_missing_close_parens() {
    assert_heals("(a (b) c", "(a (b) c)");
    assert_heals("(a (b c", "(a (b c))");
}

#[test]
fn test_stray_close_parens() {
    assert_heals("a ) b ) c )", "a b c");
    assert_heals(")a", "a");
}

#[test]
fn test_nested_groups_unchanged() {
    assert_heals(
        "((a OR c) AND d) AND E OR (g AND h OR i)",
        "((a OR c) AND d) AND E OR (g AND h OR i)",
    );
    assert_heals("((a))", "((a))");
}

#[test]
fn test_repeated_operators() {
    assert_heals("a AND AND b", "a AND b");
    assert_heals("a OR OR b", "a OR b");
    assert_heals("a NOT NOT b", "a !b");
}

#[test]
fn test_dangling_operators() {
    assert_heals("a AND", "a");
    assert_heals("a +", "a");
    assert_heals("OR a", "a");
    assert_heals("(AND a)", "(a)");
}

#[test]
fn test_empty_results_fall_back() {
    assert_heals("", "*");
    assert_heals("+", "*");
    assert_heals("( )", "*");
    assert_heals("NOT", "*");
}

#[test]
fn test_structure_preserved() {
    let sanitized = sanitize("a AND b OR NOT c").unwrap();
    assert_eq!(sanitized, "a AND b OR !c");

    let query = parse_strict(&sanitized).unwrap();
    match query.root {
        QueryNode::Or(nodes) => {
            assert!(matches!(nodes[0], QueryNode::And(_)));
            assert!(matches!(nodes[1], QueryNode::Not(_)));
        }
        other => panic!("expected OR at the root, got {other}"),
    }
}

#[test]
fn test_field_syntax_becomes_terms() {
    assert_heals("title:rust^2", "title rust 2");
}

#[test]
fn test_limit_is_reported() {
    let query = "x ".repeat(1000);
    assert!(matches!(sanitize(&query), Err(QueryError::TooComplex { .. })));
}
