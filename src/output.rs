//! Colored terminal output for the command line tool

use crate::error::QueryError;
use crate::lexer::{Capture, CaptureKind};
use crate::query::{Query, Scope, Token, TokenKind};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Stdout stream honoring the `--color` switch
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn kind_color(kind: Option<CaptureKind>) -> Color {
    match kind {
        Some(CaptureKind::Operator) => Color::Yellow,
        Some(CaptureKind::Operand) => Color::Green,
        Some(CaptureKind::Quote) => Color::Cyan,
        Some(CaptureKind::OpenParen) | Some(CaptureKind::CloseParen) => Color::Magenta,
        Some(CaptureKind::Whitespace) | None => Color::White,
    }
}

/// Print one line per capture: offset range, kind, value.
///
/// Ignored captures are only listed when `all` is set.
pub fn print_captures(out: &mut impl WriteColor, captures: &[Capture], all: bool) -> io::Result<()> {
    for capture in captures.iter().filter(|c| all || c.is_vital()) {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
        write!(out, "{:>4}..{:<4}", capture.start, capture.end())?;
        out.reset()?;

        let label = capture.kind.map(|k| k.label()).unwrap_or("IGNORED");
        out.set_color(ColorSpec::new().set_fg(Some(kind_color(capture.kind))).set_bold(true))?;
        write!(out, " {label:<12}")?;
        out.reset()?;

        write!(out, " depth={} {:?}", capture.depth, capture.value())?;
        if capture.synthetic {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(out, " (synthetic, from {:?})", capture.literal())?;
            out.reset()?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Print the token tree, one node per line, indented by depth
pub fn print_tree(out: &mut impl WriteColor, root: &Scope) -> io::Result<()> {
    print_scope(out, root, 0)
}

fn print_scope(out: &mut impl WriteColor, scope: &Scope, indent: usize) -> io::Result<()> {
    let name = if scope.is_parenthesized() { "group" } else { "root" };
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(out, "{:indent$}{name}", "")?;
    out.reset()?;
    writeln!(out, " {:?}", scope.render())?;

    for child in scope.children() {
        print_token(out, child, indent + 2)?;
    }
    Ok(())
}

fn print_token(out: &mut impl WriteColor, token: &Token, indent: usize) -> io::Result<()> {
    let (name, color) = match &token.kind {
        TokenKind::Operand(_) => ("operand", Color::Green),
        TokenKind::StringGroup(_) => ("phrase", Color::Cyan),
        TokenKind::Unary { op, .. } => (op.symbol(), Color::Yellow),
        TokenKind::Binary { op, .. } => (op.symbol(), Color::Yellow),
        TokenKind::Scope(scope) => return print_scope(out, scope, indent),
        TokenKind::Delimiter => ("delimiter", Color::White),
    };

    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "{:indent$}{name}", "")?;
    out.reset()?;
    writeln!(out, " {:?}", token.value())?;

    match &token.kind {
        TokenKind::Unary {
            argument: Some(argument),
            ..
        } => print_token(out, argument, indent + 2)?,
        TokenKind::Binary { left, right, .. } => {
            for side in [left, right].into_iter().flatten() {
                print_token(out, side, indent + 2)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Print `original -> sanitized`, or note that nothing changed
pub fn print_rewrite(out: &mut impl WriteColor, original: &str, sanitized: &str) -> io::Result<()> {
    if original == sanitized {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{sanitized}")?;
        out.reset()?;
        writeln!(out, "  (unchanged)")?;
        return Ok(());
    }

    out.set_color(ColorSpec::new().set_dimmed(true))?;
    write!(out, "{original}")?;
    out.reset()?;
    write!(out, " -> ")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    writeln!(out, "{sanitized}")?;
    out.reset()?;
    Ok(())
}

/// Print the outcome of a strict-grammar check with a caret under the
/// offending position
pub fn print_check(
    out: &mut impl WriteColor,
    input: &str,
    result: &Result<Query, QueryError>,
) -> io::Result<()> {
    match result {
        Ok(query) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            write!(out, "valid")?;
            out.reset()?;
            writeln!(out, " {}", query.root)?;
        }
        Err(QueryError::Syntax { position, message }) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "invalid")?;
            out.reset()?;
            writeln!(out, " {message}")?;
            writeln!(out, "  {input}")?;
            let column = input.get(..*position).map(|s| s.chars().count()).unwrap_or(0);
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(out, "  {:column$}^", "")?;
            out.reset()?;
        }
        Err(other) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "error")?;
            out.reset()?;
            writeln!(out, " {other}")?;
        }
    }
    Ok(())
}
