//! Delimiter balance validation.
//!
//! Maintains a stack of open delimiters over the token stream and fails
//! with one of three LexError shapes:
//!
//! - closing token with an empty stack: `unmatched close '<d>'`
//! - closing token not matching the stack top: `mismatched open '<o>' and
//!   close '<c>'`, annotated from the open to a caret at the close
//! - end of input with a non-empty stack: `unclosed open '<d>'` at the
//!   open's position
//!
//! Quote balance is validated during base tokenization; only bracket
//! delimiters reach this pass.

use crate::plume::ast::range::SourceLocation;
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::token::{Token, TokenKind};

fn delimiter_char(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::OpenParen => "(",
        TokenKind::CloseParen => ")",
        TokenKind::OpenBracket => "[",
        TokenKind::CloseBracket => "]",
        TokenKind::OpenBrace => "{",
        TokenKind::CloseBrace => "}",
        _ => "",
    }
}

fn matches_open(open: TokenKind, close: TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::OpenParen, TokenKind::CloseParen)
            | (TokenKind::OpenBracket, TokenKind::CloseBracket)
            | (TokenKind::OpenBrace, TokenKind::CloseBrace)
    )
}

/// Validate bracket nesting across the whole token stream.
pub fn check_balance(tokens: &[Token], loc: &SourceLocation) -> Result<(), Diagnostic> {
    let mut stack: Vec<&Token> = Vec::new();
    for token in tokens {
        if token.kind.is_open_delimiter() {
            stack.push(token);
        } else if token.kind.is_close_delimiter() {
            match stack.last() {
                None => {
                    return Err(Diagnostic::point(
                        DiagnosticKind::Lex,
                        format!("unmatched close '{}'", delimiter_char(token.kind)),
                        &token.range,
                        loc,
                    ));
                }
                Some(open) if !matches_open(open.kind, token.kind) => {
                    return Err(Diagnostic::span(
                        DiagnosticKind::Lex,
                        format!(
                            "mismatched open '{}' and close '{}'",
                            delimiter_char(open.kind),
                            delimiter_char(token.kind)
                        ),
                        &open.range,
                        &token.range,
                        loc,
                    ));
                }
                Some(_) => {
                    stack.pop();
                }
            }
        }
    }
    if let Some(open) = stack.first() {
        return Err(Diagnostic::point(
            DiagnosticKind::Lex,
            format!("unclosed open '{}'", delimiter_char(open.kind)),
            &open.range,
            loc,
        )
        .with_incomplete(true));
    }
    Ok(())
}
