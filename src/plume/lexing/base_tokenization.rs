//! Core tokenization.
//!
//! Converts source text into a flat token stream using the logos lexer.
//! Horizontal whitespace is skipped here; indentation is reconstructed
//! from the raw text by the [indentation](super::indentation) pass.
//! Newlines inside brackets are dropped (implicit line continuation), as
//! are blank and comment-only lines.

use crate::plume::ast::range::SourceLocation;
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::token::{Comment, Token, TokenKind};
use logos::{Lexer, Logos};

/// Raw lexical classes recognized by logos. Operator tokens are collapsed
/// into one `Op` class; the grammar matches on token text.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"\\\r?\n")]
pub enum RawToken {
    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,

    #[regex(r"[0-9][0-9_]*\.?[0-9_]*([eE][+-]?[0-9]+)?[jJ]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[jJ]?")]
    #[regex(r"0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+")]
    Number,

    // Triple-quoted strings consume to the closing quotes via callback;
    // an unterminated literal becomes an error token at the opening run.
    #[regex(r#"[rRbBuUfF]{0,2}""""#, lex_triple_double, priority = 10)]
    #[regex(r"[rRbBuUfF]{0,2}'''", lex_triple_single, priority = 10)]
    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\\n]|\\.)*""#)]
    #[regex(r"[rRbBuUfF]{0,2}'([^'\\\n]|\\.)*'")]
    Str,

    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,

    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("`")]
    Backtick,
    #[token("?")]
    Question,

    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<<")]
    #[token(">>")]
    #[token("**")]
    #[token("//")]
    #[token("->")]
    #[token("=>")]
    #[token(":=")]
    #[token("|>")]
    #[token("|*>")]
    #[token("<|")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("//=")]
    #[token("%=")]
    #[token("**=")]
    #[token("@=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("@")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    #[token("<")]
    #[token(">")]
    #[token("=")]
    #[token(":")]
    Op,
}

fn lex_triple_double(lex: &mut Lexer<RawToken>) -> bool {
    match lex.remainder().find("\"\"\"") {
        Some(i) => {
            lex.bump(i + 3);
            true
        }
        None => false,
    }
}

fn lex_triple_single(lex: &mut Lexer<RawToken>) -> bool {
    match lex.remainder().find("'''") {
        Some(i) => {
            lex.bump(i + 3);
            true
        }
        None => false,
    }
}

/// True when a string literal's prefix marks it as a format string.
fn is_format_string(text: &str) -> bool {
    text.chars()
        .take_while(|c| *c != '"' && *c != '\'')
        .any(|c| c == 'f' || c == 'F')
}

/// Tokenize source text into significant tokens plus collected comments.
///
/// Newlines are kept only outside brackets and only after lines that
/// carried content; the final logical line gets a synthetic newline when
/// the source does not end with one. String errors surface here.
pub fn tokenize(
    source: &str,
    loc: &SourceLocation,
) -> Result<(Vec<Token>, Vec<Comment>), Diagnostic> {
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut depth: usize = 0;
    let mut line_has_content = false;

    for (result, span) in RawToken::lexer(source).spanned() {
        let text = &source[span.clone()];
        let range = loc.range_of(&span);
        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                return Err(unrecognized(text, &range, loc));
            }
        };
        let kind = match raw {
            RawToken::Newline => {
                if depth == 0 && line_has_content {
                    tokens.push(Token::new(TokenKind::Newline, "\n", range));
                    line_has_content = false;
                }
                continue;
            }
            RawToken::Comment => {
                comments.push(Comment {
                    line: range.start.line,
                    text: text.to_string(),
                    range,
                });
                continue;
            }
            RawToken::Name => TokenKind::Name,
            RawToken::Number => TokenKind::Number,
            RawToken::Str => {
                if is_format_string(text) {
                    TokenKind::FStr
                } else {
                    TokenKind::Str
                }
            }
            RawToken::OpenParen => TokenKind::OpenParen,
            RawToken::CloseParen => TokenKind::CloseParen,
            RawToken::OpenBracket => TokenKind::OpenBracket,
            RawToken::CloseBracket => TokenKind::CloseBracket,
            RawToken::OpenBrace => TokenKind::OpenBrace,
            RawToken::CloseBrace => TokenKind::CloseBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Backtick => TokenKind::Backtick,
            RawToken::Question => TokenKind::Question,
            RawToken::Op => {
                if text == ":" {
                    TokenKind::Colon
                } else {
                    TokenKind::Op
                }
            }
        };
        if kind.is_open_delimiter() {
            depth += 1;
        } else if kind.is_close_delimiter() {
            depth = depth.saturating_sub(1);
        }
        line_has_content = true;
        tokens.push(Token::new(kind, text, range));
    }

    if line_has_content {
        let end = source.len();
        tokens.push(Token::new(TokenKind::Newline, "\n", loc.range_of(&(end..end))));
    }

    Ok((tokens, comments))
}

fn unrecognized(text: &str, range: &crate::plume::ast::range::Range, loc: &SourceLocation) -> Diagnostic {
    // An error token that starts with a quote run is an unterminated
    // string; anything else is a character the language does not use.
    let quotes = text
        .chars()
        .skip_while(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .collect::<String>();
    if quotes.starts_with("\"\"\"") || quotes.starts_with("'''") {
        let delim = &quotes[..3];
        Diagnostic::point(
            DiagnosticKind::Lex,
            format!("unclosed open '{}'", delim),
            range,
            loc,
        )
        .with_incomplete(true)
    } else if quotes.starts_with('"') || quotes.starts_with('\'') {
        let delim = &quotes[..1];
        Diagnostic::point(
            DiagnosticKind::Lex,
            format!("unclosed open '{}'", delim),
            range,
            loc,
        )
    } else {
        Diagnostic::point(
            DiagnosticKind::Lex,
            format!("unrecognized character {:?}", text),
            range,
            loc,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let loc = SourceLocation::new(source);
        let (tokens, _) = tokenize(source, &loc).unwrap();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(
            kinds("x + 1"),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn test_pipe_operators_lex_as_single_tokens() {
        let loc = SourceLocation::new("x |> f <| y |*> g");
        let (tokens, _) = tokenize("x |> f <| y |*> g", &loc).unwrap();
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Op)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["|>", "<|", "|*>"]);
    }

    #[test]
    fn test_newlines_inside_brackets_are_dropped() {
        assert_eq!(
            kinds("f(\n  1,\n  2)"),
            vec![
                TokenKind::Name,
                TokenKind::OpenParen,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::CloseParen,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_produce_no_newline() {
        assert_eq!(
            kinds("x\n\n# only a comment\n\ny"),
            vec![
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn test_comments_are_collected() {
        let src = "x  # NOQA\ny";
        let loc = SourceLocation::new(src);
        let (_, comments) = tokenize(src, &loc).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].line, 0);
        assert_eq!(comments[0].text, "# NOQA");
    }

    #[test]
    fn test_format_string_detection() {
        assert_eq!(kinds("f\"a{x}\"")[0], TokenKind::FStr);
        assert_eq!(kinds("\"a\"")[0], TokenKind::Str);
        assert_eq!(kinds("rb'a'")[0], TokenKind::Str);
    }

    #[test]
    fn test_triple_quoted_strings_span_lines() {
        assert_eq!(
            kinds("x = '''a\nb'''"),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Str,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn test_unterminated_triple_quote_is_incomplete_lex_error() {
        let src = "x = \"\"\"abc";
        let loc = SourceLocation::new(src);
        let err = tokenize(src, &loc).unwrap_err();
        assert!(err.message().contains("unclosed open '\"\"\"'"));
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_unterminated_single_quote_is_lex_error() {
        let src = "x = 'abc";
        let loc = SourceLocation::new(src);
        let err = tokenize(src, &loc).unwrap_err();
        assert!(err.message().contains("unclosed open '''"));
        assert!(!err.is_incomplete());
    }

    #[test]
    fn test_line_continuation_joins_lines() {
        assert_eq!(
            kinds("x + \\\n  1"),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline
            ]
        );
    }
}
