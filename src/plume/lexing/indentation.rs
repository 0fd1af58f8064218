//! Semantic indentation.
//!
//! Converts the leading whitespace of each logical line into `Indent` and
//! `Dedent` tokens via an indent-width stack, so block structure is
//! tractable by ordinary token-stream rules. Tabs advance to the next
//! multiple of eight columns.
//!
//! Problems are recorded, not failed: a line mixing tabs and spaces in
//! its indent is flagged on its [`IndentRecord`], and a dedent that lands
//! between outer indentation levels sets `bad_dedent`. The grammar engine
//! decides whether those reject the input (structured modes) or not
//! (lenient).

use crate::plume::ast::range::{Range, SourceLocation};
use crate::plume::token::{IndentRecord, Token, TokenKind};

const TAB_WIDTH: usize = 8;

fn indent_width(text: &str) -> usize {
    let mut width = 0;
    for c in text.chars() {
        match c {
            '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            _ => width += 1,
        }
    }
    width
}

/// Insert `Indent`/`Dedent` tokens and a final `Eof`, returning the new
/// stream plus per-line indentation records.
pub fn apply(
    tokens: Vec<Token>,
    source: &str,
    loc: &SourceLocation,
) -> (Vec<Token>, Vec<IndentRecord>, Option<Range>) {
    let mut out = Vec::with_capacity(tokens.len() + 8);
    let mut records = Vec::new();
    let mut bad_dedent = None;
    let mut stack: Vec<usize> = vec![0];
    let mut at_line_start = true;

    for token in tokens {
        if at_line_start && token.kind != TokenKind::Newline {
            let line = token.range.start.line;
            let line_text = loc.line_text(line);
            let indent_len = line_text
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .map(|c| c.len_utf8())
                .sum::<usize>();
            let indent_text = &line_text[..indent_len];
            // The token is the first content on its line, so the indent
            // ends exactly where the token begins.
            let span_start = token.range.span.start - indent_text.len().min(token.range.span.start);
            let range = loc.range_of(&(span_start..span_start + indent_text.len()));
            let mixed = indent_text.contains(' ') && indent_text.contains('\t');
            records.push(IndentRecord {
                line,
                text: indent_text.to_string(),
                mixed,
                range: range.clone(),
            });

            let width = indent_width(indent_text);
            let top = *stack.last().expect("indent stack is never empty");
            if width > top {
                stack.push(width);
                out.push(Token::new(TokenKind::Indent, indent_text, range));
            } else if width < top {
                while *stack.last().expect("indent stack is never empty") > width {
                    stack.pop();
                    out.push(Token::new(TokenKind::Dedent, "", range.clone()));
                }
                if *stack.last().expect("indent stack is never empty") != width
                    && bad_dedent.is_none()
                {
                    bad_dedent = Some(range);
                }
            }
            at_line_start = false;
        }
        let is_newline = token.kind == TokenKind::Newline;
        out.push(token);
        if is_newline {
            at_line_start = true;
        }
    }

    let end = source.len();
    let eof_range = loc.range_of(&(end..end));
    while stack.len() > 1 {
        stack.pop();
        out.push(Token::new(TokenKind::Dedent, "", eof_range.clone()));
    }
    out.push(Token::new(TokenKind::Eof, "", eof_range));

    (out, records, bad_dedent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::lexing::base_tokenization::tokenize;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let loc = SourceLocation::new(source);
        let (tokens, _) = tokenize(source, &loc).unwrap();
        let (tokens, _, _) = apply(tokens, source, &loc);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_indent_dedent_pairing() {
        let got = kinds("if x:\n    y\nz");
        assert_eq!(
            got,
            vec![
                TokenKind::Name, // if
                TokenKind::Name, // x
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name, // y
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name, // z
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dedents_closed_at_eof() {
        let got = kinds("if x:\n    if y:\n        z");
        assert_eq!(
            got.iter().filter(|k| **k == TokenKind::Indent).count(),
            2
        );
        assert_eq!(
            got.iter().filter(|k| **k == TokenKind::Dedent).count(),
            2
        );
        assert_eq!(*got.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn test_mixed_indent_is_recorded() {
        let source = "if x:\n\t  y";
        let loc = SourceLocation::new(source);
        let (tokens, _) = tokenize(source, &loc).unwrap();
        let (_, records, _) = apply(tokens, source, &loc);
        assert!(records.iter().any(|r| r.mixed));
    }

    #[test]
    fn test_bad_dedent_is_recorded() {
        let source = "if x:\n        y\n    z";
        let loc = SourceLocation::new(source);
        let (tokens, _) = tokenize(source, &loc).unwrap();
        let (_, _, bad) = apply(tokens, source, &loc);
        assert!(bad.is_some());
    }

    #[test]
    fn test_tab_width_expansion() {
        assert_eq!(indent_width("\t"), 8);
        assert_eq!(indent_width("    \t"), 8);
        assert_eq!(indent_width("\t "), 9);
        assert_eq!(indent_width("  "), 2);
    }
}
