//! Token kinds and the token stream produced by the scanner.

use crate::plume::ast::range::Range;

/// Kinds of tokens the grammar consumes.
///
/// Operators (including `->`, `=>`, `:=`, pipes, and custom symbol runs)
/// all carry kind [`TokenKind::Op`]; the grammar matches on the token text.
/// Keywords are [`TokenKind::Name`] tokens whose text the grammar checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Number,
    /// Plain (non-format) string literal, prefix and quotes included.
    Str,
    /// Format string literal (`f` prefix), prefix and quotes included.
    FStr,
    Op,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Backtick,
    /// `?` — partial-application placeholder.
    Question,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    pub fn is_open_delimiter(&self) -> bool {
        matches!(
            self,
            TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace
        )
    }

    pub fn is_close_delimiter(&self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace
        )
    }
}

/// A token: kind, raw text, and source range.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: Range,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            text: text.into(),
            range,
        }
    }

    /// True for a `Name` token with exactly this text.
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Name && self.text == kw
    }

    /// True for an `Op` token with exactly this text.
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }
}

/// A comment stripped from the token stream, kept for the auditor and the
/// emitter (NOQA markers, inline-warning placement).
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub line: usize,
    pub text: String,
    pub range: Range,
}

/// Indentation record for one non-blank source line.
#[derive(Debug, Clone, PartialEq)]
pub struct IndentRecord {
    pub line: usize,
    /// The literal leading whitespace.
    pub text: String,
    /// True when the leading whitespace mixes tabs and spaces.
    pub mixed: bool,
    pub range: Range,
}

/// Scanner output: significant tokens plus side channels the later passes
/// need. The token list always ends with a single `Eof` token.
///
/// Indentation problems are recorded here rather than failed eagerly; the
/// grammar engine rejects them in structured modes and ignores them in
/// lenient mode.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub indents: Vec<IndentRecord>,
    /// First dedent that does not match any outer indentation level.
    pub bad_dedent: Option<Range>,
}

impl TokenStream {
    /// First line whose indentation mixes tabs and spaces, if any.
    pub fn first_mixed_indent(&self) -> Option<&IndentRecord> {
        self.indents.iter().find(|r| r.mixed)
    }

    /// The comment sitting on the given 0-indexed line, if any.
    pub fn comment_on_line(&self, line: usize) -> Option<&Comment> {
        self.comments.iter().find(|c| c.line == line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::ast::range::{Position, Range};

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(
            kind,
            text,
            Range::new(0..text.len(), Position::new(0, 0), Position::new(0, text.len())),
        )
    }

    #[test]
    fn test_keyword_and_op_predicates() {
        assert!(tok(TokenKind::Name, "def").is_keyword("def"));
        assert!(!tok(TokenKind::Str, "def").is_keyword("def"));
        assert!(tok(TokenKind::Op, "|>").is_op("|>"));
        assert!(!tok(TokenKind::Op, "|>").is_op("<|"));
    }

    #[test]
    fn test_delimiter_predicates() {
        assert!(TokenKind::OpenParen.is_open_delimiter());
        assert!(TokenKind::CloseBrace.is_close_delimiter());
        assert!(!TokenKind::Op.is_open_delimiter());
    }
}
