//! Scanner
//!
//!     This module orchestrates the complete tokenization pipeline for
//!     plume source. Scanning runs in stages, each receiving the previous
//!     stage's tokens:
//!
//!         1. Core tokenization using the logos lexer. See
//!            [base_tokenization]. Strings (including triple-quoted and
//!            format strings) are consumed whole here, so unterminated
//!            quotes surface as LexErrors in this stage. Newlines inside
//!            brackets and blank or comment-only lines produce no tokens.
//!
//!         2. Delimiter balance validation. See [balance]. A stack of
//!            open delimiters yields the unmatched/mismatched/unclosed
//!            LexError shapes with their span annotations.
//!
//!         3. Semantic indentation. See [indentation]. Leading whitespace
//!            becomes Indent/Dedent tokens; inconsistencies are recorded
//!            on the stream for the grammar engine to reject by mode.
//!
//! Token byte ranges are produced once, here, and preserved untouched
//! through every later stage; all diagnostic annotation rendering depends
//! on their integrity.

pub mod balance;
pub mod base_tokenization;
pub mod indentation;

use crate::plume::ast::range::SourceLocation;
use crate::plume::diagnostics::Diagnostic;
use crate::plume::token::TokenStream;

/// Scan source text into a [`TokenStream`], or fail with a LexError.
pub fn scan(source: &str) -> Result<TokenStream, Diagnostic> {
    let loc = SourceLocation::new(source);
    let (tokens, comments) = base_tokenization::tokenize(source, &loc)?;
    balance::check_balance(&tokens, &loc)?;
    let (tokens, indents, bad_dedent) = indentation::apply(tokens, source, &loc);
    Ok(TokenStream {
        tokens,
        comments,
        indents,
        bad_dedent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::token::TokenKind;

    #[test]
    fn test_scan_produces_eof_terminated_stream() {
        let stream = scan("x = 1").unwrap();
        assert_eq!(stream.tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_scan_surfaces_balance_errors() {
        let err = scan("()[(())").unwrap_err();
        assert_eq!(err.message(), "unclosed open '['");
    }

    #[test]
    fn test_scan_empty_source() {
        let stream = scan("").unwrap();
        assert_eq!(stream.tokens.len(), 1);
        assert_eq!(stream.tokens[0].kind, TokenKind::Eof);
    }
}
