//! Core token types shared across the scanner, parser, auditor, and emitter.

pub mod core;

pub use core::{Comment, IndentRecord, Token, TokenKind, TokenStream};
