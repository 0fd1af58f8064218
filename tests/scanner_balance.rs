//! Scanner and delimiter-balance diagnostics.
//!
//! Covers the three LexError shapes with their exact rendered
//! annotations, plus scanner robustness over arbitrary input.

use plume::{compile, Mode};
use proptest::prelude::*;

#[test]
fn test_unclosed_open_bracket_with_caret() {
    let err = compile("()[(())", Mode::Block).unwrap_err();
    assert_eq!(err.ename(), "PlumeLexError");
    assert!(err.is_incomplete());
    assert_eq!(
        err.render(),
        "PlumeLexError: unclosed open '[' (line 1)\n  ()[(())\n    ^\n"
    );
}

#[test]
fn test_mismatched_open_and_close_with_tilde_run() {
    let err = compile("[([){[}", Mode::Block).unwrap_err();
    assert_eq!(err.ename(), "PlumeLexError");
    assert!(!err.is_incomplete());
    assert_eq!(
        err.render(),
        "PlumeLexError: mismatched open '[' and close ')' (line 1)\n  [([){[}\n    ~^\n"
    );
}

#[test]
fn test_unmatched_close() {
    let err = compile("f(x))", Mode::Block).unwrap_err();
    assert_eq!(err.message(), "unmatched close ')'");
    assert_eq!(
        err.render(),
        "PlumeLexError: unmatched close ')' (line 1)\n  f(x))\n      ^\n"
    );
}

#[test]
fn test_mismatch_across_lines_uses_continuation_marker() {
    let err = compile("f(x\n  ,y]", Mode::Block).unwrap_err();
    assert_eq!(err.message(), "mismatched open '(' and close ']'");
    assert_eq!(
        err.render(),
        "PlumeLexError: mismatched open '(' and close ']' (line 2)\n    ,y]\n   \\~~^\n"
    );
}

#[test]
fn test_unterminated_string_is_lex_error() {
    let err = compile("x = 'abc", Mode::Block).unwrap_err();
    assert_eq!(err.ename(), "PlumeLexError");
    assert!(err.message().contains("unclosed open"));
}

#[test]
fn test_unterminated_triple_string_is_incomplete() {
    let err = compile("x = \"\"\"abc\ndef", Mode::Block).unwrap_err();
    assert!(err.is_incomplete());
}

#[test]
fn test_balanced_nesting_accepted() {
    assert!(compile("f(x[0], {1: (2,)})", Mode::Block).is_ok());
}

proptest! {
    /// The scanner either tokenizes or reports a diagnostic; it never
    /// panics, whatever the input.
    #[test]
    fn test_scan_never_panics(source in "[ -~\n]{0,80}") {
        let _ = plume::plume::lexing::scan(&source);
    }

    /// Inputs built only from balanced bracket pairs always pass the
    /// balance check.
    #[test]
    fn test_balanced_brackets_always_scan(depth in 0usize..6) {
        let mut source = String::from("x");
        for _ in 0..depth {
            source = format!("([{{{}}}])", source);
        }
        prop_assert!(plume::plume::lexing::scan(&source).is_ok());
    }
}
