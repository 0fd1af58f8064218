//! Diagnostic structure and rendering: determinism, the structured form
//! consumed by the kernel adapter, and golden excerpt snapshots.

use plume::{compile, CompileConfig, Compiler, Mode};

#[test]
fn test_rendering_is_deterministic() {
    let first = compile("()[(())", Mode::Block).unwrap_err().render();
    let second = compile("()[(())", Mode::Block).unwrap_err().render();
    assert_eq!(first, second);
}

#[test]
fn test_structured_form_exposes_kind_message_and_spans() {
    let err = compile("[([){[}", Mode::Block).unwrap_err();
    let json = err.structured();
    assert_eq!(json["kind"], "Lex");
    assert_eq!(json["message"], "mismatched open '[' and close ')'");
    assert_eq!(json["annotations"][0]["range"]["start_line"], 0);
    assert_eq!(json["annotations"][0]["range"]["start_column"], 3);
    assert_eq!(json["annotations"][0]["line_text"], "[([){[}");
}

#[test]
fn test_ename_traceback_pair() {
    let err = compile("()[(())", Mode::Block).unwrap_err();
    assert_eq!(err.ename(), "PlumeLexError");
    let traceback = err.traceback();
    assert_eq!(traceback.len(), 3);
    assert!(traceback[0].starts_with("PlumeLexError:"));
    assert_eq!(traceback[1], "  ()[(())");
    assert_eq!(traceback[2], "    ^");
}

#[test]
fn test_spans_lie_within_the_source_unit() {
    for source in ["()[(())", "[([){[}", "x = = 1\n", "def f(x):"] {
        if let Err(diag) = compile(source, Mode::Block) {
            for annotation in diag.annotations() {
                assert!(annotation.range.start_byte <= source.len(), "{source}");
                assert!(annotation.range.end_byte <= source.len(), "{source}");
            }
        }
    }
}

#[test]
fn test_grammar_failure_past_line_end_renders_continuation_blank() {
    let err = compile("def f(x):", Mode::Block).unwrap_err();
    insta::assert_snapshot!(err.render(), @r"
    PlumeParseError: invalid syntax: expected an indented block (got end of input) (line 1)
      def f(x):

      ~~~~~~~~~^
    ");
}

#[test]
fn test_unclosed_bracket_snapshot() {
    let err = compile("()[(())", Mode::Block).unwrap_err();
    insta::assert_snapshot!(err.render(), @r"
    PlumeLexError: unclosed open '[' (line 1)
      ()[(())
        ^
    ");
}

#[test]
fn test_target_error_rendering_names_feature_and_version() {
    let compiler = Compiler::new(
        CompileConfig::new().with_target(plume::Target::parse("2.7").unwrap()),
    );
    let err = compiler
        .compile("def f(*, x):\n    pass\n", Mode::Block)
        .unwrap_err();
    let rendered = err.render();
    assert!(rendered.starts_with("PlumeTargetError:"));
    assert!(rendered.contains("keyword-only parameter"));
    assert!(rendered.contains("3.0"));
    assert!(rendered.contains("(line 1)"));
    assert!(rendered.contains("\n  def f(*, x):\n"));
}

#[test]
fn test_style_error_and_target_error_expose_kind_tags() {
    let strict = Compiler::new(CompileConfig::new().with_strict(true));
    let err = strict.compile("x = 1;\n", Mode::Block).unwrap_err();
    assert_eq!(err.structured()["kind"], "Style");
    assert_eq!(err.ename(), "PlumeStyleError");
}

#[test]
fn test_incomplete_detection_for_kernel_is_complete_replies() {
    // Unclosed delimiters and grammar failures at end of input signal
    // that more input may complete the cell.
    assert!(compile("f(1, 2", Mode::Block).unwrap_err().is_incomplete());
    assert!(compile("def f(x):", Mode::Block).unwrap_err().is_incomplete());
    // A mismatch can never be completed by more input.
    assert!(!compile("[([){[}", Mode::Block).unwrap_err().is_incomplete());
    // Nor can a failure in the middle of a line.
    assert!(!compile("x = = 1\n", Mode::Block).unwrap_err().is_incomplete());
}
