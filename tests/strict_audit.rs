//! Strict-mode audit rules, and their non-strict downgrades.

use plume::{CompileConfig, Compiler, DiagnosticKind, Mode};
use rstest::rstest;

fn strict() -> Compiler {
    Compiler::new(CompileConfig::new().with_strict(true))
}

fn relaxed() -> Compiler {
    Compiler::new(CompileConfig::new())
}

#[test]
fn test_unused_import_fatal_under_strict() {
    let source = "import os\nx = 1\n";
    let err = strict().compile(source, Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Style);
    assert_eq!(err.ename(), "PlumeStyleError");
    assert!(err.message().contains("unused import 'os'"));
}

#[test]
fn test_unused_import_ignored_when_not_strict() {
    let source = "import os\nx = 1\n";
    assert_eq!(
        relaxed().compile(source, Mode::Block).unwrap(),
        "import os\nx = 1\n"
    );
}

#[test]
fn test_noqa_marker_suppresses_unused_import() {
    let source = "import os  # NOQA\nx = 1\n";
    assert!(strict().compile(source, Mode::Block).is_ok());
}

#[test]
fn test_used_import_passes_strict() {
    let source = "import os\nx = os.sep\n";
    assert!(strict().compile(source, Mode::Block).is_ok());
}

#[test]
fn test_from_import_binding_tracked() {
    let err = strict()
        .compile("from os import sep\nx = 1\n", Mode::Block)
        .unwrap_err();
    assert!(err.message().contains("unused import 'sep'"));
    assert!(strict()
        .compile("from os import sep as s\nx = s\n", Mode::Block)
        .is_ok());
}

#[test]
fn test_deprecated_name_fatal_under_strict() {
    let err = strict()
        .compile("x = xrange(3)\n", Mode::Block)
        .unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Style);
    assert!(err.message().contains("deprecated built-in 'xrange'"));
    assert!(err.message().contains("'range'"));
}

#[test]
fn test_deprecated_name_downgrades_to_inline_warning() {
    let out = relaxed().compile("x = xrange(3)\n", Mode::Block).unwrap();
    assert_eq!(
        out,
        "x = xrange(3)  # DeprecationWarning: deprecated built-in 'xrange'; use 'range'\n"
    );
}

#[rstest]
#[case("r = x is int is str\n", "chained 'is'")]
#[case("g = x => y = x\n", "statement lambda")]
#[case("x = 1;\n", "stray semicolon")]
#[case("s = f\"abc\"\n", "no interpolated expressions")]
#[case("x = a.b.\n", "trailing dot")]
fn test_strict_only_rules(#[case] source: &str, #[case] fragment: &str) {
    let err = strict().compile(source, Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Style, "{source}");
    assert!(
        err.message().contains(fragment),
        "expected {:?} in {:?}",
        fragment,
        err.message()
    );
    assert!(relaxed().compile(source, Mode::Block).is_ok(), "{source}");
}

#[test]
fn test_chained_is_translates_with_legacy_semantics_when_relaxed() {
    assert_eq!(
        relaxed().compile("r = x is int is str\n", Mode::Block).unwrap(),
        "r = x is int is str\n"
    );
}

#[test]
fn test_trailing_whitespace_fatal_under_strict() {
    let err = strict().compile("x = 1 \n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Style);
    assert!(err.message().contains("trailing whitespace"));
    assert!(relaxed().compile("x = 1 \n", Mode::Block).is_ok());
}

#[test]
fn test_inconsistent_indent_styles_across_lines() {
    // Each line is internally consistent, so this is not the per-line
    // GrammarError; under strict it is a style finding.
    let source = "if x:\n    y = 1\nwhile x:\n\tz = 2\n";
    let err = strict().compile(source, Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Style);
    assert!(err.message().contains("tabs and spaces"));
    assert!(relaxed().compile(source, Mode::Block).is_ok());
}

#[test]
fn test_trailing_dot_translates_without_dot_when_relaxed() {
    assert_eq!(
        relaxed().compile("x = a.b.\n", Mode::Block).unwrap(),
        "x = a.b\n"
    );
}

#[test]
fn test_first_finding_in_source_order_wins() {
    // Both an unused import and a stray semicolon; the import comes
    // first in the file.
    let err = strict()
        .compile("import os\nx = 1;\n", Mode::Block)
        .unwrap_err();
    assert!(err.message().contains("unused import"));
}

#[test]
fn test_strict_findings_render_with_span_annotation() {
    let err = strict()
        .compile("import os\nx = 1\n", Mode::Block)
        .unwrap_err();
    let rendered = err.render();
    assert!(rendered.starts_with("PlumeStyleError: unused import 'os' (line 1)"));
    assert!(rendered.contains("\n  import os\n"));
}
