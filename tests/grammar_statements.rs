//! Statement translation, parse modes, and structural checks.

use plume::{compile, CompileConfig, Compiler, DiagnosticKind, Mode};
use rstest::rstest;

fn block(source: &str) -> String {
    compile(source, Mode::Block).expect("translation should succeed")
}

#[rstest]
#[case("x = 1\n", "x = 1\n")]
#[case("x = y = 1\n", "x = y = 1\n")]
#[case("x, y = pair\n", "(x, y) = pair\n")]
#[case("x += 1\n", "x += 1\n")]
#[case("return\n", "return\n")]
#[case("import os, sys\n", "import os, sys\n")]
#[case("import os.path as p\n", "import os.path as p\n")]
#[case("from os import path as p, sep\n", "from os import path as p, sep\n")]
fn test_simple_statements(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(block(source), expected);
}

#[test]
fn test_semicolon_separated_statements_split_lines() {
    assert_eq!(block("a = 1; b = 2\n"), "a = 1\nb = 2\n");
}

#[test]
fn test_function_definition() {
    assert_eq!(
        block("def f(x, y=1):\n    return x + y\n"),
        "def f(x, y=1):\n    return x + y\n"
    );
}

#[test]
fn test_async_function_definition() {
    assert_eq!(
        block("async def f():\n    await g()\n"),
        "async def f():\n    await g()\n"
    );
}

#[test]
fn test_class_definition() {
    assert_eq!(
        block("class A(B):\n    def m(self):\n        pass\n"),
        "class A(B):\n    def m(self):\n        pass\n"
    );
}

#[test]
fn test_if_elif_else() {
    assert_eq!(
        block("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n"),
        "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n"
    );
}

#[test]
fn test_while_and_for_loops() {
    assert_eq!(
        block("while x:\n    break\n"),
        "while x:\n    break\n"
    );
    assert_eq!(
        block("for a, b in pairs:\n    continue\n"),
        "for a, b in pairs:\n    continue\n"
    );
}

#[test]
fn test_single_line_suite() {
    assert_eq!(block("if x: y = 1\n"), "if x:\n    y = 1\n");
}

#[test]
fn test_match_statement_translation() {
    let source = "match point:\n    case (0, 0):\n        r = 1\n    case [x, *rest] if x:\n        r = 2\n    case {1: v}:\n        r = 3\n    case Point(x=0):\n        r = 4\n    case _:\n        r = 5\n";
    let expected = "match point:\n    case [0, 0]:\n        r = 1\n    case [x, *rest] if x:\n        r = 2\n    case {1: v}:\n        r = 3\n    case Point(x=0):\n        r = 4\n    case _:\n        r = 5\n";
    assert_eq!(block(source), expected);
}

#[test]
fn test_type_alias_statement() {
    assert_eq!(block("type Pair = tuple\n"), "type Pair = tuple\n");
}

#[test]
fn test_soft_keywords_remain_usable_as_names() {
    assert_eq!(block("match = 1\n"), "match = 1\n");
    assert_eq!(block("type = 2\n"), "type = 2\n");
    assert_eq!(block("operator = 3\n"), "operator = 3\n");
    assert_eq!(block("case = match + 1\n"), "case = match + 1\n");
}

// ----------------------------------------------------------------------
// Modes
// ----------------------------------------------------------------------

#[test]
fn test_file_mode_emits_header() {
    let out = compile("x = 1\n", Mode::File).unwrap();
    assert_eq!(out, "# Compiled with plume (target sys)\nx = 1\n");
}

#[test]
fn test_package_mode_adds_package_marker() {
    let out = compile("x = 1\n", Mode::Package).unwrap();
    assert!(out.contains("__plume_package__ = 1"));
}

#[test]
fn test_sys_mode_references_installed_runtime() {
    let out = compile("x = 1\n", Mode::Sys).unwrap();
    assert!(out.contains("# Requires an installed plume runtime"));
}

#[test]
fn test_single_mode_accepts_exactly_one_statement() {
    assert_eq!(compile("x = 1\n", Mode::Single).unwrap(), "x = 1\n");
    let err = compile("x = 1\ny = 2\n", Mode::Single).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
}

#[test]
fn test_eval_mode_accepts_exactly_one_expression() {
    assert_eq!(compile("1 + 2\n", Mode::Eval).unwrap(), "1 + 2\n");
    let err = compile("x = 1\n", Mode::Eval).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
}

#[test]
fn test_lenient_mode_accepts_expressions_and_blocks() {
    assert_eq!(compile("x |> print\n", Mode::Lenient).unwrap(), "print(x)\n");
    assert_eq!(
        compile("x = 1\ny = 2\n", Mode::Lenient).unwrap(),
        "x = 1\ny = 2\n"
    );
}

// ----------------------------------------------------------------------
// Output options
// ----------------------------------------------------------------------

#[test]
fn test_minify_drops_header_and_decorative_lines() {
    let compiler = Compiler::new(CompileConfig::new().with_minify(true));
    let out = compiler.compile("x = 1\n", Mode::File).unwrap();
    assert_eq!(out, "x = 1\n");
}

#[test]
fn test_line_numbers_option() {
    let compiler = Compiler::new(CompileConfig::new().with_line_numbers(true));
    let out = compiler.compile("x = 1\ny = 2\n", Mode::Block).unwrap();
    assert_eq!(out, "x = 1  # line 1\ny = 2  # line 2\n");
}

#[test]
fn test_keep_lines_option() {
    let compiler = Compiler::new(CompileConfig::new().with_keep_lines(true));
    let out = compiler.compile("x |> print\n", Mode::Block).unwrap();
    assert_eq!(out, "print(x)  # line 1: x |> print\n");
}

// ----------------------------------------------------------------------
// Structural checks
// ----------------------------------------------------------------------

#[test]
fn test_mixed_tabs_and_spaces_rejected_in_structured_modes() {
    let err = compile("if x:\n\t  y = 1\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err
        .message()
        .contains("inconsistent use of tabs and spaces"));
}

#[test]
fn test_mixed_indentation_tolerated_in_lenient_mode() {
    assert!(compile("if x:\n\t  y = 1\n", Mode::Lenient).is_ok());
}

#[test]
fn test_bad_dedent_rejected() {
    let err = compile("if x:\n        y = 1\n    z = 1\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.message().contains("unindent"));
}

#[test]
fn test_grammar_error_reports_deepest_expectation() {
    let err = compile("x = = 1\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.message().contains("expected"));
    assert!(err.message().contains("got '='"));
}

#[test]
fn test_incomplete_block_is_flagged_incomplete() {
    let err = compile("def f(x):", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.is_incomplete());
    assert!(err.message().contains("an indented block"));
}
