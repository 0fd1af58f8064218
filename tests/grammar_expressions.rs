//! Expression translation: pipelines, lambdas, sections, placeholders,
//! custom operators, backtick application, and format strings.
//!
//! Block mode keeps the output header-free so assertions see only the
//! translated statements.

use plume::{compile, CompileConfig, Compiler, DiagnosticKind, Mode, Target};
use rstest::rstest;

fn block(source: &str) -> String {
    compile(source, Mode::Block).expect("translation should succeed")
}

#[rstest]
#[case("5 |> print\n", "print(5)\n")]
#[case("5 |> f |> g\n", "g(f(5))\n")]
#[case("print <| 5\n", "print(5)\n")]
#[case("args |*> f\n", "f(*args)\n")]
#[case("5 |> (x -> x + 1)\n", "(lambda x: x + 1)(5)\n")]
fn test_pipeline_forms(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(block(source), expected);
}

#[test]
fn test_backward_pipes_group_right() {
    assert_eq!(block("f <| g <| 5\n"), "f(g(5))\n");
}

#[test]
fn test_mixed_pipe_directions_rejected() {
    let err = compile("5 |> f <| g\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.message().contains("mix forward and backward pipes"));
}

#[rstest]
#[case("inc = x -> x + 1\n", "inc = lambda x: x + 1\n")]
#[case("add = (x, y) -> x + y\n", "add = lambda x, y: x + y\n")]
#[case("one = () -> 1\n", "one = lambda: 1\n")]
#[case("scale = (x, k=2) -> x * k\n", "scale = lambda x, k=2: x * k\n")]
fn test_arrow_lambdas(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(block(source), expected);
}

#[test]
fn test_statement_lambda_hoists_a_def() {
    assert_eq!(
        block("g = x => y = x\n"),
        "def _plume_lambda_0(x): y = x\ng = _plume_lambda_0\n"
    );
}

#[test]
fn test_statement_lambda_expression_body_returns() {
    assert_eq!(
        block("g = x => x + 1\n"),
        "def _plume_lambda_0(x): return x + 1\ng = _plume_lambda_0\n"
    );
}

#[test]
fn test_placeholder_partial_application() {
    assert_eq!(block("h = f(?, 1)\n"), "h = (lambda _p0: f(_p0, 1))\n");
    assert_eq!(
        block("h = f(?, 1, ?)\n"),
        "h = (lambda _p0, _p1: f(_p0, 1, _p1))\n"
    );
}

#[rstest]
#[case("d = (* 2)\n", "d = (lambda _x: _x * 2)\n")]
#[case("d = (2 *)\n", "d = (lambda _x: 2 * _x)\n")]
#[case("d = (+)\n", "d = (lambda _x, _y: _x + _y)\n")]
#[case("d = (== 0)\n", "d = (lambda _x: _x == 0)\n")]
fn test_operator_sections(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(block(source), expected);
}

#[test]
fn test_parenthesized_unary_is_not_a_section() {
    // Expression-first resolution: `(+1)` is unary plus, documented in
    // the grammar module.
    assert_eq!(block("d = (+1)\n"), "d = (+1)\n");
    assert_eq!(block("d = (-1)\n"), "d = (-1)\n");
}

#[test]
fn test_custom_operator_declaration_and_use() {
    assert_eq!(
        block("operator <+>\nc = 1 <+> 2\n"),
        "# operator <+>\nc = _plume_op_ltplusgt(1, 2)\n"
    );
}

#[test]
fn test_custom_operator_with_implementation() {
    assert_eq!(
        block("operator <+> = min\nc = 1 <+> 2\n"),
        "_plume_op_ltplusgt = min\nc = _plume_op_ltplusgt(1, 2)\n"
    );
}

#[test]
fn test_undeclared_custom_operator_rejected() {
    let err = compile("c = 1 <+> 2\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
}

#[test]
fn test_undeclared_custom_operator_allowed_in_lenient_mode() {
    assert_eq!(
        compile("1 <+> 2\n", Mode::Lenient).unwrap(),
        "_plume_op_ltplusgt(1, 2)\n"
    );
}

#[test]
fn test_backtick_infix_application() {
    assert_eq!(block("c = 3 `max` 4\n"), "c = max(3, 4)\n");
}

#[test]
fn test_custom_operator_section() {
    assert_eq!(
        block("operator <+>\nd = (1 <+>)\n"),
        "# operator <+>\nd = (lambda _x: _plume_op_ltplusgt(1, _x))\n"
    );
}

#[test]
fn test_fstring_native_on_modern_targets() {
    assert_eq!(block("s = f\"a{x}b\"\n"), "s = f\"a{x}b\"\n");
}

#[test]
fn test_fstring_interpolations_are_translated() {
    assert_eq!(block("s = f\"{x |> f}\"\n"), "s = f\"{f(x)}\"\n");
}

#[test]
fn test_fstring_compiles_to_format_below_36() {
    let compiler = Compiler::new(
        CompileConfig::new().with_target(Target::parse("2.7").unwrap()),
    );
    assert_eq!(
        compiler.compile("s = f\"a{x}b\"\n", Mode::Block).unwrap(),
        "s = \"a{}b\".format(x)\n"
    );
}

#[test]
fn test_fstring_conversion_and_format_spec() {
    assert_eq!(block("s = f\"{x!r:>10}\"\n"), "s = f\"{x!r:>10}\"\n");
}

#[test]
fn test_malformed_fstring_expression_is_grammar_error() {
    let err = compile("s = f\"{+}\"\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.message().contains("format string"));
}

#[test]
fn test_empty_fstring_interpolation_is_grammar_error() {
    let err = compile("s = f\"{}\"\n", Mode::Block).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Grammar);
    assert!(err.message().contains("empty expression"));
}

#[rstest]
#[case("r = a if b else c\n", "r = a if b else c\n")]
#[case("r = x == y != z\n", "r = x == y != z\n")]
#[case("r = not a and b or c\n", "r = not a and b or c\n")]
#[case("r = a ** b ** c\n", "r = a ** b ** c\n")]
#[case("r = xs[1:n]\n", "r = xs[1:n]\n")]
#[case("r = xs[::2]\n", "r = xs[::2]\n")]
#[case("r = [y for y in xs if y]\n", "r = [y for y in xs if y]\n")]
#[case("r = {1: 'a', 2: 'b'}\n", "r = {1: 'a', 2: 'b'}\n")]
#[case("r = (1,)\n", "r = (1,)\n")]
fn test_python_expression_passthrough(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(block(source), expected);
}

#[test]
fn test_walrus_passthrough_on_supporting_targets() {
    assert_eq!(block("y = (x := 5)\n"), "y = (x := 5)\n");
}

#[test]
fn test_pipeline_binds_looser_than_comparison() {
    // `x |> f == y` pipes into the whole comparison.
    assert_eq!(block("r = x |> f == y\n"), "r = (f == y)(x)\n");
}
