//! The external interface: configuration, compile modes, the memoized
//! engine's reference-parse equivalence, and the analysis queries used by
//! interactive tooling.

use plume::plume::analysis;
use plume::plume::ast::range::SourceLocation;
use plume::plume::lexing;
use plume::plume::parsing::{Mode as ParseMode, Parser};
use plume::{CompileConfig, Compiler, Mode, Target};

#[test]
fn test_mode_names_round_trip() {
    for name in ["file", "package", "sys", "block", "single", "eval", "lenient"] {
        let mode = Mode::parse(name).unwrap();
        assert_eq!(mode.to_string(), name);
    }
    assert!(Mode::parse("exec").is_err());
}

#[test]
fn test_configure_replaces_the_process_default() {
    let previous = plume::active_config();
    plume::configure(CompileConfig::new().with_minify(true));
    assert!(plume::active_config().minify);
    let out = plume::compile("x = 1\n", Mode::File).unwrap();
    assert_eq!(out, "x = 1\n");
    plume::configure(previous);
}

#[test]
fn test_compiler_instances_are_isolated_from_the_default() {
    let compiler = Compiler::new(
        CompileConfig::new().with_target(Target::parse("2.7").unwrap()),
    );
    assert_eq!(
        compiler.config().target,
        Target::parse("2.7").unwrap()
    );
    // The process default is untouched by instance construction.
    assert_ne!(plume::active_config().target, Target::parse("2.7").unwrap());
}

/// Memoization is a performance optimization, not a semantic change: the
/// memoized parse must equal a reference parse with the memo disabled.
#[test]
fn test_memoized_parse_equals_reference_parse() {
    let sources = [
        "x = 1\n",
        "inc = x -> x + 1\ny = 1 |> inc |> print\n",
        "def f(a, b=2):\n    return a + b\nif f(1) > 2:\n    z = (2 *)\n",
        "operator <+>\nc = 1 <+> 2\n",
    ];
    for source in sources {
        let loc = SourceLocation::new(source);
        let stream = lexing::scan(source).unwrap();

        let mut memoized = Parser::new(source, &loc, &stream, Target::Sys, ParseMode::Block);
        let memoized_module = memoized.run().unwrap();

        let mut reference = Parser::new(source, &loc, &stream, Target::Sys, ParseMode::Block);
        reference.set_memo_enabled(false);
        let reference_module = reference.run().unwrap();

        assert_eq!(memoized_module, reference_module, "diverged on {source:?}");
    }
}

#[test]
fn test_compile_rejects_partial_output_on_failure() {
    // A failing compile returns only the diagnostic, never partial text.
    let result = plume::compile("x = 1\ny = = 2\n", Mode::Block);
    assert!(result.is_err());
}

// ----------------------------------------------------------------------
// Analysis queries
// ----------------------------------------------------------------------

#[test]
fn test_known_names_snapshot_contains_keywords_and_builtins() {
    let names = analysis::known_names();
    for expected in ["def", "match", "operator", "range", "print"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_completion_prefix_queries() {
    assert!(analysis::complete("de").contains(&"def"));
    assert!(analysis::complete("pri").contains(&"print"));
    assert!(analysis::complete("zzz").is_empty());
}

#[test]
fn test_inspect_returns_short_docs() {
    assert_eq!(
        analysis::inspect("operator"),
        Some("Declare a custom infix operator (soft keyword).")
    );
    assert!(analysis::inspect("print").is_some());
    assert!(analysis::inspect("no_such_name").is_none());
}

#[test]
fn test_diagnostics_expose_everything_the_kernel_needs() {
    let err = plume::compile("()[(())", Mode::Block).unwrap_err();
    // kind tag, message text, rendered text, span list: all present.
    assert_eq!(err.ename(), "PlumeLexError");
    assert!(!err.message().is_empty());
    assert!(!err.render().is_empty());
    assert!(!err.annotations().is_empty());
    assert!(!err.traceback().is_empty());
}
