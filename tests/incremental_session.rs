//! Incremental session behavior: memo reuse across sequential compiles
//! must never change outputs or diagnostics versus cold compiles.

use plume::{CompileConfig, Compiler, Mode, Target};

fn fresh(config: CompileConfig) -> Compiler {
    Compiler::new(config)
}

#[test]
fn test_function_then_class_matches_cold_concatenation() {
    let cell1 = "def f(x):\n    return x + 1\n";
    let cell2 = "def f(x):\n    return x + 1\nclass A:\n    pass\n";

    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("func-then-class");
    let _ = session.compile(cell1, Mode::Block).unwrap();
    let incremental = session.compile(cell2, Mode::Block).unwrap();

    let cold = fresh(CompileConfig::new()).compile(cell2, Mode::Block).unwrap();
    assert_eq!(incremental, cold);
    plume::plume::incremental::clear("func-then-class");
}

#[test]
fn test_growing_cell_sequence_matches_cold_at_every_step() {
    let steps = [
        "x = 1\n",
        "x = 1\ny = x |> f\n",
        "x = 1\ny = x |> f\ndef g(a):\n    return a\n",
        "x = 1\ny = x |> f\ndef g(a):\n    return a\nz = g(y)\n",
    ];
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("growing-cells");
    for step in steps {
        let incremental = session.compile(step, Mode::Block).unwrap();
        let cold = fresh(CompileConfig::new()).compile(step, Mode::Block).unwrap();
        assert_eq!(incremental, cold, "diverged at step: {step:?}");
    }
    plume::plume::incremental::clear("growing-cells");
}

#[test]
fn test_edited_prefix_invalidates_reuse() {
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("edited-prefix");
    let _ = session.compile("x = 1\ny = 2\n", Mode::Block).unwrap();
    // The first line changes; nothing stale may leak through.
    let incremental = session.compile("x = 9\ny = 2\n", Mode::Block).unwrap();
    let cold = fresh(CompileConfig::new())
        .compile("x = 9\ny = 2\n", Mode::Block)
        .unwrap();
    assert_eq!(incremental, cold);
    assert!(incremental.contains("x = 9"));
    plume::plume::incremental::clear("edited-prefix");
}

#[test]
fn test_custom_operator_declared_in_reused_prefix_still_applies() {
    // The declaration lives in the unchanged prefix; its effect must
    // survive memo replay for the appended text to parse.
    let cell1 = "operator <+>\na = 1 <+> 2\n";
    let cell2 = "operator <+>\na = 1 <+> 2\nb = 3 <+> 4\n";
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("custom-op-prefix");
    let _ = session.compile(cell1, Mode::Block).unwrap();
    let incremental = session.compile(cell2, Mode::Block).unwrap();
    let cold = fresh(CompileConfig::new()).compile(cell2, Mode::Block).unwrap();
    assert_eq!(incremental, cold);
    assert!(incremental.contains("b = _plume_op_ltplusgt(3, 4)"));
    plume::plume::incremental::clear("custom-op-prefix");
}

#[test]
fn test_diagnostics_unchanged_under_incremental_mode() {
    let good = "x = 1\n";
    let bad = "x = 1\ny = = 2\n";
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("diagnostics-session");
    let _ = session.compile(good, Mode::Block).unwrap();
    let incremental_err = session.compile(bad, Mode::Block).unwrap_err();
    let cold_err = fresh(CompileConfig::new()).compile(bad, Mode::Block).unwrap_err();
    assert_eq!(incremental_err.render(), cold_err.render());
    plume::plume::incremental::clear("diagnostics-session");
}

#[test]
fn test_target_change_flushes_the_session() {
    let source = "y = (x := 1)\n";
    let mut session = fresh(CompileConfig::new().with_target(Target::parse("3.8").unwrap()));
    session.enable_incremental("target-change");
    assert!(session.compile(source, Mode::Block).is_ok());

    // Same session, stricter target: gating must reject exactly as cold.
    session.configure(CompileConfig::new().with_target(Target::parse("3.6").unwrap()));
    let err = session.compile(source, Mode::Block).unwrap_err();
    assert_eq!(err.kind(), plume::DiagnosticKind::Target);
    plume::plume::incremental::clear("target-change");
}

#[test]
fn test_identical_recompile_is_a_full_cache_hit() {
    let source = "def f(x):\n    return x\n";
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("identical-recompile");
    let first = session.compile(source, Mode::Block).unwrap();
    let second = session.compile(source, Mode::Block).unwrap();
    assert_eq!(first, second);
    plume::plume::incremental::clear("identical-recompile");
}

#[test]
fn test_disable_incremental_stops_reuse() {
    let mut session = fresh(CompileConfig::new());
    session.enable_incremental("disable-session");
    let _ = session.compile("x = 1\n", Mode::Block).unwrap();
    session.disable_incremental();
    let out = session.compile("x = 2\n", Mode::Block).unwrap();
    assert_eq!(out, "x = 2\n");
    plume::plume::incremental::clear("disable-session");
}
