//! Statement grammar.
//!
//! One physical line of simple statements (`;`-separated) or one compound
//! statement. Compound statements are tried first; the soft keywords
//! `match`, `case`, `type`, and `operator` backtrack into ordinary
//! expression statements when the construct shape does not follow
//! (`match = 1` assigns, `match x:` matches).
//!
//! Version gates fire after recognition: a `def` with keyword-only
//! parameters parses identically at every target and is rejected here
//! when the target cannot express it.

use crate::plume::ast::nodes::{Expr, ImportName, MatchArm, Node, Param, Stmt};
use crate::plume::ast::range::Range;
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::parsing::engine::{Failure, PResult, Parser};
use crate::plume::parsing::expressions::{self, symbol_is_custom};
use crate::plume::parsing::graph::RuleId;
use crate::plume::parsing::patterns;
use crate::plume::targets::Feature;
use crate::plume::token::TokenKind;

const AUG_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", "@=", "&=", "|=", "^=", "<<=", ">>=",
];

fn stmt_node(s: Stmt) -> Node {
    Node::Stmt(s)
}

fn unwrap_expr(r: PResult) -> Result<(Expr, usize), Failure> {
    r.map(|(node, next)| (node.into_expr(), next))
}

/// One physical line's worth of statements: a compound statement, or a
/// `;`-separated run of simple statements ending in a newline.
pub fn statement_line(p: &mut Parser, at: usize) -> Result<(Vec<Stmt>, usize), Failure> {
    match compound_stmt(p, at) {
        Ok((node, next)) => return Ok((vec![node.into_stmt()], next)),
        Err(Failure::Soft) => {}
        Err(fatal) => return Err(fatal),
    }
    let mut stmts = Vec::new();
    let mut at = at;
    loop {
        let (stmt, next) = match simple_stmt(p, at) {
            Ok((node, next)) => (node.into_stmt(), next),
            Err(failure) => return Err(failure),
        };
        stmts.push(stmt);
        at = next;
        if p.kind(at) == TokenKind::Semicolon {
            at += 1;
            if p.kind(at) == TokenKind::Newline {
                // Trailing semicolon; tolerated here, audited in strict.
                at += 1;
                break;
            }
            continue;
        }
        at = p.expect_newline(at)?;
        break;
    }
    Ok((stmts, at))
}

/// One simple statement with no line handling, for statement lambdas.
pub fn simple_stmt_bare(p: &mut Parser, at: usize) -> Result<(Stmt, usize), Failure> {
    simple_stmt(p, at).map(|(node, next)| (node.into_stmt(), next))
}

// ----------------------------------------------------------------------
// Simple statements
// ----------------------------------------------------------------------

pub fn simple_stmt(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::SimpleStmt, at, |p, at| {
        p.choice(
            at,
            &[
                return_stmt,
                pass_like_stmt,
                import_stmt,
                from_import_stmt,
                type_alias_stmt,
                operator_decl_stmt,
                assign_or_expr_stmt,
            ],
        )
    })
}

fn return_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "return")?;
    let (value, i) = match expressions::expr(p, i) {
        Ok((node, i)) => (Some(node.into_expr()), i),
        Err(Failure::Soft) => (None, i),
        Err(fatal) => return Err(fatal),
    };
    let range = match &value {
        Some(v) => start.cover(v.range()),
        None => start,
    };
    Ok((stmt_node(Stmt::Return { value, range }), i))
}

fn pass_like_stmt(p: &mut Parser, at: usize) -> PResult {
    let token = p.tok(at).clone();
    let stmt = if token.is_keyword("pass") {
        Stmt::Pass { range: token.range }
    } else if token.is_keyword("break") {
        Stmt::Break { range: token.range }
    } else if token.is_keyword("continue") {
        Stmt::Continue { range: token.range }
    } else {
        return Err(p.fail(at, "a statement"));
    };
    Ok((stmt_node(stmt), at + 1))
}

/// A dotted module path: `a.b.c`.
fn dotted_name(p: &mut Parser, at: usize) -> Result<(String, Range, usize), Failure> {
    let (first, range, mut i) = p.expect_name(at)?;
    let mut path = first;
    let mut range = range;
    while p.kind(i) == TokenKind::Dot {
        let (part, part_range, j) = p.expect_name(i + 1)?;
        path.push('.');
        path.push_str(&part);
        range = range.cover(&part_range);
        i = j;
    }
    Ok((path, range, i))
}

fn import_alias(p: &mut Parser, at: usize) -> Result<(Option<String>, usize), Failure> {
    if p.tok(at).is_keyword("as") {
        let (alias, _, i) = p.expect_name(at + 1)?;
        Ok((Some(alias), i))
    } else {
        Ok((None, at))
    }
}

fn import_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let mut i = p.expect_keyword(at, "import")?;
    let mut names = Vec::new();
    loop {
        let (path, range, j) = dotted_name(p, i)?;
        let (alias, j) = import_alias(p, j)?;
        names.push(ImportName { path, alias, range });
        if p.kind(j) == TokenKind::Comma {
            i = j + 1;
        } else {
            i = j;
            break;
        }
    }
    let range = start.cover(&names.last().expect("at least one import").range);
    Ok((stmt_node(Stmt::Import { names, range }), i))
}

fn from_import_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "from")?;
    let (module, _, i) = dotted_name(p, i)?;
    let mut i = p.expect_keyword(i, "import")?;
    let mut names = Vec::new();
    loop {
        let (name, range, j) = p.expect_name(i)?;
        let (alias, j) = import_alias(p, j)?;
        names.push(ImportName {
            path: name,
            alias,
            range,
        });
        if p.kind(j) == TokenKind::Comma {
            i = j + 1;
        } else {
            i = j;
            break;
        }
    }
    let range = start.cover(&names.last().expect("at least one import").range);
    Ok((
        stmt_node(Stmt::FromImport {
            module,
            names,
            range,
        }),
        i,
    ))
}

/// `type Alias = value` — a soft-keyword statement, gated to 3.12+.
fn type_alias_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "type")?;
    let (name, _, i) = p.expect_name(i)?;
    let i = p.expect_op(i, "=")?;
    let (value, i) = unwrap_expr(expressions::expr(p, i))?;
    let range = start.cover(value.range());
    p.gate(Feature::TypeAliasStatement, &range)?;
    Ok((stmt_node(Stmt::TypeAlias { name, value, range }), i))
}

/// `operator <sym> [= impl]` — declares a custom infix operator for the
/// rest of the unit.
fn operator_decl_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "operator")?;
    let (symbol, symbol_range, i) = match p.op_run(i) {
        Some(run) => run,
        None => return Err(p.fail(i, "an operator symbol")),
    };
    if !symbol_is_custom(&symbol) {
        // `operator **` followed by a newline is a clear attempt to
        // redeclare a built-in symbol; anything else (`operator + x`)
        // backtracks into an expression statement on the name.
        if p.kind(i) == TokenKind::Newline {
            let diag = Diagnostic::point(
                DiagnosticKind::Grammar,
                format!("cannot redeclare the built-in operator '{}'", symbol),
                &symbol_range,
                p.loc,
            );
            return Err(p.fatal(diag));
        }
        return Err(p.fail(at + 1, "an operator symbol"));
    }
    let (implementation, i) = if p.tok(i).is_op("=") {
        let (value, j) = unwrap_expr(expressions::expr(p, i + 1))?;
        (Some(value), j)
    } else {
        (None, i)
    };
    let range = match &implementation {
        Some(value) => start.cover(value.range()),
        None => start.cover(&symbol_range),
    };
    p.custom_ops.insert(symbol.clone());
    Ok((
        stmt_node(Stmt::OperatorDecl {
            op: symbol,
            implementation,
            range,
        }),
        i,
    ))
}

/// A comma-separated expression list, folded into a tuple when plural.
fn expr_list(p: &mut Parser, at: usize) -> Result<(Expr, usize), Failure> {
    let (first, mut i) = unwrap_expr(expressions::expr(p, at))?;
    if p.kind(i) != TokenKind::Comma {
        return Ok((first, i));
    }
    let mut items = vec![first];
    while p.kind(i) == TokenKind::Comma {
        match expressions::expr(p, i + 1) {
            Ok((node, j)) => {
                items.push(node.into_expr());
                i = j;
            }
            Err(Failure::Soft) => {
                i += 1; // trailing comma
                break;
            }
            Err(fatal) => return Err(fatal),
        }
    }
    let range = items
        .first()
        .expect("nonempty")
        .range()
        .cover(items.last().expect("nonempty").range());
    Ok((Expr::Tuple { items, range }, i))
}

/// Assignment chains, augmented assignment, or a bare expression.
fn assign_or_expr_stmt(p: &mut Parser, at: usize) -> PResult {
    let (first, mut i) = expr_list(p, at)?;

    for op in AUG_OPS {
        if p.tok(i).is_op(op) {
            let (value, j) = expr_list(p, i + 1)?;
            let range = first.range().cover(value.range());
            return Ok((
                stmt_node(Stmt::AugAssign {
                    target: first,
                    op: (*op).to_string(),
                    value,
                    range,
                }),
                j,
            ));
        }
    }

    if !p.tok(i).is_op("=") {
        let range = first.range().clone();
        return Ok((stmt_node(Stmt::Expr { value: first, range }), i));
    }

    let mut targets = vec![first];
    let mut value = None;
    while p.tok(i).is_op("=") {
        let (next_value, j) = expr_list(p, i + 1)?;
        if let Some(previous) = value.replace(next_value) {
            targets.push(previous);
        }
        i = j;
    }
    let value = value.expect("assignment has a value");
    let range = targets
        .first()
        .expect("nonempty")
        .range()
        .cover(value.range());
    Ok((
        stmt_node(Stmt::Assign {
            targets,
            value,
            range,
        }),
        i,
    ))
}

// ----------------------------------------------------------------------
// Compound statements
// ----------------------------------------------------------------------

pub fn compound_stmt(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::CompoundStmt, at, |p, at| {
        p.choice(
            at,
            &[if_stmt, while_stmt, for_stmt, func_def, class_def, match_stmt],
        )
    })
}

/// A suite: `: simple-stmts NEWLINE` on one line, or an indented block.
fn suite(p: &mut Parser, at: usize) -> Result<(Vec<Stmt>, usize), Failure> {
    let i = p.expect_kind(at, TokenKind::Colon, "':'")?;
    if p.kind(i) != TokenKind::Newline {
        // Single-line suite.
        let mut stmts = Vec::new();
        let mut i = i;
        loop {
            let (stmt, next) = simple_stmt_bare(p, i)?;
            stmts.push(stmt);
            i = next;
            if p.kind(i) == TokenKind::Semicolon {
                i += 1;
                if p.kind(i) == TokenKind::Newline {
                    i += 1;
                    break;
                }
                continue;
            }
            i = p.expect_newline(i)?;
            break;
        }
        return Ok((stmts, i));
    }
    let i = p.expect_kind(i + 1, TokenKind::Indent, "an indented block")?;
    let mut stmts = Vec::new();
    let mut i = i;
    loop {
        let (line, next) = statement_line(p, i)?;
        stmts.extend(line);
        i = next;
        if matches!(p.kind(i), TokenKind::Dedent | TokenKind::Eof) {
            break;
        }
    }
    let i = p.expect_kind(i, TokenKind::Dedent, "end of block")?;
    Ok((stmts, i))
}

fn if_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "if")?;
    let (condition, i) = unwrap_expr(expressions::expr(p, i))?;
    let (body, mut i) = suite(p, i)?;
    let mut arms = vec![(condition, body)];
    while p.tok(i).is_keyword("elif") {
        let (condition, j) = unwrap_expr(expressions::expr(p, i + 1))?;
        let (body, j) = suite(p, j)?;
        arms.push((condition, body));
        i = j;
    }
    let orelse = if p.tok(i).is_keyword("else") {
        let (body, j) = suite(p, i + 1)?;
        i = j;
        Some(body)
    } else {
        None
    };
    let end = orelse
        .as_deref()
        .and_then(|body| body.last())
        .or_else(|| arms.last().and_then(|(_, body)| body.last()))
        .map(|stmt| stmt.range().clone())
        .unwrap_or_else(|| start.clone());
    let range = start.cover(&end);
    Ok((stmt_node(Stmt::If { arms, orelse, range }), i))
}

fn while_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "while")?;
    let (condition, i) = unwrap_expr(expressions::expr(p, i))?;
    let (body, i) = suite(p, i)?;
    let range = match body.last() {
        Some(last) => start.cover(last.range()),
        None => start,
    };
    Ok((
        stmt_node(Stmt::While {
            condition,
            body,
            range,
        }),
        i,
    ))
}

fn for_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "for")?;
    let (target, i) = expressions::comprehension_target(p, i)?;
    let i = p.expect_keyword(i, "in")?;
    let (iterable, i) = expr_list(p, i)?;
    let (body, i) = suite(p, i)?;
    let range = match body.last() {
        Some(last) => start.cover(last.range()),
        None => start,
    };
    Ok((
        stmt_node(Stmt::For {
            target,
            iterable,
            body,
            range,
        }),
        i,
    ))
}

fn class_def(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "class")?;
    let (name, _, mut i) = p.expect_name(i)?;
    let mut bases = Vec::new();
    if p.kind(i) == TokenKind::OpenParen {
        let mut j = i + 1;
        while p.kind(j) != TokenKind::CloseParen {
            let (base, k) = unwrap_expr(expressions::expr(p, j))?;
            bases.push(base);
            if p.kind(k) == TokenKind::Comma {
                j = k + 1;
            } else {
                j = k;
                break;
            }
        }
        i = p.expect_kind(j, TokenKind::CloseParen, "')'")?;
    }
    let (body, i) = suite(p, i)?;
    let range = match body.last() {
        Some(last) => start.cover(last.range()),
        None => start,
    };
    Ok((
        stmt_node(Stmt::ClassDef {
            name,
            bases,
            body,
            range,
        }),
        i,
    ))
}

// ----------------------------------------------------------------------
// Function definitions
// ----------------------------------------------------------------------

#[derive(Default)]
struct ParamFlags {
    keyword_only: Option<Range>,
    positional_only: Option<Range>,
    tuple_param: Option<Range>,
    annotation: Option<Range>,
}

fn def_params(p: &mut Parser, at: usize) -> Result<(Vec<Param>, ParamFlags, usize), Failure> {
    let mut i = p.expect_kind(at, TokenKind::OpenParen, "'('")?;
    let mut params = Vec::new();
    let mut flags = ParamFlags::default();
    let mut seen_star = false;
    while p.kind(i) != TokenKind::CloseParen {
        let token = p.tok(i).clone();
        if token.is_op("**") {
            let (name, range, j) = p.expect_name(i + 1)?;
            let range = token.range.cover(&range);
            params.push(Param::KwArgs { name, range });
            i = j;
        } else if token.is_op("*") {
            if let Ok((name, range, j)) = p.expect_name(i + 1) {
                let range = token.range.cover(&range);
                params.push(Param::VarArgs { name, range });
                i = j;
            } else {
                params.push(Param::KeywordOnlyMarker {
                    range: token.range.clone(),
                });
                i += 1;
            }
            seen_star = true;
        } else if token.is_op("/") {
            flags.positional_only.get_or_insert(token.range.clone());
            params.push(Param::PositionalOnlyMarker { range: token.range });
            i += 1;
        } else if token.kind == TokenKind::OpenParen {
            // Legacy tuple destructuring parameter.
            let mut names = Vec::new();
            let mut j = i + 1;
            loop {
                let (name, _, k) = p.expect_name(j)?;
                names.push(name);
                if p.kind(k) == TokenKind::Comma {
                    j = k + 1;
                } else {
                    j = k;
                    break;
                }
            }
            let j = p.expect_kind(j, TokenKind::CloseParen, "')'")?;
            let range = token.range.cover(&p.tok(j - 1).range.clone());
            flags.tuple_param.get_or_insert(range.clone());
            params.push(Param::Tuple { names, range });
            i = j;
        } else {
            let (name, range, j) = p.expect_name(i)?;
            let (annotation, j) = if p.kind(j) == TokenKind::Colon {
                let (a, j) = unwrap_expr(expressions::expr(p, j + 1))?;
                flags.annotation.get_or_insert(a.range().clone());
                (Some(a), j)
            } else {
                (None, j)
            };
            let (default, j) = if p.tok(j).is_op("=") {
                let (d, j) = unwrap_expr(expressions::expr(p, j + 1))?;
                (Some(d), j)
            } else {
                (None, j)
            };
            if seen_star {
                flags.keyword_only.get_or_insert(range.clone());
            }
            params.push(Param::Normal {
                name,
                annotation,
                default,
                range,
            });
            i = j;
        }
        if p.kind(i) == TokenKind::Comma {
            i += 1;
        } else {
            break;
        }
    }
    let i = p.expect_kind(i, TokenKind::CloseParen, "')'")?;
    Ok((params, flags, i))
}

fn func_def(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let (is_async, i) = if p.tok(at).is_keyword("async") {
        (true, at + 1)
    } else {
        (false, at)
    };
    let i = p.expect_keyword(i, "def")?;
    let (name, _, i) = p.expect_name(i)?;
    let (params, flags, i) = def_params(p, i)?;
    let (returns, i) = if p.tok(i).is_op("->") {
        let (r, j) = unwrap_expr(expressions::expr(p, i + 1))?;
        (Some(r), j)
    } else {
        (None, i)
    };
    let (body, i) = suite(p, i)?;

    // Version gates, after the whole definition is recognized.
    if let Some(range) = &flags.tuple_param {
        p.gate(Feature::TupleParams, range)?;
    }
    if let Some(range) = &flags.keyword_only {
        p.gate(Feature::KeywordOnlyParams, range)?;
    }
    if let Some(range) = &flags.positional_only {
        p.gate(Feature::PositionalOnlyParams, range)?;
    }
    if let Some(range) = flags
        .annotation
        .as_ref()
        .or_else(|| returns.as_ref().map(|r| r.range()))
    {
        p.gate(Feature::Annotations, range)?;
    }
    if is_async {
        p.gate(Feature::AsyncAwait, &start)?;
        if body_contains_yield(&body) {
            p.gate(Feature::AsyncGenerators, &start)?;
        }
    }

    let range = match body.last() {
        Some(last) => start.cover(last.range()),
        None => start,
    };
    Ok((
        stmt_node(Stmt::FuncDef {
            name,
            params,
            returns,
            body,
            is_async,
            range,
        }),
        i,
    ))
}

/// Whether a function body yields, without descending into nested
/// definitions.
fn body_contains_yield(body: &[Stmt]) -> bool {
    fn expr_yields(e: &Expr) -> bool {
        match e {
            Expr::Yield { .. } => true,
            Expr::Paren { inner, .. } => expr_yields(inner),
            Expr::BoolOp { values, .. } => values.iter().any(expr_yields),
            Expr::Binary { left, right, .. } => expr_yields(left) || expr_yields(right),
            Expr::Ternary {
                body,
                condition,
                orelse,
                ..
            } => expr_yields(body) || expr_yields(condition) || expr_yields(orelse),
            _ => false,
        }
    }
    body.iter().any(|stmt| match stmt {
        Stmt::Expr { value, .. } => expr_yields(value),
        Stmt::Assign { value, .. } => expr_yields(value),
        Stmt::Return { value: Some(v), .. } => expr_yields(v),
        Stmt::If { arms, orelse, .. } => {
            arms.iter().any(|(_, body)| body_contains_yield(body))
                || orelse.as_deref().map(body_contains_yield).unwrap_or(false)
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } => body_contains_yield(body),
        _ => false,
    })
}

// ----------------------------------------------------------------------
// Match statements
// ----------------------------------------------------------------------

fn match_stmt(p: &mut Parser, at: usize) -> PResult {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "match")?;
    let (subject, i) = unwrap_expr(expressions::expr(p, i))?;
    let i = p.expect_kind(i, TokenKind::Colon, "':'")?;
    let i = p.expect_newline(i)?;
    let mut i = p.expect_kind(i, TokenKind::Indent, "an indented block")?;
    let mut arms = Vec::new();
    loop {
        let (arm, next) = case_arm(p, i)?;
        arms.push(arm);
        i = next;
        if matches!(p.kind(i), TokenKind::Dedent | TokenKind::Eof) {
            break;
        }
    }
    let i = p.expect_kind(i, TokenKind::Dedent, "end of block")?;

    let range = match arms.last() {
        Some(arm) => start.cover(&arm.range),
        None => start.clone(),
    };
    p.gate(Feature::MatchStatement, &start)?;
    Ok((
        stmt_node(Stmt::Match {
            subject,
            arms,
            range,
        }),
        i,
    ))
}

fn case_arm(p: &mut Parser, at: usize) -> Result<(MatchArm, usize), Failure> {
    let start = p.tok(at).range.clone();
    let i = p.expect_keyword(at, "case")?;
    let (pattern, i) = patterns::pattern(p, i).map(|(n, i)| (n.into_pattern(), i))?;
    let (guard, i) = if p.tok(i).is_keyword("if") {
        let (g, j) = unwrap_expr(expressions::expr(p, i + 1))?;
        (Some(g), j)
    } else {
        (None, i)
    };
    let (body, i) = suite(p, i)?;
    let range = match body.last() {
        Some(last) => start.cover(last.range()),
        None => start,
    };
    Ok((
        MatchArm {
            pattern,
            guard,
            body,
            range,
        },
        i,
    ))
}
