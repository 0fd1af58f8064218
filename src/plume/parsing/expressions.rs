//! Expression grammar.
//!
//! Precedence, loosest to tightest:
//!
//! ```text
//! statement lambda (=>)  >  arrow lambda (->)  >  pipeline (|> |*> <|)
//!   >  ternary  >  or  >  and  >  not  >  comparison
//!   >  custom-operator / backtick infix  >  | ^ &  >  << >>
//!   >  + -  >  * / // % @  >  unary + - ~  >  **  >  postfix  >  atom
//! ```
//!
//! Ambiguity resolution (choice order is the documented contract):
//!
//! - `expr` tries a statement lambda, then an arrow lambda, then a
//!   pipeline; a parenthesized parameter list that is not followed by an
//!   arrow backtracks into an ordinary parenthesized expression.
//! - Forward pipes (`|>`, `|*>`) associate left; backward pipes (`<|`)
//!   bind everything to their right. Mixing a backward pipe into a
//!   forward chain without parentheses is rejected.
//! - Inside parentheses an expression is tried before an operator
//!   section, so `(+1)` and `(-1)` are unary expressions; `+` and `-`
//!   therefore have no right sections. `(1 +)`, `(* 2)`, and `(+)` are
//!   sections.
//! - A custom operator is a contiguous run of operator characters; runs
//!   are only accepted infix when declared by an `operator` statement
//!   (lenient mode accepts undeclared runs).

use crate::plume::ast::nodes::{Arg, Expr, FStringPart, Node, Param};
use crate::plume::ast::range::{Range, SourceLocation};
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::parsing::engine::{Failure, Mode, PResult, Parser};
use crate::plume::parsing::graph::RuleId;
use crate::plume::targets::Feature;
use crate::plume::token::TokenKind;

/// Binary operators usable in sections and as section-able infix ops.
pub(crate) const STANDARD_BINOPS: &[&str] = &[
    "+", "-", "*", "/", "//", "%", "@", "**", "|", "^", "&", "<<", ">>", "==", "!=", "<", "<=",
    ">", ">=",
];

fn expr_node(e: Expr) -> Node {
    Node::Expr(e)
}

fn unwrap_expr(r: PResult) -> Result<(Expr, usize), Failure> {
    r.map(|(node, next)| (node.into_expr(), next))
}

// ----------------------------------------------------------------------
// Entry
// ----------------------------------------------------------------------

pub fn expr(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Expr, at, |p, at| {
        p.choice(at, &[stmt_lambda, arrow_lambda, pipeline])
    })
}

// ----------------------------------------------------------------------
// Lambdas
// ----------------------------------------------------------------------

fn stmt_lambda(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::StmtLambda, at, |p, at| {
        let (params, start, i) = lambda_params(p, at)?;
        let i = p.expect_op(i, "=>")?;
        let (body, i) = crate::plume::parsing::statements::simple_stmt_bare(p, i)?;
        let range = start.cover(body.range());
        Ok((
            expr_node(Expr::StmtLambda {
                params,
                body: Box::new(body),
                range,
            }),
            i,
        ))
    })
}

fn arrow_lambda(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::ArrowLambda, at, |p, at| {
        let (params, start, i) = lambda_params(p, at)?;
        let i = p.expect_op(i, "->")?;
        let (body, i) = unwrap_expr(expr(p, i))?;
        let range = start.cover(body.range());
        Ok((
            expr_node(Expr::Lambda {
                params,
                body: Box::new(body),
                range,
            }),
            i,
        ))
    })
}

/// Lambda parameters: a bare name, or a parenthesized name list with
/// optional defaults.
fn lambda_params(p: &mut Parser, at: usize) -> Result<(Vec<Param>, Range, usize), Failure> {
    if let Ok((name, range, i)) = p.expect_name(at) {
        let param = Param::Normal {
            name,
            annotation: None,
            default: None,
            range: range.clone(),
        };
        return Ok((vec![param], range, i));
    }
    let start = p.tok(at).range.clone();
    let mut i = p.expect_kind(at, TokenKind::OpenParen, "lambda parameters")?;
    let mut params = Vec::new();
    if p.kind(i) != TokenKind::CloseParen {
        loop {
            let (name, range, j) = p.expect_name(i)?;
            let (default, j) = if p.tok(j).is_op("=") {
                let (value, j) = unwrap_expr(expr(p, j + 1))?;
                (Some(value), j)
            } else {
                (None, j)
            };
            params.push(Param::Normal {
                name,
                annotation: None,
                default,
                range,
            });
            if p.kind(j) == TokenKind::Comma {
                i = j + 1;
                if p.kind(i) == TokenKind::CloseParen {
                    break;
                }
            } else {
                i = j;
                break;
            }
        }
    }
    let i = p.expect_kind(i, TokenKind::CloseParen, "')'")?;
    Ok((params, start, i))
}

// ----------------------------------------------------------------------
// Pipelines
// ----------------------------------------------------------------------

pub fn pipeline(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Pipeline, at, |p, at| {
        let (first, mut i) = unwrap_expr(ternary(p, at))?;

        if p.tok(i).is_op("<|") {
            let (rest, j) = unwrap_expr(pipeline(p, i + 1))?;
            let range = first.range().cover(rest.range());
            return Ok((
                expr_node(Expr::Pipe {
                    kind: crate::plume::ast::nodes::PipeKind::Backward,
                    left: Box::new(first),
                    right: Box::new(rest),
                    range,
                }),
                j,
            ));
        }

        let mut node = first;
        loop {
            let kind = if p.tok(i).is_op("|>") {
                crate::plume::ast::nodes::PipeKind::Forward
            } else if p.tok(i).is_op("|*>") {
                crate::plume::ast::nodes::PipeKind::ForwardStar
            } else if p.tok(i).is_op("<|") {
                // A backward pipe inside a forward chain has no single
                // deterministic grouping; require parentheses.
                let diag = Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "cannot mix forward and backward pipes without parentheses",
                    &p.tok(i).range,
                    p.loc,
                );
                return Err(p.fatal(diag));
            } else {
                break;
            };
            let (rhs, j) = unwrap_expr(ternary(p, i + 1))?;
            let range = node.range().cover(rhs.range());
            node = Expr::Pipe {
                kind,
                left: Box::new(node),
                right: Box::new(rhs),
                range,
            };
            i = j;
        }
        Ok((expr_node(node), i))
    })
}

// ----------------------------------------------------------------------
// Ternary and boolean levels
// ----------------------------------------------------------------------

fn ternary(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Ternary, at, |p, at| {
        let (body, i) = unwrap_expr(or_test(p, at))?;
        if !p.tok(i).is_keyword("if") {
            return Ok((expr_node(body), i));
        }
        let (condition, i) = unwrap_expr(or_test(p, i + 1))?;
        let i = p.expect_keyword(i, "else")?;
        let (orelse, i) = unwrap_expr(expr(p, i))?;
        let range = body.range().cover(orelse.range());
        Ok((
            expr_node(Expr::Ternary {
                body: Box::new(body),
                condition: Box::new(condition),
                orelse: Box::new(orelse),
                range,
            }),
            i,
        ))
    })
}

fn bool_level(
    p: &mut Parser,
    at: usize,
    keyword: &'static str,
    sub: fn(&mut Parser, usize) -> PResult,
) -> PResult {
    let (first, mut i) = unwrap_expr(sub(p, at))?;
    let mut values = vec![first];
    while p.tok(i).is_keyword(keyword) {
        match sub(p, i + 1) {
            Ok((node, j)) => {
                values.push(node.into_expr());
                i = j;
            }
            // Backtrack the operator; the caller may accept the prefix.
            Err(Failure::Soft) => break,
            Err(fatal) => return Err(fatal),
        }
    }
    if values.len() == 1 {
        return Ok((expr_node(values.pop().expect("one value")), i));
    }
    let range = values
        .first()
        .expect("nonempty")
        .range()
        .cover(values.last().expect("nonempty").range());
    Ok((
        expr_node(Expr::BoolOp {
            op: keyword.to_string(),
            values,
            range,
        }),
        i,
    ))
}

fn or_test(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::OrTest, at, |p, at| bool_level(p, at, "or", and_test))
}

fn and_test(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::AndTest, at, |p, at| bool_level(p, at, "and", not_test))
}

fn not_test(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::NotTest, at, |p, at| {
        if p.tok(at).is_keyword("not") {
            let start = p.tok(at).range.clone();
            let (operand, i) = unwrap_expr(not_test(p, at + 1))?;
            let range = start.cover(operand.range());
            Ok((
                expr_node(Expr::Unary {
                    op: "not".to_string(),
                    operand: Box::new(operand),
                    range,
                }),
                i,
            ))
        } else {
            comparison(p, at)
        }
    })
}

// ----------------------------------------------------------------------
// Comparisons
// ----------------------------------------------------------------------

/// One comparison operator at `at`, as (text, next). Handles the
/// two-keyword forms `not in` and `is not`.
fn comparison_op(p: &Parser, at: usize) -> Option<(String, usize)> {
    let token = p.tok(at);
    for op in ["==", "!=", "<=", ">=", "<", ">"] {
        if token.is_op(op) {
            return Some((op.to_string(), at + 1));
        }
    }
    if token.is_keyword("in") {
        return Some(("in".to_string(), at + 1));
    }
    if token.is_keyword("not") && p.tok(at + 1).is_keyword("in") {
        return Some(("not in".to_string(), at + 2));
    }
    if token.is_keyword("is") {
        if p.tok(at + 1).is_keyword("not") {
            return Some(("is not".to_string(), at + 2));
        }
        return Some(("is".to_string(), at + 1));
    }
    None
}

fn comparison(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Comparison, at, |p, at| {
        let (first, mut i) = unwrap_expr(infix_chain(p, at))?;
        let mut rest = Vec::new();
        while let Some((op, j)) = comparison_op(p, i) {
            match infix_chain(p, j) {
                Ok((node, k)) => {
                    rest.push((op, node.into_expr()));
                    i = k;
                }
                // Backtrack the operator: `(x <)` is a section, not a
                // truncated comparison.
                Err(Failure::Soft) => break,
                Err(fatal) => return Err(fatal),
            }
        }
        if rest.is_empty() {
            return Ok((expr_node(first), i));
        }
        let range = first
            .range()
            .cover(rest.last().expect("nonempty").1.range());
        Ok((
            expr_node(Expr::Compare {
                first: Box::new(first),
                rest,
                range,
            }),
            i,
        ))
    })
}

// ----------------------------------------------------------------------
// Custom operators and backtick application
// ----------------------------------------------------------------------

/// A declared custom operator symbol at `at`: a contiguous operator run
/// that is not a standard operator and is either declared or allowed by
/// lenient mode.
fn custom_op_at(p: &Parser, at: usize) -> Option<(String, Range, usize)> {
    let (symbol, range, next) = p.op_run(at)?;
    if STANDARD_BINOPS.contains(&symbol.as_str()) || !symbol_is_custom(&symbol) {
        return None;
    }
    if p.custom_ops.contains(&symbol) || p.allows_undeclared_ops() {
        Some((symbol, range, next))
    } else {
        // Recognized shape, undeclared symbol: report a useful
        // expectation instead of cascading single-char failures.
        let _ = p.fail(at, "a declared custom operator");
        None
    }
}

/// Runs that can only be custom operators: multi-token symbols, and
/// never ones carrying `=`/arrow/pipe meaning.
pub(crate) fn symbol_is_custom(symbol: &str) -> bool {
    symbol.len() > 1
        && !symbol.contains(":=")
        && !symbol.contains("->")
        && !symbol.contains("=>")
        && symbol != "|>"
        && symbol != "|*>"
        && symbol != "<|"
        && !symbol.ends_with('=')
}

fn infix_chain(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::InfixChain, at, |p, at| {
        let (mut node, mut i) = unwrap_expr(bit_or(p, at))?;
        loop {
            if let Some((symbol, _, j)) = custom_op_at(p, i) {
                let (rhs, k) = match bit_or(p, j) {
                    Ok((rhs, k)) => (rhs.into_expr(), k),
                    // Backtrack the operator: `(a <+>)` is a section.
                    Err(Failure::Soft) => return Ok((expr_node(node), i)),
                    Err(fatal) => return Err(fatal),
                };
                let range = node.range().cover(rhs.range());
                node = Expr::CustomOp {
                    op: symbol,
                    left: Box::new(node),
                    right: Box::new(rhs),
                    range,
                };
                i = k;
            } else if p.kind(i) == TokenKind::Backtick {
                let (func, _, j) = p.expect_name(i + 1)?;
                let j = p.expect_kind(j, TokenKind::Backtick, "'`'")?;
                let (rhs, k) = unwrap_expr(bit_or(p, j))?;
                let range = node.range().cover(rhs.range());
                node = Expr::BacktickCall {
                    func,
                    left: Box::new(node),
                    right: Box::new(rhs),
                    range,
                };
                i = k;
            } else {
                return Ok((expr_node(node), i));
            }
        }
    })
}

// ----------------------------------------------------------------------
// Binary operator levels
// ----------------------------------------------------------------------

fn left_assoc(
    p: &mut Parser,
    at: usize,
    ops: &[&'static str],
    sub: fn(&mut Parser, usize) -> PResult,
) -> PResult {
    let (mut node, mut i) = unwrap_expr(sub(p, at))?;
    'outer: loop {
        for op in ops {
            if p.tok(i).is_op(op) {
                let (rhs, j) = match sub(p, i + 1) {
                    Ok((rhs, j)) => (rhs.into_expr(), j),
                    // Backtrack the operator: `(1 +)` is a section.
                    Err(Failure::Soft) => return Ok((expr_node(node), i)),
                    Err(fatal) => return Err(fatal),
                };
                if *op == "@" {
                    p.gate(Feature::MatMul, &p.tok(i).range.clone())?;
                }
                let range = node.range().cover(rhs.range());
                node = Expr::Binary {
                    op: (*op).to_string(),
                    left: Box::new(node),
                    right: Box::new(rhs),
                    range,
                };
                i = j;
                continue 'outer;
            }
        }
        return Ok((expr_node(node), i));
    }
}

fn bit_or(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::BitOr, at, |p, at| left_assoc(p, at, &["|"], bit_xor))
}

fn bit_xor(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::BitXor, at, |p, at| left_assoc(p, at, &["^"], bit_and))
}

fn bit_and(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::BitAnd, at, |p, at| left_assoc(p, at, &["&"], shift))
}

fn shift(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Shift, at, |p, at| {
        left_assoc(p, at, &["<<", ">>"], arith)
    })
}

fn arith(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Arith, at, |p, at| {
        left_assoc(p, at, &["+", "-"], term)
    })
}

fn term(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Term, at, |p, at| {
        left_assoc(p, at, &["*", "/", "//", "%", "@"], factor)
    })
}

fn factor(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Factor, at, |p, at| {
        let token = p.tok(at).clone();
        for op in ["+", "-", "~"] {
            if token.is_op(op) {
                let start = token.range.clone();
                let (operand, i) = unwrap_expr(factor(p, at + 1))?;
                let range = start.cover(operand.range());
                return Ok((
                    expr_node(Expr::Unary {
                        op: op.to_string(),
                        operand: Box::new(operand),
                        range,
                    }),
                    i,
                ));
            }
        }
        power(p, at)
    })
}

fn power(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Power, at, |p, at| {
        let (base, i) = unwrap_expr(postfix(p, at))?;
        if !p.tok(i).is_op("**") {
            return Ok((expr_node(base), i));
        }
        // Right-associative: the exponent may itself be a unary/power.
        let (exponent, j) = match factor(p, i + 1) {
            Ok((node, j)) => (node.into_expr(), j),
            // Backtrack the operator: `(2 **)` is a section.
            Err(Failure::Soft) => return Ok((expr_node(base), i)),
            Err(fatal) => return Err(fatal),
        };
        let range = base.range().cover(exponent.range());
        Ok((
            expr_node(Expr::Binary {
                op: "**".to_string(),
                left: Box::new(base),
                right: Box::new(exponent),
                range,
            }),
            j,
        ))
    })
}

// ----------------------------------------------------------------------
// Postfix trailers
// ----------------------------------------------------------------------

fn postfix(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Postfix, at, |p, at| {
        let (mut node, mut i) = unwrap_expr(atom(p, at))?;
        loop {
            match p.kind(i) {
                TokenKind::OpenParen => {
                    let (args, j) = call_args(p, i + 1)?;
                    let close = p.expect_kind(j, TokenKind::CloseParen, "')'")?;
                    let range = node.range().cover(&p.tok(close - 1).range.clone());
                    node = Expr::Call {
                        func: Box::new(node),
                        args,
                        range,
                    };
                    i = close;
                }
                TokenKind::OpenBracket => {
                    let (index, j) = subscript_index(p, i + 1)?;
                    let close = p.expect_kind(j, TokenKind::CloseBracket, "']'")?;
                    let range = node.range().cover(&p.tok(close - 1).range.clone());
                    node = Expr::Subscript {
                        value: Box::new(node),
                        index: Box::new(index),
                        range,
                    };
                    i = close;
                }
                TokenKind::Dot => {
                    if let Ok((attr, attr_range, j)) = p.expect_name(i + 1) {
                        let range = node.range().cover(&attr_range);
                        node = Expr::Attribute {
                            value: Box::new(node),
                            attr,
                            range,
                        };
                        i = j;
                    } else {
                        // Dangling dot: legacy tolerance, audited in
                        // strict mode.
                        let range = node.range().cover(&p.tok(i).range.clone());
                        node = Expr::TrailingDot {
                            value: Box::new(node),
                            range,
                        };
                        i += 1;
                        return Ok((expr_node(node), i));
                    }
                }
                _ => return Ok((expr_node(node), i)),
            }
        }
    })
}

/// Call arguments, ending before the closing paren.
fn call_args(p: &mut Parser, mut at: usize) -> Result<(Vec<Arg>, usize), Failure> {
    let mut args = Vec::new();
    if p.kind(at) == TokenKind::CloseParen {
        return Ok((args, at));
    }
    loop {
        let arg = if p.kind(at) == TokenKind::Question {
            let range = p.tok(at).range.clone();
            at += 1;
            Arg::Placeholder(range)
        } else if p.tok(at).is_op("**") {
            let (value, next) = unwrap_expr(expr(p, at + 1))?;
            at = next;
            Arg::DoubleStar(value)
        } else if p.tok(at).is_op("*") {
            let (value, next) = unwrap_expr(expr(p, at + 1))?;
            at = next;
            Arg::Star(value)
        } else if p.kind(at) == TokenKind::Name
            && p.tok(at + 1).is_op("=")
            && !crate::plume::parsing::engine::RESERVED.contains(&p.tok(at).text.as_str())
        {
            let name = p.tok(at).text.clone();
            let (value, next) = unwrap_expr(expr(p, at + 2))?;
            at = next;
            Arg::Keyword { name, value }
        } else if p.kind(at) == TokenKind::Name && p.tok(at + 1).is_op(":=") {
            let (value, next) = walrus(p, at)?;
            at = next;
            Arg::Positional(value)
        } else {
            let (value, next) = unwrap_expr(expr(p, at))?;
            at = next;
            Arg::Positional(value)
        };
        args.push(arg);
        if p.kind(at) == TokenKind::Comma {
            at += 1;
            if p.kind(at) == TokenKind::CloseParen {
                break;
            }
        } else {
            break;
        }
    }
    Ok((args, at))
}

/// `name := value`, gated on the assignment-expression feature.
fn walrus(p: &mut Parser, at: usize) -> Result<(Expr, usize), Failure> {
    let (name, start, i) = p.expect_name(at)?;
    let i = p.expect_op(i, ":=")?;
    let (value, i) = unwrap_expr(expr(p, i))?;
    let range = start.cover(value.range());
    p.gate(Feature::Walrus, &range)?;
    Ok((
        Expr::Walrus {
            name,
            value: Box::new(value),
            range,
        },
        i,
    ))
}

fn subscript_index(p: &mut Parser, at: usize) -> Result<(Expr, usize), Failure> {
    let start = p.tok(at).range.clone();
    let (lower, i) = if p.kind(at) == TokenKind::Colon {
        (None, at)
    } else {
        let (e, i) = unwrap_expr(expr(p, at))?;
        (Some(e), i)
    };
    if p.kind(i) != TokenKind::Colon {
        return match lower {
            Some(e) => Ok((e, i)),
            None => Err(p.fail(at, "a subscript")),
        };
    }
    let mut i = i + 1;
    let upper = if matches!(p.kind(i), TokenKind::Colon | TokenKind::CloseBracket) {
        None
    } else {
        let (e, j) = unwrap_expr(expr(p, i))?;
        i = j;
        Some(e)
    };
    let step = if p.kind(i) == TokenKind::Colon {
        i += 1;
        if p.kind(i) == TokenKind::CloseBracket {
            None
        } else {
            let (e, j) = unwrap_expr(expr(p, i))?;
            i = j;
            Some(e)
        }
    } else {
        None
    };
    let range = start.cover(&p.tok(i).range.clone());
    Ok((
        Expr::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
            range,
        },
        i,
    ))
}

// ----------------------------------------------------------------------
// Atoms
// ----------------------------------------------------------------------

fn atom(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Atom, at, |p, at| {
        let token = p.tok(at).clone();
        match token.kind {
            TokenKind::Number | TokenKind::Str => Ok((
                expr_node(Expr::Literal {
                    text: token.text,
                    range: token.range,
                }),
                at + 1,
            )),
            TokenKind::FStr => {
                let fstring = parse_fstring(p, at)?;
                Ok((expr_node(fstring), at + 1))
            }
            TokenKind::Name if token.text == "await" => {
                p.gate(Feature::AsyncAwait, &token.range)?;
                let (operand, i) = unwrap_expr(postfix(p, at + 1))?;
                let range = token.range.cover(operand.range());
                Ok((
                    expr_node(Expr::Await {
                        value: Box::new(operand),
                        range,
                    }),
                    i,
                ))
            }
            TokenKind::Name if token.text == "yield" => {
                let (value, i) = match expr(p, at + 1) {
                    Ok((node, i)) => (Some(Box::new(node.into_expr())), i),
                    Err(Failure::Soft) => (None, at + 1),
                    Err(fatal) => return Err(fatal),
                };
                let range = match &value {
                    Some(v) => token.range.cover(v.range()),
                    None => token.range,
                };
                Ok((expr_node(Expr::Yield { value, range }), i))
            }
            TokenKind::Name
                if !crate::plume::parsing::engine::RESERVED.contains(&token.text.as_str()) =>
            {
                Ok((
                    expr_node(Expr::Name {
                        text: token.text,
                        range: token.range,
                    }),
                    at + 1,
                ))
            }
            TokenKind::OpenParen => parenthesized(p, at),
            TokenKind::OpenBracket => list_display(p, at),
            TokenKind::OpenBrace => brace_display(p, at),
            _ => Err(p.fail(at, "an expression")),
        }
    })
}

/// Parenthesized forms, tried in order: unit tuple, walrus, expression
/// (then tuple or left section), right section, bare operator function.
fn parenthesized(p: &mut Parser, at: usize) -> PResult {
    let open = p.tok(at).range.clone();
    let i = at + 1;

    if p.kind(i) == TokenKind::CloseParen {
        let range = open.cover(&p.tok(i).range.clone());
        return Ok((expr_node(Expr::Tuple { items: vec![], range }), i + 1));
    }

    if p.kind(i) == TokenKind::Name && p.tok(i + 1).is_op(":=") {
        let (value, j) = walrus(p, i)?;
        let j = p.expect_kind(j, TokenKind::CloseParen, "')'")?;
        let range = open.cover(&p.tok(j - 1).range.clone());
        return Ok((
            expr_node(Expr::Paren {
                inner: Box::new(value),
                range,
            }),
            j,
        ));
    }

    match expr(p, i) {
        Ok((node, j)) => {
            let first = node.into_expr();
            if p.kind(j) == TokenKind::CloseParen {
                let range = open.cover(&p.tok(j).range.clone());
                return Ok((
                    expr_node(Expr::Paren {
                        inner: Box::new(first),
                        range,
                    }),
                    j + 1,
                ));
            }
            if p.kind(j) == TokenKind::Comma {
                let mut items = vec![first];
                let mut i = j + 1;
                while p.kind(i) != TokenKind::CloseParen {
                    let (item, k) = unwrap_expr(expr(p, i))?;
                    items.push(item);
                    if p.kind(k) == TokenKind::Comma {
                        i = k + 1;
                    } else {
                        i = k;
                        break;
                    }
                }
                let i = p.expect_kind(i, TokenKind::CloseParen, "')'")?;
                let range = open.cover(&p.tok(i - 1).range.clone());
                return Ok((expr_node(Expr::Tuple { items, range }), i));
            }
            // `(expr op)` — left section.
            if let Some((symbol, _, k)) = section_op(p, j) {
                if p.kind(k) == TokenKind::CloseParen {
                    let range = open.cover(&p.tok(k).range.clone());
                    return Ok((
                        expr_node(Expr::Section {
                            op: symbol,
                            left: Some(Box::new(first)),
                            right: None,
                            range,
                        }),
                        k + 1,
                    ));
                }
            }
            Err(p.fail(j, "')'"))
        }
        Err(Failure::Soft) => {
            // `(op expr)` right section or `(op)` operator function.
            if let Some((symbol, _, j)) = section_op(p, i) {
                if p.kind(j) == TokenKind::CloseParen {
                    let range = open.cover(&p.tok(j).range.clone());
                    return Ok((
                        expr_node(Expr::Section {
                            op: symbol,
                            left: None,
                            right: None,
                            range,
                        }),
                        j + 1,
                    ));
                }
                let (rhs, k) = unwrap_expr(expr(p, j))?;
                let k = p.expect_kind(k, TokenKind::CloseParen, "')'")?;
                let range = open.cover(&p.tok(k - 1).range.clone());
                return Ok((
                    expr_node(Expr::Section {
                        op: symbol,
                        left: None,
                        right: Some(Box::new(rhs)),
                        range,
                    }),
                    k,
                ));
            }
            Err(p.fail(i, "an expression"))
        }
        Err(fatal) => Err(fatal),
    }
}

/// An operator usable in a section: a standard binary operator or a
/// declared custom one.
fn section_op(p: &Parser, at: usize) -> Option<(String, Range, usize)> {
    let (symbol, range, next) = p.op_run(at)?;
    if STANDARD_BINOPS.contains(&symbol.as_str())
        || p.custom_ops.contains(&symbol)
        || (p.allows_undeclared_ops() && symbol_is_custom(&symbol))
    {
        Some((symbol, range, next))
    } else {
        None
    }
}

fn list_display(p: &mut Parser, at: usize) -> PResult {
    let open = p.tok(at).range.clone();
    let mut i = at + 1;
    if p.kind(i) == TokenKind::CloseBracket {
        let range = open.cover(&p.tok(i).range.clone());
        return Ok((expr_node(Expr::List { items: vec![], range }), i + 1));
    }
    let (first, j) = unwrap_expr(expr(p, i))?;

    if p.tok(j).is_keyword("for") {
        let (target, k) = comprehension_target(p, j + 1)?;
        let k = p.expect_keyword(k, "in")?;
        let (iterable, k) = unwrap_expr(or_test(p, k))?;
        let (condition, k) = if p.tok(k).is_keyword("if") {
            let (cond, k) = unwrap_expr(or_test(p, k + 1))?;
            (Some(Box::new(cond)), k)
        } else {
            (None, k)
        };
        let k = p.expect_kind(k, TokenKind::CloseBracket, "']'")?;
        let range = open.cover(&p.tok(k - 1).range.clone());
        return Ok((
            expr_node(Expr::ListComp {
                element: Box::new(first),
                target: Box::new(target),
                iterable: Box::new(iterable),
                condition,
                range,
            }),
            k,
        ));
    }

    let mut items = vec![first];
    i = j;
    while p.kind(i) == TokenKind::Comma {
        i += 1;
        if p.kind(i) == TokenKind::CloseBracket {
            break;
        }
        let (item, k) = unwrap_expr(expr(p, i))?;
        items.push(item);
        i = k;
    }
    let i = p.expect_kind(i, TokenKind::CloseBracket, "']'")?;
    let range = open.cover(&p.tok(i - 1).range.clone());
    Ok((expr_node(Expr::List { items, range }), i))
}

/// A comprehension or for-loop target: a name or a tuple of names.
pub fn comprehension_target(p: &mut Parser, at: usize) -> Result<(Expr, usize), Failure> {
    let (name, range, mut i) = p.expect_name(at)?;
    let first = Expr::Name {
        text: name,
        range: range.clone(),
    };
    if p.kind(i) != TokenKind::Comma {
        return Ok((first, i));
    }
    let mut items = vec![first];
    while p.kind(i) == TokenKind::Comma {
        i += 1;
        let (name, r, j) = p.expect_name(i)?;
        items.push(Expr::Name { text: name, range: r });
        i = j;
    }
    let range = range.cover(items.last().expect("nonempty").range());
    Ok((Expr::Tuple { items, range }, i))
}

fn brace_display(p: &mut Parser, at: usize) -> PResult {
    let open = p.tok(at).range.clone();
    let mut i = at + 1;
    if p.kind(i) == TokenKind::CloseBrace {
        let range = open.cover(&p.tok(i).range.clone());
        return Ok((expr_node(Expr::Dict { pairs: vec![], range }), i + 1));
    }
    let (first, j) = unwrap_expr(expr(p, i))?;
    if p.kind(j) == TokenKind::Colon {
        let (value, mut i) = unwrap_expr(expr(p, j + 1))?;
        let mut pairs = vec![(first, value)];
        while p.kind(i) == TokenKind::Comma {
            i += 1;
            if p.kind(i) == TokenKind::CloseBrace {
                break;
            }
            let (key, k) = unwrap_expr(expr(p, i))?;
            let k = p.expect_kind(k, TokenKind::Colon, "':'")?;
            let (value, k) = unwrap_expr(expr(p, k))?;
            pairs.push((key, value));
            i = k;
        }
        let i = p.expect_kind(i, TokenKind::CloseBrace, "'}'")?;
        let range = open.cover(&p.tok(i - 1).range.clone());
        return Ok((expr_node(Expr::Dict { pairs, range }), i));
    }
    let mut items = vec![first];
    i = j;
    while p.kind(i) == TokenKind::Comma {
        i += 1;
        if p.kind(i) == TokenKind::CloseBrace {
            break;
        }
        let (item, k) = unwrap_expr(expr(p, i))?;
        items.push(item);
        i = k;
    }
    let i = p.expect_kind(i, TokenKind::CloseBrace, "'}'")?;
    let range = open.cover(&p.tok(i - 1).range.clone());
    Ok((expr_node(Expr::Set { items, range }), i))
}

// ----------------------------------------------------------------------
// Format strings
// ----------------------------------------------------------------------

/// Parse the f-string token at `at` into text and expression parts.
/// Interpolated expressions are sub-parsed with the same target and
/// custom-operator environment; a malformed body is a fatal GrammarError
/// at the interpolation's position in the outer source.
fn parse_fstring(p: &mut Parser, at: usize) -> Result<Expr, Failure> {
    let token = p.tok(at).clone();
    let raw = token.text.clone();
    let (content, content_offset) = string_content(&raw);

    let mut parts = Vec::new();
    let mut text = String::new();
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                text.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                text.push('}');
                i += 2;
            }
            b'}' => {
                let range = interpolation_range(p, &token, content_offset + i, 1);
                return Err(p.fatal(Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "single '}' is not allowed in a format string",
                    &range,
                    p.loc,
                )));
            }
            b'{' => {
                let inner_start = i + 1;
                let inner_end = match matching_brace(bytes, inner_start) {
                    Some(end) => end,
                    None => {
                        let range = interpolation_range(p, &token, content_offset + i, 1);
                        return Err(p.fatal(Diagnostic::point(
                            DiagnosticKind::Grammar,
                            "unclosed '{' in format string",
                            &range,
                            p.loc,
                        )));
                    }
                };
                if !text.is_empty() {
                    parts.push(FStringPart::Text(std::mem::take(&mut text)));
                }
                let inner = &content[inner_start..inner_end];
                let part = parse_interpolation(p, &token, inner, content_offset + inner_start)?;
                parts.push(part);
                i = inner_end + 1;
            }
            _ => {
                let c = content[i..].chars().next().expect("in-bounds char");
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
    if !text.is_empty() {
        parts.push(FStringPart::Text(text));
    }

    Ok(Expr::FString {
        raw,
        parts,
        range: token.range,
    })
}

/// Split one interpolation body into expression, conversion, and format
/// spec, and sub-parse the expression.
fn parse_interpolation(
    p: &mut Parser,
    token: &crate::plume::token::Token,
    inner: &str,
    inner_offset: usize,
) -> Result<FStringPart, Failure> {
    let (expr_src, conversion, format) = split_interpolation(inner);
    let expr_src = expr_src.trim();
    if expr_src.is_empty() {
        let range = interpolation_range(p, token, inner_offset, inner.len().max(1));
        return Err(p.fatal(Diagnostic::point(
            DiagnosticKind::Grammar,
            "empty expression in format string",
            &range,
            p.loc,
        )));
    }
    let node = match parse_embedded(p, expr_src) {
        Ok(node) => node,
        Err(detail) => {
            let range = interpolation_range(p, token, inner_offset, inner.len().max(1));
            return Err(p.fatal(Diagnostic::point(
                DiagnosticKind::Grammar,
                format!("malformed expression in format string ({})", detail),
                &range,
                p.loc,
            )));
        }
    };
    Ok(FStringPart::Expr {
        src: expr_src.to_string(),
        node: Box::new(node),
        conversion,
        format,
    })
}

/// Parse an interpolation body with a fresh scanner and parser sharing
/// this parse's target and custom operators. Returns the failure message
/// on error; span mapping back to the outer source happens at the caller.
fn parse_embedded(p: &Parser, fragment: &str) -> Result<Expr, String> {
    let stream = crate::plume::lexing::scan(fragment).map_err(|d| d.message().to_string())?;
    let loc = SourceLocation::new(fragment);
    let mut sub = Parser::new(fragment, &loc, &stream, p.target, Mode::Eval);
    sub.custom_ops = p.custom_ops.clone();
    let module = sub.run().map_err(|d| d.message().to_string())?;
    match module.body.into_iter().next() {
        Some(crate::plume::ast::nodes::Stmt::Expr { value, .. }) => Ok(value),
        _ => Err("expected an expression".to_string()),
    }
}

/// Skip a quoted literal starting at `i`; returns the index just past the
/// closing quote, or the end of input when unterminated.
fn skip_quoted(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    j
}

/// Byte index of the matching close brace for the interpolation opened
/// before `start`. Braces and colons inside nested string literals do not
/// count.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split `expr[!conv][:format]` at the top nesting level.
fn split_interpolation(inner: &str) -> (&str, Option<char>, Option<String>) {
    let bytes = inner.as_bytes();
    let mut depth = 0usize;
    let mut colon = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) != Some(&b'=') => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
        i += 1;
    }
    let (head, format) = match colon {
        Some(i) => (&inner[..i], Some(inner[i + 1..].to_string())),
        None => (inner, None),
    };
    let head_bytes = head.as_bytes();
    if head_bytes.len() >= 2 && head_bytes[head_bytes.len() - 2] == b'!' {
        let conv = head_bytes[head_bytes.len() - 1] as char;
        if matches!(conv, 'r' | 's' | 'a') {
            return (&head[..head.len() - 2], Some(conv), format);
        }
    }
    (head, None, format)
}

/// The prefix length and quote style of a string token, yielding the
/// content slice and the byte offset of the content within the token.
fn string_content(raw: &str) -> (&str, usize) {
    let prefix_len = raw
        .bytes()
        .take_while(|b| !matches!(b, b'"' | b'\''))
        .count();
    let rest = &raw[prefix_len..];
    let (quote_len, quote) = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        (3, &rest[..3])
    } else {
        (1, &rest[..1])
    };
    let content = &rest[quote_len..rest.len() - quote.len().min(rest.len() - quote_len)];
    (content, prefix_len + quote_len)
}

/// Map a byte offset inside the f-string token to a source range.
fn interpolation_range(
    p: &Parser,
    token: &crate::plume::token::Token,
    offset: usize,
    len: usize,
) -> Range {
    let start = token.range.span.start + offset;
    p.loc.range_of(&(start..start + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_interpolation_plain() {
        assert_eq!(split_interpolation("x + 1"), ("x + 1", None, None));
    }

    #[test]
    fn test_split_interpolation_conversion_and_format() {
        assert_eq!(
            split_interpolation("x!r:>10"),
            ("x", Some('r'), Some(">10".to_string()))
        );
    }

    #[test]
    fn test_split_interpolation_colon_inside_brackets() {
        assert_eq!(split_interpolation("d['a:b']"), ("d['a:b']", None, None));
    }

    #[test]
    fn test_string_content_strips_prefix_and_quotes() {
        assert_eq!(string_content("f\"abc\""), ("abc", 2));
        assert_eq!(string_content("f'''abc'''"), ("abc", 4));
        assert_eq!(string_content("\"x\""), ("x", 1));
    }

    #[test]
    fn test_symbol_is_custom() {
        assert!(symbol_is_custom("<+>"));
        assert!(symbol_is_custom("%%"));
        assert!(!symbol_is_custom("+"));
        assert!(!symbol_is_custom("|>"));
        assert!(!symbol_is_custom("+="));
    }
}
