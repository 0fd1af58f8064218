//! The audit rule table.
//!
//! Each rule walks the tree, token stream, or raw lines and produces
//! findings. Under strict configuration every finding is a fatal
//! StyleError; under non-strict configuration only the deprecated-name
//! rule has an effect, as an inline warning embedded in the output.

use crate::plume::ast::nodes::{Expr, FStringPart, Module, Pattern, Stmt};
use crate::plume::ast::range::{Range, SourceLocation};
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::token::{TokenKind, TokenStream};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Deprecated built-in names and their replacements.
static DEPRECATED_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("raw_input", "input"),
        ("xrange", "range"),
        ("unicode", "str"),
        ("unichr", "chr"),
        ("long", "int"),
    ])
});

static NOQA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)#\s*noqa\b").expect("static regex"));
static TRAILING_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+$").expect("static regex"));

/// One audit finding: a diagnostic, plus the inline-warning downgrade for
/// rules that have one.
pub struct Finding {
    pub diagnostic: Diagnostic,
    pub warning: Option<String>,
}

// ----------------------------------------------------------------------
// Tree walking
// ----------------------------------------------------------------------

fn walk_exprs<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Expr)) {
    for stmt in stmts {
        match stmt {
            Stmt::Expr { value, .. } => walk_expr(value, f),
            Stmt::Assign { targets, value, .. } => {
                for t in targets {
                    walk_expr(t, f);
                }
                walk_expr(value, f);
            }
            Stmt::AugAssign { target, value, .. } => {
                walk_expr(target, f);
                walk_expr(value, f);
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    walk_expr(v, f);
                }
            }
            Stmt::If { arms, orelse, .. } => {
                for (condition, body) in arms {
                    walk_expr(condition, f);
                    walk_exprs(body, f);
                }
                if let Some(body) = orelse {
                    walk_exprs(body, f);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                walk_expr(condition, f);
                walk_exprs(body, f);
            }
            Stmt::For {
                target,
                iterable,
                body,
                ..
            } => {
                walk_expr(target, f);
                walk_expr(iterable, f);
                walk_exprs(body, f);
            }
            Stmt::FuncDef {
                params,
                returns,
                body,
                ..
            } => {
                for param in params {
                    if let crate::plume::ast::nodes::Param::Normal {
                        annotation, default, ..
                    } = param
                    {
                        if let Some(a) = annotation {
                            walk_expr(a, f);
                        }
                        if let Some(d) = default {
                            walk_expr(d, f);
                        }
                    }
                }
                if let Some(r) = returns {
                    walk_expr(r, f);
                }
                walk_exprs(body, f);
            }
            Stmt::ClassDef { bases, body, .. } => {
                for base in bases {
                    walk_expr(base, f);
                }
                walk_exprs(body, f);
            }
            Stmt::Match { subject, arms, .. } => {
                walk_expr(subject, f);
                for arm in arms {
                    if let Some(guard) = &arm.guard {
                        walk_expr(guard, f);
                    }
                    walk_exprs(&arm.body, f);
                }
            }
            Stmt::TypeAlias { value, .. } => walk_expr(value, f),
            Stmt::OperatorDecl { implementation, .. } => {
                if let Some(value) = implementation {
                    walk_expr(value, f);
                }
            }
            Stmt::Import { .. }
            | Stmt::FromImport { .. }
            | Stmt::Pass { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. } => {}
        }
    }
}

fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match expr {
        Expr::Tuple { items, .. } | Expr::List { items, .. } | Expr::Set { items, .. } => {
            for item in items {
                walk_expr(item, f);
            }
        }
        Expr::Dict { pairs, .. } => {
            for (k, v) in pairs {
                walk_expr(k, f);
                walk_expr(v, f);
            }
        }
        Expr::ListComp {
            element,
            target,
            iterable,
            condition,
            ..
        } => {
            walk_expr(element, f);
            walk_expr(target, f);
            walk_expr(iterable, f);
            if let Some(c) = condition {
                walk_expr(c, f);
            }
        }
        Expr::Paren { inner, .. } => walk_expr(inner, f),
        Expr::Unary { operand, .. } => walk_expr(operand, f),
        Expr::Binary { left, right, .. }
        | Expr::Pipe { left, right, .. }
        | Expr::CustomOp { left, right, .. }
        | Expr::BacktickCall { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Compare { first, rest, .. } => {
            walk_expr(first, f);
            for (_, operand) in rest {
                walk_expr(operand, f);
            }
        }
        Expr::BoolOp { values, .. } => {
            for value in values {
                walk_expr(value, f);
            }
        }
        Expr::Ternary {
            body,
            condition,
            orelse,
            ..
        } => {
            walk_expr(body, f);
            walk_expr(condition, f);
            walk_expr(orelse, f);
        }
        Expr::Lambda { body, .. } => walk_expr(body, f),
        Expr::StmtLambda { body, .. } => walk_exprs(std::slice::from_ref(&**body), f),
        Expr::Call { func, args, .. } => {
            walk_expr(func, f);
            for arg in args {
                match arg {
                    crate::plume::ast::nodes::Arg::Positional(e)
                    | crate::plume::ast::nodes::Arg::Star(e)
                    | crate::plume::ast::nodes::Arg::DoubleStar(e) => walk_expr(e, f),
                    crate::plume::ast::nodes::Arg::Keyword { value, .. } => walk_expr(value, f),
                    crate::plume::ast::nodes::Arg::Placeholder(_) => {}
                }
            }
        }
        Expr::Attribute { value, .. }
        | Expr::TrailingDot { value, .. }
        | Expr::Await { value, .. }
        | Expr::Walrus { value, .. } => walk_expr(value, f),
        Expr::Subscript { value, index, .. } => {
            walk_expr(value, f);
            walk_expr(index, f);
        }
        Expr::Slice {
            lower, upper, step, ..
        } => {
            for part in [lower, upper, step].into_iter().flatten() {
                walk_expr(part, f);
            }
        }
        Expr::Section { left, right, .. } => {
            for part in [left, right].into_iter().flatten() {
                walk_expr(part, f);
            }
        }
        Expr::Yield { value, .. } => {
            if let Some(v) = value {
                walk_expr(v, f);
            }
        }
        Expr::Literal { .. } | Expr::Name { .. } | Expr::FString { .. } => {}
    }
}

fn walk_patterns<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Pattern)) {
    fn walk_pattern<'a>(pattern: &'a Pattern, f: &mut impl FnMut(&'a Pattern)) {
        f(pattern);
        match pattern {
            Pattern::Sequence { items, .. } => {
                for item in items {
                    walk_pattern(item, f);
                }
            }
            Pattern::Mapping { pairs, .. } => {
                for (_, value) in pairs {
                    walk_pattern(value, f);
                }
            }
            Pattern::Class { args, kwargs, .. } => {
                for arg in args {
                    walk_pattern(arg, f);
                }
                for (_, value) in kwargs {
                    walk_pattern(value, f);
                }
            }
            Pattern::Or { alternatives, .. } => {
                for alternative in alternatives {
                    walk_pattern(alternative, f);
                }
            }
            _ => {}
        }
    }
    for stmt in stmts {
        if let Stmt::Match { arms, .. } = stmt {
            for arm in arms {
                walk_pattern(&arm.pattern, f);
                walk_patterns(&arm.body, f);
            }
        }
    }
}

// ----------------------------------------------------------------------
// Rules
// ----------------------------------------------------------------------

fn style(message: String, range: &Range, loc: &SourceLocation) -> Diagnostic {
    Diagnostic::point(DiagnosticKind::Style, message, range, loc)
}

/// Deprecated built-in names. The only rule with a non-strict downgrade.
pub fn deprecated_names(module: &Module, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    let mut seen = Vec::new();
    walk_exprs(&module.body, &mut |expr| {
        if let Expr::Name { text, range } = expr {
            if let Some(replacement) = DEPRECATED_NAMES.get(text.as_str()) {
                seen.push((text.clone(), (*replacement).to_string(), range.clone()));
            }
        }
    });
    for (name, replacement, range) in seen {
        let message = format!("deprecated built-in '{}'; use '{}'", name, replacement);
        findings.push(Finding {
            diagnostic: style(message.clone(), &range, loc),
            warning: Some(format!("DeprecationWarning: {}", message)),
        });
    }
}

/// Top-level imports never referenced, with no NOQA marker on their line.
pub fn unused_imports(
    module: &Module,
    stream: &TokenStream,
    loc: &SourceLocation,
    findings: &mut Vec<Finding>,
) {
    let mut used: HashSet<String> = HashSet::new();
    walk_exprs(&module.body, &mut |expr| match expr {
        Expr::Name { text, .. } => {
            used.insert(text.clone());
        }
        Expr::BacktickCall { func, .. } => {
            used.insert(func.clone());
        }
        _ => {}
    });
    walk_patterns(&module.body, &mut |pattern| match pattern {
        Pattern::Value { path, .. } | Pattern::Class { path, .. } => {
            if let Some(root) = path.split('.').next() {
                used.insert(root.to_string());
            }
        }
        _ => {}
    });

    for stmt in &module.body {
        let names = match stmt {
            Stmt::Import { names, .. } | Stmt::FromImport { names, .. } => names,
            _ => continue,
        };
        for name in names {
            let bound = name.bound_name();
            if used.contains(bound) {
                continue;
            }
            let line = name.range.start.line;
            if let Some(comment) = stream.comment_on_line(line) {
                if NOQA.is_match(&comment.text) {
                    continue;
                }
            }
            findings.push(Finding {
                diagnostic: style(
                    format!("unused import '{}'", bound),
                    &name.range,
                    loc,
                ),
                warning: None,
            });
        }
    }
}

/// Comparison chains with two or more `is` operators.
pub fn chained_is(module: &Module, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    walk_exprs(&module.body, &mut |expr| {
        if let Expr::Compare { rest, range, .. } = expr {
            let is_count = rest.iter().filter(|(op, _)| op.starts_with("is")).count();
            if is_count >= 2 {
                findings.push(Finding {
                    diagnostic: style(
                        "chained 'is' comparison has legacy semantics".to_string(),
                        range,
                        loc,
                    ),
                    warning: None,
                });
            }
        }
    });
}

/// Statement lambdas: bodies that are not a single expression.
pub fn statement_lambdas(module: &Module, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    walk_exprs(&module.body, &mut |expr| {
        if let Expr::StmtLambda { range, .. } = expr {
            findings.push(Finding {
                diagnostic: style(
                    "statement lambda without an expression-only body".to_string(),
                    range,
                    loc,
                ),
                warning: None,
            });
        }
    });
}

/// Lines indented with tabs in a file otherwise indented with spaces
/// (or vice versa). Per-line mixing is already a GrammarError.
pub fn inconsistent_indent_styles(
    stream: &TokenStream,
    loc: &SourceLocation,
    findings: &mut Vec<Finding>,
) {
    let mut seen_space: Option<usize> = None;
    let mut seen_tab: Option<usize> = None;
    for record in stream.indents.iter().filter(|r| !r.text.is_empty()) {
        if record.text.contains('\t') {
            seen_tab.get_or_insert(record.line);
        } else {
            seen_space.get_or_insert(record.line);
        }
        if let (Some(_), Some(_)) = (seen_space, seen_tab) {
            findings.push(Finding {
                diagnostic: style(
                    "mixed use of tabs and spaces for indentation".to_string(),
                    &record.range,
                    loc,
                ),
                warning: None,
            });
            return;
        }
    }
}

/// Trailing whitespace at end of line, or a tab immediately before a
/// comment.
pub fn trailing_whitespace(source: &str, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    let mut offset = 0;
    for line in source.split('\n') {
        if let Some(m) = TRAILING_WHITESPACE.find(line) {
            let range = loc.range_of(&(offset + m.start()..offset + m.end()));
            findings.push(Finding {
                diagnostic: style("trailing whitespace".to_string(), &range, loc),
                warning: None,
            });
        } else if let Some(pos) = line.find("\t#") {
            let range = loc.range_of(&(offset + pos..offset + pos + 1));
            findings.push(Finding {
                diagnostic: style(
                    "whitespace before trailing comment".to_string(),
                    &range,
                    loc,
                ),
                warning: None,
            });
        }
        offset += line.len() + 1;
    }
}

/// Statement-final semicolons.
pub fn stray_semicolons(stream: &TokenStream, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    for pair in stream.tokens.windows(2) {
        if pair[0].kind == TokenKind::Semicolon
            && matches!(pair[1].kind, TokenKind::Newline | TokenKind::Eof)
        {
            findings.push(Finding {
                diagnostic: style("stray semicolon".to_string(), &pair[0].range, loc),
                warning: None,
            });
        }
    }
}

/// Format strings that interpolate nothing.
pub fn empty_fstrings(module: &Module, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    walk_exprs(&module.body, &mut |expr| {
        if let Expr::FString { parts, range, .. } = expr {
            let has_expr = parts.iter().any(|p| matches!(p, FStringPart::Expr { .. }));
            if !has_expr {
                findings.push(Finding {
                    diagnostic: style(
                        "format string with no interpolated expressions".to_string(),
                        range,
                        loc,
                    ),
                    warning: None,
                });
            }
        }
    });
}

/// Attribute access written with a dangling dot.
pub fn trailing_dots(module: &Module, loc: &SourceLocation, findings: &mut Vec<Finding>) {
    walk_exprs(&module.body, &mut |expr| {
        if let Expr::TrailingDot { range, .. } = expr {
            findings.push(Finding {
                diagnostic: style(
                    "trailing dot in attribute access".to_string(),
                    range,
                    loc,
                ),
                warning: None,
            });
        }
    });
}
