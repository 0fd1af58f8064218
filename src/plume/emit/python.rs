//! Python text emission.
//!
//! Walks the syntax tree and renders target-appropriate Python source.
//! Plume constructs lower to plain Python: pipelines become calls, arrow
//! lambdas become `lambda`, statement lambdas hoist a named `def` before
//! the enclosing statement, sections and placeholder partials become
//! lambdas, custom operators become mangled function calls, and format
//! strings emit natively on targets that support them or compile to
//! `.format(...)` otherwise.
//!
//! Output across targets stays structurally equivalent: the same tree
//! produces the same statement shapes, differing only in the spellings a
//! given target requires.

use crate::plume::ast::nodes::{
    Arg, Expr, FStringPart, Module, Param, Pattern, PipeKind, Stmt,
};
use crate::plume::ast::range::SourceLocation;
use crate::plume::config::CompileConfig;
use crate::plume::parsing::Mode;
use crate::plume::targets::Version;
use std::collections::HashMap;

/// An advisory finding to be embedded as an inline comment.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineWarning {
    /// 0-indexed source line the finding sits on.
    pub line: usize,
    pub message: String,
}

const INDENT: &str = "    ";

pub struct Emitter<'a> {
    config: &'a CompileConfig,
    mode: Mode,
    loc: &'a SourceLocation<'a>,
    /// Advisory findings not yet attached to an emitted line.
    warnings: Vec<InlineWarning>,
    out: Vec<String>,
    indent: usize,
    /// Hoisted definitions pending before the current statement line.
    hoisted: Vec<String>,
    lambda_counter: usize,
    op_names: HashMap<String, String>,
}

/// Render a parsed module as Python text.
pub fn emit(
    module: &Module,
    config: &CompileConfig,
    mode: Mode,
    loc: &SourceLocation,
    warnings: &[InlineWarning],
) -> String {
    let mut emitter = Emitter {
        config,
        mode,
        loc,
        warnings: warnings.to_vec(),
        out: Vec::new(),
        indent: 0,
        hoisted: Vec::new(),
        lambda_counter: 0,
        op_names: HashMap::new(),
    };
    emitter.emit_module(module);
    // Findings are never silently discarded: anything that found no
    // emitted line to sit on lands at the end.
    for warning in std::mem::take(&mut emitter.warnings) {
        emitter.push_raw(format!("# {} (line {})", warning.message, warning.line + 1));
    }
    let mut text = emitter.out.join("\n");
    text.push('\n');
    text
}

impl<'a> Emitter<'a> {
    fn native_fstrings(&self) -> bool {
        self.config.target.at_least(Version::new(3, 6))
    }

    fn fresh_lambda_name(&mut self) -> String {
        let name = format!("_plume_lambda_{}", self.lambda_counter);
        self.lambda_counter += 1;
        name
    }

    /// Deterministic mangled name for a custom operator symbol.
    fn op_name(&mut self, symbol: &str) -> String {
        if let Some(name) = self.op_names.get(symbol) {
            return name.clone();
        }
        let mut mangled = String::from("_plume_op_");
        for c in symbol.chars() {
            mangled.push_str(match c {
                '<' => "lt",
                '>' => "gt",
                '+' => "plus",
                '-' => "minus",
                '*' => "star",
                '/' => "slash",
                '%' => "percent",
                '&' => "amp",
                '|' => "bar",
                '^' => "caret",
                '~' => "tilde",
                '=' => "eq",
                '!' => "bang",
                '@' => "at",
                ':' => "colon",
                other => {
                    mangled.push(other);
                    continue;
                }
            });
        }
        self.op_names.insert(symbol.to_string(), mangled.clone());
        mangled
    }

    // ------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------

    fn push_raw(&mut self, text: String) {
        self.out.push(text);
    }

    fn line(&mut self, text: String, src_line: Option<usize>) {
        for hoisted in std::mem::take(&mut self.hoisted) {
            let indented = format!("{}{}", INDENT.repeat(self.indent), hoisted);
            self.out.push(indented);
        }
        let mut rendered = format!("{}{}", INDENT.repeat(self.indent), text);
        if let Some(line) = src_line {
            let mut i = 0;
            while i < self.warnings.len() {
                if self.warnings[i].line == line {
                    let warning = self.warnings.remove(i);
                    rendered.push_str("  # ");
                    rendered.push_str(&warning.message);
                } else {
                    i += 1;
                }
            }
            if self.config.keep_lines {
                rendered.push_str(&format!(
                    "  # line {}: {}",
                    line + 1,
                    self.loc.line_text(line).trim()
                ));
            } else if self.config.line_numbers {
                rendered.push_str(&format!("  # line {}", line + 1));
            }
        }
        self.out.push(rendered);
    }

    // ------------------------------------------------------------------
    // Module
    // ------------------------------------------------------------------

    fn emit_module(&mut self, module: &Module) {
        if self.mode.emits_header() && !self.config.minify {
            self.push_raw(format!(
                "# Compiled with plume (target {})",
                self.config.target
            ));
            if self.mode == Mode::Sys {
                self.push_raw("# Requires an installed plume runtime".to_string());
            }
            if self.mode == Mode::Package {
                self.push_raw("__plume_package__ = 1".to_string());
            }
        }
        let mut first = true;
        for stmt in &module.body {
            if !first
                && !self.config.minify
                && matches!(stmt, Stmt::FuncDef { .. } | Stmt::ClassDef { .. })
            {
                self.push_raw(String::new());
            }
            self.emit_stmt(stmt);
            first = false;
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn emit_body(&mut self, body: &[Stmt]) {
        self.indent += 1;
        if body.is_empty() {
            self.line("pass".to_string(), None);
        }
        for stmt in body {
            self.emit_stmt(stmt);
        }
        self.indent -= 1;
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        let src_line = Some(stmt.range().start.line);
        match stmt {
            Stmt::Expr { value, .. } => {
                let text = self.expr(value);
                self.line(text, src_line);
            }
            Stmt::Assign { targets, value, .. } => {
                let mut pieces: Vec<String> = targets.iter().map(|t| self.expr(t)).collect();
                pieces.push(self.expr(value));
                self.line(pieces.join(" = "), src_line);
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                let text = format!("{} {} {}", self.expr(target), op, self.expr(value));
                self.line(text, src_line);
            }
            Stmt::Return { value, .. } => {
                let text = match value {
                    Some(v) => format!("return {}", self.expr(v)),
                    None => "return".to_string(),
                };
                self.line(text, src_line);
            }
            Stmt::Pass { .. } => self.line("pass".to_string(), src_line),
            Stmt::Break { .. } => self.line("break".to_string(), src_line),
            Stmt::Continue { .. } => self.line("continue".to_string(), src_line),
            Stmt::Import { names, .. } => {
                let rendered: Vec<String> = names
                    .iter()
                    .map(|n| match &n.alias {
                        Some(alias) => format!("{} as {}", n.path, alias),
                        None => n.path.clone(),
                    })
                    .collect();
                self.line(format!("import {}", rendered.join(", ")), src_line);
            }
            Stmt::FromImport { module, names, .. } => {
                let rendered: Vec<String> = names
                    .iter()
                    .map(|n| match &n.alias {
                        Some(alias) => format!("{} as {}", n.path, alias),
                        None => n.path.clone(),
                    })
                    .collect();
                self.line(
                    format!("from {} import {}", module, rendered.join(", ")),
                    src_line,
                );
            }
            Stmt::If { arms, orelse, .. } => {
                for (index, (condition, body)) in arms.iter().enumerate() {
                    let keyword = if index == 0 { "if" } else { "elif" };
                    let text = format!("{} {}:", keyword, self.expr(condition));
                    self.line(text, src_line);
                    self.emit_body(body);
                }
                if let Some(body) = orelse {
                    self.line("else:".to_string(), None);
                    self.emit_body(body);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                let text = format!("while {}:", self.expr(condition));
                self.line(text, src_line);
                self.emit_body(body);
            }
            Stmt::For {
                target,
                iterable,
                body,
                ..
            } => {
                let text = format!("for {} in {}:", self.for_target(target), self.expr(iterable));
                self.line(text, src_line);
                self.emit_body(body);
            }
            Stmt::FuncDef {
                name,
                params,
                returns,
                body,
                is_async,
                ..
            } => {
                let prefix = if *is_async { "async def" } else { "def" };
                let params = self.params(params);
                let returns = match returns {
                    Some(r) => format!(" -> {}", self.expr(r)),
                    None => String::new(),
                };
                let text = format!("{} {}({}){}:", prefix, name, params, returns);
                self.line(text, src_line);
                self.emit_body(body);
            }
            Stmt::ClassDef {
                name, bases, body, ..
            } => {
                let text = if bases.is_empty() {
                    format!("class {}:", name)
                } else {
                    let bases: Vec<String> = bases.iter().map(|b| self.expr(b)).collect();
                    format!("class {}({}):", name, bases.join(", "))
                };
                self.line(text, src_line);
                self.emit_body(body);
            }
            Stmt::Match { subject, arms, .. } => {
                let text = format!("match {}:", self.expr(subject));
                self.line(text, src_line);
                self.indent += 1;
                for arm in arms {
                    let guard = match &arm.guard {
                        Some(g) => format!(" if {}", self.expr(g)),
                        None => String::new(),
                    };
                    let text = format!("case {}{}:", self.pattern(&arm.pattern), guard);
                    self.line(text, Some(arm.range.start.line));
                    self.emit_body(&arm.body);
                }
                self.indent -= 1;
            }
            Stmt::TypeAlias { name, value, .. } => {
                let text = format!("type {} = {}", name, self.expr(value));
                self.line(text, src_line);
            }
            Stmt::OperatorDecl {
                op, implementation, ..
            } => match implementation {
                Some(value) => {
                    let name = self.op_name(op);
                    let text = format!("{} = {}", name, self.expr(value));
                    self.line(text, src_line);
                }
                None => {
                    if !self.config.minify {
                        self.line(format!("# operator {}", op), None);
                    }
                }
            },
        }
    }

    /// For-loop targets render without tuple parentheses.
    fn for_target(&mut self, target: &Expr) -> String {
        match target {
            Expr::Tuple { items, .. } if !items.is_empty() => {
                let rendered: Vec<String> = items.iter().map(|e| self.expr(e)).collect();
                rendered.join(", ")
            }
            other => self.expr(other),
        }
    }

    // ------------------------------------------------------------------
    // Parameters and patterns
    // ------------------------------------------------------------------

    fn params(&mut self, params: &[Param]) -> String {
        let rendered: Vec<String> = params
            .iter()
            .map(|param| match param {
                Param::Normal {
                    name,
                    annotation,
                    default,
                    ..
                } => match (annotation, default) {
                    (Some(a), Some(d)) => {
                        format!("{}: {} = {}", name, self.expr(a), self.expr(d))
                    }
                    (Some(a), None) => format!("{}: {}", name, self.expr(a)),
                    (None, Some(d)) => format!("{}={}", name, self.expr(d)),
                    (None, None) => name.clone(),
                },
                Param::Tuple { names, .. } => format!("({})", names.join(", ")),
                Param::KeywordOnlyMarker { .. } => "*".to_string(),
                Param::PositionalOnlyMarker { .. } => "/".to_string(),
                Param::VarArgs { name, .. } => format!("*{}", name),
                Param::KwArgs { name, .. } => format!("**{}", name),
            })
            .collect();
        rendered.join(", ")
    }

    fn pattern(&mut self, pattern: &Pattern) -> String {
        match pattern {
            Pattern::Literal { text, .. } => text.clone(),
            Pattern::Capture { name, .. } => name.clone(),
            Pattern::Wildcard { .. } => "_".to_string(),
            Pattern::Value { path, .. } => path.clone(),
            Pattern::Star { name, .. } => format!("*{}", name),
            Pattern::Sequence { items, .. } => {
                let rendered: Vec<String> = items.iter().map(|p| self.pattern(p)).collect();
                format!("[{}]", rendered.join(", "))
            }
            Pattern::Mapping { pairs, .. } => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{}: {}", self.expr(key), self.pattern(value)))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Pattern::Class {
                path, args, kwargs, ..
            } => {
                let mut rendered: Vec<String> = args.iter().map(|p| self.pattern(p)).collect();
                rendered.extend(
                    kwargs
                        .iter()
                        .map(|(name, value)| format!("{}={}", name, self.pattern(value))),
                );
                format!("{}({})", path, rendered.join(", "))
            }
            Pattern::Or { alternatives, .. } => {
                let rendered: Vec<String> =
                    alternatives.iter().map(|p| self.pattern(p)).collect();
                rendered.join(" | ")
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Render a callee, parenthesizing anything that does not bind
    /// tightly enough to be called directly.
    fn callee(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Name { .. }
            | Expr::Attribute { .. }
            | Expr::Call { .. }
            | Expr::Subscript { .. }
            | Expr::Paren { .. } => self.expr(expr),
            other => format!("({})", self.expr(other)),
        }
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Literal { text, .. } | Expr::Name { text, .. } => text.clone(),
            Expr::Tuple { items, .. } => match items.len() {
                0 => "()".to_string(),
                1 => format!("({},)", self.expr(&items[0])),
                _ => {
                    let rendered: Vec<String> = items.iter().map(|e| self.expr(e)).collect();
                    format!("({})", rendered.join(", "))
                }
            },
            Expr::List { items, .. } => {
                let rendered: Vec<String> = items.iter().map(|e| self.expr(e)).collect();
                format!("[{}]", rendered.join(", "))
            }
            Expr::Set { items, .. } => {
                if items.is_empty() {
                    "set()".to_string()
                } else {
                    let rendered: Vec<String> = items.iter().map(|e| self.expr(e)).collect();
                    format!("{{{}}}", rendered.join(", "))
                }
            }
            Expr::Dict { pairs, .. } => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", self.expr(k), self.expr(v)))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Expr::ListComp {
                element,
                target,
                iterable,
                condition,
                ..
            } => {
                let condition = match condition {
                    Some(c) => format!(" if {}", self.expr(c)),
                    None => String::new(),
                };
                format!(
                    "[{} for {} in {}{}]",
                    self.expr(element),
                    self.for_target(target),
                    self.expr(iterable),
                    condition
                )
            }
            Expr::Paren { inner, .. } => format!("({})", self.expr(inner)),
            Expr::Unary { op, operand, .. } => {
                if op == "not" {
                    format!("not {}", self.expr(operand))
                } else {
                    format!("{}{}", op, self.expr(operand))
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => format!("{} {} {}", self.expr(left), op, self.expr(right)),
            Expr::Compare { first, rest, .. } => {
                let mut text = self.expr(first);
                for (op, operand) in rest {
                    text.push_str(&format!(" {} {}", op, self.expr(operand)));
                }
                text
            }
            Expr::BoolOp { op, values, .. } => {
                let rendered: Vec<String> = values.iter().map(|e| self.expr(e)).collect();
                rendered.join(&format!(" {} ", op))
            }
            Expr::Ternary {
                body,
                condition,
                orelse,
                ..
            } => format!(
                "{} if {} else {}",
                self.expr(body),
                self.expr(condition),
                self.expr(orelse)
            ),
            Expr::Pipe {
                kind, left, right, ..
            } => match kind {
                PipeKind::Forward => format!("{}({})", self.callee(right), self.expr(left)),
                PipeKind::ForwardStar => format!("{}(*{})", self.callee(right), self.expr(left)),
                PipeKind::Backward => format!("{}({})", self.callee(left), self.expr(right)),
            },
            Expr::Lambda { params, body, .. } => {
                let params = self.params(params);
                if params.is_empty() {
                    format!("lambda: {}", self.expr(body))
                } else {
                    format!("lambda {}: {}", params, self.expr(body))
                }
            }
            Expr::StmtLambda { params, body, .. } => {
                let name = self.fresh_lambda_name();
                let params = self.params(params);
                let body_text = match body.as_ref() {
                    Stmt::Expr { value, .. } => {
                        let value = self.expr(value);
                        format!("return {}", value)
                    }
                    other => self.inline_stmt(other),
                };
                self.hoisted
                    .push(format!("def {}({}): {}", name, params, body_text));
                name
            }
            Expr::Call { func, args, .. } => self.call(func, args),
            Expr::Attribute { value, attr, .. } => {
                format!("{}.{}", self.callee(value), attr)
            }
            Expr::TrailingDot { value, .. } => self.expr(value),
            Expr::Subscript { value, index, .. } => {
                format!("{}[{}]", self.callee(value), self.subscript(index))
            }
            Expr::Slice { .. } => self.subscript(expr),
            Expr::Section {
                op, left, right, ..
            } => self.section(op, left.as_deref(), right.as_deref()),
            Expr::CustomOp {
                op, left, right, ..
            } => {
                let name = self.op_name(op);
                format!("{}({}, {})", name, self.expr(left), self.expr(right))
            }
            Expr::BacktickCall {
                func, left, right, ..
            } => format!("{}({}, {})", func, self.expr(left), self.expr(right)),
            Expr::FString { parts, raw, .. } => self.fstring(parts, raw),
            Expr::Await { value, .. } => format!("await {}", self.expr(value)),
            Expr::Yield { value, .. } => match value {
                Some(v) => format!("yield {}", self.expr(v)),
                None => "yield".to_string(),
            },
            Expr::Walrus { name, value, .. } => {
                format!("{} := {}", name, self.expr(value))
            }
        }
    }

    /// Subscript contents: slices render bare, everything else normally.
    fn subscript(&mut self, index: &Expr) -> String {
        match index {
            Expr::Slice {
                lower, upper, step, ..
            } => {
                let lower = lower.as_deref().map(|e| self.expr(e)).unwrap_or_default();
                let upper = upper.as_deref().map(|e| self.expr(e)).unwrap_or_default();
                match step.as_deref() {
                    Some(step) => {
                        let step = self.expr(step);
                        format!("{}:{}:{}", lower, upper, step)
                    }
                    None => format!("{}:{}", lower, upper),
                }
            }
            other => self.expr(other),
        }
    }

    /// A statement lambda body that is not a bare expression.
    fn inline_stmt(&mut self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Assign { targets, value, .. } => {
                let mut pieces: Vec<String> = targets.iter().map(|t| self.expr(t)).collect();
                pieces.push(self.expr(value));
                pieces.join(" = ")
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => format!("{} {} {}", self.expr(target), op, self.expr(value)),
            Stmt::Return { value, .. } => match value {
                Some(v) => format!("return {}", self.expr(v)),
                None => "return".to_string(),
            },
            Stmt::Pass { .. } => "pass".to_string(),
            Stmt::Expr { value, .. } => self.expr(value),
            _ => "pass".to_string(),
        }
    }

    /// Calls, including placeholder partial application.
    fn call(&mut self, func: &Expr, args: &[Arg]) -> String {
        let placeholder_count = args
            .iter()
            .filter(|a| matches!(a, Arg::Placeholder(_)))
            .count();
        let callee = self.callee(func);
        if placeholder_count == 0 {
            let rendered: Vec<String> = args.iter().map(|a| self.arg(a)).collect();
            return format!("{}({})", callee, rendered.join(", "));
        }
        // `f(?, x)` — wrap into a lambda taking one parameter per
        // placeholder, in order.
        let mut params = Vec::new();
        let mut rendered = Vec::new();
        let mut next = 0usize;
        for arg in args {
            match arg {
                Arg::Placeholder(_) => {
                    let param = format!("_p{}", next);
                    next += 1;
                    rendered.push(param.clone());
                    params.push(param);
                }
                other => rendered.push(self.arg(other)),
            }
        }
        format!(
            "(lambda {}: {}({}))",
            params.join(", "),
            callee,
            rendered.join(", ")
        )
    }

    fn arg(&mut self, arg: &Arg) -> String {
        match arg {
            Arg::Positional(e) => self.expr(e),
            Arg::Placeholder(_) => unreachable!("placeholders are handled by call()"),
            Arg::Star(e) => format!("*{}", self.expr(e)),
            Arg::DoubleStar(e) => format!("**{}", self.expr(e)),
            Arg::Keyword { name, value } => format!("{}={}", name, self.expr(value)),
        }
    }

    /// Operator sections. `(2 *)` binds the left operand, `(* 2)` the
    /// right, `(+)` neither.
    fn section(&mut self, op: &str, left: Option<&Expr>, right: Option<&Expr>) -> String {
        let apply = |emitter: &mut Self, lhs: String, rhs: String| {
            if crate::plume::parsing::expressions::STANDARD_BINOPS.contains(&op) {
                format!("{} {} {}", lhs, op, rhs)
            } else {
                let name = emitter.op_name(op);
                format!("{}({}, {})", name, lhs, rhs)
            }
        };
        match (left, right) {
            (Some(l), None) => {
                let lhs = self.expr(l);
                let body = apply(self, lhs, "_x".to_string());
                format!("(lambda _x: {})", body)
            }
            (None, Some(r)) => {
                let rhs = self.expr(r);
                let body = apply(self, "_x".to_string(), rhs);
                format!("(lambda _x: {})", body)
            }
            _ => {
                let body = apply(self, "_x".to_string(), "_y".to_string());
                format!("(lambda _x, _y: {})", body)
            }
        }
    }

    // ------------------------------------------------------------------
    // Format strings
    // ------------------------------------------------------------------

    /// The quote run of the original token, so emission keeps the source
    /// quoting style.
    fn quote_style(raw: &str) -> &str {
        let rest: &str = raw.trim_start_matches(|c| !matches!(c, '"' | '\''));
        if rest.starts_with("\"\"\"") {
            "\"\"\""
        } else if rest.starts_with("'''") {
            "'''"
        } else if rest.starts_with('"') {
            "\""
        } else {
            "'"
        }
    }

    fn fstring(&mut self, parts: &[FStringPart], raw: &str) -> String {
        let quote = Self::quote_style(raw);
        if self.native_fstrings() {
            let mut body = String::new();
            for part in parts {
                match part {
                    FStringPart::Text(text) => {
                        body.push_str(&text.replace('{', "{{").replace('}', "}}"));
                    }
                    FStringPart::Expr {
                        node,
                        conversion,
                        format,
                        ..
                    } => {
                        body.push('{');
                        body.push_str(&self.expr(node));
                        if let Some(conv) = conversion {
                            body.push('!');
                            body.push(*conv);
                        }
                        if let Some(spec) = format {
                            body.push(':');
                            body.push_str(spec);
                        }
                        body.push('}');
                    }
                }
            }
            return format!("f{}{}{}", quote, body, quote);
        }

        // Pre-3.6 targets: compile down to str.format.
        let mut template = String::new();
        let mut args = Vec::new();
        for part in parts {
            match part {
                FStringPart::Text(text) => {
                    template.push_str(&text.replace('{', "{{").replace('}', "}}"));
                }
                FStringPart::Expr {
                    node,
                    conversion,
                    format,
                    ..
                } => {
                    template.push('{');
                    if let Some(conv) = conversion {
                        template.push('!');
                        template.push(*conv);
                    }
                    if let Some(spec) = format {
                        template.push(':');
                        template.push_str(spec);
                    }
                    template.push('}');
                    args.push(self.expr(node));
                }
            }
        }
        format!(
            "{}{}{}.format({})",
            quote,
            template,
            quote,
            args.join(", ")
        )
    }
}
