//! The grammar engine.
//!
//! A backtracking, memoized recursive descent over composable rule
//! functions. Rules have the shape `fn(&mut Parser, usize) -> PResult`
//! and are combined with the sequence/choice/repetition/optional helpers
//! on [`Parser`]; memoized rules are identified by a stable
//! [`RuleId`](super::graph::RuleId) so lookups by (rule, offset) stay
//! valid across backtracking and, in incremental sessions, across
//! compiles.
//!
//! Failure is two-tier: `Failure::Soft` backtracks into the next choice
//! alternative, while `Failure::Fatal` (version-gate rejections, malformed
//! f-string bodies) aborts the whole parse. The engine tracks the
//! furthest soft failure and the rule descriptions expected there; a
//! total failure is reported at that position, not at the start of the
//! attempt.

use crate::plume::ast::nodes::{Module, Node};
use crate::plume::ast::range::{Range, SourceLocation};
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::parsing::graph::{fingerprint, MemoEntry, MemoOutcome, MemoTable, RuleId};
use crate::plume::parsing::statements;
use crate::plume::targets::{gate, Feature, Target};
use crate::plume::token::{Token, TokenKind, TokenStream};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;

/// Parse modes, selecting the grammar entry point and emitted framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// A whole module, emitted with a standalone header.
    File,
    /// As `File`, plus a package marker in the output.
    Package,
    /// As `File`, but the output references an installed runtime.
    Sys,
    /// A sequence of statements with no header.
    Block,
    /// Exactly one statement (a REPL cell).
    Single,
    /// Exactly one expression.
    Eval,
    /// Relaxed: expression or statements, with structural checks skipped.
    Lenient,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Mode, String> {
        match s {
            "file" => Ok(Mode::File),
            "package" => Ok(Mode::Package),
            "sys" => Ok(Mode::Sys),
            "block" => Ok(Mode::Block),
            "single" => Ok(Mode::Single),
            "eval" => Ok(Mode::Eval),
            "lenient" => Ok(Mode::Lenient),
            other => Err(format!("unrecognized parse mode {:?}", other)),
        }
    }

    /// Structured modes require well-formed top-level constructs and run
    /// the indentation-consistency checks.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Mode::Lenient)
    }

    /// Modes whose output carries a module header.
    pub fn emits_header(&self) -> bool {
        matches!(self, Mode::File | Mode::Package | Mode::Sys)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::File => "file",
            Mode::Package => "package",
            Mode::Sys => "sys",
            Mode::Block => "block",
            Mode::Single => "single",
            Mode::Eval => "eval",
            Mode::Lenient => "lenient",
        };
        write!(f, "{}", name)
    }
}

/// Rule failure: soft failures backtrack, fatal ones abort the parse.
#[derive(Debug)]
pub enum Failure {
    Soft,
    Fatal(Box<Diagnostic>),
}

pub type PResult = Result<(Node, usize), Failure>;

/// A grammar rule function. Referential stability comes from [`RuleId`],
/// not the function pointer.
pub type RuleFn = for<'a, 's> fn(&'a mut Parser<'s>, usize) -> PResult;

/// Names reserved as statement or expression keywords; never usable as
/// plain names. `match`, `case`, `type`, and `operator` are soft keywords
/// recognized positionally and are not listed here.
pub const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "elif", "else", "while", "for", "def", "class",
    "return", "pass", "break", "continue", "import", "from", "as", "lambda", "async", "await",
    "yield", "global", "nonlocal", "del", "with", "try", "except", "finally", "raise", "assert",
];

/// Parser state for one compilation unit.
pub struct Parser<'s> {
    pub(crate) src: &'s str,
    pub(crate) loc: &'s SourceLocation<'s>,
    pub(crate) stream: &'s TokenStream,
    pub(crate) memo: MemoTable,
    pub(crate) target: Target,
    pub(crate) mode: Mode,
    pub(crate) custom_ops: HashSet<String>,
    furthest_at: Cell<usize>,
    furthest_expected: RefCell<Vec<&'static str>>,
    examined_hwm: Cell<usize>,
    stmt_start: Cell<usize>,
    memo_enabled: bool,
}

impl<'s> Parser<'s> {
    pub fn new(
        src: &'s str,
        loc: &'s SourceLocation<'s>,
        stream: &'s TokenStream,
        target: Target,
        mode: Mode,
    ) -> Self {
        Self::with_memo(src, loc, stream, target, mode, MemoTable::new())
    }

    /// Start from a pre-seeded memo table (incremental session reuse).
    pub fn with_memo(
        src: &'s str,
        loc: &'s SourceLocation<'s>,
        stream: &'s TokenStream,
        target: Target,
        mode: Mode,
        memo: MemoTable,
    ) -> Self {
        Self {
            src,
            loc,
            stream,
            memo,
            target,
            mode,
            custom_ops: HashSet::new(),
            furthest_at: Cell::new(0),
            furthest_expected: RefCell::new(Vec::new()),
            examined_hwm: Cell::new(0),
            stmt_start: Cell::new(0),
            memo_enabled: true,
        }
    }

    /// Disable the memo table, forcing a reference re-exploring parse.
    /// Memoization is a performance optimization, not a semantic change;
    /// tests compare both configurations.
    pub fn set_memo_enabled(&mut self, enabled: bool) {
        self.memo_enabled = enabled;
    }

    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    /// The token at `at`, clamped to the trailing `Eof`. Every access
    /// raises the examined high-water mark used for memo-entry validity.
    pub fn tok(&self, at: usize) -> &Token {
        let i = at.min(self.stream.tokens.len() - 1);
        if i > self.examined_hwm.get() {
            self.examined_hwm.set(i);
        }
        &self.stream.tokens[i]
    }

    pub fn kind(&self, at: usize) -> TokenKind {
        self.tok(at).kind
    }

    /// True when tokens `at` and `at + 1` touch in the source (no
    /// whitespace between them). Custom operators are contiguous op runs.
    pub fn touching(&self, at: usize) -> bool {
        let a = self.tok(at).range.span.end;
        let b = self.tok(at + 1).range.span.start;
        a == b
    }

    // ------------------------------------------------------------------
    // Failure tracking
    // ------------------------------------------------------------------

    /// Record a soft failure at `at`, expecting the given description.
    pub fn fail(&self, at: usize, expected: &'static str) -> Failure {
        if at > self.furthest_at.get() {
            self.furthest_at.set(at);
            self.furthest_expected.borrow_mut().clear();
        }
        if at == self.furthest_at.get() {
            let mut expected_set = self.furthest_expected.borrow_mut();
            if !expected_set.contains(&expected) {
                expected_set.push(expected);
            }
        }
        Failure::Soft
    }

    pub fn fatal(&self, diagnostic: Diagnostic) -> Failure {
        Failure::Fatal(Box::new(diagnostic))
    }

    /// Version-gate a just-recognized construct. Rejection is fatal.
    pub fn gate(&self, feature: Feature, range: &Range) -> Result<(), Failure> {
        gate::check(feature, self.target, range, self.loc)
            .map_err(|diag| Failure::Fatal(Box::new(diag)))
    }

    /// Mark the start of the statement currently being parsed.
    pub fn note_stmt_start(&self, at: usize) {
        self.stmt_start.set(at);
    }

    /// Lenient mode accepts undeclared symbol runs as custom operators.
    pub fn allows_undeclared_ops(&self) -> bool {
        self.mode == Mode::Lenient
    }

    // ------------------------------------------------------------------
    // Memoization
    // ------------------------------------------------------------------

    /// Run a rule through the memo table. Soft failures are recorded as
    /// well as successes; fatal failures abort and are never cached.
    pub fn memoized(&mut self, rule: RuleId, at: usize, f: RuleFn) -> PResult {
        if !self.memo_enabled {
            return f(self, at);
        }
        if let Some(entry) = self.memo.lookup(rule, at) {
            let entry = entry.clone();
            if entry.examined > self.examined_hwm.get() {
                self.examined_hwm.set(entry.examined);
            }
            return match entry.outcome {
                MemoOutcome::Success { node, next } => {
                    // Replayed operator declarations must still register
                    // their symbol, or entries reused from a session
                    // would lose the declaration's effect on later text.
                    if let Node::Stmt(crate::plume::ast::nodes::Stmt::OperatorDecl {
                        op, ..
                    }) = &node
                    {
                        self.custom_ops.insert(op.clone());
                    }
                    Ok((node, next))
                }
                MemoOutcome::Failure => Err(Failure::Soft),
            };
        }
        let saved_hwm = self.examined_hwm.replace(at);
        let result = f(self, at);
        let examined = self.examined_hwm.get();
        let entry_fingerprint = self.fingerprint_span(at, examined);
        match &result {
            Ok((node, next)) => {
                self.memo.insert(
                    rule,
                    at,
                    MemoEntry {
                        outcome: MemoOutcome::Success {
                            node: node.clone(),
                            next: *next,
                        },
                        examined,
                        fingerprint: entry_fingerprint,
                    },
                );
            }
            Err(Failure::Soft) => {
                self.memo.insert(
                    rule,
                    at,
                    MemoEntry {
                        outcome: MemoOutcome::Failure,
                        examined,
                        fingerprint: entry_fingerprint,
                    },
                );
            }
            Err(Failure::Fatal(_)) => {}
        }
        if saved_hwm > self.examined_hwm.get() {
            self.examined_hwm.set(saved_hwm);
        }
        result
    }

    fn fingerprint_span(&self, at: usize, examined: usize) -> u64 {
        let tokens = &self.stream.tokens;
        let start = tokens[at.min(tokens.len() - 1)].range.span.start;
        let end = tokens[examined.min(tokens.len() - 1)].range.span.end;
        fingerprint(&self.src.as_bytes()[start.min(end)..end])
    }

    // ------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------

    /// First successful alternative wins; order encodes precedence.
    pub fn choice(&mut self, at: usize, alternatives: &[RuleFn]) -> PResult {
        for alternative in alternatives {
            match alternative(self, at) {
                Err(Failure::Soft) => continue,
                other => return other,
            }
        }
        Err(Failure::Soft)
    }

    /// Zero or more repetitions of a rule; stops at the first soft
    /// failure, propagates fatal ones.
    pub fn many(
        &mut self,
        mut at: usize,
        f: impl Fn(&mut Self, usize) -> PResult,
    ) -> Result<(Vec<Node>, usize), Failure> {
        let mut nodes = Vec::new();
        loop {
            match f(self, at) {
                Ok((node, next)) => {
                    debug_assert!(next > at, "repetition must consume input");
                    nodes.push(node);
                    at = next;
                }
                Err(Failure::Soft) => return Ok((nodes, at)),
                Err(fatal) => return Err(fatal),
            }
        }
    }

    /// Optional rule: soft failure yields `None`, fatal propagates.
    pub fn opt(
        &mut self,
        at: usize,
        f: impl FnOnce(&mut Self, usize) -> PResult,
    ) -> Result<(Option<Node>, usize), Failure> {
        match f(self, at) {
            Ok((node, next)) => Ok((Some(node), next)),
            Err(Failure::Soft) => Ok((None, at)),
            Err(fatal) => Err(fatal),
        }
    }

    // ------------------------------------------------------------------
    // Token-level expectations
    // ------------------------------------------------------------------

    pub fn expect_kind(
        &self,
        at: usize,
        kind: TokenKind,
        expected: &'static str,
    ) -> Result<usize, Failure> {
        if self.kind(at) == kind {
            Ok(at + 1)
        } else {
            Err(self.fail(at, expected))
        }
    }

    pub fn expect_op(&self, at: usize, op: &'static str) -> Result<usize, Failure> {
        if self.tok(at).is_op(op) {
            Ok(at + 1)
        } else {
            Err(self.fail(at, op))
        }
    }

    pub fn expect_keyword(&self, at: usize, keyword: &'static str) -> Result<usize, Failure> {
        if self.tok(at).is_keyword(keyword) {
            Ok(at + 1)
        } else {
            Err(self.fail(at, keyword))
        }
    }

    /// A non-reserved name token.
    pub fn expect_name(&self, at: usize) -> Result<(String, Range, usize), Failure> {
        let token = self.tok(at);
        if token.kind == TokenKind::Name && !RESERVED.contains(&token.text.as_str()) {
            Ok((token.text.clone(), token.range.clone(), at + 1))
        } else {
            Err(self.fail(at, "a name"))
        }
    }

    pub fn expect_newline(&self, at: usize) -> Result<usize, Failure> {
        self.expect_kind(at, TokenKind::Newline, "end of line")
    }

    /// A run of contiguous operator-class tokens starting at `at`,
    /// joined into one symbol. Used for custom operator recognition.
    pub fn op_run(&self, at: usize) -> Option<(String, Range, usize)> {
        if self.kind(at) != TokenKind::Op {
            return None;
        }
        let mut text = self.tok(at).text.clone();
        let mut range = self.tok(at).range.clone();
        let mut i = at;
        while self.kind(i + 1) == TokenKind::Op && self.touching(i) {
            i += 1;
            text.push_str(&self.tok(i).text);
            range = range.cover(&self.tok(i).range);
        }
        Some((text, range, i + 1))
    }

    // ------------------------------------------------------------------
    // Entry points and error synthesis
    // ------------------------------------------------------------------

    /// Parse the whole unit per the configured mode.
    pub fn run(&mut self) -> Result<Module, Diagnostic> {
        if self.mode.is_structured() {
            if let Some(record) = self.stream.first_mixed_indent() {
                return Err(Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "inconsistent use of tabs and spaces in indentation",
                    &record.range,
                    self.loc,
                ));
            }
            if let Some(range) = &self.stream.bad_dedent {
                return Err(Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "unindent does not match any outer indentation level",
                    range,
                    self.loc,
                ));
            }
        }
        match self.mode {
            Mode::File | Mode::Package | Mode::Sys | Mode::Block => self.run_module(),
            Mode::Single => self.run_single(),
            Mode::Eval => self.run_eval(),
            Mode::Lenient => match self.run_eval() {
                Ok(module) => Ok(module),
                Err(_) => self.run_module(),
            },
        }
    }

    fn run_module(&mut self) -> Result<Module, Diagnostic> {
        let mut body = Vec::new();
        let mut at = 0;
        while self.kind(at) != TokenKind::Eof {
            self.note_stmt_start(at);
            match statements::statement_line(self, at) {
                Ok((stmts, next)) => {
                    body.extend(stmts);
                    at = next;
                }
                Err(Failure::Soft) => return Err(self.grammar_error()),
                Err(Failure::Fatal(diag)) => return Err(*diag),
            }
        }
        Ok(Module {
            body,
            range: self.unit_range(),
        })
    }

    fn run_single(&mut self) -> Result<Module, Diagnostic> {
        let at = 0;
        self.note_stmt_start(at);
        match statements::statement_line(self, at) {
            Ok((stmts, next)) => {
                if self.kind(next) != TokenKind::Eof {
                    self.fail(next, "end of input");
                    return Err(self.grammar_error());
                }
                Ok(Module {
                    body: stmts,
                    range: self.unit_range(),
                })
            }
            Err(Failure::Soft) => Err(self.grammar_error()),
            Err(Failure::Fatal(diag)) => Err(*diag),
        }
    }

    fn run_eval(&mut self) -> Result<Module, Diagnostic> {
        // A lone expression may be indented; tolerate one leading level.
        let mut at = 0;
        if self.kind(at) == TokenKind::Indent {
            at += 1;
        }
        self.note_stmt_start(at);
        match crate::plume::parsing::expressions::expr(self, at) {
            Ok((node, mut next)) => {
                while matches!(self.kind(next), TokenKind::Newline | TokenKind::Dedent) {
                    next += 1;
                }
                if self.kind(next) != TokenKind::Eof {
                    self.fail(next, "end of input");
                    return Err(self.grammar_error());
                }
                let expr = node.into_expr();
                let range = expr.range().clone();
                Ok(Module {
                    body: vec![crate::plume::ast::nodes::Stmt::Expr { value: expr, range: range.clone() }],
                    range,
                })
            }
            Err(Failure::Soft) => Err(self.grammar_error()),
            Err(Failure::Fatal(diag)) => Err(*diag),
        }
    }

    fn unit_range(&self) -> Range {
        self.loc.range_of(&(0..self.src.len()))
    }

    /// Build the GrammarError for a total failure: report at the furthest
    /// soft-failure position with a description of what was expected.
    pub fn grammar_error(&self) -> Diagnostic {
        let at = self.furthest_at.get();
        let token = self.tok(at);
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else if token.kind == TokenKind::Newline {
            "end of line".to_string()
        } else if token.kind == TokenKind::Dedent {
            "end of block".to_string()
        } else {
            format!("'{}'", token.text)
        };
        let expected = describe_expected(&self.furthest_expected.borrow());
        let message = format!("invalid syntax: expected {} (got {})", expected, found);
        let start_idx = self.stmt_start.get().min(at);
        let start = &self.stream.tokens[start_idx.min(self.stream.tokens.len() - 1)].range;
        Diagnostic::block(DiagnosticKind::Grammar, message, start, &token.range, self.loc)
            .with_incomplete(token.kind == TokenKind::Eof)
    }
}

fn describe_expected(expected: &[&'static str]) -> String {
    match expected {
        [] => "a complete construct".to_string(),
        [single] => (*single).to_string(),
        [init @ .., last] => format!(
            "{} or {}",
            init.iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            last
        ),
    }
}
