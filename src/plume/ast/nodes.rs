//! The plume syntax tree.
//!
//! A tagged-variant tree over expression, statement, and pattern kinds.
//! Every variant carries the [`Range`] of its constituent tokens. The tree
//! is owned by one parse and handed to the auditor and emitter; nothing in
//! it refers back into the token stream.

use crate::plume::ast::range::Range;

/// Pipeline operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    /// `x |> f` — apply left as the sole argument of right.
    Forward,
    /// `x |*> f` — unpack left into the arguments of right.
    ForwardStar,
    /// `f <| x` — apply right as the sole argument of left.
    Backward,
}

/// One piece of an f-string: literal text or an interpolated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Text(String),
    Expr {
        /// Source text of the interpolated expression.
        src: String,
        node: Box<Expr>,
        /// `!r`, `!s`, `!a` conversion, if any.
        conversion: Option<char>,
        /// Format spec after `:`, kept literal.
        format: Option<String>,
    },
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    /// `?` — partial-application placeholder.
    Placeholder(Range),
    Star(Expr),
    DoubleStar(Expr),
    Keyword { name: String, value: Expr },
}

/// Parameter kinds for function definitions and lambdas.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Normal {
        name: String,
        annotation: Option<Expr>,
        default: Option<Expr>,
        range: Range,
    },
    /// `(a, b)` destructuring parameter (legacy, 2.x only).
    Tuple { names: Vec<String>, range: Range },
    /// Bare `*` — subsequent parameters are keyword-only.
    KeywordOnlyMarker { range: Range },
    /// `/` — preceding parameters are positional-only.
    PositionalOnlyMarker { range: Range },
    VarArgs { name: String, range: Range },
    KwArgs { name: String, range: Range },
}

impl Param {
    pub fn range(&self) -> &Range {
        match self {
            Param::Normal { range, .. }
            | Param::Tuple { range, .. }
            | Param::KeywordOnlyMarker { range }
            | Param::PositionalOnlyMarker { range }
            | Param::VarArgs { range, .. }
            | Param::KwArgs { range, .. } => range,
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number or plain string literal, kept as source text.
    Literal { text: String, range: Range },
    Name { text: String, range: Range },
    Tuple { items: Vec<Expr>, range: Range },
    List { items: Vec<Expr>, range: Range },
    Set { items: Vec<Expr>, range: Range },
    Dict { pairs: Vec<(Expr, Expr)>, range: Range },
    ListComp {
        element: Box<Expr>,
        target: Box<Expr>,
        iterable: Box<Expr>,
        condition: Option<Box<Expr>>,
        range: Range,
    },
    Paren { inner: Box<Expr>, range: Range },
    Unary { op: String, operand: Box<Expr>, range: Range },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        range: Range,
    },
    /// Comparison chain: `first op0 rest0 op1 rest1 …`.
    Compare {
        first: Box<Expr>,
        rest: Vec<(String, Expr)>,
        range: Range,
    },
    BoolOp { op: String, values: Vec<Expr>, range: Range },
    Ternary {
        body: Box<Expr>,
        condition: Box<Expr>,
        orelse: Box<Expr>,
        range: Range,
    },
    Pipe {
        kind: PipeKind,
        left: Box<Expr>,
        right: Box<Expr>,
        range: Range,
    },
    /// Arrow lambda `params -> expr`.
    Lambda {
        params: Vec<Param>,
        body: Box<Expr>,
        range: Range,
    },
    /// Statement lambda `params => stmt`; body is hoisted at emission.
    StmtLambda {
        params: Vec<Param>,
        body: Box<Stmt>,
        range: Range,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Arg>,
        range: Range,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
        range: Range,
    },
    /// `a.b.` — attribute chain written with a dangling dot.
    TrailingDot { value: Box<Expr>, range: Range },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
        range: Range,
    },
    /// `lower:upper:step` inside a subscript.
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        range: Range,
    },
    /// Operator section: `(2 *)`, `(* 2)`, or the bare operator `(+)`.
    Section {
        op: String,
        left: Option<Box<Expr>>,
        right: Option<Box<Expr>>,
        range: Range,
    },
    /// Declared custom operator used infix: `a <+> b`.
    CustomOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        range: Range,
    },
    /// Backtick infix application: `` a `f` b ``.
    BacktickCall {
        func: String,
        left: Box<Expr>,
        right: Box<Expr>,
        range: Range,
    },
    FString {
        /// Raw token text including prefix and quotes.
        raw: String,
        parts: Vec<FStringPart>,
        range: Range,
    },
    Await { value: Box<Expr>, range: Range },
    Yield { value: Option<Box<Expr>>, range: Range },
    /// Assignment expression `name := value`.
    Walrus {
        name: String,
        value: Box<Expr>,
        range: Range,
    },
}

impl Expr {
    pub fn range(&self) -> &Range {
        match self {
            Expr::Literal { range, .. }
            | Expr::Name { range, .. }
            | Expr::Tuple { range, .. }
            | Expr::List { range, .. }
            | Expr::Set { range, .. }
            | Expr::Dict { range, .. }
            | Expr::ListComp { range, .. }
            | Expr::Paren { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Compare { range, .. }
            | Expr::BoolOp { range, .. }
            | Expr::Ternary { range, .. }
            | Expr::Pipe { range, .. }
            | Expr::Lambda { range, .. }
            | Expr::StmtLambda { range, .. }
            | Expr::Call { range, .. }
            | Expr::Attribute { range, .. }
            | Expr::TrailingDot { range, .. }
            | Expr::Subscript { range, .. }
            | Expr::Slice { range, .. }
            | Expr::Section { range, .. }
            | Expr::CustomOp { range, .. }
            | Expr::BacktickCall { range, .. }
            | Expr::FString { range, .. }
            | Expr::Await { range, .. }
            | Expr::Yield { range, .. }
            | Expr::Walrus { range, .. } => range,
        }
    }
}

/// One `import` binding: dotted module path plus optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub path: String,
    pub alias: Option<String>,
    pub range: Range,
}

impl ImportName {
    /// The name this import binds at top level.
    pub fn bound_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.split('.').next().unwrap_or(&self.path),
        }
    }
}

/// A `case` arm of a match statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub range: Range,
}

/// Structural match patterns.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Number or string literal pattern.
    Literal { text: String, range: Range },
    /// Bare name: captures the subject.
    Capture { name: String, range: Range },
    Wildcard { range: Range },
    /// Dotted name: matched by value, not captured.
    Value { path: String, range: Range },
    Sequence {
        items: Vec<Pattern>,
        /// Index of a `*rest` element, if present.
        star: Option<usize>,
        range: Range,
    },
    /// `*name` inside a sequence pattern.
    Star { name: String, range: Range },
    Mapping {
        pairs: Vec<(Expr, Pattern)>,
        range: Range,
    },
    Class {
        path: String,
        args: Vec<Pattern>,
        kwargs: Vec<(String, Pattern)>,
        range: Range,
    },
    Or { alternatives: Vec<Pattern>, range: Range },
}

impl Pattern {
    pub fn range(&self) -> &Range {
        match self {
            Pattern::Literal { range, .. }
            | Pattern::Capture { range, .. }
            | Pattern::Wildcard { range }
            | Pattern::Value { range, .. }
            | Pattern::Sequence { range, .. }
            | Pattern::Star { range, .. }
            | Pattern::Mapping { range, .. }
            | Pattern::Class { range, .. }
            | Pattern::Or { range, .. } => range,
        }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr { value: Expr, range: Range },
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        range: Range,
    },
    AugAssign {
        target: Expr,
        op: String,
        value: Expr,
        range: Range,
    },
    Return { value: Option<Expr>, range: Range },
    Pass { range: Range },
    Break { range: Range },
    Continue { range: Range },
    Import { names: Vec<ImportName>, range: Range },
    FromImport {
        module: String,
        names: Vec<ImportName>,
        range: Range,
    },
    If {
        /// `(condition, body)` for the `if` and each `elif`.
        arms: Vec<(Expr, Vec<Stmt>)>,
        orelse: Option<Vec<Stmt>>,
        range: Range,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        range: Range,
    },
    For {
        target: Expr,
        iterable: Expr,
        body: Vec<Stmt>,
        range: Range,
    },
    FuncDef {
        name: String,
        params: Vec<Param>,
        returns: Option<Expr>,
        body: Vec<Stmt>,
        is_async: bool,
        range: Range,
    },
    ClassDef {
        name: String,
        bases: Vec<Expr>,
        body: Vec<Stmt>,
        range: Range,
    },
    Match {
        subject: Expr,
        arms: Vec<MatchArm>,
        range: Range,
    },
    /// `type Alias = value` (3.12+).
    TypeAlias {
        name: String,
        value: Expr,
        range: Range,
    },
    /// `operator <sym> [= impl]` — declares a custom infix operator.
    OperatorDecl {
        op: String,
        implementation: Option<Expr>,
        range: Range,
    },
}

impl Stmt {
    pub fn range(&self) -> &Range {
        match self {
            Stmt::Expr { range, .. }
            | Stmt::Assign { range, .. }
            | Stmt::AugAssign { range, .. }
            | Stmt::Return { range, .. }
            | Stmt::Pass { range }
            | Stmt::Break { range }
            | Stmt::Continue { range }
            | Stmt::Import { range, .. }
            | Stmt::FromImport { range, .. }
            | Stmt::If { range, .. }
            | Stmt::While { range, .. }
            | Stmt::For { range, .. }
            | Stmt::FuncDef { range, .. }
            | Stmt::ClassDef { range, .. }
            | Stmt::Match { range, .. }
            | Stmt::TypeAlias { range, .. }
            | Stmt::OperatorDecl { range, .. } => range,
        }
    }
}

/// A parsed compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub range: Range,
}

/// Memoizable parse results. Rules produce exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Stmt(Stmt),
    Pattern(Pattern),
}

impl Node {
    pub fn into_expr(self) -> Expr {
        match self {
            Node::Expr(e) => e,
            other => panic!("expected expression node, got {:?}", other),
        }
    }

    pub fn into_stmt(self) -> Stmt {
        match self {
            Node::Stmt(s) => s,
            other => panic!("expected statement node, got {:?}", other),
        }
    }

    pub fn into_pattern(self) -> Pattern {
        match self {
            Node::Pattern(p) => p,
            other => panic!("expected pattern node, got {:?}", other),
        }
    }
}
