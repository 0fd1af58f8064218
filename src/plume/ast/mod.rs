//! Syntax tree and source-location types shared across the compiler.

pub mod nodes;
pub mod range;

pub use nodes::{
    Arg, Expr, FStringPart, ImportName, MatchArm, Module, Node, Param, Pattern, PipeKind, Stmt,
};
pub use range::{Position, Range, SourceLocation};
