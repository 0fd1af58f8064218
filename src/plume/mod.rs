//! # plume
//!
//! The compiler core of the plume language: an expression-oriented
//! functional superset syntax (pipelines, placeholder partial
//! application, arrow lambdas, operator sections, custom operators,
//! pattern matching, format strings) translated to Python source text.
//!
//! The pipeline is scan → parse → audit → emit:
//!
//! - [`lexing`] tokenizes and validates delimiter nesting
//! - [`parsing`] is a memoized backtracking recursive descent engine
//!   that consults the version gate in [`targets`] per construct and the
//!   session cache in [`incremental`] when enabled
//! - [`audit`] enforces style rules when strict
//! - [`emit`] renders target-appropriate Python
//!
//! Every failure is a structured [`diagnostics::Diagnostic`] with exact
//! source-span annotations; a compile either fully succeeds or returns
//! one.

pub mod analysis;
pub mod ast;
pub mod audit;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod incremental;
pub mod lexing;
pub mod parsing;
pub mod targets;
pub mod token;

pub use compiler::{compile, Compiler};
pub use config::{active_config, configure, CompileConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use parsing::Mode;
pub use targets::{Target, Version};
