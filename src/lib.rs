//! # plume
//!
//! Compiler core for the plume language. See the [plume] module for the
//! pipeline layout; the commonly used API is re-exported at the crate
//! root:
//!
//! ```rust,ignore
//! use plume::{compile, configure, CompileConfig, Mode, Target};
//!
//! configure(CompileConfig::new().with_target(Target::parse("3.6").unwrap()));
//! let translated = compile("x |> print", Mode::Block)?;
//! ```

#![allow(rustdoc::invalid_html_tags)]

pub mod plume;

pub use crate::plume::{
    active_config, compile, configure, CompileConfig, Compiler, Diagnostic, DiagnosticKind, Mode,
    Target, Version,
};
