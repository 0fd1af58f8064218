//! Text emission: the parsed tree rendered as target-appropriate Python.

pub mod python;

pub use python::{emit, InlineWarning};
