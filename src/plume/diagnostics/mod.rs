//! Diagnostic types for every failure the compiler can report.
//!
//! A [`Diagnostic`] is structured first (kind, message, annotated spans,
//! source-line snapshot) and textual second: [`Diagnostic::render`]
//! produces the caret/tilde annotated message, deterministically, so the
//! same input and configuration always yield byte-identical output.
//!
//! Diagnostics snapshot the source lines they reference at construction
//! time; rendering never needs the original buffer.

pub mod render;

use crate::plume::ast::range::{Range, SourceLocation};
use serde::Serialize;
use std::fmt;

/// The diagnostic taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Unbalanced or mismatched delimiters and quotes.
    Lex,
    /// No grammar rule satisfied the input at a position.
    Grammar,
    /// Recognized construct rejected by the configured target version.
    Target,
    /// Strict-mode style finding.
    Style,
}

impl DiagnosticKind {
    /// The exception-style name exposed to the kernel adapter.
    pub fn ename(&self) -> &'static str {
        match self {
            DiagnosticKind::Lex => "PlumeLexError",
            DiagnosticKind::Grammar => "PlumeParseError",
            DiagnosticKind::Target => "PlumeTargetError",
            DiagnosticKind::Style => "PlumeStyleError",
        }
    }
}

/// How an annotated span is drawn under its source excerpt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnnotationStyle {
    /// A single caret under one column.
    Caret,
    /// Tilde run from an opening position to a caret at the closing
    /// position. Falls back to a continuation-marker rendering when the
    /// opening position is on an earlier line than the close.
    Span { open: SerializableRange },
    /// Statement-level failure: tilde run over the terminal portion of the
    /// block, ending in a caret at the failure point.
    Block { start: SerializableRange },
}

/// Range mirror with serde support, so diagnostics serialize without
/// coupling the AST types to serde.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializableRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl From<&Range> for SerializableRange {
    fn from(r: &Range) -> Self {
        Self {
            start_byte: r.span.start,
            end_byte: r.span.end,
            start_line: r.start.line,
            start_column: r.start.column,
            end_line: r.end.line,
            end_column: r.end.column,
        }
    }
}

/// One annotated span plus the snapshot of the line it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanAnnotation {
    pub range: SerializableRange,
    pub style: AnnotationStyle,
    /// Snapshot of the source line containing the annotation point.
    pub line_text: String,
}

/// A structured compile failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    message: String,
    annotations: Vec<SpanAnnotation>,
    /// True when more input could plausibly complete the construct
    /// (unclosed delimiter, grammar failure at end of input). Drives the
    /// kernel adapter's `is_complete` replies.
    incomplete: bool,
}

impl Diagnostic {
    /// A diagnostic with a single-caret annotation at `range.start`.
    pub fn point(
        kind: DiagnosticKind,
        message: impl Into<String>,
        range: &Range,
        loc: &SourceLocation,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            annotations: vec![SpanAnnotation {
                range: range.into(),
                style: AnnotationStyle::Caret,
                line_text: loc.line_text(range.start.line).to_string(),
            }],
            incomplete: false,
        }
    }

    /// A diagnostic spanning from `open` to a caret at `close`.
    pub fn span(
        kind: DiagnosticKind,
        message: impl Into<String>,
        open: &Range,
        close: &Range,
        loc: &SourceLocation,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            annotations: vec![SpanAnnotation {
                range: close.into(),
                style: AnnotationStyle::Span { open: open.into() },
                line_text: loc.line_text(close.start.line).to_string(),
            }],
            incomplete: false,
        }
    }

    /// A statement-level failure covering `start` up to the failure point.
    pub fn block(
        kind: DiagnosticKind,
        message: impl Into<String>,
        start: &Range,
        point: &Range,
        loc: &SourceLocation,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            annotations: vec![SpanAnnotation {
                range: point.into(),
                style: AnnotationStyle::Block { start: start.into() },
                line_text: loc.line_text(point.start.line).to_string(),
            }],
            incomplete: false,
        }
    }

    /// Mark this diagnostic as recoverable-by-more-input.
    pub fn with_incomplete(mut self, incomplete: bool) -> Self {
        self.incomplete = incomplete;
        self
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn annotations(&self) -> &[SpanAnnotation] {
        &self.annotations
    }

    /// The exception-style name for this diagnostic's kind.
    pub fn ename(&self) -> &'static str {
        self.kind.ename()
    }

    /// True when the failure sits at end of input and more text could
    /// complete the construct.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Render per the excerpt rules; see [`render`].
    pub fn render(&self) -> String {
        render::render(self)
    }

    /// The rendered text as a line list, for `ename`/`traceback` pairs.
    pub fn traceback(&self) -> Vec<String> {
        self.render().lines().map(str::to_string).collect()
    }

    /// Structured JSON form for the kernel adapter.
    pub fn structured(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("diagnostic serialization cannot fail")
    }

    /// The 0-indexed line of the primary annotation, if any.
    pub fn primary_line(&self) -> Option<usize> {
        self.annotations.first().map(|a| a.range.start_line)
    }

    /// Byte offset ordering key, for picking the first finding in a file.
    pub fn primary_offset(&self) -> usize {
        self.annotations
            .first()
            .map(|a| a.range.start_byte)
            .unwrap_or(0)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for Diagnostic {}
