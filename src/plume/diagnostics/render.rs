//! Textual rendering of diagnostics.
//!
//! Format:
//!
//! ```text
//! <ename>: <message> (line <N>)
//!   <source line>
//!   <annotation>
//! ```
//!
//! Excerpts are indented two spaces. Annotation columns are character
//! columns of the original, unmodified source line; lines are never
//! truncated.
//!
//! Annotation shapes:
//! - point errors: a single caret under the column
//! - same-line spans: a tilde run from the open column up to (not
//!   including) the close column, terminated by a caret at the close
//! - cross-line spans: only the close's line, the tilde run prefixed with
//!   a `\` continuation marker
//! - statement-level failures: tilde run over the terminal line of the
//!   block ending in a caret; a blank continuation line is inserted when
//!   the failure point lies past the last rendered character

use super::{AnnotationStyle, Diagnostic, SpanAnnotation};

const EXCERPT_INDENT: &str = "  ";

pub fn render(diag: &Diagnostic) -> String {
    let mut out = String::new();
    out.push_str(diag.ename());
    out.push_str(": ");
    out.push_str(diag.message());
    if let Some(line) = diag.primary_line() {
        out.push_str(&format!(" (line {})", line + 1));
    }
    out.push('\n');
    for ann in diag.annotations() {
        render_annotation(&mut out, ann);
    }
    out
}

fn render_annotation(out: &mut String, ann: &SpanAnnotation) {
    let line_len = ann.line_text.chars().count();
    let caret_col = ann.range.start_column;

    match &ann.style {
        AnnotationStyle::Caret => {
            push_line(out, &ann.line_text);
            push_line(out, &format!("{}^", " ".repeat(caret_col.min(line_len))));
        }
        AnnotationStyle::Span { open } => {
            push_line(out, &ann.line_text);
            if open.start_line == ann.range.start_line {
                push_line(out, &plain_run(open.start_column, caret_col));
            } else {
                let anchor = first_nonspace_column(&ann.line_text);
                push_line(out, &continuation_run(anchor, caret_col));
            }
        }
        AnnotationStyle::Block { start } => {
            push_line(out, &ann.line_text);
            let past_end = caret_col >= line_len;
            let effective = caret_col.min(line_len);
            if past_end {
                // Failure point lies past the last rendered character.
                out.push('\n');
            }
            let annotation = if start.start_line == ann.range.start_line {
                plain_run(start.start_column.min(effective), effective)
            } else {
                let anchor = first_nonspace_column(&ann.line_text).min(effective);
                continuation_run(anchor, effective)
            };
            push_line(out, &annotation);
        }
    }
}

fn push_line(out: &mut String, content: &str) {
    out.push_str(EXCERPT_INDENT);
    out.push_str(content);
    out.push('\n');
}

/// Tildes from `from` up to (not including) `caret`, caret at `caret`.
fn plain_run(from: usize, caret: usize) -> String {
    let from = from.min(caret);
    format!("{}{}^", " ".repeat(from), "~".repeat(caret - from))
}

/// As [`plain_run`], but prefixed with a `\` marking a span that starts on
/// an earlier line. The marker takes the column before the run when there
/// is room, otherwise the run's first column.
fn continuation_run(anchor: usize, caret: usize) -> String {
    let anchor = anchor.min(caret);
    if anchor == 0 {
        format!("\\{}^", "~".repeat(caret.saturating_sub(1)))
    } else {
        format!(
            "{}\\{}^",
            " ".repeat(anchor - 1),
            "~".repeat(caret - anchor)
        )
    }
}

fn first_nonspace_column(line: &str) -> usize {
    line.chars()
        .position(|c| !c.is_whitespace())
        .unwrap_or(0)
}
