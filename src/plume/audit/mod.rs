//! The strict-mode auditor.
//!
//! A secondary pass over the completed tree, token stream, and raw lines.
//! Under strict configuration the first finding (in source order) aborts
//! the compile as a fatal StyleError. Under non-strict configuration the
//! pass runs only the deprecated-name rule, whose findings are embedded
//! as inline warning comments in the emitted text.

pub mod rules;

use crate::plume::ast::nodes::Module;
use crate::plume::ast::range::SourceLocation;
use crate::plume::diagnostics::Diagnostic;
use crate::plume::emit::InlineWarning;
use crate::plume::token::TokenStream;
use rules::Finding;

/// Run the auditor. `Err` carries the first fatal StyleError (strict
/// only); `Ok` carries the inline warnings to embed.
pub fn run(
    module: &Module,
    stream: &TokenStream,
    source: &str,
    loc: &SourceLocation,
    strict: bool,
) -> Result<Vec<InlineWarning>, Diagnostic> {
    let mut findings: Vec<Finding> = Vec::new();

    rules::deprecated_names(module, loc, &mut findings);
    if strict {
        rules::unused_imports(module, stream, loc, &mut findings);
        rules::chained_is(module, loc, &mut findings);
        rules::statement_lambdas(module, loc, &mut findings);
        rules::inconsistent_indent_styles(stream, loc, &mut findings);
        rules::trailing_whitespace(source, loc, &mut findings);
        rules::stray_semicolons(stream, loc, &mut findings);
        rules::empty_fstrings(module, loc, &mut findings);
        rules::trailing_dots(module, loc, &mut findings);

        if let Some(first) = findings
            .into_iter()
            .min_by_key(|f| f.diagnostic.primary_offset())
        {
            return Err(first.diagnostic);
        }
        return Ok(Vec::new());
    }

    Ok(findings
        .into_iter()
        .filter_map(|finding| {
            let line = finding.diagnostic.primary_line()?;
            let message = finding.warning?;
            Some(InlineWarning { line, message })
        })
        .collect())
}
