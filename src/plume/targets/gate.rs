//! The version gate.
//!
//! Invoked by the grammar engine at the point a version-gated construct is
//! recognized. The gate is a post-recognition filter: the same recognition
//! code path runs at every target, and rejection happens here.

use super::{Feature, Target};
use crate::plume::ast::range::{Range, SourceLocation};
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};

/// Check one recognized construct against the configured target.
pub fn check(
    feature: Feature,
    target: Target,
    range: &Range,
    loc: &SourceLocation,
) -> Result<(), Diagnostic> {
    let spec = feature.spec();
    if target.supports(spec) {
        return Ok(());
    }
    let (lo, hi) = target.version_span();
    let message = match spec.removed {
        Some(removed) if hi >= removed => format!(
            "{} was removed as of {} and is not supported on target {}",
            spec.label, removed, target
        ),
        _ => format!(
            "{} requires a minimum target of {} (currently {}, supporting {})",
            spec.label, spec.introduced, target, lo
        ),
    };
    Err(Diagnostic::point(DiagnosticKind::Target, message, range, loc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::diagnostics::DiagnosticKind;
    use crate::plume::targets::Version;

    fn dummy_range(loc: &SourceLocation) -> Range {
        loc.range_of(&(0..1))
    }

    #[test]
    fn test_gate_rejects_below_minimum() {
        let loc = SourceLocation::new("x");
        let err = check(
            Feature::Walrus,
            Target::Exact(Version::new(3, 6)),
            &dummy_range(&loc),
            &loc,
        )
        .unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::Target);
        assert!(err.message().contains("assignment expression"));
        assert!(err.message().contains("3.8"));
    }

    #[test]
    fn test_gate_accepts_at_minimum() {
        let loc = SourceLocation::new("x");
        assert!(check(
            Feature::Walrus,
            Target::Exact(Version::new(3, 8)),
            &dummy_range(&loc),
            &loc,
        )
        .is_ok());
    }

    #[test]
    fn test_gate_names_removal_version() {
        let loc = SourceLocation::new("x");
        let err = check(
            Feature::TupleParams,
            Target::Exact(Version::new(3, 6)),
            &dummy_range(&loc),
            &loc,
        )
        .unwrap_err();
        assert!(err.message().contains("removed as of 3.0"));
    }
}
