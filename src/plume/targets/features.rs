//! The version feature table.
//!
//! Static, read-only mapping from optional-syntax feature to the dialect
//! versions that support it. Built once per process; gating decisions are
//! a pure function of this table and the configured target.

use super::Version;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Version-gated syntax features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Assignment expressions (`:=`).
    Walrus,
    /// Keyword-only parameters (after a bare `*`).
    KeywordOnlyParams,
    /// Positional-only parameter marker (`/`).
    PositionalOnlyParams,
    /// `async def` / `await`.
    AsyncAwait,
    /// `async def` bodies containing `yield`.
    AsyncGenerators,
    /// Matrix-multiplication operator (`@`).
    MatMul,
    /// Structural pattern matching (`match` statements).
    MatchStatement,
    /// `type Alias = …` statements.
    TypeAliasStatement,
    /// Parameter and return annotations.
    Annotations,
    /// Tuple destructuring parameters (`def f((a, b)):`), 2.x only.
    TupleParams,
}

/// One feature table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Human-readable construct name used in TargetError messages.
    pub label: &'static str,
    pub introduced: Version,
    /// Version the construct was removed in, if any.
    pub removed: Option<Version>,
}

static FEATURE_TABLE: Lazy<HashMap<Feature, FeatureSpec>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let mut add = |feature, label, introduced, removed| {
        table.insert(
            feature,
            FeatureSpec {
                label,
                introduced,
                removed,
            },
        );
    };
    add(
        Feature::Walrus,
        "assignment expression",
        Version::new(3, 8),
        None,
    );
    add(
        Feature::KeywordOnlyParams,
        "keyword-only parameter",
        Version::new(3, 0),
        None,
    );
    add(
        Feature::PositionalOnlyParams,
        "positional-only parameter marker",
        Version::new(3, 8),
        None,
    );
    add(
        Feature::AsyncAwait,
        "async/await syntax",
        Version::new(3, 5),
        None,
    );
    add(
        Feature::AsyncGenerators,
        "async generator",
        Version::new(3, 6),
        None,
    );
    add(
        Feature::MatMul,
        "matrix multiplication operator",
        Version::new(3, 5),
        None,
    );
    add(
        Feature::MatchStatement,
        "match statement",
        Version::new(3, 10),
        None,
    );
    add(
        Feature::TypeAliasStatement,
        "type alias statement",
        Version::new(3, 12),
        None,
    );
    add(
        Feature::Annotations,
        "parameter annotation",
        Version::new(3, 0),
        None,
    );
    add(
        Feature::TupleParams,
        "tuple destructuring parameter",
        Version::new(2, 0),
        Some(Version::new(3, 0)),
    );
    table
});

impl Feature {
    /// Look up this feature's table entry.
    pub fn spec(&self) -> &'static FeatureSpec {
        FEATURE_TABLE
            .get(self)
            .expect("every feature has a table entry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::targets::Target;

    #[test]
    fn test_every_feature_has_an_entry() {
        for feature in [
            Feature::Walrus,
            Feature::KeywordOnlyParams,
            Feature::PositionalOnlyParams,
            Feature::AsyncAwait,
            Feature::AsyncGenerators,
            Feature::MatMul,
            Feature::MatchStatement,
            Feature::TypeAliasStatement,
            Feature::Annotations,
            Feature::TupleParams,
        ] {
            let spec = feature.spec();
            assert!(!spec.label.is_empty());
        }
    }

    #[test]
    fn test_keyword_only_support_matrix() {
        let spec = Feature::KeywordOnlyParams.spec();
        assert!(!Target::Exact(Version::new(2, 7)).supports(spec));
        assert!(Target::Exact(Version::new(3, 6)).supports(spec));
        assert!(Target::Family(3).supports(spec));
        assert!(!Target::Universal.supports(spec));
    }

    #[test]
    fn test_removed_feature_matrix() {
        let spec = Feature::TupleParams.spec();
        assert!(Target::Exact(Version::new(2, 7)).supports(spec));
        assert!(Target::Family(2).supports(spec));
        assert!(!Target::Exact(Version::new(3, 6)).supports(spec));
        assert!(!Target::Universal.supports(spec));
    }
}
