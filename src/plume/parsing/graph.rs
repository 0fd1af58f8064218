//! The rule memo table ("computation graph").
//!
//! Every memoized attempt at a (rule, offset) pair — success or failure —
//! is recorded here, so backtracking never re-explores the same substring
//! under the same rule and pathological inputs stay roughly quadratic.
//!
//! Entries additionally record the furthest token index examined while
//! they were produced and a fingerprint of the text they covered. Those
//! two fields make entries safely reusable across compiles in an
//! incremental session: an entry is valid for a new token stream exactly
//! when every token it examined is inside the unchanged prefix and the
//! covering text still hashes to the same fingerprint.

use crate::plume::ast::nodes::Node;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Stable identities for memoized grammar rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    Expr,
    StmtLambda,
    ArrowLambda,
    Pipeline,
    Ternary,
    OrTest,
    AndTest,
    NotTest,
    Comparison,
    InfixChain,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Postfix,
    Atom,
    SimpleStmt,
    CompoundStmt,
    Pattern,
    OrPattern,
    ClosedPattern,
}

/// What a memoized attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoOutcome {
    Success { node: Node, next: usize },
    Failure,
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoEntry {
    pub outcome: MemoOutcome,
    /// Furthest token index examined while producing this entry.
    pub examined: usize,
    /// Hash of the source text covered from the entry's start token to
    /// its furthest examined token.
    pub fingerprint: u64,
}

/// Memo map keyed by (rule identity, token offset).
#[derive(Debug, Clone, Default)]
pub struct MemoTable {
    map: HashMap<(RuleId, usize), MemoEntry>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, rule: RuleId, at: usize) -> Option<&MemoEntry> {
        self.map.get(&(rule, at))
    }

    pub fn insert(&mut self, rule: RuleId, at: usize, entry: MemoEntry) {
        self.map.insert((rule, at), entry);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drain into the entry list stored by an incremental session.
    pub fn into_entries(self) -> Vec<((RuleId, usize), MemoEntry)> {
        self.map.into_iter().collect()
    }

    /// Rebuild a table from session entries that survived invalidation.
    pub fn from_entries(entries: impl IntoIterator<Item = ((RuleId, usize), MemoEntry)>) -> Self {
        Self {
            map: entries.into_iter().collect(),
        }
    }
}

/// Fingerprint of a byte slice, used to verify reused entries.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::ast::nodes::{Expr, Node};
    use crate::plume::ast::range::Range;

    fn entry(next: usize) -> MemoEntry {
        MemoEntry {
            outcome: MemoOutcome::Success {
                node: Node::Expr(Expr::Name {
                    text: "x".into(),
                    range: Range::default(),
                }),
                next,
            },
            examined: next,
            fingerprint: 0,
        }
    }

    #[test]
    fn test_lookup_distinguishes_rules_at_same_offset() {
        let mut table = MemoTable::new();
        table.insert(RuleId::Atom, 3, entry(4));
        assert!(table.lookup(RuleId::Atom, 3).is_some());
        assert!(table.lookup(RuleId::Term, 3).is_none());
        assert!(table.lookup(RuleId::Atom, 4).is_none());
    }

    #[test]
    fn test_round_trip_through_entries() {
        let mut table = MemoTable::new();
        table.insert(RuleId::Atom, 0, entry(1));
        table.insert(RuleId::Expr, 0, entry(5));
        let rebuilt = MemoTable::from_entries(table.into_entries());
        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt.lookup(RuleId::Expr, 0).is_some());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint(b"def f(): pass"), fingerprint(b"def g(): pass"));
        assert_eq!(fingerprint(b"x = 1"), fingerprint(b"x = 1"));
    }
}
