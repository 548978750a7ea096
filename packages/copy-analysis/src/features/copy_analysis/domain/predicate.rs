//! Static verdicts for branch conditions

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the analysis knows about a condition's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PredicateValueKind {
    #[default]
    Unknown,
    AlwaysTrue,
    AlwaysFalse,
}

impl PredicateValueKind {
    /// Verdict for the negated condition
    pub fn negate(self) -> Self {
        match self {
            PredicateValueKind::Unknown => PredicateValueKind::Unknown,
            PredicateValueKind::AlwaysTrue => PredicateValueKind::AlwaysFalse,
            PredicateValueKind::AlwaysFalse => PredicateValueKind::AlwaysTrue,
        }
    }

    /// Join of two verdicts reached on different paths
    pub fn merge(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            PredicateValueKind::Unknown
        }
    }

    /// Combine two verdicts for the same condition computed from different
    /// facts (e.g. its true and its false side); a known verdict wins over
    /// `Unknown`
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (PredicateValueKind::Unknown, k) | (k, PredicateValueKind::Unknown) => k,
            (a, b) if a == b => a,
            _ => PredicateValueKind::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != PredicateValueKind::Unknown
    }
}

impl fmt::Display for PredicateValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PredicateValueKind::Unknown => "unknown",
            PredicateValueKind::AlwaysTrue => "always-true",
            PredicateValueKind::AlwaysFalse => "always-false",
        };
        write!(f, "{}", s)
    }
}
