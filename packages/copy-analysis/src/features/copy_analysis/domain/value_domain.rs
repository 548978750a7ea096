//! Join and order over [`CopyAbstractValue`]

use std::cmp::Ordering;

use super::abstract_value::{CopyAbstractValue, CopyAbstractValueKind};

/// Abstract domain of copy values
///
/// `Invalid` is bottom (identity of the join), `Unknown` is top. Two known
/// values join to the intersection of their entity sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyAbstractValueDomain;

impl CopyAbstractValueDomain {
    pub fn bottom() -> CopyAbstractValue {
        CopyAbstractValue::invalid()
    }

    pub fn unknown_or_may_be_value() -> CopyAbstractValue {
        CopyAbstractValue::unknown()
    }

    /// Join of two values at a merge point
    pub fn merge(value1: &CopyAbstractValue, value2: &CopyAbstractValue) -> CopyAbstractValue {
        use CopyAbstractValueKind::*;

        match (value1.kind(), value2.kind()) {
            (Invalid, _) => value2.clone(),
            (_, Invalid) => value1.clone(),
            (Unknown, _) | (_, Unknown) => Self::unknown_or_may_be_value(),
            (NotApplicable, _) | (_, NotApplicable) => CopyAbstractValue::not_applicable(),
            (k1, k2) => {
                if value1 == value2 {
                    return value1.clone();
                }
                let common = value1
                    .entities()
                    .intersection(value2.entities())
                    .cloned()
                    .collect();
                CopyAbstractValue::with_kind(common, k1.merge_if_both_known(k2))
            }
        }
    }

    /// Lattice order of `old` relative to `new`.
    ///
    /// Kinds order as declared (`NotApplicable` < `Invalid` < known < `Unknown`);
    /// within one kind a larger entity set is more precise (lower).
    pub fn compare(old: &CopyAbstractValue, new: &CopyAbstractValue) -> Ordering {
        if old == new {
            return Ordering::Equal;
        }
        if old.kind() != new.kind() {
            return old.kind().cmp(&new.kind());
        }
        if old.entities().is_superset(new.entities()) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}
