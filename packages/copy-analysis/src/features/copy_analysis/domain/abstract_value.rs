//! Copy abstract value lattice
//!
//! A [`CopyAbstractValue`] is the set of entities known to hold the same
//! value (or the same reference) together with a [`CopyAbstractValueKind`].
//! Values are immutable; every "mutation" returns a new value.
//!
//! Invariants (enforced by the constructors):
//! - the entity set is empty exactly when the kind is not known
//! - a `KnownReferenceCopy` never contains a value-typed entity
//! - a singleton `KnownValueCopy` of a reference-typed entity is normalized
//!   to `KnownReferenceCopy`

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::shared::models::AnalysisEntity;

/// Kind of a copy value
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CopyAbstractValueKind {
    /// Type cannot be analyzed; never transitions
    NotApplicable,

    /// Only inside a provably unreachable branch
    Invalid,

    /// Entities hold equal values
    KnownValueCopy,

    /// Entities hold the same reference
    KnownReferenceCopy,

    /// Nothing is known
    Unknown,
}

impl CopyAbstractValueKind {
    #[inline]
    pub fn is_known(self) -> bool {
        matches!(
            self,
            CopyAbstractValueKind::KnownValueCopy | CopyAbstractValueKind::KnownReferenceCopy
        )
    }

    /// Kind of a combined copy set.
    ///
    /// Returns `self` unchanged unless both kinds are known; callers merge
    /// the entity sets themselves. Two known kinds combine to
    /// `KnownReferenceCopy` only if both are reference copies.
    pub fn merge_if_both_known(self, other: CopyAbstractValueKind) -> CopyAbstractValueKind {
        if !self.is_known() || !other.is_known() {
            return self;
        }
        if self == CopyAbstractValueKind::KnownReferenceCopy
            && other == CopyAbstractValueKind::KnownReferenceCopy
        {
            CopyAbstractValueKind::KnownReferenceCopy
        } else {
            CopyAbstractValueKind::KnownValueCopy
        }
    }
}

/// Set of entities sharing a copy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyAbstractValue {
    entities: BTreeSet<AnalysisEntity>,
    kind: CopyAbstractValueKind,
}

static NOT_APPLICABLE: Lazy<CopyAbstractValue> =
    Lazy::new(|| CopyAbstractValue::empty(CopyAbstractValueKind::NotApplicable));
static INVALID: Lazy<CopyAbstractValue> =
    Lazy::new(|| CopyAbstractValue::empty(CopyAbstractValueKind::Invalid));
static UNKNOWN: Lazy<CopyAbstractValue> =
    Lazy::new(|| CopyAbstractValue::empty(CopyAbstractValueKind::Unknown));

impl CopyAbstractValue {
    fn empty(kind: CopyAbstractValueKind) -> Self {
        Self {
            entities: BTreeSet::new(),
            kind,
        }
    }

    pub fn not_applicable() -> Self {
        NOT_APPLICABLE.clone()
    }

    pub fn invalid() -> Self {
        INVALID.clone()
    }

    pub fn unknown() -> Self {
        UNKNOWN.clone()
    }

    /// Singleton copy set of `entity`; kind follows the entity's type
    pub fn new(entity: &AnalysisEntity) -> Self {
        let kind = if entity.ty().is_reference_type() {
            CopyAbstractValueKind::KnownReferenceCopy
        } else {
            CopyAbstractValueKind::KnownValueCopy
        };
        Self {
            entities: std::iter::once(entity.clone()).collect(),
            kind,
        }
    }

    /// Copy set with an explicit kind.
    ///
    /// An empty set always yields the canonical value of a non-known kind
    /// (`Unknown` when a known kind was requested). A reference copy holding
    /// a value-typed entity is weakened to a value copy.
    pub fn with_kind(entities: BTreeSet<AnalysisEntity>, kind: CopyAbstractValueKind) -> Self {
        if !kind.is_known() {
            debug_assert!(
                entities.is_empty(),
                "{:?} copy value must not carry entities",
                kind
            );
            return Self::empty(kind);
        }
        if entities.is_empty() {
            return Self::unknown();
        }

        let kind = if entities.len() == 1 {
            match entities.iter().next() {
                Some(e) if e.ty().is_reference_type() => CopyAbstractValueKind::KnownReferenceCopy,
                _ => kind,
            }
        } else {
            kind
        };
        let kind = if kind == CopyAbstractValueKind::KnownReferenceCopy
            && entities.iter().any(|e| !e.ty().is_reference_type())
        {
            CopyAbstractValueKind::KnownValueCopy
        } else {
            kind
        };

        Self { entities, kind }
    }

    pub fn with_reference_copy(entities: BTreeSet<AnalysisEntity>, is_reference_copy: bool) -> Self {
        let kind = if is_reference_copy {
            CopyAbstractValueKind::KnownReferenceCopy
        } else {
            CopyAbstractValueKind::KnownValueCopy
        };
        Self::with_kind(entities, kind)
    }

    /// Value with `entity` excluded.
    ///
    /// Requires `entity` to be a member and the set to have more than one
    /// member; callers degrade the other cases themselves.
    pub fn with_entity_removed(&self, entity: &AnalysisEntity) -> Self {
        self.with_entities_removed(std::iter::once(entity))
    }

    /// Value with all of `entities` excluded (same preconditions as
    /// [`with_entity_removed`](Self::with_entity_removed), and at least one
    /// member must remain)
    pub fn with_entities_removed<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a AnalysisEntity>,
    ) -> Self {
        debug_assert!(self.entities.len() > 1, "cannot shrink {}", self);
        let mut remaining = self.entities.clone();
        for entity in entities {
            let removed = remaining.remove(entity);
            debug_assert!(removed, "{} is not a member of {}", entity, self);
        }
        Self::with_kind(remaining, self.kind)
    }

    #[inline]
    pub fn kind(&self) -> CopyAbstractValueKind {
        self.kind
    }

    #[inline]
    pub fn entities(&self) -> &BTreeSet<AnalysisEntity> {
        &self.entities
    }

    #[inline]
    pub fn contains(&self, entity: &AnalysisEntity) -> bool {
        self.entities.contains(entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        self.kind.is_known()
    }
}

impl fmt::Display for CopyAbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{{", self.kind)?;
        for (i, entity) in self.entities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entity)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{EntityFactory, TypeInfo};
    use CopyAbstractValueKind::*;

    fn set(entities: &[&AnalysisEntity]) -> BTreeSet<AnalysisEntity> {
        entities.iter().map(|e| (*e).clone()).collect()
    }

    #[test]
    fn test_singleton_kind_follows_type() {
        let mut factory = EntityFactory::new();
        let i = factory.local("M", "i", TypeInfo::value("int"));
        let s = factory.local("M", "s", TypeInfo::reference("string"));

        assert_eq!(CopyAbstractValue::new(&i).kind(), KnownValueCopy);
        assert_eq!(CopyAbstractValue::new(&s).kind(), KnownReferenceCopy);
    }

    #[test]
    fn test_singleton_reference_normalized() {
        let mut factory = EntityFactory::new();
        let s = factory.local("M", "s", TypeInfo::reference("string"));

        let value = CopyAbstractValue::with_kind(set(&[&s]), KnownValueCopy);
        assert_eq!(value.kind(), KnownReferenceCopy);
    }

    #[test]
    fn test_reference_copy_with_value_entity_weakened() {
        let mut factory = EntityFactory::new();
        let i = factory.local("M", "i", TypeInfo::value("int"));
        let s = factory.local("M", "s", TypeInfo::reference("string"));

        let value = CopyAbstractValue::with_reference_copy(set(&[&i, &s]), true);
        assert_eq!(value.kind(), KnownValueCopy);
    }

    #[test]
    fn test_canonical_values_are_empty() {
        for value in [
            CopyAbstractValue::not_applicable(),
            CopyAbstractValue::invalid(),
            CopyAbstractValue::unknown(),
        ] {
            assert!(value.is_empty());
            assert!(!value.is_known());
        }
        assert_eq!(CopyAbstractValue::unknown(), CopyAbstractValue::unknown());
        assert_ne!(CopyAbstractValue::unknown(), CopyAbstractValue::invalid());
    }

    #[test]
    fn test_empty_known_set_degrades_to_unknown() {
        let value = CopyAbstractValue::with_kind(BTreeSet::new(), KnownValueCopy);
        assert_eq!(value, CopyAbstractValue::unknown());
    }

    #[test]
    fn test_entity_removal() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));
        let c = factory.local("M", "c", TypeInfo::value("int"));

        let abc = CopyAbstractValue::with_kind(set(&[&a, &b, &c]), KnownValueCopy);
        let bc = abc.with_entity_removed(&a);
        assert_eq!(bc.entities(), &set(&[&b, &c]));
        assert_eq!(bc.kind(), KnownValueCopy);

        let c_only = abc.with_entities_removed([&a, &b]);
        assert_eq!(c_only, CopyAbstractValue::new(&c));
    }

    #[test]
    fn test_structural_equality() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));

        let v1 = CopyAbstractValue::with_kind(set(&[&a, &b]), KnownValueCopy);
        let v2 = CopyAbstractValue::with_kind(set(&[&b, &a]), KnownValueCopy);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_merge_if_both_known() {
        assert_eq!(KnownReferenceCopy.merge_if_both_known(KnownValueCopy), KnownValueCopy);
        assert_eq!(KnownValueCopy.merge_if_both_known(KnownValueCopy), KnownValueCopy);
        assert_eq!(
            KnownReferenceCopy.merge_if_both_known(KnownReferenceCopy),
            KnownReferenceCopy
        );
        assert_eq!(KnownReferenceCopy.merge_if_both_known(Unknown), KnownReferenceCopy);
        assert_eq!(Unknown.merge_if_both_known(KnownValueCopy), Unknown);
        assert_eq!(Invalid.merge_if_both_known(NotApplicable), Invalid);
    }

    #[test]
    fn test_display() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));
        let value = CopyAbstractValue::with_kind(set(&[&a, &b]), KnownValueCopy);
        assert_eq!(value.to_string(), "KnownValueCopy{a, b}");
    }
}
