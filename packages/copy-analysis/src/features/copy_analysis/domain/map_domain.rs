//! Map abstract domain: join of entity → copy value maps
//!
//! Used for the core data of [`CopyAnalysisData`](super::CopyAnalysisData)
//! and for its predicated overlays. A valid map satisfies:
//! - every known value contains its key
//! - every member of a known value maps to a structurally equal value
//! - no key has an unknown instance location
//! - non-known values (`Invalid`, `NotApplicable`, `Unknown`) carry no
//!   partners

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

use super::abstract_value::CopyAbstractValue;
use super::value_domain::CopyAbstractValueDomain;
use crate::errors::{CopyAnalysisError, Result};
use crate::shared::models::AnalysisEntity;

/// Entity → copy value
pub type CopyAnalysisMap = BTreeMap<AnalysisEntity, CopyAbstractValue>;

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyAnalysisMapDomain;

impl CopyAnalysisMapDomain {
    /// Join `map1` and `map2`.
    ///
    /// Keys present in both maps get the value-domain join. A key present in
    /// only one map gets `default_value(key)`, restricted to partners that
    /// are also missing from one of the inputs (a partner tracked on both
    /// paths already has its own joined value). The result is normalized so
    /// that every group agrees on one value.
    pub fn merge(
        map1: &CopyAnalysisMap,
        map2: &CopyAnalysisMap,
        default_value: &dyn Fn(&AnalysisEntity) -> CopyAbstractValue,
        validate: bool,
    ) -> Result<CopyAnalysisMap> {
        if validate {
            Self::validate(map1)?;
            Self::validate(map2)?;
        }

        let keys: BTreeSet<&AnalysisEntity> = map1.keys().chain(map2.keys()).collect();
        let mut result = CopyAnalysisMap::new();

        for key in keys {
            if result.contains_key(key) {
                continue;
            }

            match (map1.get(key), map2.get(key)) {
                (Some(v1), Some(v2)) => {
                    let merged = CopyAbstractValueDomain::merge(v1, v2);
                    if merged.is_known() {
                        for member in merged.entities() {
                            result
                                .entry(member.clone())
                                .or_insert_with(|| merged.clone());
                        }
                    }
                    result.entry(key.clone()).or_insert(merged);
                }
                _ => {
                    let default = default_value(key);
                    if !default.is_known() {
                        result.insert(key.clone(), default);
                        continue;
                    }

                    let one_sided: BTreeSet<AnalysisEntity> = default
                        .entities()
                        .iter()
                        .filter(|e| {
                            *e == key || !(map1.contains_key(*e) && map2.contains_key(*e))
                        })
                        .filter(|e| !result.contains_key(*e))
                        .cloned()
                        .chain(std::iter::once(key.clone()))
                        .collect();

                    let value = if one_sided.len() == default.len() {
                        default
                    } else if one_sided.len() == 1 {
                        CopyAbstractValue::new(key)
                    } else {
                        CopyAbstractValue::with_kind(one_sided.clone(), default.kind())
                    };
                    for member in one_sided {
                        result.insert(member, value.clone());
                    }
                }
            }
        }

        Self::normalize(&mut result);

        if validate {
            Self::validate(&result)?;
        }
        Ok(result)
    }

    /// Split groups whose members disagree.
    ///
    /// Keys holding structurally equal known values form one group; the group
    /// is shrunk to the keys its value names (a key outside its own value
    /// becomes a singleton). Groups only ever shrink.
    pub fn normalize(map: &mut CopyAnalysisMap) {
        let mut by_value: FxHashMap<CopyAbstractValue, BTreeSet<AnalysisEntity>> =
            FxHashMap::default();
        for (key, value) in map.iter() {
            if value.is_known() {
                by_value
                    .entry(value.clone())
                    .or_default()
                    .insert(key.clone());
            }
        }

        for (value, keys) in by_value {
            if &keys == value.entities() {
                continue;
            }

            let (members, strays): (BTreeSet<_>, BTreeSet<_>) =
                keys.into_iter().partition(|k| value.contains(k));
            for stray in strays {
                map.insert(stray.clone(), CopyAbstractValue::new(&stray));
            }

            let repaired = match members.len() {
                0 => continue,
                1 => members
                    .iter()
                    .next()
                    .map(CopyAbstractValue::new)
                    .unwrap_or_else(CopyAbstractValue::unknown),
                _ => CopyAbstractValue::with_kind(members.clone(), value.kind()),
            };
            for member in members {
                map.insert(member, repaired.clone());
            }
        }
    }

    /// Check the consistency rules listed in the module docs
    pub fn validate(map: &CopyAnalysisMap) -> Result<()> {
        for (key, value) in map {
            if key.has_unknown_instance_location() {
                return Err(CopyAnalysisError::invariant(format!(
                    "entity with unknown instance location {} is tracked",
                    key
                )));
            }

            if !value.is_known() {
                if !value.is_empty() {
                    return Err(CopyAnalysisError::invariant(format!(
                        "{} maps to non-known value {} with partners",
                        key, value
                    )));
                }
                continue;
            }

            if !value.contains(key) {
                return Err(CopyAnalysisError::invariant(format!(
                    "{} maps to {} which does not contain it",
                    key, value
                )));
            }

            for partner in value.entities() {
                match map.get(partner) {
                    Some(partner_value) if partner_value == value => {}
                    Some(partner_value) => {
                        return Err(CopyAnalysisError::invariant(format!(
                            "{} maps to {} but its partner {} maps to {}",
                            key, value, partner, partner_value
                        )))
                    }
                    None => {
                        return Err(CopyAnalysisError::invariant(format!(
                            "{} maps to {} but its partner {} is not tracked",
                            key, value, partner
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::copy_analysis::domain::CopyAbstractValueKind;
    use crate::shared::models::{EntityFactory, TypeInfo};

    fn group(entities: &[&AnalysisEntity]) -> (BTreeSet<AnalysisEntity>, CopyAbstractValue) {
        let set: BTreeSet<_> = entities.iter().map(|e| (*e).clone()).collect();
        let value = CopyAbstractValue::with_kind(set.clone(), CopyAbstractValueKind::KnownValueCopy);
        (set, value)
    }

    fn insert(map: &mut CopyAnalysisMap, entities: &[&AnalysisEntity]) {
        let (set, value) = group(entities);
        for e in set {
            map.insert(e, value.clone());
        }
    }

    fn self_default(e: &AnalysisEntity) -> CopyAbstractValue {
        CopyAbstractValue::new(e)
    }

    #[test]
    fn test_merge_keeps_common_partners() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));
        let c = factory.local("M", "c", TypeInfo::value("int"));

        let mut m1 = CopyAnalysisMap::new();
        insert(&mut m1, &[&a, &b, &c]);
        let mut m2 = CopyAnalysisMap::new();
        insert(&mut m2, &[&a, &b]);
        insert(&mut m2, &[&c]);

        let merged = CopyAnalysisMapDomain::merge(&m1, &m2, &self_default, true).unwrap();
        assert_eq!(merged[&a], group(&[&a, &b]).1);
        assert_eq!(merged[&b], group(&[&a, &b]).1);
        assert_eq!(merged[&c], CopyAbstractValue::new(&c));
    }

    #[test]
    fn test_merge_one_sided_uses_default() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));

        let mut m1 = CopyAnalysisMap::new();
        insert(&mut m1, &[&a, &b]);
        let m2 = CopyAnalysisMap::new();

        let merged = CopyAnalysisMapDomain::merge(&m1, &m2, &self_default, true).unwrap();
        assert_eq!(merged[&a], CopyAbstractValue::new(&a));
        assert_eq!(merged[&b], CopyAbstractValue::new(&b));
    }

    #[test]
    fn test_merge_one_sided_group_default() {
        let mut factory = EntityFactory::new();
        let x = factory.local("M", "x", TypeInfo::value("int"));
        let r = factory.local("M", "r", TypeInfo::value("int"));
        let y = factory.local("M", "y", TypeInfo::value("int"));
        let (_, shared) = group(&[&x, &r]);
        let default = |e: &AnalysisEntity| {
            if e == &x || e == &r {
                shared.clone()
            } else {
                CopyAbstractValue::new(e)
            }
        };

        let mut m1 = CopyAnalysisMap::new();
        insert(&mut m1, &[&x, &r, &y]);
        let mut m2 = CopyAnalysisMap::new();
        insert(&mut m2, &[&y]);

        let merged = CopyAnalysisMapDomain::merge(&m1, &m2, &default, true).unwrap();
        assert_eq!(merged[&x], shared);
        assert_eq!(merged[&r], shared);
        assert_eq!(merged[&y], CopyAbstractValue::new(&y));
    }

    #[test]
    fn test_normalize_splits_disagreeing_group() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));
        let c = factory.local("M", "c", TypeInfo::value("int"));

        let mut map = CopyAnalysisMap::new();
        let (_, abc) = group(&[&a, &b, &c]);
        map.insert(a.clone(), abc.clone());
        map.insert(b.clone(), abc);
        map.insert(c.clone(), CopyAbstractValue::new(&c));
        assert!(CopyAnalysisMapDomain::validate(&map).is_err());

        CopyAnalysisMapDomain::normalize(&mut map);
        assert!(CopyAnalysisMapDomain::validate(&map).is_ok());
        assert_eq!(map[&a], group(&[&a, &b]).1);
        assert_eq!(map[&c], CopyAbstractValue::new(&c));
    }

    #[test]
    fn test_validate_reports_missing_self() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));

        let mut map = CopyAnalysisMap::new();
        map.insert(a, CopyAbstractValue::new(&b));
        map.insert(b.clone(), CopyAbstractValue::new(&b));
        assert!(matches!(
            CopyAnalysisMapDomain::validate(&map),
            Err(CopyAnalysisError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_invalid_entries_are_allowed() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let mut map = CopyAnalysisMap::new();
        map.insert(a, CopyAbstractValue::invalid());
        assert!(CopyAnalysisMapDomain::validate(&map).is_ok());
    }
}
