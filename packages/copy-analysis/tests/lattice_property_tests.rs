//! Property-based tests for the copy lattice
//!
//! Invariants that must hold for ALL values:
//! - Join is commutative and idempotent
//! - `Invalid` is the identity of the join, `Unknown` absorbs
//! - Joining two known values never invents copies
//! - Joined maps stay consistent (every group agrees on one value)

use copy_analysis::features::copy_analysis::domain::{
    CopyAbstractValue, CopyAbstractValueDomain, CopyAbstractValueKind, CopyAnalysisMap,
    CopyAnalysisMapDomain,
};
use copy_analysis::shared::models::{AnalysisEntity, EntityFactory, TypeInfo};
use proptest::prelude::*;
use quickcheck_macros::quickcheck;
use std::collections::BTreeSet;

const POOL: usize = 6;

fn pool() -> Vec<AnalysisEntity> {
    let mut factory = EntityFactory::new();
    (0..POOL)
        .map(|i| factory.local("M", &format!("v{i}"), TypeInfo::value("int")))
        .collect()
}

fn subset(entities: &[AnalysisEntity], mask: u8) -> BTreeSet<AnalysisEntity> {
    entities
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, e)| e.clone())
        .collect()
}

/// selector 0 => NotApplicable, 1 => Invalid, 2 => Unknown, otherwise a
/// known copy set drawn from `mask`
fn value(entities: &[AnalysisEntity], selector: u8, mask: u8) -> CopyAbstractValue {
    match selector % 6 {
        0 => CopyAbstractValue::not_applicable(),
        1 => CopyAbstractValue::invalid(),
        2 => CopyAbstractValue::unknown(),
        _ => {
            let members = subset(entities, mask | 1);
            CopyAbstractValue::with_kind(members, CopyAbstractValueKind::KnownValueCopy)
        }
    }
}

/// Map in which entity `i` belongs to group `groups[i]`
fn partition_map(entities: &[AnalysisEntity], groups: &[u8]) -> CopyAnalysisMap {
    let mut map = CopyAnalysisMap::new();
    for group in 0..4u8 {
        let members: BTreeSet<AnalysisEntity> = entities
            .iter()
            .zip(groups)
            .filter(|(_, g)| **g % 4 == group)
            .map(|(e, _)| e.clone())
            .collect();
        let value = match members.len() {
            0 => continue,
            1 => members.iter().next().map(CopyAbstractValue::new).unwrap(),
            _ => CopyAbstractValue::with_kind(members.clone(), CopyAbstractValueKind::KnownValueCopy),
        };
        for member in members {
            map.insert(member, value.clone());
        }
    }
    map
}

proptest! {
    #[test]
    fn prop_merge_commutative(s1 in any::<u8>(), m1 in any::<u8>(), s2 in any::<u8>(), m2 in any::<u8>()) {
        let entities = pool();
        let v1 = value(&entities, s1, m1);
        let v2 = value(&entities, s2, m2);
        prop_assert_eq!(
            CopyAbstractValueDomain::merge(&v1, &v2),
            CopyAbstractValueDomain::merge(&v2, &v1)
        );
    }

    #[test]
    fn prop_merge_idempotent(s in any::<u8>(), m in any::<u8>()) {
        let entities = pool();
        let v = value(&entities, s, m);
        prop_assert_eq!(CopyAbstractValueDomain::merge(&v, &v), v);
    }

    #[test]
    fn prop_invalid_identity_unknown_absorbs(s in any::<u8>(), m in any::<u8>()) {
        let entities = pool();
        let v = value(&entities, s, m);
        prop_assert_eq!(CopyAbstractValueDomain::merge(&v, &CopyAbstractValue::invalid()), v.clone());
        if v.kind() != CopyAbstractValueKind::Invalid {
            prop_assert_eq!(
                CopyAbstractValueDomain::merge(&v, &CopyAbstractValue::unknown()),
                CopyAbstractValue::unknown()
            );
        }
    }

    #[test]
    fn prop_known_merge_is_intersection(m1 in any::<u8>(), m2 in any::<u8>()) {
        let entities = pool();
        let v1 = value(&entities, 3, m1);
        let v2 = value(&entities, 3, m2);
        let merged = CopyAbstractValueDomain::merge(&v1, &v2);
        if merged.is_known() {
            prop_assert!(merged.entities().is_subset(v1.entities()));
            prop_assert!(merged.entities().is_subset(v2.entities()));
        } else {
            prop_assert!(v1.entities().is_disjoint(v2.entities()));
        }
    }

    #[test]
    fn prop_map_merge_intersects_partitions(
        g1 in proptest::collection::vec(0u8..4, POOL),
        g2 in proptest::collection::vec(0u8..4, POOL),
    ) {
        let entities = pool();
        let map1 = partition_map(&entities, &g1);
        let map2 = partition_map(&entities, &g2);
        let merged = CopyAnalysisMapDomain::merge(&map1, &map2, &CopyAbstractValue::new, true).unwrap();

        prop_assert!(CopyAnalysisMapDomain::validate(&merged).is_ok());
        for (i, a) in entities.iter().enumerate() {
            for (j, b) in entities.iter().enumerate() {
                let together = merged.get(a).is_some_and(|v| v.contains(b));
                prop_assert_eq!(together, g1[i] == g1[j] && g2[i] == g2[j]);
            }
        }
    }
}

#[quickcheck]
fn qc_map_merge_commutative(g1: Vec<u8>, g2: Vec<u8>) -> bool {
    let entities = pool();
    let pad = |g: Vec<u8>| -> Vec<u8> { g.into_iter().chain(std::iter::repeat(0)).take(POOL).collect() };
    let map1 = partition_map(&entities, &pad(g1));
    let map2 = partition_map(&entities, &pad(g2));

    let left = CopyAnalysisMapDomain::merge(&map1, &map2, &CopyAbstractValue::new, false);
    let right = CopyAnalysisMapDomain::merge(&map2, &map1, &CopyAbstractValue::new, false);
    matches!((left, right), (Ok(l), Ok(r)) if l == r)
}

#[quickcheck]
fn qc_normalize_idempotent(groups: Vec<u8>) -> bool {
    let entities = pool();
    let groups: Vec<u8> = groups.into_iter().chain(std::iter::repeat(1)).take(POOL).collect();
    let mut map = partition_map(&entities, &groups);
    CopyAnalysisMapDomain::normalize(&mut map);
    let once = map.clone();
    CopyAnalysisMapDomain::normalize(&mut map);
    map == once
}
