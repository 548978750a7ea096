//! Address-shared entity groups
//!
//! Entities in one group denote the same storage: writing one writes all of
//! them. The copy analysis treats the group as an unbreakable copy set.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::shared::models::AnalysisEntity;

/// Entity → group of entities sharing its address (groups have ≥ 2 members)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressSharedEntities {
    groups: FxHashMap<AnalysisEntity, Arc<BTreeSet<AnalysisEntity>>>,
}

impl AddressSharedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from disjoint groups; singleton groups are ignored
    pub fn from_groups(groups: impl IntoIterator<Item = BTreeSet<AnalysisEntity>>) -> Self {
        let mut map = FxHashMap::default();
        for group in groups {
            if group.len() < 2 {
                continue;
            }
            let shared = Arc::new(group);
            for entity in shared.iter() {
                map.insert(entity.clone(), Arc::clone(&shared));
            }
        }
        Self { groups: map }
    }

    /// Group containing `entity` (including `entity` itself)
    pub fn group_of(&self, entity: &AnalysisEntity) -> Option<&BTreeSet<AnalysisEntity>> {
        self.groups.get(entity).map(|g| g.as_ref())
    }

    /// Whether `entity` shares its address with any other entity
    pub fn is_address_shared(&self, entity: &AnalysisEntity) -> bool {
        self.groups.contains_key(entity)
    }

    /// Distinct groups, in deterministic order
    pub fn groups(&self) -> Vec<BTreeSet<AnalysisEntity>> {
        let distinct: FxHashSet<&BTreeSet<AnalysisEntity>> =
            self.groups.values().map(|g| g.as_ref()).collect();
        let mut groups: Vec<BTreeSet<AnalysisEntity>> = distinct.into_iter().cloned().collect();
        groups.sort();
        groups
    }

    /// Number of entities in some group
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
