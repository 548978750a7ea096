//! Per-block copy analysis state
//!
//! Core data is an entity → copy value map that satisfies the consistency
//! rules of [`CopyAnalysisMapDomain`]. On top of it, predicated data records
//! what holds when a boolean entity is true or false (`c = x == y; if (c)`),
//! to be folded into the core once the branch on that entity is taken.
//!
//! `Invalid` entries only appear inside provably unreachable states; writing
//! one marks the data unreachable.

use std::collections::{BTreeMap, BTreeSet};

use super::abstract_value::{CopyAbstractValue, CopyAbstractValueKind};
use super::map_domain::{CopyAnalysisMap, CopyAnalysisMapDomain};
use super::predicate::PredicateValueKind;
use crate::errors::{CopyAnalysisError, Result};
use crate::shared::models::AnalysisEntity;

/// Facts conditioned on a boolean entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicatedData {
    /// Holds when the entity is true
    pub true_data: Option<CopyAnalysisMap>,

    /// Holds when the entity is false
    pub false_data: Option<CopyAnalysisMap>,
}

impl PredicatedData {
    pub fn is_empty(&self) -> bool {
        self.true_data.is_none() && self.false_data.is_none()
    }

    fn maps_mut(&mut self) -> impl Iterator<Item = &mut CopyAnalysisMap> {
        self.true_data.iter_mut().chain(self.false_data.iter_mut())
    }
}

/// Whether `map` describes an unreachable state
fn is_unreachable_map(map: &CopyAnalysisMap) -> bool {
    map.values()
        .any(|v| v.kind() == CopyAbstractValueKind::Invalid)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyAnalysisData {
    core: CopyAnalysisMap,
    predicated: BTreeMap<AnalysisEntity, PredicatedData>,
    is_reachable: bool,
}

impl Default for CopyAnalysisData {
    fn default() -> Self {
        Self {
            core: CopyAnalysisMap::new(),
            predicated: BTreeMap::new(),
            is_reachable: true,
        }
    }
}

impl CopyAnalysisData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data for a path that can never execute
    pub fn unreachable() -> Self {
        Self {
            is_reachable: false,
            ..Self::default()
        }
    }

    /// Wrap an existing (valid) core map
    pub fn from_core(core: CopyAnalysisMap) -> Self {
        let is_reachable = !is_unreachable_map(&core);
        Self {
            core,
            predicated: BTreeMap::new(),
            is_reachable,
        }
    }

    pub fn core(&self) -> &CopyAnalysisMap {
        &self.core
    }

    pub fn into_core(self) -> CopyAnalysisMap {
        self.core
    }

    pub fn get(&self, entity: &AnalysisEntity) -> Option<&CopyAbstractValue> {
        self.core.get(entity)
    }

    pub fn contains(&self, entity: &AnalysisEntity) -> bool {
        self.core.contains_key(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &AnalysisEntity> {
        self.core.keys()
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn is_reachable(&self) -> bool {
        self.is_reachable
    }

    pub fn mark_unreachable(&mut self) {
        self.is_reachable = false;
    }

    /// Write `value` for every member of `value`.
    ///
    /// The assigned entity loses the predicated data it was tracking, and
    /// every written entity is removed from all overlays (the new value is
    /// unconditional). A value without members (`Invalid`, `NotApplicable`)
    /// is written for `entity_being_assigned` alone.
    pub fn set_abstract_value_for_entities(
        &mut self,
        value: &CopyAbstractValue,
        entity_being_assigned: Option<&AnalysisEntity>,
    ) {
        if let Some(assigned) = entity_being_assigned {
            if self.has_predicated_data_for_entity(assigned) {
                self.stop_tracking_predicated_data(assigned);
            }
        }

        if value.is_empty() {
            if let Some(assigned) = entity_being_assigned {
                self.remove_entry_in_predicated_data(assigned);
                if value.kind() == CopyAbstractValueKind::Invalid {
                    self.is_reachable = false;
                }
                self.core.insert(assigned.clone(), value.clone());
            }
            return;
        }

        self.detach_from_previous_groups(value);
        for entity in value.entities() {
            self.remove_entry_in_predicated_data(entity);
            self.core.insert(entity.clone(), value.clone());
        }
    }

    /// Shrink every group that loses members to `value`, so that the
    /// members left behind agree on a smaller value
    fn detach_from_previous_groups(&mut self, value: &CopyAbstractValue) {
        let mut stale: Vec<CopyAbstractValue> = Vec::new();
        for member in value.entities() {
            if let Some(previous) = self.core.get(member) {
                if previous.is_known()
                    && previous != value
                    && !previous.entities().is_subset(value.entities())
                    && !stale.contains(previous)
                {
                    stale.push(previous.clone());
                }
            }
        }

        for previous in stale {
            let rest: BTreeSet<AnalysisEntity> = previous
                .entities()
                .difference(value.entities())
                .cloned()
                .collect();
            let shrunk = match rest.len() {
                0 => continue,
                1 => rest
                    .iter()
                    .next()
                    .map(CopyAbstractValue::new)
                    .unwrap_or_else(CopyAbstractValue::unknown),
                _ => CopyAbstractValue::with_kind(rest.clone(), previous.kind()),
            };
            for entity in rest {
                self.core.insert(entity, shrunk.clone());
            }
        }
    }

    /// Replace the core with `core` (e.g. the state after a call); entities
    /// whose value changes or disappears leave every overlay
    pub fn replace_core(&mut self, core: CopyAnalysisMap) {
        let changed: Vec<AnalysisEntity> = core
            .iter()
            .filter(|(entity, value)| self.core.get(*entity) != Some(*value))
            .map(|(entity, _)| entity.clone())
            .chain(
                self.core
                    .keys()
                    .filter(|entity| !core.contains_key(*entity))
                    .cloned(),
            )
            .collect();
        for entity in &changed {
            self.remove_entry_in_predicated_data(entity);
        }
        if is_unreachable_map(&core) {
            self.is_reachable = false;
        }
        self.core = core;
    }

    /// Single-entity writes would break partner consistency
    pub fn set_abstract_value(
        &mut self,
        _entity: &AnalysisEntity,
        _value: CopyAbstractValue,
    ) -> Result<()> {
        Err(CopyAnalysisError::invalid_operation(
            "use the multi-entity setter set_abstract_value_for_entities",
        ))
    }

    /// Remove `entity` from every overlay, shrinking its partners' entries
    pub fn remove_entry_in_predicated_data(&mut self, entity: &AnalysisEntity) {
        for data in self.predicated.values_mut() {
            for map in data.maps_mut() {
                Self::remove_from_overlay(map, entity);
            }
        }
    }

    fn remove_from_overlay(map: &mut CopyAnalysisMap, entity: &AnalysisEntity) {
        let Some(value) = map.remove(entity) else {
            return;
        };
        if value.len() < 2 || !value.contains(entity) {
            return;
        }

        let remaining = value.with_entity_removed(entity);
        if remaining.len() == 1 {
            for partner in remaining.entities() {
                map.remove(partner);
            }
        } else {
            for partner in remaining.entities() {
                map.insert(partner.clone(), remaining.clone());
            }
        }
    }

    /// Fold `predicated` facts into `core`.
    ///
    /// Knowledge only grows: every predicated entity ends up in a set that
    /// contains its previous core set, the predicated partners, and the core
    /// sets of those partners.
    pub fn apply_predicated_data(core: &mut CopyAnalysisMap, predicated: &CopyAnalysisMap) {
        for (key, predicated_value) in predicated {
            if !predicated_value.is_known() {
                continue;
            }

            let (mut entities, mut kind) = match core.get(key) {
                Some(current) if current.is_known() => (current.entities().clone(), current.kind()),
                _ => (
                    std::iter::once(key.clone()).collect::<BTreeSet<_>>(),
                    predicated_value.kind(),
                ),
            };

            for partner in predicated_value.entities() {
                match core.get(partner) {
                    Some(partner_value) if partner_value.is_known() => {
                        entities.extend(partner_value.entities().iter().cloned());
                        kind = kind.merge_if_both_known(partner_value.kind());
                    }
                    _ => {
                        entities.insert(partner.clone());
                    }
                }
            }
            kind = kind.merge_if_both_known(predicated_value.kind());

            let merged = CopyAbstractValue::with_kind(entities, kind);
            for entity in merged.entities() {
                core.insert(entity.clone(), merged.clone());
            }
        }
    }

    /// Replace every core value through `get_reset_value`; drops all
    /// predicated data
    pub fn reset(
        &mut self,
        get_reset_value: impl Fn(&AnalysisEntity, &CopyAbstractValue) -> CopyAbstractValue,
    ) {
        for (entity, value) in self.core.iter_mut() {
            *value = get_reset_value(entity, &*value);
        }
        self.predicated.clear();
        CopyAnalysisMapDomain::normalize(&mut self.core);
    }

    /// Drop every entry whose key matches `predicate`, shrinking the groups
    /// they belonged to (core and overlays)
    pub fn remove_entries(&mut self, predicate: impl Fn(&AnalysisEntity) -> bool) {
        let removed: BTreeSet<AnalysisEntity> =
            self.core.keys().filter(|&e| predicate(e)).cloned().collect();
        self.core.retain(|e, _| !removed.contains(e));
        for (key, value) in self.core.iter_mut() {
            if value.entities().iter().any(|e| predicate(e)) {
                let remaining: BTreeSet<_> =
                    value.entities().iter().filter(|&e| !predicate(e)).cloned().collect();
                *value = if remaining.len() > 1 {
                    CopyAbstractValue::with_kind(remaining, value.kind())
                } else {
                    CopyAbstractValue::new(key)
                };
            }
        }

        self.predicated.retain(|key, _| !predicate(key));
        for data in self.predicated.values_mut() {
            for map in data.maps_mut() {
                let doomed: Vec<AnalysisEntity> =
                    map.keys().filter(|&e| predicate(e)).cloned().collect();
                for entity in doomed {
                    Self::remove_from_overlay(map, &entity);
                }
            }
        }
        self.predicated.retain(|_, data| !data.is_empty());
    }

    /// Core facts carried onto an exception edge. Members of an entity that
    /// is itself tracked are dropped; predicated data is not carried.
    pub fn exception_path_snapshot(&self) -> CopyAnalysisData {
        let tracked: BTreeSet<&AnalysisEntity> = self.core.keys().collect();
        let doomed: BTreeSet<AnalysisEntity> = self
            .core
            .keys()
            .filter(|e| e.ancestors().any(|a| tracked.contains(a)))
            .cloned()
            .collect();

        let mut snapshot = CopyAnalysisData::from_core(self.core.clone());
        snapshot.remove_entries(|e| doomed.contains(e));
        snapshot
    }

    /// Record what holds when `entity` is true / false
    pub fn start_tracking_predicated_data(
        &mut self,
        entity: &AnalysisEntity,
        true_data: Option<CopyAnalysisMap>,
        false_data: Option<CopyAnalysisMap>,
    ) {
        let data = PredicatedData {
            true_data,
            false_data,
        };
        if data.is_empty() {
            self.predicated.remove(entity);
        } else {
            self.predicated.insert(entity.clone(), data);
        }
    }

    pub fn stop_tracking_predicated_data(&mut self, entity: &AnalysisEntity) {
        self.predicated.remove(entity);
    }

    pub fn has_predicated_data_for_entity(&self, entity: &AnalysisEntity) -> bool {
        self.predicated.contains_key(entity)
    }

    pub fn predicated_data(&self, entity: &AnalysisEntity) -> Option<&PredicatedData> {
        self.predicated.get(entity)
    }

    /// Entities with predicated data
    pub fn predicated_entities(&self) -> impl Iterator<Item = &AnalysisEntity> {
        self.predicated.keys()
    }

    /// Fold the facts recorded for `entity == true_data` into the core.
    ///
    /// Returns `AlwaysFalse` (`AlwaysTrue` for the false side) when those
    /// facts describe an unreachable state, `Unknown` otherwise.
    pub fn apply_predicated_data_for_entity(
        &mut self,
        entity: &AnalysisEntity,
        true_data: bool,
    ) -> PredicateValueKind {
        let Some(data) = self.predicated.get(entity) else {
            return PredicateValueKind::Unknown;
        };
        let chosen = if true_data {
            data.true_data.as_ref()
        } else {
            data.false_data.as_ref()
        };
        let Some(map) = chosen.cloned() else {
            return PredicateValueKind::Unknown;
        };

        if is_unreachable_map(&map) {
            return if true_data {
                PredicateValueKind::AlwaysFalse
            } else {
                PredicateValueKind::AlwaysTrue
            };
        }

        Self::apply_predicated_data(&mut self.core, &map);
        PredicateValueKind::Unknown
    }

    /// Join of two states.
    ///
    /// An unreachable side contributes nothing. Core maps are joined by the
    /// map domain; predicated data survives only for entities tracked on
    /// both sides.
    pub fn merge(
        data1: &CopyAnalysisData,
        data2: &CopyAnalysisData,
        default_value: &dyn Fn(&AnalysisEntity) -> CopyAbstractValue,
        validate: bool,
    ) -> Result<CopyAnalysisData> {
        if !data1.is_reachable {
            return Ok(data2.clone());
        }
        if !data2.is_reachable {
            return Ok(data1.clone());
        }

        let core = CopyAnalysisMapDomain::merge(&data1.core, &data2.core, default_value, validate)?;

        let self_default = |e: &AnalysisEntity| CopyAbstractValue::new(e);
        let merge_overlay = |m1: &Option<CopyAnalysisMap>,
                             m2: &Option<CopyAnalysisMap>|
         -> Result<Option<CopyAnalysisMap>> {
            match (m1, m2) {
                (Some(m1), Some(m2)) => Ok(Some(CopyAnalysisMapDomain::merge(
                    m1,
                    m2,
                    &self_default,
                    validate,
                )?)),
                _ => Ok(None),
            }
        };

        let mut predicated = BTreeMap::new();
        for (entity, p1) in &data1.predicated {
            let Some(p2) = data2.predicated.get(entity) else {
                continue;
            };
            let merged = PredicatedData {
                true_data: merge_overlay(&p1.true_data, &p2.true_data)?,
                false_data: merge_overlay(&p1.false_data, &p2.false_data)?,
            };
            if !merged.is_empty() {
                predicated.insert(entity.clone(), merged);
            }
        }

        Ok(CopyAnalysisData {
            core,
            predicated,
            is_reachable: true,
        })
    }

    /// Check the consistency rules on the core and every overlay.
    ///
    /// Unreachable data carries no facts and always passes.
    pub fn assert_valid(&self) -> Result<()> {
        if !self.is_reachable {
            return Ok(());
        }
        if let Some((entity, _)) = self
            .core
            .iter()
            .find(|(_, v)| v.kind() == CopyAbstractValueKind::Invalid)
        {
            return Err(CopyAnalysisError::invariant(format!(
                "reachable data holds an invalid value for {}",
                entity
            )));
        }
        CopyAnalysisMapDomain::validate(&self.core)?;

        for (entity, data) in &self.predicated {
            if entity.has_unknown_instance_location() {
                return Err(CopyAnalysisError::invariant(format!(
                    "predicated data tracked for {} with unknown instance location",
                    entity
                )));
            }
            if let Some(map) = &data.true_data {
                CopyAnalysisMapDomain::validate(map)?;
            }
            if let Some(map) = &data.false_data {
                CopyAnalysisMapDomain::validate(map)?;
            }
        }
        Ok(())
    }

    /// [`assert_valid`](Self::assert_valid) in debug builds or strict mode
    #[inline]
    pub fn debug_assert_valid(&self, strict: bool) -> Result<()> {
        if strict || cfg!(debug_assertions) {
            self.assert_valid()
        } else {
            Ok(())
        }
    }
}
