//! Analysis results exposed to consumers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::abstract_value::CopyAbstractValue;
use super::map_domain::CopyAnalysisMap;
use super::predicate::PredicateValueKind;
use crate::features::flow_graph::domain::BlockId;
use crate::shared::models::AnalysisEntity;

/// Serializes an entity-keyed map as a list of `(entity, value)` entries
/// (entities are structured and cannot be JSON object keys)
mod entry_list {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(map: &CopyAnalysisMap, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CopyAnalysisMap, D::Error> {
        let entries: Vec<(AnalysisEntity, CopyAbstractValue)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Immutable per-block snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyBlockAnalysisResult {
    #[serde(with = "entry_list")]
    data: CopyAnalysisMap,
    is_reachable: bool,
}

impl CopyBlockAnalysisResult {
    pub fn new(data: CopyAnalysisMap, is_reachable: bool) -> Self {
        Self { data, is_reachable }
    }

    pub fn data(&self) -> &CopyAnalysisMap {
        &self.data
    }

    pub fn get(&self, entity: &AnalysisEntity) -> Option<&CopyAbstractValue> {
        self.data.get(entity)
    }

    pub fn is_reachable(&self) -> bool {
        self.is_reachable
    }
}

/// Return value facts of an analyzed method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValueAndPredicateKind {
    pub value: CopyAbstractValue,

    /// Verdict of a boolean return value (`Unknown` unless every return agrees)
    pub predicate_kind: PredicateValueKind,
}

/// Result of one `CopyAnalysis` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyAnalysisResult {
    pub method: String,

    /// Output state of every block
    pub blocks: BTreeMap<BlockId, CopyBlockAnalysisResult>,

    /// Input state of the exit block
    pub exit: CopyBlockAnalysisResult,

    /// `None` for void methods
    pub return_value: Option<ReturnValueAndPredicateKind>,

    /// Verdicts of branch conditions, by the block ending in the branch
    pub predicate_kinds: BTreeMap<BlockId, PredicateValueKind>,

    /// State with which exceptions leave the method (`None` when no
    /// exception escapes or exception paths are not analyzed)
    pub unhandled_exception: Option<CopyBlockAnalysisResult>,

    /// Blocks processed by the solver
    pub iterations: usize,
}

impl CopyAnalysisResult {
    pub fn block(&self, id: BlockId) -> Option<&CopyBlockAnalysisResult> {
        self.blocks.get(&id)
    }

    pub fn predicate_kind(&self, id: BlockId) -> PredicateValueKind {
        self.predicate_kinds.get(&id).copied().unwrap_or_default()
    }
}
