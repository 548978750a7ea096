//! Address-sharing analyzer
//!
//! Scans a CFG for `ref` assignments and groups the entities that end up
//! naming the same storage. This is the only part of points-to the copy
//! analysis consumes.
//!
//! # Usage
//! ```text
//! let analyzer = AddressSharingAnalyzer::new(PointsToAnalysisKind::Complete);
//! let result = analyzer.analyze(&cfg);
//! result.address_shared.group_of(&x);
//! ```

use tracing::debug;

use crate::config::PointsToAnalysisKind;
use crate::features::flow_graph::domain::{ControlFlowGraph, Operation, Terminator};
use crate::features::points_to::domain::AddressSharedEntities;
use crate::features::points_to::infrastructure::EntityUnionFind;
use crate::shared::models::AnalysisEntity;

/// Points-to facts handed to the copy analysis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsToAnalysisResult {
    pub address_shared: AddressSharedEntities,

    /// `ref` assignments that were recorded
    pub ref_assignments: usize,

    /// `ref` assignments skipped because of the configured kind
    pub skipped: usize,
}

pub struct AddressSharingAnalyzer {
    kind: PointsToAnalysisKind,
}

impl AddressSharingAnalyzer {
    pub fn new(kind: PointsToAnalysisKind) -> Self {
        Self { kind }
    }

    /// Whether `kind` lets `entity` take part in address sharing
    fn tracks(&self, entity: &AnalysisEntity) -> bool {
        if entity.has_unknown_instance_location() {
            return false;
        }
        match self.kind {
            PointsToAnalysisKind::None => false,
            PointsToAnalysisKind::PartialWithoutTrackingFieldsAndProperties => !entity.is_child(),
            PointsToAnalysisKind::Complete => true,
        }
    }

    /// Compute address-shared groups of `cfg`
    pub fn analyze(&self, cfg: &ControlFlowGraph) -> PointsToAnalysisResult {
        self.analyze_with(cfg, std::iter::empty())
    }

    /// Compute address-shared groups of `cfg`, seeded with extra pairs (e.g.
    /// a `ref` parameter and the caller's argument)
    pub fn analyze_with<'a>(
        &self,
        cfg: &ControlFlowGraph,
        seeds: impl IntoIterator<Item = (&'a AnalysisEntity, &'a AnalysisEntity)>,
    ) -> PointsToAnalysisResult {
        let mut result = PointsToAnalysisResult::default();
        if self.kind == PointsToAnalysisKind::None {
            return result;
        }

        let mut sets = EntityUnionFind::new();
        for (a, b) in seeds {
            if self.tracks(a) && self.tracks(b) {
                sets.union(a, b);
            }
        }

        for block in &cfg.blocks {
            for op in &block.operations {
                self.collect(op, &mut sets, &mut result);
            }
            match &block.terminator {
                Terminator::Branch { condition, .. } => self.collect(condition, &mut sets, &mut result),
                Terminator::Return(Some(op)) | Terminator::Throw(Some(op)) => {
                    self.collect(op, &mut sets, &mut result)
                }
                _ => {}
            }
        }

        result.address_shared = AddressSharedEntities::from_groups(sets.groups());
        debug!(
            method = cfg.name(),
            groups = result.address_shared.groups().len(),
            ref_assignments = result.ref_assignments,
            skipped = result.skipped,
            "Address sharing computed"
        );
        result
    }

    fn collect(
        &self,
        op: &Operation,
        sets: &mut EntityUnionFind,
        result: &mut PointsToAnalysisResult,
    ) {
        match op {
            Operation::RefAssignment { target, source } => {
                if self.tracks(target) && self.tracks(source) {
                    sets.union(target, source);
                    result.ref_assignments += 1;
                } else {
                    result.skipped += 1;
                }
            }
            Operation::Assignment { value, .. } => self.collect(value, sets, result),
            Operation::Conversion { operand, .. } | Operation::IsNull { operand, .. } => {
                self.collect(operand, sets, result)
            }
            Operation::Comparison { left, right, .. } => {
                self.collect(left, sets, result);
                self.collect(right, sets, result);
            }
            Operation::Invocation { arguments, .. } => {
                for arg in arguments {
                    self.collect(&arg.value, sets, result);
                }
            }
            Operation::Reference(_) | Operation::Literal(_) | Operation::Opaque(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::domain::MethodSignature;
    use crate::features::flow_graph::infrastructure::CfgBuilder;
    use crate::shared::models::{EntityFactory, TypeInfo};

    fn cfg_with(ops: Vec<Operation>) -> ControlFlowGraph {
        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let body = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, body);
        for op in ops {
            builder.push(body, op);
        }
        builder.ret(body, None);
        builder.build().unwrap()
    }

    #[test]
    fn test_ref_assignment_groups() {
        let mut factory = EntityFactory::new();
        let x = factory.local("M", "x", TypeInfo::value("int"));
        let r = factory.local("M", "r", TypeInfo::value("int"));
        let s = factory.local("M", "s", TypeInfo::value("int"));
        let cfg = cfg_with(vec![Operation::ref_assign(&r, &x), Operation::ref_assign(&s, &r)]);

        let result = AddressSharingAnalyzer::new(PointsToAnalysisKind::Complete).analyze(&cfg);
        let group = result.address_shared.group_of(&x).unwrap();
        assert_eq!(group.len(), 3);
        assert!(group.contains(&s));
        assert_eq!(result.ref_assignments, 2);
    }

    #[test]
    fn test_partial_kind_skips_fields() {
        let mut factory = EntityFactory::new();
        let o = factory.local("M", "o", TypeInfo::reference("T"));
        let f = factory.field(&o, "f", TypeInfo::value("int"));
        let r = factory.local("M", "r", TypeInfo::value("int"));
        let cfg = cfg_with(vec![Operation::ref_assign(&r, &f)]);

        let partial =
            AddressSharingAnalyzer::new(PointsToAnalysisKind::PartialWithoutTrackingFieldsAndProperties)
                .analyze(&cfg);
        assert!(partial.address_shared.is_empty());
        assert_eq!(partial.skipped, 1);

        let complete = AddressSharingAnalyzer::new(PointsToAnalysisKind::Complete).analyze(&cfg);
        assert!(complete.address_shared.is_address_shared(&f));
    }

    #[test]
    fn test_none_kind_is_empty() {
        let mut factory = EntityFactory::new();
        let x = factory.local("M", "x", TypeInfo::value("int"));
        let r = factory.local("M", "r", TypeInfo::value("int"));
        let cfg = cfg_with(vec![Operation::ref_assign(&r, &x)]);

        let result = AddressSharingAnalyzer::new(PointsToAnalysisKind::None).analyze(&cfg);
        assert!(result.address_shared.is_empty());
    }

    #[test]
    fn test_seeded_pairs() {
        let mut factory = EntityFactory::new();
        let p = factory.parameter("M", "p", 0, TypeInfo::value("int"));
        let arg = factory.local("Caller", "a", TypeInfo::value("int"));
        let cfg = cfg_with(vec![]);

        let result = AddressSharingAnalyzer::new(PointsToAnalysisKind::Complete)
            .analyze_with(&cfg, [(&p, &arg)]);
        assert!(result.address_shared.is_address_shared(&arg));
    }
}
