//! Copy dataflow operation visitor
//!
//! Transfer functions of the copy analysis. The solver hands every block's
//! input state to [`CopyDataFlowOperationVisitor::visit_block`], which walks
//! the block's operations and updates the current [`CopyAnalysisData`].
//!
//! All writes go through [`set_abstract_value`], which keeps copy groups
//! consistent: an assigned entity leaves its old group, joins the group of
//! the assigned value, and drags its address-shared partners along.

use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use super::interprocedural::{self, AnalysisSession};
use super::summary_cache::InterproceduralSummary;
use crate::config::CopyAnalysisConfig;
use crate::errors::Result;
use crate::features::copy_analysis::application::context::{ArgumentInfo, CopyAnalysisContext};
use crate::features::copy_analysis::domain::{
    CopyAbstractValue, CopyAbstractValueDomain, CopyAbstractValueKind, CopyAnalysisData,
    CopyAnalysisMap, CopyAnalysisMapDomain, PredicateValueKind, ReturnValueAndPredicateKind,
};
use crate::features::flow_graph::domain::{
    Argument, BasicBlock, BlockId, CallTarget, ComparisonKind, ConditionKind, ControlFlowGraph,
    ConversionKind, Operation, Terminator,
};
use crate::features::points_to::AddressSharedEntities;
use crate::shared::models::{AnalysisEntity, TypeInfo};

/// Comparison a predicate write is learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateCompare {
    /// `==` on values: equal, not necessarily the same reference
    Value,

    /// Reference identity
    Reference,
}

/// Address-sharing facts of the analyzed method
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressSharing<'a> {
    shared: Option<&'a AddressSharedEntities>,
}

impl<'a> AddressSharing<'a> {
    pub fn new(shared: Option<&'a AddressSharedEntities>) -> Self {
        Self { shared }
    }

    /// Copy value of the storage `entity` shares with other entities
    pub fn address_shared_copy_value(&self, entity: &AnalysisEntity) -> Option<CopyAbstractValue> {
        let group = self.shared?.group_of(entity)?;
        Some(CopyAbstractValue::with_reference_copy(group.clone(), true))
    }

    /// Value of an entity that has no entry: its address-shared group, or
    /// itself alone
    pub fn default_copy_value(&self, entity: &AnalysisEntity) -> CopyAbstractValue {
        self.address_shared_copy_value(entity)
            .unwrap_or_else(|| CopyAbstractValue::new(entity))
    }

    pub fn groups(&self) -> Vec<BTreeSet<AnalysisEntity>> {
        self.shared.map(|s| s.groups()).unwrap_or_default()
    }
}

/// Assign `value` to `entity` in `data`.
///
/// 1. entities that cannot be tracked are skipped
/// 2. entities with unknown instance location are dropped from `value`
/// 3. outside predicates, an unchanged value is a no-op; otherwise the
///    entity (with its address-shared partners) leaves its old group
/// 4. the entity joins `value`
/// 5. predicate writes keep the entity's existing partners, plain writes
///    add its address-shared partners
/// 6. the result is written for every member
pub fn set_abstract_value(
    data: &mut CopyAnalysisData,
    entity: &AnalysisEntity,
    value: CopyAbstractValue,
    sharing: AddressSharing<'_>,
    from_predicate: Option<PredicateCompare>,
    initializing_parameters: bool,
) {
    if entity.has_unknown_instance_location() || !entity.ty().is_trackable() {
        return;
    }

    let value = if value.entities().iter().any(|e| e.has_unknown_instance_location()) {
        let kept: BTreeSet<AnalysisEntity> = value
            .entities()
            .iter()
            .filter(|e| !e.has_unknown_instance_location())
            .cloned()
            .collect();
        CopyAbstractValue::with_kind(kept, value.kind())
    } else {
        value
    };

    if from_predicate.is_none() {
        if let Some(existing) = data.get(entity).cloned() {
            if existing == value {
                return;
            }

            if !initializing_parameters && existing.is_known() && existing.len() > 1 {
                let shared = sharing.address_shared_copy_value(entity);
                if shared.as_ref() != Some(&existing) {
                    let leaving: Vec<&AnalysisEntity> = match &shared {
                        Some(group) => group
                            .entities()
                            .iter()
                            .filter(|e| existing.contains(e))
                            .collect(),
                        None => vec![entity],
                    };
                    if !leaving.is_empty() && leaving.len() < existing.len() {
                        let rest = existing.with_entities_removed(leaving);
                        data.set_abstract_value_for_entities(&rest, None);
                    }
                }
            }
        }
    }

    let mut entities = value.entities().clone();
    let mut kind = if entities.contains(entity) {
        value.kind()
    } else {
        entities.insert(entity.clone());
        if entities.len() == 1 {
            CopyAbstractValue::new(entity).kind()
        } else if from_predicate != Some(PredicateCompare::Value)
            && entity.ty().is_reference_type()
            && value.kind() == CopyAbstractValueKind::KnownReferenceCopy
        {
            CopyAbstractValueKind::KnownReferenceCopy
        } else {
            CopyAbstractValueKind::KnownValueCopy
        }
    };

    if from_predicate.is_some() {
        if let Some(existing) = data.get(entity) {
            if existing.is_known() {
                entities.extend(existing.entities().iter().cloned());
                kind = kind.merge_if_both_known(existing.kind());
            }
        }
    } else if let Some(shared) = sharing.address_shared_copy_value(entity) {
        entities.extend(shared.entities().iter().cloned());
    }

    let new_value = CopyAbstractValue::with_kind(entities, kind);
    data.set_abstract_value_for_entities(&new_value, Some(entity));
}

/// `value` without entities owned by `method` (its locals, parameters,
/// flow captures and their members)
pub fn strip_owned_entities(value: &CopyAbstractValue, method: &str) -> CopyAbstractValue {
    if !value.is_known() || !value.entities().iter().any(|e| e.is_owned_by(method)) {
        return value.clone();
    }
    let remaining: BTreeSet<AnalysisEntity> = value
        .entities()
        .iter()
        .filter(|e| !e.is_owned_by(method))
        .cloned()
        .collect();
    match remaining.len() {
        0 => CopyAbstractValue::unknown(),
        1 => remaining
            .iter()
            .next()
            .map(CopyAbstractValue::new)
            .unwrap_or_else(CopyAbstractValue::unknown),
        _ => CopyAbstractValue::with_kind(remaining, value.kind()),
    }
}

/// Whether `verdict` rules out the `branch` side of a condition
fn is_infeasible(verdict: PredicateValueKind, branch: ConditionKind) -> bool {
    matches!(
        (verdict, branch),
        (PredicateValueKind::AlwaysFalse, ConditionKind::WhenTrue)
            | (PredicateValueKind::AlwaysTrue, ConditionKind::WhenFalse)
    )
}

/// State leaving a block
#[derive(Debug, Clone)]
pub struct BlockOutput {
    /// Normal-flow state (before branch refinement)
    pub data: CopyAnalysisData,

    /// State with which an exception may leave the block
    pub exception: Option<CopyAnalysisData>,
}

pub struct CopyDataFlowOperationVisitor<'a, 'p> {
    context: &'a CopyAnalysisContext,
    cfg: &'a ControlFlowGraph,
    session: &'a mut AnalysisSession<'p>,
    sharing: AddressSharing<'a>,
    current: CopyAnalysisData,
    exception: Option<CopyAnalysisData>,
    return_values: BTreeMap<BlockId, ReturnValueAndPredicateKind>,
    predicate_kinds: BTreeMap<BlockId, PredicateValueKind>,
}

impl<'a, 'p> CopyDataFlowOperationVisitor<'a, 'p> {
    pub fn new(
        context: &'a CopyAnalysisContext,
        cfg: &'a ControlFlowGraph,
        session: &'a mut AnalysisSession<'p>,
    ) -> Self {
        let sharing = AddressSharing::new(context.points_to().map(|p| &p.address_shared));
        Self {
            context,
            cfg,
            session,
            sharing,
            current: CopyAnalysisData::new(),
            exception: None,
            return_values: BTreeMap::new(),
            predicate_kinds: BTreeMap::new(),
        }
    }

    fn config(&self) -> &CopyAnalysisConfig {
        self.context.config()
    }

    fn validate(&self) -> bool {
        self.config().strict_validation || cfg!(debug_assertions)
    }

    pub fn default_copy_value(&self, entity: &AnalysisEntity) -> CopyAbstractValue {
        self.sharing.default_copy_value(entity)
    }

    /// Join of two states reaching the same point
    pub fn merge(&self, data1: &CopyAnalysisData, data2: &CopyAnalysisData) -> Result<CopyAnalysisData> {
        let sharing = self.sharing;
        CopyAnalysisData::merge(
            data1,
            data2,
            &|e: &AnalysisEntity| sharing.default_copy_value(e),
            self.validate(),
        )
    }

    /// Forget every multi-entity copy set except address sharing
    pub fn widen(&self, mut data: CopyAnalysisData) -> CopyAnalysisData {
        let sharing = self.sharing;
        data.reset(|entity, value| {
            if value.len() > 1 {
                sharing.default_copy_value(entity)
            } else {
                value.clone()
            }
        });
        data
    }

    /// State at method entry: the caller's state (for callees), parameters
    /// seeded from their arguments, address-shared groups joined
    pub fn initial_data(&mut self) -> Result<CopyAnalysisData> {
        let mut data = match self.context.interprocedural() {
            Some(call) => CopyAnalysisData::from_core(call.initial_data.clone()),
            None => CopyAnalysisData::new(),
        };

        if let Some(call) = self.context.interprocedural() {
            for (ordinal, parameter) in self.cfg.method.parameters.iter().enumerate() {
                if let Some(argument) = call.argument(ordinal) {
                    self.set_value_for_parameter_on_entry(&mut data, parameter, argument);
                }
            }
        }

        for group in self.sharing.groups() {
            let mut entities = group.clone();
            let mut kind = CopyAbstractValueKind::KnownReferenceCopy;
            for member in &group {
                if let Some(existing) = data.get(member) {
                    if existing.is_known() {
                        entities.extend(existing.entities().iter().cloned());
                        kind = kind.merge_if_both_known(existing.kind());
                    }
                }
            }
            let value = CopyAbstractValue::with_kind(entities, kind);
            if group.iter().any(|m| data.get(m) != Some(&value)) {
                data.set_abstract_value_for_entities(&value, None);
            }
        }

        data.debug_assert_valid(self.config().strict_validation)?;
        Ok(data)
    }

    /// Seed `parameter` with the argument's copy set, closed over the
    /// current groups of its members
    pub fn set_value_for_parameter_on_entry(
        &self,
        data: &mut CopyAnalysisData,
        parameter: &AnalysisEntity,
        argument: &ArgumentInfo,
    ) {
        let mut assigned = argument.value.entities().clone();
        if let Some(entity) = &argument.entity {
            assigned.insert(entity.clone());
        }

        let mut kind = if argument.value.is_known() {
            argument.value.kind()
        } else {
            match &argument.entity {
                Some(entity) if entity.ty().is_reference_type() => {
                    CopyAbstractValueKind::KnownReferenceCopy
                }
                _ => CopyAbstractValueKind::KnownValueCopy,
            }
        };

        let mut entities = assigned.clone();
        for member in &assigned {
            if let Some(existing) = data.get(member) {
                if existing.is_known() {
                    entities.extend(existing.entities().iter().cloned());
                    kind = kind.merge_if_both_known(existing.kind());
                }
            }
        }

        let value = CopyAbstractValue::with_kind(entities, kind);
        set_abstract_value(data, parameter, value, self.sharing, None, true);
    }

    /// Transfer function of one block
    pub fn visit_block(&mut self, block: &BasicBlock, input: CopyAnalysisData) -> Result<BlockOutput> {
        self.current = input;
        self.exception = None;

        if !self.current.is_reachable() {
            self.return_values.remove(&block.id);
            self.predicate_kinds.remove(&block.id);
            return Ok(BlockOutput {
                data: std::mem::take(&mut self.current),
                exception: None,
            });
        }

        trace!(block = %block.id, entries = self.current.len(), "visit block");
        let strict = self.config().strict_validation;
        for operation in &block.operations {
            self.visit_operation(operation)?;
            self.current.debug_assert_valid(strict)?;
        }

        match &block.terminator {
            Terminator::Branch { condition, .. } => {
                self.visit_operation(condition)?;
            }
            Terminator::Return(Some(operation)) => {
                let value = self.visit_operation(operation)?;
                let predicate_kind = self.predicate_kind_of(operation);
                self.return_values.insert(
                    block.id,
                    ReturnValueAndPredicateKind {
                        value,
                        predicate_kind,
                    },
                );
            }
            Terminator::Throw(operation) => {
                if let Some(operation) = operation {
                    self.visit_operation(operation)?;
                }
                self.record_exception_path(&[])?;
            }
            Terminator::Goto(_) | Terminator::Return(None) | Terminator::Exit => {}
        }
        self.current.debug_assert_valid(strict)?;

        Ok(BlockOutput {
            data: std::mem::take(&mut self.current),
            exception: self.exception.take(),
        })
    }

    /// State on the `branch` side of `block`'s condition, plus the verdict
    /// for the condition as seen from that side
    pub fn branch_data(
        &self,
        output: &CopyAnalysisData,
        condition: &Operation,
        branch: ConditionKind,
    ) -> (CopyAnalysisData, PredicateValueKind) {
        let mut data = output.clone();
        if !data.is_reachable() {
            return (data, PredicateValueKind::Unknown);
        }
        let verdict = self.refine_for_condition(&mut data, condition, branch);
        (data, verdict)
    }

    /// Record the verdict of `block`'s branch condition
    pub fn record_predicate_kind(&mut self, block: BlockId, when_true: PredicateValueKind, when_false: PredicateValueKind) {
        self.predicate_kinds.insert(block, when_true.combine(when_false));
    }

    pub fn predicate_kinds(&self) -> &BTreeMap<BlockId, PredicateValueKind> {
        &self.predicate_kinds
    }

    /// Drop flow captures whose scope ends with `block`
    pub fn leave_scope(&self, block: &BasicBlock, data: &mut CopyAnalysisData) {
        if block.leaving_scope.is_empty() {
            return;
        }
        for capture in &block.leaving_scope {
            data.stop_tracking_predicated_data(capture);
        }
        let leaving: BTreeSet<&AnalysisEntity> = block.leaving_scope.iter().collect();
        data.remove_entries(|e| leaving.contains(e));
    }

    /// Merged value of every reachable `return`; callee-owned entities are
    /// stripped when the method is analyzed for a caller
    pub fn get_return_value_and_predicate_kind(&self) -> Option<ReturnValueAndPredicateKind> {
        if self.cfg.method.returns_void() {
            return None;
        }

        let mut value = CopyAbstractValueDomain::bottom();
        let mut predicate_kind: Option<PredicateValueKind> = None;
        for returned in self.return_values.values() {
            value = CopyAbstractValueDomain::merge(&value, &returned.value);
            predicate_kind = Some(match predicate_kind {
                Some(kind) => kind.merge(returned.predicate_kind),
                None => returned.predicate_kind,
            });
        }

        if self.context.is_interprocedural() {
            value = strip_owned_entities(&value, self.context.method());
        }
        Some(ReturnValueAndPredicateKind {
            value,
            predicate_kind: predicate_kind.unwrap_or_default(),
        })
    }

    fn value_of_entity(&self, data: &CopyAnalysisData, entity: &AnalysisEntity) -> CopyAbstractValue {
        if !entity.ty().is_trackable() {
            return CopyAbstractValue::not_applicable();
        }
        if entity.has_unknown_instance_location() {
            return CopyAbstractValue::unknown();
        }
        match data.get(entity) {
            Some(value) => value.clone(),
            None => self.default_copy_value(entity),
        }
    }

    /// Value with no copy partners
    fn fresh_value(ty: &TypeInfo) -> CopyAbstractValue {
        if ty.is_trackable() {
            CopyAbstractValue::unknown()
        } else {
            CopyAbstractValue::not_applicable()
        }
    }

    fn convert(value: CopyAbstractValue, kind: ConversionKind, ty: &TypeInfo) -> CopyAbstractValue {
        if !ty.is_trackable() {
            return CopyAbstractValue::not_applicable();
        }
        match kind {
            ConversionKind::Boxing | ConversionKind::Unboxing => value,
            ConversionKind::TryCast { always_succeeds } if always_succeeds => value,
            ConversionKind::Reference { is_implicit } if is_implicit => value,
            _ => CopyAbstractValue::unknown(),
        }
    }

    /// Copy value of `operation`, applying its effects to the current state
    pub fn visit_operation(&mut self, operation: &Operation) -> Result<CopyAbstractValue> {
        match operation {
            Operation::Reference(entity) => Ok(self.value_of_entity(&self.current, entity)),
            Operation::Literal(ty) | Operation::Opaque(ty) => Ok(Self::fresh_value(ty)),
            Operation::Assignment { target, value } => self.visit_assignment(target, value),
            Operation::RefAssignment { target, source } => {
                let value = self.value_of_entity(&self.current, source);
                set_abstract_value(&mut self.current, target, value, self.sharing, None, false);
                Ok(self.value_of_entity(&self.current, target))
            }
            Operation::Conversion { operand, kind, ty } => {
                let value = self.visit_operation(operand)?;
                Ok(Self::convert(value, *kind, ty))
            }
            Operation::Comparison { left, right, .. } => {
                self.visit_operation(left)?;
                self.visit_operation(right)?;
                Ok(CopyAbstractValue::unknown())
            }
            Operation::IsNull { operand, .. } => {
                self.visit_operation(operand)?;
                Ok(CopyAbstractValue::unknown())
            }
            Operation::Invocation {
                target,
                arguments,
                return_type,
            } => self.visit_invocation(target, arguments, return_type.as_ref()),
        }
    }

    fn visit_assignment(&mut self, target: &AnalysisEntity, value: &Operation) -> Result<CopyAbstractValue> {
        let assigned = self.visit_operation(value)?;
        self.current.stop_tracking_predicated_data(target);
        set_abstract_value(&mut self.current, target, assigned, self.sharing, None, false);

        if self.context.well_known_types().is_boolean(target.ty())
            && !target.has_unknown_instance_location()
        {
            self.track_predicated_assignment(target, value);
        }
        Ok(self.value_of_entity(&self.current, target))
    }

    /// `flag = <condition>`: remember what each outcome implies so that a
    /// later `if (flag)` can use it
    fn track_predicated_assignment(&mut self, target: &AnalysisEntity, condition: &Operation) {
        let refines = match condition {
            Operation::Comparison { .. } => true,
            Operation::Reference(source) => self.current.has_predicated_data_for_entity(source),
            _ => false,
        };
        if !refines {
            return;
        }

        // Overlays hold only the entries the condition refines
        let side = |visitor: &Self, branch: ConditionKind| -> Option<CopyAnalysisMap> {
            let mut data = visitor.current.clone();
            visitor.refine_for_condition(&mut data, condition, branch);
            if !data.is_reachable() {
                return Some(std::iter::once((target.clone(), CopyAbstractValue::invalid())).collect());
            }
            let core = visitor.current.core();
            let delta: CopyAnalysisMap = data
                .into_core()
                .into_iter()
                .filter(|(entity, value)| core.get(entity) != Some(value))
                .collect();
            (!delta.is_empty()).then_some(delta)
        };
        let true_data = side(self, ConditionKind::WhenTrue);
        let false_data = side(self, ConditionKind::WhenFalse);

        if true_data.is_none() && false_data.is_none() {
            return;
        }
        self.current
            .start_tracking_predicated_data(target, true_data, false_data);
    }

    /// Verdict of a boolean operation evaluated against the current state
    fn predicate_kind_of(&self, operation: &Operation) -> PredicateValueKind {
        let is_boolean = operation
            .ty()
            .is_some_and(|ty| self.context.well_known_types().is_boolean(&ty));
        if !is_boolean {
            return PredicateValueKind::Unknown;
        }
        let mut on_true = self.current.clone();
        let mut on_false = self.current.clone();
        self.refine_for_condition(&mut on_true, operation, ConditionKind::WhenTrue)
            .combine(self.refine_for_condition(&mut on_false, operation, ConditionKind::WhenFalse))
    }

    /// Refine `data` under the assumption that `condition` takes the
    /// `branch` outcome; returns the verdict for the condition itself and
    /// marks `data` unreachable when that outcome is impossible
    fn refine_for_condition(
        &self,
        data: &mut CopyAnalysisData,
        condition: &Operation,
        branch: ConditionKind,
    ) -> PredicateValueKind {
        let verdict = match condition {
            Operation::Comparison {
                left,
                right,
                kind,
                is_reference_equality,
            } => {
                let equals = (*kind == ComparisonKind::Equals) != (branch == ConditionKind::WhenFalse);
                let branch_verdict = self.set_value_for_equals_or_not_equals_comparison_operator(
                    left,
                    right,
                    equals,
                    *is_reference_equality,
                    data,
                );
                match branch {
                    ConditionKind::WhenTrue => branch_verdict,
                    ConditionKind::WhenFalse => branch_verdict.negate(),
                }
            }
            Operation::IsNull { operand, .. } => {
                self.set_value_for_is_null_comparison_operator(operand, data)
            }
            Operation::Reference(entity) if data.has_predicated_data_for_entity(entity) => {
                data.apply_predicated_data_for_entity(entity, branch == ConditionKind::WhenTrue)
            }
            _ => PredicateValueKind::Unknown,
        };

        if is_infeasible(verdict, branch) {
            data.mark_unreachable();
        }
        verdict
    }

    /// Learn from `left == right` (when `equals`) or `left != right` on one
    /// side of a branch. Returns the verdict for that side.
    pub fn set_value_for_equals_or_not_equals_comparison_operator(
        &self,
        left: &Operation,
        right: &Operation,
        equals: bool,
        is_reference_equality: bool,
        target: &mut CopyAnalysisData,
    ) -> PredicateValueKind {
        let left_value = self.peek_value(target, left);
        let right_value = self.peek_value(target, right);
        if left_value.is_empty() || right_value.is_empty() {
            return PredicateValueKind::Unknown;
        }

        let mut verdict = PredicateValueKind::Unknown;
        if left_value == right_value
            && !(is_reference_equality && left_value.kind() == CopyAbstractValueKind::KnownValueCopy)
        {
            verdict = if equals {
                PredicateValueKind::AlwaysTrue
            } else {
                PredicateValueKind::AlwaysFalse
            };
        }

        if verdict == PredicateValueKind::Unknown {
            if equals {
                let representative = left
                    .referenced_entity()
                    .or_else(|| left_value.entities().iter().next())
                    .cloned();
                if let Some(representative) = representative {
                    let from = if is_reference_equality {
                        PredicateCompare::Reference
                    } else {
                        PredicateCompare::Value
                    };
                    set_abstract_value(target, &representative, right_value, self.sharing, Some(from), false);
                }
            }
        } else if !equals {
            for entity in right_value.entities() {
                target.set_abstract_value_for_entities(&CopyAbstractValue::invalid(), Some(entity));
            }
        }
        verdict
    }

    /// Null checks say nothing about copies
    pub fn set_value_for_is_null_comparison_operator(
        &self,
        _operand: &Operation,
        _target: &mut CopyAnalysisData,
    ) -> PredicateValueKind {
        PredicateValueKind::Unknown
    }

    /// Copy value of a side-effect free operand in `data`
    fn peek_value(&self, data: &CopyAnalysisData, operation: &Operation) -> CopyAbstractValue {
        match operation {
            Operation::Reference(entity) => self.value_of_entity(data, entity),
            Operation::Assignment { target, .. } | Operation::RefAssignment { target, .. } => {
                self.value_of_entity(data, target)
            }
            Operation::Conversion { operand, kind, ty } => {
                Self::convert(self.peek_value(data, operand), *kind, ty)
            }
            _ => CopyAbstractValue::unknown(),
        }
    }

    /// Merge the current state (without members of tracked entities) into
    /// the block's exception state; `escaped` entities may have been written before the
    /// exception and are forgotten
    fn record_exception_path(&mut self, escaped: &[AnalysisEntity]) -> Result<()> {
        if !self.config().exception_paths_analysis || !self.current.is_reachable() {
            return Ok(());
        }

        let mut snapshot = self.current.exception_path_snapshot();
        for entity in escaped {
            set_abstract_value(&mut snapshot, entity, CopyAbstractValue::unknown(), self.sharing, None, false);
        }

        self.exception = Some(match self.exception.take() {
            Some(previous) => self.merge(&previous, &snapshot)?,
            None => snapshot,
        });
        Ok(())
    }

    fn visit_invocation(
        &mut self,
        target: &CallTarget,
        arguments: &[Argument],
        return_type: Option<&TypeInfo>,
    ) -> Result<CopyAbstractValue> {
        let mut infos = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let value = self.visit_operation(&argument.value)?;
            infos.push(ArgumentInfo {
                ordinal: argument.ordinal,
                kind: argument.kind,
                entity: argument.value.referenced_entity().cloned(),
                value,
            });
        }

        let escaped: Vec<AnalysisEntity> = infos
            .iter()
            .filter(|a| a.is_escaped())
            .filter_map(|a| a.entity.clone())
            .collect();
        self.record_exception_path(&escaped)?;

        let summary = match target {
            CallTarget::Method(callee) => interprocedural::analyze_callee(
                &mut *self.session,
                self.context,
                self.current.core(),
                callee,
                &infos,
            )?,
            CallTarget::Unknown => None,
        };

        let returned = match (target, summary) {
            (CallTarget::Method(callee), Some(summary)) => {
                self.apply_interprocedural_analysis_result(callee, &summary, &infos)
            }
            _ => self.apply_conservative_call(&infos),
        };

        Ok(match return_type {
            Some(ty) if ty.is_trackable() => returned,
            _ => CopyAbstractValue::not_applicable(),
        })
    }

    /// Effects of a call nothing is known about
    fn apply_conservative_call(&mut self, arguments: &[ArgumentInfo]) -> CopyAbstractValue {
        let pessimistic = self.config().pessimistic_analysis;
        for argument in arguments {
            let Some(entity) = &argument.entity else {
                continue;
            };
            if argument.is_escaped() {
                set_abstract_value(&mut self.current, entity, CopyAbstractValue::unknown(), self.sharing, None, false);
            }
            if pessimistic && entity.ty().is_reference_type() {
                self.reset_members(entity);
            }
        }
        CopyAbstractValue::unknown()
    }

    /// Forget everything known about member projections of `entity`
    fn reset_members(&mut self, entity: &AnalysisEntity) {
        let members: Vec<AnalysisEntity> = self
            .current
            .entities()
            .filter(|e| e.is_descendant_of(entity))
            .cloned()
            .collect();
        for member in members {
            set_abstract_value(&mut self.current, &member, CopyAbstractValue::unknown(), self.sharing, None, false);
        }
    }

    /// Fold a callee's exit state back into the caller; returns the call's
    /// value
    pub fn apply_interprocedural_analysis_result(
        &mut self,
        callee: &str,
        summary: &InterproceduralSummary,
        arguments: &[ArgumentInfo],
    ) -> CopyAbstractValue {
        if !summary.exit_reachable {
            self.current.mark_unreachable();
            return CopyAbstractValue::unknown();
        }

        let mut exit = CopyAnalysisData::from_core(summary.exit.clone());
        exit.remove_entries(|e| e.is_owned_by(callee));
        let mut merged = exit.into_core();
        for (entity, value) in self.current.core() {
            merged
                .entry(entity.clone())
                .or_insert_with(|| value.clone());
        }
        CopyAnalysisMapDomain::normalize(&mut merged);
        self.current.replace_core(merged);

        for argument in arguments.iter().filter(|a| a.is_escaped()) {
            let (Some(entity), Some(parameter)) = (&argument.entity, summary.parameter(argument.ordinal))
            else {
                continue;
            };
            let exit_value = summary
                .exit
                .get(parameter)
                .cloned()
                .unwrap_or_else(|| CopyAbstractValue::new(parameter));
            let value = strip_owned_entities(&exit_value, callee);
            set_abstract_value(&mut self.current, entity, value, self.sharing, None, false);
        }

        match &summary.return_value {
            Some(returned) if returned.value.is_known() => self.expand_to_current_groups(&returned.value),
            _ => CopyAbstractValue::unknown(),
        }
    }

    /// Grow `value` by the current groups of its members
    fn expand_to_current_groups(&self, value: &CopyAbstractValue) -> CopyAbstractValue {
        let mut entities = value.entities().clone();
        let mut kind = value.kind();
        for member in value.entities() {
            if let Some(current) = self.current.get(member) {
                if current.is_known() {
                    entities.extend(current.entities().iter().cloned());
                    kind = kind.merge_if_both_known(current.kind());
                }
            }
        }
        CopyAbstractValue::with_kind(entities, kind)
    }
}
