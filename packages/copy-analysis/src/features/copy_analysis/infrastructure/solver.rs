//! Worklist dataflow solver
//!
//! Blocks are processed in reverse postorder (smallest pending position
//! first). A block's input is the join of the data on its incoming edges:
//! - normal edges carry the predecessor's output, refined per branch side
//!   (an infeasible side carries unreachable data)
//! - exception edges carry the predecessor's exception state
//!
//! Without exception path analysis a handler is entered with the input
//! state of the blocks it protects (without members of tracked entities).
//!
//! Loop headers are widened once they have been visited more than
//! `widening_threshold` times; exceeding `max_iterations` block visits fails
//! with [`CopyAnalysisError::FixpointNotReached`].

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::{debug, trace};

use super::visitor::CopyDataFlowOperationVisitor;
use crate::config::CopyAnalysisConfig;
use crate::errors::{CopyAnalysisError, Result};
use crate::features::copy_analysis::domain::CopyAnalysisData;
use crate::features::flow_graph::domain::{
    BlockId, CFGEdgeKind, ConditionKind, ControlFlowGraph, Terminator,
};
use crate::features::flow_graph::FlowGraphIndex;

/// Fixpoint states of one method
#[derive(Debug, Clone, Default)]
pub struct SolverOutput {
    /// Block → input state
    pub inputs: FxHashMap<BlockId, CopyAnalysisData>,

    /// Block → output state (after leaving scope, before branch refinement)
    pub outputs: FxHashMap<BlockId, CopyAnalysisData>,

    /// Join of exception states that no handler catches
    pub unhandled_exception: Option<CopyAnalysisData>,

    /// Block visits
    pub iterations: usize,
}

pub struct CopyDataFlowSolver<'s> {
    cfg: &'s ControlFlowGraph,
    config: &'s CopyAnalysisConfig,
    index: FlowGraphIndex,
}

impl<'s> CopyDataFlowSolver<'s> {
    pub fn new(cfg: &'s ControlFlowGraph, config: &'s CopyAnalysisConfig) -> Result<Self> {
        Self::check_graph(cfg)?;
        Ok(Self {
            cfg,
            config,
            index: FlowGraphIndex::new(cfg),
        })
    }

    /// Reject graphs whose edges point at missing blocks
    fn check_graph(cfg: &ControlFlowGraph) -> Result<()> {
        for id in [cfg.entry, cfg.exit] {
            if cfg.block(id).is_none() {
                return Err(CopyAnalysisError::invalid_graph(format!(
                    "{} has no block {}",
                    cfg.name(),
                    id
                )));
            }
        }
        for (position, block) in cfg.blocks.iter().enumerate() {
            if block.id.0 != position {
                return Err(CopyAnalysisError::invalid_graph(format!(
                    "block {} stored at position {}",
                    block.id, position
                )));
            }
            for (succ, _) in cfg.all_successors(block.id) {
                if cfg.block(succ).is_none() {
                    return Err(CopyAnalysisError::invalid_graph(format!(
                        "{} references missing block {}",
                        block.id, succ
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run `visitor` to a fixpoint
    pub fn solve(&self, visitor: &mut CopyDataFlowOperationVisitor<'_, '_>) -> Result<SolverOutput> {
        let order = self.index.reverse_postorder();
        let entry_data = visitor.initial_data()?;

        let mut output = SolverOutput::default();
        let mut edges: FxHashMap<(BlockId, CFGEdgeKind), CopyAnalysisData> = FxHashMap::default();
        let mut exceptions: FxHashMap<BlockId, CopyAnalysisData> = FxHashMap::default();
        let mut unhandled: FxHashMap<BlockId, CopyAnalysisData> = FxHashMap::default();
        let mut visits: FxHashMap<BlockId, usize> = FxHashMap::default();
        let mut worklist: BTreeSet<usize> = (0..order.len()).collect();

        while let Some(position) = worklist.pop_first() {
            output.iterations += 1;
            if output.iterations > self.config.max_iterations {
                return Err(CopyAnalysisError::FixpointNotReached {
                    method: self.cfg.name().to_string(),
                    iterations: self.config.max_iterations,
                });
            }

            let id = order[position];
            let Some(block) = self.cfg.block(id) else {
                continue;
            };

            let mut input = if id == self.cfg.entry {
                entry_data.clone()
            } else {
                self.join_predecessors(visitor, id, &edges, &exceptions)?
            };

            let count = visits.entry(id).or_insert(0);
            *count += 1;
            if self.index.is_loop_header(id) && *count > self.config.widening_threshold {
                debug!(method = self.cfg.name(), block = %id, visits = *count, "widening loop header");
                input = visitor.widen(input);
            }
            trace!(method = self.cfg.name(), block = %id, visit = *count, "solver step");

            let fallback_exception = (!self.config.exception_paths_analysis
                && block.handler.is_some()
                && input.is_reachable())
            .then(|| input.exception_path_snapshot());

            output.inputs.insert(id, input.clone());
            let result = visitor.visit_block(block, input)?;

            let mut successors: Vec<((BlockId, CFGEdgeKind), CopyAnalysisData)> = Vec::new();
            match &block.terminator {
                Terminator::Branch {
                    condition,
                    when_true,
                    when_false,
                } => {
                    let (mut on_true, verdict_true) =
                        visitor.branch_data(&result.data, condition, ConditionKind::WhenTrue);
                    let (mut on_false, verdict_false) =
                        visitor.branch_data(&result.data, condition, ConditionKind::WhenFalse);
                    if result.data.is_reachable() {
                        visitor.record_predicate_kind(id, verdict_true, verdict_false);
                    }
                    visitor.leave_scope(block, &mut on_true);
                    visitor.leave_scope(block, &mut on_false);
                    successors.push(((*when_true, CFGEdgeKind::TrueBranch), on_true));
                    successors.push(((*when_false, CFGEdgeKind::FalseBranch), on_false));
                }
                Terminator::Goto(target) => {
                    let mut data = result.data.clone();
                    visitor.leave_scope(block, &mut data);
                    successors.push(((*target, CFGEdgeKind::Sequential), data));
                }
                Terminator::Return(_) => {
                    let mut data = result.data.clone();
                    visitor.leave_scope(block, &mut data);
                    successors.push(((self.cfg.exit, CFGEdgeKind::Return), data));
                }
                Terminator::Throw(_) | Terminator::Exit => {}
            }

            for ((target, kind), data) in successors {
                let key = (id, kind);
                if edges.get(&key) != Some(&data) {
                    edges.insert(key, data);
                    self.enqueue(&mut worklist, target);
                }
            }

            if let Some(exception) = result.exception.or(fallback_exception) {
                match block.handler {
                    Some(handler) => {
                        if exceptions.get(&id) != Some(&exception) {
                            exceptions.insert(id, exception);
                            self.enqueue(&mut worklist, handler);
                        }
                    }
                    None => {
                        unhandled.insert(id, exception);
                    }
                }
            } else {
                unhandled.remove(&id);
                if exceptions.remove(&id).is_some() {
                    if let Some(handler) = block.handler {
                        self.enqueue(&mut worklist, handler);
                    }
                }
            }

            let mut data = result.data;
            visitor.leave_scope(block, &mut data);
            output.outputs.insert(id, data);
        }

        let mut unhandled_exception: Option<CopyAnalysisData> = None;
        let mut contributions: Vec<_> = unhandled.into_iter().collect();
        contributions.sort_by_key(|(id, _)| *id);
        for (_, data) in contributions {
            unhandled_exception = Some(match unhandled_exception {
                Some(previous) => visitor.merge(&previous, &data)?,
                None => data,
            });
        }
        output.unhandled_exception = unhandled_exception;

        debug!(
            method = self.cfg.name(),
            iterations = output.iterations,
            blocks = order.len(),
            "fixpoint reached"
        );
        Ok(output)
    }

    fn enqueue(&self, worklist: &mut BTreeSet<usize>, block: BlockId) {
        if let Some(position) = self.index.position(block) {
            worklist.insert(position);
        }
    }

    /// Join of the data on every incoming edge of `block` seen so far
    fn join_predecessors(
        &self,
        visitor: &CopyDataFlowOperationVisitor<'_, '_>,
        block: BlockId,
        edges: &FxHashMap<(BlockId, CFGEdgeKind), CopyAnalysisData>,
        exceptions: &FxHashMap<BlockId, CopyAnalysisData>,
    ) -> Result<CopyAnalysisData> {
        let mut joined: Option<CopyAnalysisData> = None;
        for (pred, kind) in self.index.predecessors(block) {
            let incoming = match kind {
                CFGEdgeKind::Exception => exceptions.get(&pred),
                _ => edges.get(&(pred, kind)),
            };
            let Some(incoming) = incoming else {
                continue;
            };
            joined = Some(match joined {
                Some(previous) => visitor.merge(&previous, incoming)?,
                None => incoming.clone(),
            });
        }
        Ok(joined.unwrap_or_else(CopyAnalysisData::unreachable))
    }
}
