//! Copy analysis driver
//!
//! Runs the copy dataflow analysis of one method to a fixpoint and wraps the
//! per-block states into an immutable [`CopyAnalysisResult`].
//!
//! # Usage
//! ```text
//! let program = ProgramModel::new().with(helper_cfg);
//! let mut analysis = CopyAnalysis::new(CopyAnalysisConfig::default(), &program)?;
//! let result = analysis.analyze(&main_cfg)?;
//! result.exit.get(&b);
//! ```

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::context::{CopyAnalysisContext, WellKnownTypes};
use crate::config::{CopyAnalysisConfig, PointsToAnalysisKind};
use crate::errors::Result;
use crate::features::copy_analysis::domain::{
    CopyAnalysisData, CopyAnalysisResult, CopyBlockAnalysisResult,
};
use crate::features::copy_analysis::infrastructure::{
    AnalysisSession, CopyDataFlowOperationVisitor, CopyDataFlowSolver,
};
use crate::features::copy_analysis::ports::MethodProvider;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::points_to::AddressSharingAnalyzer;

/// Copy analysis over the methods of one program
pub struct CopyAnalysis<'p> {
    config: Arc<CopyAnalysisConfig>,
    well_known_types: Arc<WellKnownTypes>,

    /// Callee lookup and summary cache, shared by every analyzed method
    session: AnalysisSession<'p>,
}

impl<'p> CopyAnalysis<'p> {
    /// Create an analysis; fails if `config` does not validate
    pub fn new(config: CopyAnalysisConfig, provider: &'p dyn MethodProvider) -> Result<Self> {
        config.validate()?;
        let session = AnalysisSession::new(provider, config.interprocedural.summary_cache_size);
        Ok(Self {
            config: Arc::new(config),
            well_known_types: Arc::new(WellKnownTypes::default()),
            session,
        })
    }

    pub fn with_well_known_types(mut self, types: WellKnownTypes) -> Self {
        self.well_known_types = Arc::new(types);
        self
    }

    pub fn config(&self) -> &CopyAnalysisConfig {
        &self.config
    }

    /// Top-level context for `cfg`, including its address-sharing facts
    pub fn context_for(&self, cfg: &ControlFlowGraph) -> CopyAnalysisContext {
        let context = CopyAnalysisContext::new(cfg.name(), Arc::clone(&self.config))
            .with_well_known_types(Arc::clone(&self.well_known_types));
        if self.config.points_to_kind == PointsToAnalysisKind::None {
            return context;
        }
        let points_to = AddressSharingAnalyzer::new(self.config.points_to_kind).analyze(cfg);
        context.with_points_to(Arc::new(points_to))
    }

    /// Analyze `cfg` as an entry point
    pub fn analyze(&mut self, cfg: &ControlFlowGraph) -> Result<CopyAnalysisResult> {
        let context = self.context_for(cfg);
        self.run(cfg, &context)
    }

    /// Analyze `cfg` in a caller-supplied context
    pub fn run(&mut self, cfg: &ControlFlowGraph, context: &CopyAnalysisContext) -> Result<CopyAnalysisResult> {
        info!(method = cfg.name(), blocks = cfg.len(), "copy analysis started");
        let start = Instant::now();

        let result = Self::run_in_session(cfg, context, &mut self.session)?;

        info!(
            method = cfg.name(),
            iterations = result.iterations,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            cache = %self.session.cache().stats(),
            "copy analysis finished"
        );
        Ok(result)
    }

    /// Analysis of one method within an ongoing session (also used for
    /// callees)
    pub(crate) fn run_in_session(
        cfg: &ControlFlowGraph,
        context: &CopyAnalysisContext,
        session: &mut AnalysisSession<'_>,
    ) -> Result<CopyAnalysisResult> {
        if let Some(call) = context.interprocedural() {
            debug!(method = cfg.name(), depth = call.depth(), "analyzing callee");
        }

        let solver = CopyDataFlowSolver::new(cfg, context.config())?;
        let mut visitor = CopyDataFlowOperationVisitor::new(context, cfg, session);
        let output = solver.solve(&mut visitor)?;
        let return_value = visitor.get_return_value_and_predicate_kind();
        let predicate_kinds = visitor.predicate_kinds().clone();

        let snapshot = |data: Option<&CopyAnalysisData>| match data {
            Some(data) => CopyBlockAnalysisResult::new(data.core().clone(), data.is_reachable()),
            None => CopyBlockAnalysisResult::new(Default::default(), false),
        };

        let blocks = cfg
            .blocks
            .iter()
            .map(|block| (block.id, snapshot(output.outputs.get(&block.id))))
            .collect();

        Ok(CopyAnalysisResult {
            method: cfg.name().to_string(),
            blocks,
            exit: snapshot(output.inputs.get(&cfg.exit)),
            return_value,
            predicate_kinds,
            unhandled_exception: output.unhandled_exception.as_ref().map(|d| snapshot(Some(d))),
            iterations: output.iterations,
        })
    }

    /// Summary cache statistics of this analysis
    pub fn cache_stats(&self) -> String {
        self.session.cache().stats()
    }

    pub fn clear_cache(&mut self) {
        self.session.cache_mut().clear();
    }
}
