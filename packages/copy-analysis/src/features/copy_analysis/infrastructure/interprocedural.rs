//! Interprocedural copy analysis
//!
//! A call to a method with a known body is analyzed by running the copy
//! analysis on the callee, starting from the caller's state with the
//! parameters seeded from the arguments. Results are cached per
//! (callee, caller state, arguments, call stack).
//!
//! The analysis falls back to conservative call handling when:
//! - interprocedural analysis is disabled
//! - the callee has no body
//! - the call would recurse (callee already on the call stack)
//! - the call chain would exceed `max_call_chain`
//! - the callee analysis does not converge

use std::sync::Arc;
use tracing::{debug, warn};

use super::summary_cache::{InterproceduralSummary, SummaryCache, SummaryKey};
use crate::config::PointsToAnalysisKind;
use crate::errors::{CopyAnalysisError, Result};
use crate::features::copy_analysis::application::analyzer::CopyAnalysis;
use crate::features::copy_analysis::application::context::{ArgumentInfo, CopyAnalysisContext};
use crate::features::copy_analysis::domain::CopyAnalysisMap;
use crate::features::copy_analysis::ports::MethodProvider;
use crate::features::points_to::AddressSharingAnalyzer;
use crate::shared::models::AnalysisEntity;

/// State shared by every method analysis of one top-level run
pub struct AnalysisSession<'p> {
    provider: &'p dyn MethodProvider,
    cache: SummaryCache,
}

impl<'p> AnalysisSession<'p> {
    pub fn new(provider: &'p dyn MethodProvider, cache_size: usize) -> Self {
        Self {
            provider,
            cache: SummaryCache::new(cache_size),
        }
    }

    pub fn provider(&self) -> &'p dyn MethodProvider {
        self.provider
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SummaryCache {
        &mut self.cache
    }
}

/// Analyze `callee` for a call made in `context`'s method with the caller
/// state `caller_data`; `None` means the call must be handled conservatively
pub fn analyze_callee(
    session: &mut AnalysisSession<'_>,
    context: &CopyAnalysisContext,
    caller_data: &CopyAnalysisMap,
    callee: &str,
    arguments: &[ArgumentInfo],
) -> Result<Option<InterproceduralSummary>> {
    let config = context.config();
    if !config.interprocedural.is_enabled() {
        return Ok(None);
    }

    let provider = session.provider();
    let Some(callee_cfg) = provider.method(callee) else {
        debug!(caller = context.method(), callee, "callee has no body, handled conservatively");
        return Ok(None);
    };

    if context.is_circular(callee) {
        debug!(caller = context.method(), callee, "recursive call, handled conservatively");
        return Ok(None);
    }

    let call_stack = context.callee_call_stack();
    if call_stack.len() > config.interprocedural.max_call_chain {
        debug!(
            caller = context.method(),
            callee,
            depth = call_stack.len(),
            max = config.interprocedural.max_call_chain,
            "call chain limit reached, handled conservatively"
        );
        return Ok(None);
    }

    let key = SummaryKey {
        callee: callee.to_string(),
        initial_data: caller_data.clone(),
        arguments: arguments.to_vec(),
        call_stack,
    };
    if let Some(summary) = session.cache.get(&key) {
        debug!(callee, "summary cache hit");
        return Ok(Some(summary.clone()));
    }
    debug!(callee, "summary cache miss");

    let points_to = if config.points_to_kind == PointsToAnalysisKind::None {
        None
    } else {
        let seeds: Vec<(&AnalysisEntity, &AnalysisEntity)> = arguments
            .iter()
            .filter(|a| a.is_escaped())
            .filter_map(|a| Some((callee_cfg.method.parameters.get(a.ordinal)?, a.entity.as_ref()?)))
            .collect();
        Some(Arc::new(
            AddressSharingAnalyzer::new(config.points_to_kind).analyze_with(callee_cfg, seeds),
        ))
    };

    let callee_context = context.fork_for_interprocedural(
        callee,
        key.initial_data.clone(),
        key.arguments.clone(),
        points_to,
    );

    match CopyAnalysis::run_in_session(callee_cfg, &callee_context, session) {
        Ok(result) => {
            let summary = InterproceduralSummary {
                exit: result.exit.data().clone(),
                exit_reachable: result.exit.is_reachable(),
                return_value: result.return_value,
                parameters: callee_cfg.method.parameters.clone(),
            };
            session.cache.put(key, summary.clone());
            Ok(Some(summary))
        }
        Err(err @ CopyAnalysisError::FixpointNotReached { .. })
        | Err(err @ CopyAnalysisError::InvalidGraph(_)) => {
            warn!(callee, error = %err, "callee analysis failed, handled conservatively");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
