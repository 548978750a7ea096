//! Analysis context
//!
//! Everything a single method analysis needs besides its CFG: the config,
//! the address-sharing facts of the method, and (for callees analyzed on
//! behalf of a call site) the caller's state and arguments.

use std::sync::Arc;

use crate::config::CopyAnalysisConfig;
use crate::features::copy_analysis::domain::{CopyAbstractValue, CopyAnalysisMap};
use crate::features::flow_graph::domain::ArgumentKind;
use crate::features::points_to::PointsToAnalysisResult;
use crate::shared::models::{AnalysisEntity, TypeInfo, BOOLEAN_TYPE_NAME};

/// Types the visitor must recognize by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub boolean: String,
}

impl WellKnownTypes {
    pub fn is_boolean(&self, ty: &TypeInfo) -> bool {
        ty.derives_from(&self.boolean)
    }
}

impl Default for WellKnownTypes {
    fn default() -> Self {
        Self {
            boolean: BOOLEAN_TYPE_NAME.to_string(),
        }
    }
}

/// Argument passed at the call site that spawned a callee analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgumentInfo {
    /// Parameter ordinal in the callee
    pub ordinal: usize,
    pub kind: ArgumentKind,

    /// Storage location passed, when the argument is a plain reference
    pub entity: Option<AnalysisEntity>,

    /// Copy value of the argument in the caller
    pub value: CopyAbstractValue,
}

impl ArgumentInfo {
    pub fn is_escaped(&self) -> bool {
        matches!(self.kind, ArgumentKind::Ref | ArgumentKind::Out)
    }
}

/// Call-site facts handed to a callee analysis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterproceduralAnalysisData {
    /// Callers, outermost first (the analyzed method is not on it)
    pub call_stack: Vec<String>,

    /// Caller core data at the call site
    pub initial_data: CopyAnalysisMap,

    pub arguments: Vec<ArgumentInfo>,
}

impl InterproceduralAnalysisData {
    /// Context for a call made from `caller`
    pub fn with_call(&self, caller: &str) -> Self {
        let mut data = self.clone();
        data.call_stack.push(caller.to_string());
        data.arguments.clear();
        data
    }

    /// Check if `method` is already being analyzed further up the chain
    pub fn is_circular(&self, method: &str) -> bool {
        self.call_stack.iter().any(|m| m == method)
    }

    /// Length of the call chain above the analyzed method
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn argument(&self, ordinal: usize) -> Option<&ArgumentInfo> {
        self.arguments.iter().find(|a| a.ordinal == ordinal)
    }
}

/// Immutable per-method context
#[derive(Debug, Clone)]
pub struct CopyAnalysisContext {
    method: String,
    config: Arc<CopyAnalysisConfig>,
    well_known_types: Arc<WellKnownTypes>,
    points_to: Option<Arc<PointsToAnalysisResult>>,
    interprocedural: Option<InterproceduralAnalysisData>,
}

impl CopyAnalysisContext {
    pub fn new(method: impl Into<String>, config: Arc<CopyAnalysisConfig>) -> Self {
        Self {
            method: method.into(),
            config,
            well_known_types: Arc::new(WellKnownTypes::default()),
            points_to: None,
            interprocedural: None,
        }
    }

    pub fn with_points_to(mut self, points_to: Arc<PointsToAnalysisResult>) -> Self {
        self.points_to = Some(points_to);
        self
    }

    pub fn with_well_known_types(mut self, types: Arc<WellKnownTypes>) -> Self {
        self.well_known_types = types;
        self
    }

    /// Context for analyzing `callee` on behalf of a call made in this
    /// context's method
    pub fn fork_for_interprocedural(
        &self,
        callee: impl Into<String>,
        initial_data: CopyAnalysisMap,
        arguments: Vec<ArgumentInfo>,
        points_to: Option<Arc<PointsToAnalysisResult>>,
    ) -> Self {
        let mut data = self
            .interprocedural
            .as_ref()
            .map(|d| d.with_call(&self.method))
            .unwrap_or_else(|| InterproceduralAnalysisData {
                call_stack: vec![self.method.clone()],
                ..Default::default()
            });
        data.initial_data = initial_data;
        data.arguments = arguments;

        Self {
            method: callee.into(),
            config: Arc::clone(&self.config),
            well_known_types: Arc::clone(&self.well_known_types),
            points_to,
            interprocedural: Some(data),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn config(&self) -> &CopyAnalysisConfig {
        &self.config
    }

    pub fn config_arc(&self) -> &Arc<CopyAnalysisConfig> {
        &self.config
    }

    pub fn well_known_types(&self) -> &WellKnownTypes {
        &self.well_known_types
    }

    pub fn points_to(&self) -> Option<&PointsToAnalysisResult> {
        self.points_to.as_deref()
    }

    pub fn interprocedural(&self) -> Option<&InterproceduralAnalysisData> {
        self.interprocedural.as_ref()
    }

    pub fn is_interprocedural(&self) -> bool {
        self.interprocedural.is_some()
    }

    /// Call stack a callee of this method would see
    pub fn callee_call_stack(&self) -> Vec<String> {
        let mut stack = self
            .interprocedural
            .as_ref()
            .map(|d| d.call_stack.clone())
            .unwrap_or_default();
        stack.push(self.method.clone());
        stack
    }

    /// Whether analyzing `callee` from here would recurse
    pub fn is_circular(&self, callee: &str) -> bool {
        self.method == callee
            || self
                .interprocedural
                .as_ref()
                .is_some_and(|d| d.is_circular(callee))
    }
}
