/*
 * Copy Analysis Ports
 *
 * The interprocedural analysis needs the CFG of every callee it descends
 * into. Callers plug in whatever program representation they have through
 * `MethodProvider`; `ProgramModel` is the in-memory implementation.
 */

use rustc_hash::FxHashMap;

use crate::features::flow_graph::domain::ControlFlowGraph;

/// Resolves a callee name to its control flow graph
pub trait MethodProvider {
    /// `None` for methods without a body (external, abstract, unresolved)
    fn method(&self, name: &str) -> Option<&ControlFlowGraph>;
}

/// Method name → CFG
#[derive(Debug, Clone, Default)]
pub struct ProgramModel {
    methods: FxHashMap<String, ControlFlowGraph>,
}

impl ProgramModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cfg` under its method name (replacing a previous body)
    pub fn add(&mut self, cfg: ControlFlowGraph) -> &mut Self {
        self.methods.insert(cfg.name().to_string(), cfg);
        self
    }

    pub fn with(mut self, cfg: ControlFlowGraph) -> Self {
        self.add(cfg);
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl MethodProvider for ProgramModel {
    fn method(&self, name: &str) -> Option<&ControlFlowGraph> {
        self.methods.get(name)
    }
}

/// No callee bodies: every call is handled conservatively
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMethods;

impl MethodProvider for NoMethods {
    fn method(&self, _name: &str) -> Option<&ControlFlowGraph> {
        None
    }
}
