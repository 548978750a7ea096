//! Test data builders
//!
//! `Fixture` owns the entity factory every CFG of a test must share, so that
//! caller and callee agree on entity ids.

use copy_analysis::config::{CopyAnalysisConfig, Preset};
use copy_analysis::features::copy_analysis::{CopyAnalysis, CopyAnalysisResult, ProgramModel};
use copy_analysis::features::flow_graph::{
    Argument, CfgBuilder, ControlFlowGraph, MethodSignature, Operation,
};
use copy_analysis::shared::models::{AnalysisEntity, EntityFactory, TypeInfo};

pub fn int() -> TypeInfo {
    TypeInfo::value("int")
}

pub fn object() -> TypeInfo {
    TypeInfo::reference("object")
}

/// Entity factory plus the methods defined so far
#[derive(Default)]
pub struct Fixture {
    pub factory: EntityFactory,
    pub program: ProgramModel,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&mut self, method: &str, name: &str, ty: TypeInfo) -> AnalysisEntity {
        self.factory.local(method, name, ty)
    }

    pub fn int_local(&mut self, method: &str, name: &str) -> AnalysisEntity {
        self.local(method, name, int())
    }

    pub fn parameter(&mut self, method: &str, name: &str, ordinal: usize, ty: TypeInfo) -> AnalysisEntity {
        self.factory.parameter(method, name, ordinal, ty)
    }

    pub fn flow_capture(&mut self, method: &str, capture_id: u32, ty: TypeInfo) -> AnalysisEntity {
        self.factory.flow_capture(method, capture_id, ty)
    }

    pub fn field(&mut self, parent: &AnalysisEntity, name: &str, ty: TypeInfo) -> AnalysisEntity {
        self.factory.field(parent, name, ty)
    }

    /// Register a callee
    pub fn define(&mut self, cfg: ControlFlowGraph) {
        self.program.add(cfg);
    }

    pub fn analyze(&self, cfg: &ControlFlowGraph, config: CopyAnalysisConfig) -> CopyAnalysisResult {
        let mut analysis = CopyAnalysis::new(config, &self.program).unwrap();
        analysis.analyze(cfg).unwrap()
    }

    pub fn analyze_balanced(&self, cfg: &ControlFlowGraph) -> CopyAnalysisResult {
        self.analyze(cfg, CopyAnalysisConfig::from_preset(Preset::Balanced))
    }
}

/// Single-block method running `operations` then returning `returned`
pub fn straight_line(
    signature: MethodSignature,
    operations: Vec<Operation>,
    returned: Option<Operation>,
) -> ControlFlowGraph {
    let mut builder = CfgBuilder::new(signature);
    let entry = builder.entry();
    for operation in operations {
        builder.push(entry, operation);
    }
    builder.ret(entry, returned);
    builder.build().unwrap()
}

/// `T Name(T p0, ...) { return p<returned>; }`
pub fn identity_method(fixture: &mut Fixture, name: &str, returned: usize, arity: usize) -> ControlFlowGraph {
    let mut signature = MethodSignature::new(name).with_return_type(int());
    let mut parameters = Vec::new();
    for ordinal in 0..arity {
        let parameter = fixture.parameter(name, &format!("p{ordinal}"), ordinal, int());
        signature = signature.with_parameter(parameter.clone());
        parameters.push(parameter);
    }
    straight_line(signature, Vec::new(), Some(Operation::reference(&parameters[returned])))
}

/// `target = callee(args...)` with value arguments
pub fn assign_call(target: &AnalysisEntity, callee: &str, args: &[&AnalysisEntity]) -> Operation {
    let arguments = args
        .iter()
        .enumerate()
        .map(|(ordinal, e)| Argument::by_value(ordinal, Operation::reference(e)))
        .collect();
    Operation::assign(target, Operation::call(callee, arguments, Some(target.ty().clone())))
}

pub fn opaque(ty: TypeInfo) -> Operation {
    Operation::Opaque(ty)
}
