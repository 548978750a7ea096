//! Flow graph domain: operation IR and CFG model

pub mod cfg;
pub mod operation;

pub use cfg::{
    BasicBlock, BlockId, BlockKind, CFGEdgeKind, ConditionKind, ControlFlowGraph,
    MethodSignature, Terminator,
};
pub use operation::{Argument, ArgumentKind, CallTarget, ComparisonKind, ConversionKind, Operation};
