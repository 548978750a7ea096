//! Control Flow Graph blocks and edges

use serde::{Deserialize, Serialize};
use std::fmt;

use super::operation::Operation;
use crate::shared::models::{AnalysisEntity, TypeInfo};

/// Basic block index within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Entry,
    Exit,
    Statement,
}

/// Which outcome of a condition an edge is taken for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    WhenTrue,
    WhenFalse,
}

impl ConditionKind {
    pub fn negate(self) -> Self {
        match self {
            ConditionKind::WhenTrue => ConditionKind::WhenFalse,
            ConditionKind::WhenFalse => ConditionKind::WhenTrue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CFGEdgeKind {
    Sequential,
    TrueBranch,
    FalseBranch,
    Return,
    Exception,
}

/// How control leaves a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    Goto(BlockId),

    Branch {
        condition: Operation,
        when_true: BlockId,
        when_false: BlockId,
    },

    /// Return (optionally with a value); flows to the exit block
    Return(Option<Operation>),

    /// Throw; flows to the enclosing handler or leaves the method
    Throw(Option<Operation>),

    /// Exit block only
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub operations: Vec<Operation>,
    pub terminator: Terminator,

    /// Catch block receiving exceptions raised in this block
    pub handler: Option<BlockId>,

    /// Flow captures whose scope ends when control leaves this block
    pub leaving_scope: Vec<AnalysisEntity>,
}

impl BasicBlock {
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        let terminator = match kind {
            BlockKind::Exit => Terminator::Exit,
            _ => Terminator::Return(None),
        };
        Self {
            id,
            kind,
            operations: Vec::new(),
            terminator,
            handler: None,
            leaving_scope: Vec::new(),
        }
    }
}

/// Method shape needed for parameter seeding and return handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,

    /// Parameter entities in ordinal order
    pub parameters: Vec<AnalysisEntity>,

    /// `None` for void methods
    pub return_type: Option<TypeInfo>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    pub fn with_parameter(mut self, parameter: AnalysisEntity) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, ty: TypeInfo) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.is_none()
    }
}

/// Control flow graph for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub method: MethodSignature,
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub exit: BlockId,
}

impl ControlFlowGraph {
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    /// Normal (non-exceptional) successors with their edge kinds
    pub fn successors(&self, id: BlockId) -> Vec<(BlockId, CFGEdgeKind)> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };

        match &block.terminator {
            Terminator::Goto(target) => vec![(*target, CFGEdgeKind::Sequential)],
            Terminator::Branch {
                when_true,
                when_false,
                ..
            } => vec![
                (*when_true, CFGEdgeKind::TrueBranch),
                (*when_false, CFGEdgeKind::FalseBranch),
            ],
            Terminator::Return(_) => vec![(self.exit, CFGEdgeKind::Return)],
            Terminator::Throw(_) | Terminator::Exit => Vec::new(),
        }
    }

    /// All successors, including the exception edge to the handler
    pub fn all_successors(&self, id: BlockId) -> Vec<(BlockId, CFGEdgeKind)> {
        let mut succs = self.successors(id);
        if let Some(handler) = self.block(id).and_then(|b| b.handler) {
            succs.push((handler, CFGEdgeKind::Exception));
        }
        succs
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
