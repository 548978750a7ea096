//! CFG builder
//!
//! Creates the entry block (`B0`) and the exit block (`B1`) up front; every
//! other block is added explicitly. `build()` checks that all terminators and
//! handlers reference existing blocks.

use crate::errors::{CopyAnalysisError, Result};
use crate::features::flow_graph::domain::{
    BasicBlock, BlockId, BlockKind, ControlFlowGraph, MethodSignature, Operation, Terminator,
};
use crate::shared::models::AnalysisEntity;

pub struct CfgBuilder {
    method: MethodSignature,
    blocks: Vec<BasicBlock>,
    unknown_blocks: Vec<BlockId>,
}

impl CfgBuilder {
    pub const ENTRY: BlockId = BlockId(0);
    pub const EXIT: BlockId = BlockId(1);

    pub fn new(method: MethodSignature) -> Self {
        let mut entry = BasicBlock::new(Self::ENTRY, BlockKind::Entry);
        entry.terminator = Terminator::Goto(Self::EXIT);
        let exit = BasicBlock::new(Self::EXIT, BlockKind::Exit);
        Self {
            method,
            blocks: vec![entry, exit],
            unknown_blocks: Vec::new(),
        }
    }

    pub fn entry(&self) -> BlockId {
        Self::ENTRY
    }

    pub fn exit(&self) -> BlockId {
        Self::EXIT
    }

    /// Add a statement block (terminates with `return` until told otherwise)
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, BlockKind::Statement));
        id
    }

    /// Apply `edit` to block `id`; unknown ids are reported by `build()`
    fn edit(&mut self, id: BlockId, edit: impl FnOnce(&mut BasicBlock)) -> &mut Self {
        match self.blocks.get_mut(id.0) {
            Some(block) => edit(block),
            None => self.unknown_blocks.push(id),
        }
        self
    }

    pub fn push(&mut self, block: BlockId, operation: Operation) -> &mut Self {
        self.edit(block, |b| b.operations.push(operation))
    }

    pub fn goto(&mut self, from: BlockId, to: BlockId) -> &mut Self {
        self.edit(from, |b| b.terminator = Terminator::Goto(to))
    }

    pub fn branch(
        &mut self,
        from: BlockId,
        condition: Operation,
        when_true: BlockId,
        when_false: BlockId,
    ) -> &mut Self {
        self.edit(from, |b| {
            b.terminator = Terminator::Branch {
                condition,
                when_true,
                when_false,
            }
        })
    }

    pub fn ret(&mut self, from: BlockId, value: Option<Operation>) -> &mut Self {
        self.edit(from, |b| b.terminator = Terminator::Return(value))
    }

    pub fn throw(&mut self, from: BlockId, value: Option<Operation>) -> &mut Self {
        self.edit(from, |b| b.terminator = Terminator::Throw(value))
    }

    pub fn handler(&mut self, block: BlockId, handler: BlockId) -> &mut Self {
        self.edit(block, |b| b.handler = Some(handler))
    }

    pub fn leave_scope(&mut self, block: BlockId, captures: &[AnalysisEntity]) -> &mut Self {
        self.edit(block, |b| b.leaving_scope.extend(captures.iter().cloned()))
    }

    pub fn build(self) -> Result<ControlFlowGraph> {
        if let Some(id) = self.unknown_blocks.first() {
            return Err(CopyAnalysisError::invalid_graph(format!(
                "edit of missing block {}",
                id
            )));
        }

        let len = self.blocks.len();
        let check = |id: BlockId, from: BlockId| -> Result<()> {
            if id.0 >= len {
                return Err(CopyAnalysisError::invalid_graph(format!(
                    "{} references missing block {}",
                    from, id
                )));
            }
            if id == Self::ENTRY {
                return Err(CopyAnalysisError::invalid_graph(format!(
                    "{} jumps back to the entry block",
                    from
                )));
            }
            Ok(())
        };

        for block in &self.blocks {
            match &block.terminator {
                Terminator::Goto(target) => check(*target, block.id)?,
                Terminator::Branch {
                    when_true,
                    when_false,
                    ..
                } => {
                    check(*when_true, block.id)?;
                    check(*when_false, block.id)?;
                }
                Terminator::Exit if block.kind != BlockKind::Exit => {
                    return Err(CopyAnalysisError::invalid_graph(format!(
                        "{} is not the exit block but has an exit terminator",
                        block.id
                    )));
                }
                _ => {}
            }
            if let Some(handler) = block.handler {
                check(handler, block.id)?;
            }
        }

        Ok(ControlFlowGraph {
            method: self.method,
            blocks: self.blocks,
            entry: Self::ENTRY,
            exit: Self::EXIT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::domain::CFGEdgeKind;
    use crate::shared::models::{EntityFactory, TypeInfo};

    #[test]
    fn test_builder_diamond() {
        let mut factory = EntityFactory::new();
        let c = factory.local("M", "c", TypeInfo::boolean());

        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let cond = builder.add_block();
        let then_b = builder.add_block();
        let else_b = builder.add_block();
        let join = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, cond);
        builder.branch(cond, Operation::reference(&c), then_b, else_b);
        builder.goto(then_b, join).goto(else_b, join);
        builder.ret(join, None);
        let cfg = builder.build().unwrap();

        assert_eq!(cfg.len(), 6);
        assert_eq!(
            cfg.successors(cond),
            vec![(then_b, CFGEdgeKind::TrueBranch), (else_b, CFGEdgeKind::FalseBranch)]
        );
        assert_eq!(cfg.successors(join), vec![(cfg.exit, CFGEdgeKind::Return)]);
        assert!(cfg.successors(cfg.exit).is_empty());
    }

    #[test]
    fn test_builder_rejects_entry_jump() {
        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let b = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, b).goto(b, CfgBuilder::ENTRY);
        assert!(matches!(
            builder.build(),
            Err(CopyAnalysisError::InvalidGraph(_))
        ));
    }

    #[test]
    fn test_handler_edge() {
        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let body = builder.add_block();
        let catch = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, body);
        builder.handler(body, catch);
        builder.ret(catch, None);
        let cfg = builder.build().unwrap();

        assert!(cfg
            .all_successors(body)
            .contains(&(catch, CFGEdgeKind::Exception)));
    }
}
