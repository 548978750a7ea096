//! CFG traversal order
//!
//! Lifts a [`ControlFlowGraph`] into a petgraph `DiGraph` (node index ==
//! block index) to compute the reverse postorder used by the worklist, the
//! predecessor lists used at join points and the loop headers (targets of
//! DFS back edges) used for widening.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent, DfsPostOrder, EdgeRef};
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::flow_graph::domain::{BlockId, CFGEdgeKind, ControlFlowGraph};

/// Traversal facts of one CFG
#[derive(Debug, Clone)]
pub struct FlowGraphIndex {
    graph: DiGraph<BlockId, CFGEdgeKind>,

    /// Reachable blocks, reverse postorder from the entry
    order: Vec<BlockId>,

    /// Block → position in `order`
    position: FxHashMap<BlockId, usize>,

    loop_headers: FxHashSet<BlockId>,
}

impl FlowGraphIndex {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut graph = DiGraph::with_capacity(cfg.len(), cfg.len() * 2);
        for block in &cfg.blocks {
            graph.add_node(block.id);
        }
        for block in &cfg.blocks {
            for (succ, kind) in cfg.all_successors(block.id) {
                graph.add_edge(NodeIndex::new(block.id.0), NodeIndex::new(succ.0), kind);
            }
        }

        let entry = NodeIndex::new(cfg.entry.0);
        let mut postorder = Vec::with_capacity(cfg.len());
        let mut dfs = DfsPostOrder::new(&graph, entry);
        while let Some(node) = dfs.next(&graph) {
            postorder.push(graph[node]);
        }
        postorder.reverse();

        let position = postorder
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut loop_headers = FxHashSet::default();
        depth_first_search(&graph, Some(entry), |event| {
            if let DfsEvent::BackEdge(_, header) = event {
                loop_headers.insert(graph[header]);
            }
        });

        Self {
            graph,
            order: postorder,
            position,
            loop_headers,
        }
    }

    /// Blocks reachable from the entry in reverse postorder
    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.order
    }

    /// Position of `block` in reverse postorder (`None` if unreachable)
    pub fn position(&self, block: BlockId) -> Option<usize> {
        self.position.get(&block).copied()
    }

    pub fn is_loop_header(&self, block: BlockId) -> bool {
        self.loop_headers.contains(&block)
    }

    pub fn loop_headers(&self) -> impl Iterator<Item = &BlockId> {
        self.loop_headers.iter()
    }

    /// Incoming edges of `block` with their kinds
    pub fn predecessors(&self, block: BlockId) -> Vec<(BlockId, CFGEdgeKind)> {
        let node = NodeIndex::new(block.0);
        if node.index() >= self.graph.node_count() {
            return Vec::new();
        }
        let mut preds: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| (self.graph[edge.source()], *edge.weight()))
            .collect();
        preds.sort_by_key(|(id, _)| *id);
        preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::domain::{MethodSignature, Operation};
    use crate::features::flow_graph::infrastructure::CfgBuilder;
    use crate::shared::models::{EntityFactory, TypeInfo};

    #[test]
    fn test_reverse_postorder_diamond() {
        let mut factory = EntityFactory::new();
        let c = factory.local("M", "c", TypeInfo::boolean());

        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let cond = builder.add_block();
        let then_b = builder.add_block();
        let else_b = builder.add_block();
        let join = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, cond);
        builder.branch(cond, Operation::reference(&c), then_b, else_b);
        builder.goto(then_b, join).goto(else_b, join).ret(join, None);
        let cfg = builder.build().unwrap();

        let index = FlowGraphIndex::new(&cfg);
        let order = index.reverse_postorder();
        assert_eq!(order.first(), Some(&cfg.entry));
        assert_eq!(order.last(), Some(&cfg.exit));
        assert!(index.position(cond) < index.position(then_b));
        assert!(index.position(then_b) < index.position(join));
        assert!(index.position(else_b) < index.position(join));
        assert_eq!(index.loop_headers().count(), 0);
        assert_eq!(index.predecessors(join).len(), 2);
    }

    #[test]
    fn test_loop_header_detected() {
        let mut factory = EntityFactory::new();
        let c = factory.local("M", "c", TypeInfo::boolean());

        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let header = builder.add_block();
        let body = builder.add_block();
        let after = builder.add_block();
        builder.goto(CfgBuilder::ENTRY, header);
        builder.branch(header, Operation::reference(&c), body, after);
        builder.goto(body, header).ret(after, None);
        let cfg = builder.build().unwrap();

        let index = FlowGraphIndex::new(&cfg);
        assert!(index.is_loop_header(header));
        assert!(!index.is_loop_header(body));
        assert!(index
            .predecessors(header)
            .contains(&(body, CFGEdgeKind::Sequential)));
    }

    #[test]
    fn test_unreachable_block_excluded() {
        let mut builder = CfgBuilder::new(MethodSignature::new("M"));
        let dead = builder.add_block();
        builder.ret(dead, None);
        let cfg = builder.build().unwrap();

        let index = FlowGraphIndex::new(&cfg);
        assert_eq!(index.position(dead), None);
        assert_eq!(index.reverse_postorder().len(), 2);
    }
}
