//! Copy analysis infrastructure
//!
//! - visitor: transfer functions over CFG operations
//! - solver: worklist fixpoint over blocks
//! - interprocedural: callee analysis on behalf of call sites
//! - summary_cache: LRU cache of callee results

pub mod interprocedural;
pub mod solver;
pub mod summary_cache;
pub mod visitor;

pub use interprocedural::{analyze_callee, AnalysisSession};
pub use solver::{CopyDataFlowSolver, SolverOutput};
pub use summary_cache::{InterproceduralSummary, SummaryCache, SummaryKey};
pub use visitor::{
    set_abstract_value, strip_owned_entities, AddressSharing, BlockOutput,
    CopyDataFlowOperationVisitor, PredicateCompare,
};
