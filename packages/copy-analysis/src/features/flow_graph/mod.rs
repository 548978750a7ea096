//! Flow graph feature
//!
//! Operation IR, basic-block CFG, builder and traversal order consumed by the
//! copy analysis.

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::{CfgBuilder, FlowGraphIndex};
