//! Flow graph infrastructure: construction and traversal

pub mod cfg_builder;
pub mod traversal;

pub use cfg_builder::CfgBuilder;
pub use traversal::FlowGraphIndex;
