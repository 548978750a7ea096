//! Feature modules

pub mod copy_analysis;
pub mod flow_graph;
pub mod points_to;
