//! Copy analysis application layer

pub mod analyzer;
pub mod context;

pub use analyzer::CopyAnalysis;
pub use context::{ArgumentInfo, CopyAnalysisContext, InterproceduralAnalysisData, WellKnownTypes};
