//! Points-to application layer

pub mod analyzer;

pub use analyzer::{AddressSharingAnalyzer, PointsToAnalysisResult};
