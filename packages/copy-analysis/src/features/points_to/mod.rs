//! Address-sharing part of points-to analysis
//!
//! Determines which entities name the same storage so that the copy analysis
//! can keep them in one copy set. Heap abstraction and may-alias queries are
//! out of scope.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AddressSharingAnalyzer, PointsToAnalysisResult};
pub use domain::AddressSharedEntities;
