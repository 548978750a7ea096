//! Copy analysis domain
//!
//! - CopyAbstractValue: copy set + kind lattice
//! - CopyAbstractValueDomain / CopyAnalysisMapDomain: joins
//! - CopyAnalysisData: per-block state with predicated overlays
//! - CopyAnalysisResult: snapshots handed to consumers

pub mod abstract_value;
pub mod analysis_data;
pub mod map_domain;
pub mod predicate;
pub mod result;
pub mod value_domain;

pub use abstract_value::{CopyAbstractValue, CopyAbstractValueKind};
pub use analysis_data::{CopyAnalysisData, PredicatedData};
pub use map_domain::{CopyAnalysisMap, CopyAnalysisMapDomain};
pub use predicate::PredicateValueKind;
pub use result::{CopyAnalysisResult, CopyBlockAnalysisResult, ReturnValueAndPredicateKind};
pub use value_domain::CopyAbstractValueDomain;
