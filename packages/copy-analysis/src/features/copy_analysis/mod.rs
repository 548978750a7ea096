//! Copy analysis
//!
//! Tracks, per program point, which storage locations hold copies of the same
//! value or reference. Each location maps to its copy set (a group that
//! includes the location itself) tagged with a kind:
//!
//! ```text
//! NotApplicable < Invalid < KnownValueCopy < KnownReferenceCopy < Unknown
//! ```
//!
//! Joins intersect copy sets, so a copy survives a merge point only if it
//! holds on every incoming path. Branch conditions comparing two locations
//! refine the state on each side, and a boolean assigned from a comparison
//! carries both refinements until it is tested.
//!
//! ## Usage
//! ```text
//! use copy_analysis::features::copy_analysis::{CopyAnalysis, ProgramModel};
//!
//! let program = ProgramModel::new().with(callee_cfg);
//! let mut analysis = CopyAnalysis::new(CopyAnalysisConfig::default(), &program)?;
//! let result = analysis.analyze(&cfg)?;
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{CopyAnalysis, CopyAnalysisContext, WellKnownTypes};
pub use domain::{
    CopyAbstractValue, CopyAbstractValueKind, CopyAnalysisData, CopyAnalysisMap,
    CopyAnalysisResult, CopyBlockAnalysisResult, PredicateValueKind, ReturnValueAndPredicateKind,
};
pub use ports::{MethodProvider, NoMethods, ProgramModel};
