/*
 * Copy Analysis - copy/alias dataflow over control flow graphs
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (AnalysisEntity, TypeInfo)
 * - features/    : Vertical slices (flow_graph → points_to → copy_analysis)
 * - config/      : Presets, builder overrides, YAML
 * - errors       : Crate-wide error type
 *
 * The library never installs a tracing subscriber; embedders choose one.
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::type_complexity)] // Edge maps keyed by (block, kind)

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{CopyAnalysisConfig, Preset};
pub use errors::{CopyAnalysisError, Result};
pub use features::copy_analysis::{
    CopyAbstractValue, CopyAbstractValueKind, CopyAnalysis, CopyAnalysisContext,
    CopyAnalysisResult, CopyBlockAnalysisResult, MethodProvider, PredicateValueKind,
    ProgramModel,
};
pub use features::flow_graph::{CfgBuilder, ControlFlowGraph, MethodSignature, Operation};
pub use shared::models::{AnalysisEntity, EntityFactory, TypeInfo};
