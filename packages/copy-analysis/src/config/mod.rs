//! Configuration system
//!
//! Presets for the common cases, builder setters for partial adjustment and
//! versioned YAML for complete control. Every configuration is validated
//! (range checks plus cross-field consistency) before an analysis uses it.

pub mod analysis_config;
pub mod error;
pub mod preset;

// Re-exports
pub use analysis_config::{
    ConfigExportV1, ConfigOverrides, CopyAnalysisConfig, InterproceduralAnalysisConfig,
    InterproceduralAnalysisKind, PointsToAnalysisKind,
};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
