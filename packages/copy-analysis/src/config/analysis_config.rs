//! Copy analysis configuration
//!
//! Level 1: `CopyAnalysisConfig::from_preset(Preset::Fast)`
//! Level 2: builder overrides (`.max_call_chain(5).pessimistic_analysis(true)`)
//! Level 3: YAML (`CopyAnalysisConfig::from_yaml("analysis.yaml")`)

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;

/// Supported YAML schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Interprocedural analysis mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterproceduralAnalysisKind {
    /// Calls are never analyzed; invocations are handled conservatively
    None,

    /// Callees are analyzed per call site with the caller's data
    ContextSensitive,
}

/// How much of the points-to information feeds address sharing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsToAnalysisKind {
    /// No points-to input; no address-shared entities
    None,

    /// Address sharing for locals and parameters only
    PartialWithoutTrackingFieldsAndProperties,

    /// Address sharing for all entities, including member projections
    Complete,
}

/// Interprocedural settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterproceduralAnalysisConfig {
    /// Analysis mode
    pub kind: InterproceduralAnalysisKind,

    /// Maximum length of the analyzed call chain
    pub max_call_chain: usize,

    /// Capacity of the callee result cache
    pub summary_cache_size: usize,
}

impl InterproceduralAnalysisConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_call_chain == 0 || self.max_call_chain > 64 {
            return Err(ConfigError::range_with_hint(
                "interprocedural.max_call_chain",
                self.max_call_chain,
                1,
                64,
                "Use kind: none to disable interprocedural analysis",
            ));
        }

        if self.summary_cache_size == 0 || self.summary_cache_size > 1_000_000 {
            return Err(ConfigError::range_with_hint(
                "interprocedural.summary_cache_size",
                self.summary_cache_size,
                1,
                1_000_000,
                "Cache capacity must be positive",
            ));
        }

        Ok(())
    }

    /// Whether callees are analyzed at all
    pub fn is_enabled(&self) -> bool {
        self.kind != InterproceduralAnalysisKind::None
    }
}

impl Default for InterproceduralAnalysisConfig {
    fn default() -> Self {
        Self {
            kind: InterproceduralAnalysisKind::ContextSensitive,
            max_call_chain: 3,
            summary_cache_size: 1024,
        }
    }
}

/// Copy analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyAnalysisConfig {
    /// Interprocedural settings
    pub interprocedural: InterproceduralAnalysisConfig,

    /// Points-to input used for address-shared entities
    pub points_to_kind: PointsToAnalysisKind,

    /// Unanalyzable calls invalidate member entities of their arguments
    pub pessimistic_analysis: bool,

    /// Model exception edges
    pub exception_paths_analysis: bool,

    /// Validate analysis data invariants after every mutation
    pub strict_validation: bool,

    /// Visits of a loop header before multi-entity values are widened away
    pub widening_threshold: usize,

    /// Iteration budget of the worklist solver (per analyzed method)
    pub max_iterations: usize,
}

impl CopyAnalysisConfig {
    /// Create configuration from a preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                interprocedural: InterproceduralAnalysisConfig {
                    kind: InterproceduralAnalysisKind::None,
                    max_call_chain: 1,
                    summary_cache_size: 64,
                },
                points_to_kind: PointsToAnalysisKind::None,
                pessimistic_analysis: false,
                exception_paths_analysis: false,
                strict_validation: false,
                widening_threshold: 2,
                max_iterations: 1_000,
            },
            Preset::Balanced => Self {
                interprocedural: InterproceduralAnalysisConfig::default(),
                points_to_kind: PointsToAnalysisKind::PartialWithoutTrackingFieldsAndProperties,
                pessimistic_analysis: false,
                exception_paths_analysis: false,
                strict_validation: false,
                widening_threshold: 3,
                max_iterations: 10_000,
            },
            Preset::Thorough => Self {
                interprocedural: InterproceduralAnalysisConfig {
                    kind: InterproceduralAnalysisKind::ContextSensitive,
                    max_call_chain: 10,
                    summary_cache_size: 10_000,
                },
                points_to_kind: PointsToAnalysisKind::Complete,
                pessimistic_analysis: true,
                exception_paths_analysis: true,
                strict_validation: false,
                widening_threshold: 5,
                max_iterations: 100_000,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.interprocedural.validate()?;

        if self.widening_threshold == 0 || self.widening_threshold > 100 {
            return Err(ConfigError::range_with_hint(
                "widening_threshold",
                self.widening_threshold,
                1,
                100,
                "Loop headers must be visited at least once before widening",
            ));
        }

        if self.max_iterations < 10 || self.max_iterations > 10_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                10,
                10_000_000,
                "Iteration budget must be reasonable",
            ));
        }

        if self.max_iterations < self.widening_threshold {
            return Err(ConfigError::conflict(
                "max_iterations is smaller than widening_threshold",
                "raise max_iterations or lower widening_threshold",
            ));
        }

        Ok(())
    }

    /// Builder: Set interprocedural kind
    pub fn interprocedural_kind(mut self, v: InterproceduralAnalysisKind) -> Self {
        self.interprocedural.kind = v;
        self
    }

    /// Builder: Set max_call_chain
    pub fn max_call_chain(mut self, v: usize) -> Self {
        self.interprocedural.max_call_chain = v;
        self
    }

    /// Builder: Set summary_cache_size
    pub fn summary_cache_size(mut self, v: usize) -> Self {
        self.interprocedural.summary_cache_size = v;
        self
    }

    /// Builder: Set points_to_kind
    pub fn points_to_kind(mut self, v: PointsToAnalysisKind) -> Self {
        self.points_to_kind = v;
        self
    }

    /// Builder: Set pessimistic_analysis
    pub fn pessimistic_analysis(mut self, v: bool) -> Self {
        self.pessimistic_analysis = v;
        self
    }

    /// Builder: Set exception_paths_analysis
    pub fn exception_paths_analysis(mut self, v: bool) -> Self {
        self.exception_paths_analysis = v;
        self
    }

    /// Builder: Set strict_validation
    pub fn strict_validation(mut self, v: bool) -> Self {
        self.strict_validation = v;
        self
    }

    /// Builder: Set widening_threshold
    pub fn widening_threshold(mut self, v: usize) -> Self {
        self.widening_threshold = v;
        self
    }

    /// Builder: Set max_iterations
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.max_iterations = v;
        self
    }

    /// Load configuration from a YAML file
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// The document names a preset; fields under `overrides` replace the
    /// preset's values.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        if !SUPPORTED_VERSIONS.contains(&export.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = export
            .preset
            .parse::<Preset>()
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let config = match export.overrides {
            Some(overrides) => overrides.apply(Self::from_preset(preset)),
            None => Self::from_preset(preset),
        };

        config.validate()?;
        Ok(config)
    }

    /// Export configuration as YAML (all fields as overrides of `balanced`)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: Preset::Balanced.to_string(),
            overrides: Some(ConfigOverrides::from_config(self)),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}

impl Default for CopyAnalysisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

/// YAML document (schema v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigExportV1 {
    pub version: u32,
    pub preset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Partial overrides; absent fields keep the preset's value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interprocedural: Option<InterproceduralAnalysisConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_to_kind: Option<PointsToAnalysisKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pessimistic_analysis: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_paths_analysis: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_validation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widening_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

impl ConfigOverrides {
    fn from_config(config: &CopyAnalysisConfig) -> Self {
        Self {
            interprocedural: Some(config.interprocedural.clone()),
            points_to_kind: Some(config.points_to_kind),
            pessimistic_analysis: Some(config.pessimistic_analysis),
            exception_paths_analysis: Some(config.exception_paths_analysis),
            strict_validation: Some(config.strict_validation),
            widening_threshold: Some(config.widening_threshold),
            max_iterations: Some(config.max_iterations),
        }
    }

    fn apply(self, mut config: CopyAnalysisConfig) -> CopyAnalysisConfig {
        if let Some(v) = self.interprocedural {
            config.interprocedural = v;
        }
        if let Some(v) = self.points_to_kind {
            config.points_to_kind = v;
        }
        if let Some(v) = self.pessimistic_analysis {
            config.pessimistic_analysis = v;
        }
        if let Some(v) = self.exception_paths_analysis {
            config.exception_paths_analysis = v;
        }
        if let Some(v) = self.strict_validation {
            config.strict_validation = v;
        }
        if let Some(v) = self.widening_threshold {
            config.widening_threshold = v;
        }
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
            assert!(CopyAnalysisConfig::from_preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_invalid_call_chain() {
        let config = CopyAnalysisConfig::default().max_call_chain(0);
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_widening_conflict() {
        let config = CopyAnalysisConfig::default()
            .widening_threshold(50)
            .max_iterations(20);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict { .. })));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
version: 1
preset: fast
overrides:
  pessimistic_analysis: true
  widening_threshold: 4
"#;
        let config = CopyAnalysisConfig::from_yaml_str(yaml).unwrap();
        assert!(config.pessimistic_analysis);
        assert_eq!(config.widening_threshold, 4);
        assert_eq!(
            config.interprocedural.kind,
            InterproceduralAnalysisKind::None
        );
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CopyAnalysisConfig::from_preset(Preset::Thorough).strict_validation(true);
        let yaml = config.to_yaml().unwrap();
        let recovered = CopyAnalysisConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config, recovered);
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let yaml = "version: 2\npreset: fast\n";
        assert!(matches!(
            CopyAnalysisConfig::from_yaml_str(yaml),
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_preset() {
        let yaml = "version: 1\npreset: turbo\n";
        assert!(matches!(
            CopyAnalysisConfig::from_yaml_str(yaml),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
