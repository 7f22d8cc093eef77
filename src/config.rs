use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::roots::ScanSettings;

// =============================================================================
// DEFAULTS
// =============================================================================
pub const DERIVATIVE_H: f64 = 1e-3;
pub const CLASSIFY_PROBE: f64 = 0.1;
pub const PARITY_TOLERANCE: f64 = 0.01;
pub const BOUND_LIMIT: f64 = 100.0;
pub const ASYMPTOTE_PROBE: f64 = 100.0;
pub const GROWTH_THRESHOLD: f64 = 1000.0;

/// Every numeric knob of the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub zeros: ScanSettings,
    pub critical: ScanSettings,
    pub derivative_step: f64,
    pub classify_probe: f64,
    pub parity_tolerance: f64,
    pub bound_points: Vec<f64>,
    pub bound_limit: f64,
    pub monotonic_points: Vec<f64>,
    pub convexity_points: Vec<f64>,
    pub asymptote_probe: f64,
    pub growth_threshold: f64,
    pub plot: PlotConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zeros: ScanSettings::default(),
            critical: ScanSettings {
                lower: -5.0,
                upper: 5.0,
                step: 0.2,
                merge_distance: 0.1,
                ..ScanSettings::default()
            },
            derivative_step: DERIVATIVE_H,
            classify_probe: CLASSIFY_PROBE,
            parity_tolerance: PARITY_TOLERANCE,
            bound_points: vec![-10.0, -5.0, -1.0, 0.0, 1.0, 5.0, 10.0],
            bound_limit: BOUND_LIMIT,
            monotonic_points: vec![-10.0, -5.0, -2.0, -1.0, 0.0, 1.0, 2.0, 5.0, 10.0],
            convexity_points: vec![-2.0, -1.0, 0.0, 1.0, 2.0],
            asymptote_probe: ASYMPTOTE_PROBE,
            growth_threshold: GROWTH_THRESHOLD,
            plot: PlotConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a TOML file; keys it does not mention keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |message: String| AnalysisError::Config {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: Self = toml::from_str(&content).map_err(|e| config_error(e.to_string()))?;
        config.validate().map_err(config_error)?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (name, scan) in [("zeros", &self.zeros), ("critical", &self.critical)] {
            if !(scan.step > 0.0) || !(scan.lower < scan.upper) {
                return Err(format!("{name}: need step > 0 and lower < upper"));
            }
        }
        if !(self.derivative_step > 0.0) {
            return Err("derivative_step must be positive".to_string());
        }
        if self.plot.divisions == 0 || self.plot.min_range == 0 || self.plot.min_range > self.plot.max_range {
            return Err("plot: need divisions > 0 and 0 < min_range <= max_range".to_string());
        }
        Ok(())
    }
}

/// Sampling of the plot table handed to the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub default_range: u32,
    pub min_range: u32,
    pub max_range: u32,
    pub divisions: usize,
    /// Samples at or beyond this magnitude become gaps.
    pub clip: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            default_range: 10,
            min_range: 1,
            max_range: 1000,
            divisions: 100,
            clip: 1000.0,
        }
    }
}

impl PlotConfig {
    pub fn clamp_range(&self, range: u32) -> u32 {
        range.clamp(self.min_range, self.max_range)
    }
}
