//! Simulator configuration.
//!
//! ```text
//! SimConfig
//! ├── leveling        # samatala::config::LevelingConfig
//! ├── surface         # true bed shape
//! ├── probe           # reading noise, failures, thermal drift
//! ├── thermal         # starting temperatures
//! └── random_seed     # 0 = entropy
//! ```
//!
//! Every section has defaults, so an empty file gives a flat bed measured
//! by a perfect probe.

use std::path::Path;

use samatala::config::LevelingConfig;
use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::surface::BedSurface;

/// Probe behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeModelConfig {
    /// Reading noise standard deviation (mm)
    #[serde(default)]
    pub noise_stddev: f32,

    /// Probability that a probe returns no reading
    #[serde(default)]
    pub failure_rate: f32,

    /// Trigger height shift per °C of probe temperature above
    /// `drift_reference` (µm)
    #[serde(default)]
    pub drift_um_per_c: f32,

    /// Probe temperature with no trigger shift (°C)
    #[serde(default = "default_drift_reference")]
    pub drift_reference: f32,

    /// Probe temperature rise per probing (°C)
    #[serde(default)]
    pub heating_per_probe: f32,
}

fn default_drift_reference() -> f32 {
    30.0
}

impl Default for ProbeModelConfig {
    fn default() -> Self {
        Self {
            noise_stddev: 0.0,
            failure_rate: 0.0,
            drift_um_per_c: 0.0,
            drift_reference: default_drift_reference(),
            heating_per_probe: 0.0,
        }
    }
}

/// Starting temperatures (°C); `None` means the sensor is not fitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThermalConfig {
    /// Probe thermistor
    #[serde(default)]
    pub probe: Option<f32>,
    /// Bed thermistor
    #[serde(default)]
    pub bed: Option<f32>,
    /// Hotend thermistor
    #[serde(default)]
    pub hotend: Option<f32>,
}

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfig {
    /// Leveling core settings
    #[serde(default)]
    pub leveling: LevelingConfig,

    /// True bed shape
    #[serde(default)]
    pub surface: BedSurface,

    /// Probe model
    #[serde(default)]
    pub probe: ProbeModelConfig,

    /// Starting temperatures
    #[serde(default)]
    pub thermal: ThermalConfig,

    /// Seed for probe noise (0 = entropy)
    #[serde(default)]
    pub random_seed: u64,
}

impl SimConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse YAML and validate
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot use
    pub fn validate(&self) -> Result<()> {
        self.leveling
            .validate()
            .map_err(|e| SimError::Config(e.to_string()))?;
        if !(0.0..=1.0).contains(&self.probe.failure_rate) {
            return Err(SimError::Config(format!(
                "probe.failure_rate {} outside 0..=1",
                self.probe.failure_rate
            )));
        }
        if self.probe.noise_stddev < 0.0 {
            return Err(SimError::Config(
                "probe.noise_stddev cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
