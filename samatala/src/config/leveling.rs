//! Top-level `LevelingConfig`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::{
    BedSection, CompensationSection, MeshSection, ProbeSection, StorageSection, WorkflowSection,
};
use crate::compensation::SensorKind;
use crate::core::MeshGeometry;

/// Full leveling configuration loaded from YAML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LevelingConfig {
    /// Mesh bounds and resolution
    #[serde(default)]
    pub mesh: MeshSection,

    /// Bed size
    #[serde(default)]
    pub bed: BedSection,

    /// Probe settings
    #[serde(default)]
    pub probe: ProbeSection,

    /// Workflow behavior
    #[serde(default)]
    pub workflow: WorkflowSection,

    /// Probe temperature compensation
    #[serde(default)]
    pub compensation: CompensationSection,

    /// Mesh storage layout
    #[serde(default)]
    pub storage: StorageSection,
}

impl LevelingConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load from default config path (configs/leveling.yaml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new("configs/leveling.yaml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Mesh geometry described by the `mesh` section
    pub fn geometry(&self) -> Result<MeshGeometry, ConfigError> {
        self.mesh
            .geometry()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject settings no printer could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let geometry = self.geometry()?;
        if !self.bed.contains(geometry.min()) || !self.bed.contains(geometry.max()) {
            return Err(ConfigError::Invalid(format!(
                "mesh {}..{} extends past the {}x{} bed",
                geometry.min(),
                geometry.max(),
                self.bed.size_x,
                self.bed.size_y
            )));
        }
        for sensor in SensorKind::ALL {
            let grid = self.compensation.grid(sensor);
            if !(grid.temp_resolution > 0.0) || grid.measurements == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} compensation needs a positive step and at least one measurement",
                    sensor
                )));
            }
            if let Some(k) = self.compensation.linear_extrapolation {
                if k == 0 || k > grid.measurements {
                    return Err(ConfigError::Invalid(format!(
                        "linear_extrapolation {} outside 1..={} for {}",
                        k, grid.measurements, sensor
                    )));
                }
            }
        }
        if !(self.workflow.max_shim_thickness > 0.0) {
            return Err(ConfigError::Invalid(
                "max_shim_thickness must be positive".to_string(),
            ));
        }
        if self.workflow.fade_height < 0.0 {
            return Err(ConfigError::Invalid(
                "fade_height cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
