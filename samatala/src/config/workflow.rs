//! Workflow behavior settings.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::strategy::StrategyKind;
use crate::traversal::SearchMode;

/// Workflow settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowSection {
    /// How the next probe point is chosen
    #[serde(default)]
    pub search_mode: SearchMode,
    /// Correction model used by the motion path
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Largest accepted shim thickness for manual probing (mm)
    #[serde(default = "defaults::max_shim_thickness")]
    pub max_shim_thickness: f32,
    /// Height at which correction fades out (mm, 0 disables)
    #[serde(default = "defaults::fade_height")]
    pub fade_height: f32,
    /// Omit spacer rows in human-readable maps
    #[serde(default)]
    pub compact_map: bool,
    /// Seed for the furthest-point jitter (random when absent)
    #[serde(default)]
    pub jitter_seed: Option<u64>,
    /// Nozzle travel per encoder click (mm)
    #[serde(default = "defaults::encoder_step")]
    pub encoder_step: f32,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::default(),
            strategy: StrategyKind::default(),
            max_shim_thickness: defaults::max_shim_thickness(),
            fade_height: defaults::fade_height(),
            compact_map: false,
            jitter_seed: None,
            encoder_step: defaults::encoder_step(),
        }
    }
}
