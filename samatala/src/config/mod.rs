//! Leveling configuration loaded from YAML.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use samatala::config::LevelingConfig;
//!
//! // Load from default path (configs/leveling.yaml), falling back to defaults
//! let config = LevelingConfig::load_default()?;
//!
//! // Or build the mesh geometry directly
//! let geometry = LevelingConfig::default().geometry()?;
//! ```
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | [`MeshSection`] | Mesh bounds and point counts |
//! | [`BedSection`] | Physical bed size |
//! | [`ProbeSection`] | Probe offset, margins, tilt points, clearances |
//! | [`WorkflowSection`] | Search mode, strategy, fade, report options |
//! | [`CompensationSection`] | Probe temperature compensation grids |
//! | [`StorageSection`] | Mesh slot layout |
//!
//! ## Example YAML
//!
//! ```yaml
//! mesh:
//!   min_x: 10.0
//!   max_x: 210.0
//!   points_x: 10
//! probe:
//!   offset_x: -40.0
//!   offset_y: -10.0
//! workflow:
//!   search_mode: curve
//!   fade_height: 10.0
//! compensation:
//!   enabled: true
//!   linear_extrapolation: 2
//! storage:
//!   compressed: true
//! ```

mod compensation;
mod defaults;
mod error;
mod leveling;
mod mesh;
mod probe;
mod storage;
mod workflow;

pub use error::ConfigError;
pub use leveling::LevelingConfig;

pub use compensation::CompensationSection;
pub use mesh::{BedSection, MeshSection};
pub use probe::ProbeSection;
pub use storage::StorageSection;
pub use workflow::WorkflowSection;
