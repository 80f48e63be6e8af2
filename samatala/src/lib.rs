#![warn(missing_docs)]

//! # Samatala: Bed-Leveling Core for 3D Printers
//!
//! Measures the build plate, stores the result as a height mesh and turns
//! it into a Z correction for every XY the motion path visits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use samatala::config::LevelingConfig;
//! use samatala::io::SlotImage;
//! use samatala::workflow::{LevelingParams, LevelingWorkflow, Word};
//!
//! let config = LevelingConfig::load_default()?;
//! let mut store = SlotImage::from_config(&config.storage, config.geometry()?.len());
//! let mut workflow = LevelingWorkflow::new(config)?;
//! let mut session = workflow.new_session();
//!
//! // G29 P1 T
//! let params = LevelingParams {
//!     phase: Word::Value(1.0),
//!     map: Word::Seen,
//!     ..Default::default()
//! };
//! let outcome = workflow.execute(&mut printer, &mut session, &params, &mut store)?;
//! println!("{}", outcome.map.unwrap_or_default());
//! ```
//!
//! ## Coordinate Frame
//!
//! Bed positions are millimeters in the machine frame. Mesh column `i`
//! runs along X and row `j` along Y, with `(0, 0)` at the mesh minimum.
//! An undefined cell holds `NaN`.
//!
//! ## Architecture
//!
//! - [`core`]: positions, cell addresses, mesh geometry
//! - [`mesh`]: the height map and its 16-bit codec
//! - [`traversal`]: Hilbert enumeration and next-cell selection
//! - [`fit`]: incremental least-squares planes
//! - [`fill`]: extrapolation of undefined cells
//! - [`compensation`]: probe temperature compensation tables
//! - [`strategy`]: correction models queried by the motion path
//! - [`workflow`]: the phase state machine and host traits
//! - [`io`]: mesh slots, maps and export
//! - [`config`]: YAML configuration
//!
//! ## Data Flow
//!
//! ```text
//!   PrinterHost ──probe──► LevelingWorkflow ──► MeshGrid ──► LevelingStrategy
//!        ▲                   │      │                          │
//!        │                   │      └── PlaneFit (J tilt)      │ correction_at()
//!        └── move / enable ──┘                                 ▼
//!                                                         motion path
//! ```

pub mod compensation;
pub mod config;
pub mod core;
pub mod fill;
pub mod fit;
pub mod io;
pub mod mesh;
pub mod strategy;
pub mod traversal;
pub mod workflow;

mod error;

pub use error::{Error, Result};

pub use crate::core::{GridIndex, MeshGeometry, XyPos};
pub use config::LevelingConfig;
pub use mesh::{MeshGrid, MeshStatistics};
pub use workflow::{LevelingParams, LevelingSession, LevelingWorkflow, PrinterHost, WorkflowOutcome};
