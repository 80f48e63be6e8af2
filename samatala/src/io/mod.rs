//! Mesh input and output.
//!
//! - [`storage`]: numbered mesh slots and temperature tables in a byte image,
//!   optionally persisted to a file
//! - [`report`]: topography maps and command-text export

pub mod report;
pub mod storage;

pub use report::{MapFormat, export_mesh, render_map};
pub use storage::{CalibrationStore, MeshStore, SlotImage, SlotLayout, StorageError};
