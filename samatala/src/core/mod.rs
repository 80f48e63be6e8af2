//! Core types shared by every leveling component.
//!
//! Coordinates follow the printer's machine frame:
//! - **X-axis**: left to right across the bed, millimeters
//! - **Y-axis**: front to back, millimeters
//! - Mesh column `i` maps to X, mesh row `j` maps to Y
//!
//! ## Type Categories
//!
//! - [`XyPos`]: floating-point bed position in millimeters
//! - [`GridIndex`]: validated `(x, y)` mesh cell address
//! - [`MeshGeometry`]: bed area covered by the mesh and the cell spacing

mod geometry;
mod point;

pub use geometry::{GridIndices, MeshGeometry};
pub use point::{GridIndex, XyPos};
