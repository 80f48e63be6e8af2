//! Spatial traversal over the mesh.
//!
//! Two independent tools:
//! - [`HilbertCurve`]: space-filling enumeration of the grid, used to walk
//!   outward from a start cell without allocating a candidate list
//! - [`find_closest`] / [`find_furthest_invalid`]: selection of the next
//!   cell to probe, edit, or invalidate
//!
//! Every selection honors a caller-supplied reachability predicate; cells
//! the probe or nozzle cannot reach are never returned.

mod bitmap;
mod hilbert;
mod search;

pub use bitmap::CellBitmap;
pub use hilbert::{HilbertCurve, HilbertIter};
pub use search::{MeshPointType, NearestQuery, SearchMode, find_closest, find_furthest_invalid};
