//! Filling of undefined mesh cells.
//!
//! Both strategies leave defined cells untouched:
//! - [`smart_fill`]: quick edge-inward linear extrapolation
//! - [`fill_weighted`]: per-cell weighted least-squares plane over the
//!   cells that were defined before the pass started

mod edge;
mod weighted;

pub use edge::{extrapolate, smart_fill, smart_fill_pass};
pub use weighted::{FillError, fill_weighted};
