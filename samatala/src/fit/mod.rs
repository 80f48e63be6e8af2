//! Incremental least-squares plane fitting.
//!
//! [`LinearFitAccumulator`] keeps only running sums, so samples can be
//! streamed in as they are probed and the accumulator can outlive an
//! interrupted session. [`PlaneFit`] is the solved plane `z = A·x + B·y + D`.

mod accumulator;
mod plane;

pub use accumulator::{FitError, LinearFitAccumulator};
pub use plane::{PlaneFit, TiltRotation};
