//! Weighted least-squares extrapolation of undefined cells.

use std::ops::ControlFlow;

use log::{debug, warn};
use thiserror::Error;

use crate::core::GridIndex;
use crate::fit::{FitError, LinearFitAccumulator};
use crate::mesh::MeshGrid;

/// Reasons a weighted fill stops early.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FillError {
    /// The plane for one cell could not be solved
    #[error("Insufficient data to extrapolate {index}: {source}")]
    Fit {
        /// Cell being filled when the fit failed
        index: GridIndex,
        /// Underlying fit failure
        source: FitError,
    },
    /// The progress callback asked to stop
    #[error("Fill cancelled after {filled} cells")]
    Cancelled {
        /// Cells written before cancellation
        filled: usize,
    },
}

/// Fill every undefined cell from a distance-weighted plane fit.
///
/// Each sample is weighted `1 + weight_scale / distance`, so nearby
/// measurements dominate while distant ones still anchor the slope. Only
/// cells defined before the call contribute; cells filled during the pass
/// are never used as samples.
///
/// `progress` runs after every filled cell with the cell and its new value;
/// returning [`ControlFlow::Break`] stops the pass, keeping cells already
/// written.
pub fn fill_weighted<F>(
    mesh: &mut MeshGrid,
    weight_scale: f32,
    mut progress: F,
) -> Result<usize, FillError>
where
    F: FnMut(GridIndex, f32) -> ControlFlow<()>,
{
    let samples: Vec<(f32, f32, f32)> = mesh
        .defined()
        .map(|(idx, z)| {
            let pos = mesh.position(idx);
            (pos.x, pos.y, z)
        })
        .collect();
    let targets: Vec<GridIndex> = mesh.indices().filter(|idx| !mesh.is_defined(*idx)).collect();

    debug!(
        "[Fill] Weighted fill of {} cells from {} samples (scale {:.3})",
        targets.len(),
        samples.len(),
        weight_scale
    );

    let mut filled = 0;
    for idx in targets {
        let pos = mesh.position(idx);
        let mut acc = LinearFitAccumulator::new();
        for &(x, y, z) in &samples {
            let distance = (x - pos.x).hypot(y - pos.y);
            acc.accumulate_weighted(x, y, z, 1.0 + weight_scale / distance);
        }
        let plane = acc.finish().map_err(|source| {
            warn!("[Fill] Insufficient data at {}: {}", idx, source);
            FillError::Fit { index: idx, source }
        })?;

        let z = plane.z_at(pos.x, pos.y);
        mesh.set(idx, z);
        filled += 1;

        if progress(idx, z).is_break() {
            return Err(FillError::Cancelled { filled });
        }
    }
    Ok(filled)
}
