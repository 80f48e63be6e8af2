//! Edge-inward extrapolation ("smart fill").
//!
//! Four scans run in turn: bottom edge looking up, top edge looking down,
//! left edge looking right, right edge looking left. Along each scan line
//! the first undefined cell backed by two defined cells in the scan
//! direction is extrapolated, then the line is abandoned. Cells filled by
//! an earlier scan count as defined for later ones.

use log::debug;

use crate::core::GridIndex;
use crate::mesh::MeshGrid;

/// Extrapolated value from the nearer (`v1`) and farther (`v2`) neighbor.
///
/// Keeps `v1` when the surface rises away from the gap, otherwise
/// continues the slope. This always picks the lower of the two candidates.
#[inline]
pub fn extrapolate(v1: f32, v2: f32) -> f32 {
    if v1 < v2 { v1 } else { v1 + v1 - v2 }
}

fn fill_one(mesh: &mut MeshGrid, idx: GridIndex, dx: i32, dy: i32) -> bool {
    if mesh.is_defined(idx) {
        return false;
    }
    let geometry = *mesh.geometry();
    let (x, y) = (idx.x() as i32, idx.y() as i32);
    let (Some(near), Some(far)) = (
        geometry.index_signed(x + dx, y + dy),
        geometry.index_signed(x + 2 * dx, y + 2 * dy),
    ) else {
        return false;
    };
    let (v1, v2) = (mesh.get(near), mesh.get(far));
    if v1.is_nan() || v2.is_nan() {
        return false;
    }
    mesh.set(idx, extrapolate(v1, v2));
    true
}

#[inline]
fn scan_position(step: usize, len: usize, dir: i32) -> usize {
    if dir > 0 { step } else { len - 1 - step }
}

/// Run the four edge scans once. Returns the number of cells filled.
pub fn smart_fill_pass(mesh: &mut MeshGrid) -> usize {
    let (w, h) = (mesh.geometry().width(), mesh.geometry().height());
    let mut filled = 0;

    // Columns scanned along Y
    for dir in [1i32, -1] {
        for x in 0..w {
            for step in 0..h {
                let Some(idx) = mesh.index(x, scan_position(step, h, dir)) else {
                    continue;
                };
                if fill_one(mesh, idx, 0, dir) {
                    filled += 1;
                    break;
                }
            }
        }
    }
    // Rows scanned along X
    for dir in [1i32, -1] {
        for y in 0..h {
            for step in 0..w {
                let Some(idx) = mesh.index(scan_position(step, w, dir), y) else {
                    continue;
                };
                if fill_one(mesh, idx, dir, 0) {
                    filled += 1;
                    break;
                }
            }
        }
    }
    filled
}

/// Repeat [`smart_fill_pass`] until a pass fills nothing.
///
/// Returns the total number of cells filled. A second call on the result
/// is a no-op.
pub fn smart_fill(mesh: &mut MeshGrid) -> usize {
    let mut total = 0;
    loop {
        let filled = smart_fill_pass(mesh);
        if filled == 0 {
            break;
        }
        total += filled;
    }
    debug!(
        "[Fill] Smart fill extrapolated {} cells, {} still undefined",
        total,
        mesh.geometry().len() - mesh.defined_count()
    );
    total
}
