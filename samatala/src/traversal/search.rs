//! Selection of the next mesh cell to work on.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{CellBitmap, HilbertCurve};
use crate::core::{GridIndex, XyPos};
use crate::mesh::MeshGrid;

/// Weight of the travel distance from the current tool position.
const TRAVEL_WEIGHT: f32 = 0.1;

/// Classification a selected cell must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshPointType {
    /// Cell holds `NaN`
    Invalid,
    /// Cell holds a measurement
    Real,
    /// Cell is not yet marked in the session bitmap
    NotVisited,
}

/// Nearest-cell search strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Score every cell and keep the lowest composite distance
    #[default]
    BruteForce,
    /// First match along the Hilbert curve from the cell nearest the anchor
    Curve,
}

/// Parameters of a nearest-cell search.
#[derive(Clone, Copy, Debug)]
pub struct NearestQuery<'a> {
    /// Required cell classification
    pub kind: MeshPointType,
    /// Position the search is centered on (nozzle coordinates)
    pub anchor: XyPos,
    /// When set, distances are measured from `anchor + offset` (the probe)
    pub probe_offset: Option<XyPos>,
    /// Current tool position, used for the travel bias
    pub current: XyPos,
    /// Session bitmap consulted for [`MeshPointType::NotVisited`]
    pub visited: Option<&'a CellBitmap>,
}

impl NearestQuery<'_> {
    /// Reference point distances are measured from
    #[inline]
    pub fn reference(&self) -> XyPos {
        match self.probe_offset {
            Some(offset) => self.anchor + offset,
            None => self.anchor,
        }
    }

    fn matches(&self, mesh: &MeshGrid, idx: GridIndex) -> bool {
        match self.kind {
            MeshPointType::Invalid => !mesh.is_defined(idx),
            MeshPointType::Real => mesh.is_defined(idx),
            MeshPointType::NotVisited => !self.visited.is_some_and(|bits| bits.is_marked(idx)),
        }
    }
}

/// Find the reachable cell of the requested type closest to the query.
///
/// In [`SearchMode::BruteForce`] the score is the distance from the
/// reference point plus a tenth of the distance from the current tool
/// position; ties keep the first cell in x-major order. In
/// [`SearchMode::Curve`] the first matching cell along the Hilbert curve
/// wins, so the two modes can disagree when candidates are equidistant.
pub fn find_closest<F>(
    mesh: &MeshGrid,
    query: &NearestQuery<'_>,
    mut reachable: F,
    mode: SearchMode,
) -> Option<GridIndex>
where
    F: FnMut(XyPos) -> bool,
{
    match mode {
        SearchMode::BruteForce => {
            let reference = query.reference();
            let mut best: Option<(GridIndex, f32)> = None;
            for idx in mesh.indices() {
                if !query.matches(mesh, idx) {
                    continue;
                }
                let pos = mesh.position(idx);
                if !reachable(pos) {
                    continue;
                }
                let score = reference.distance(&pos) + query.current.distance(&pos) * TRAVEL_WEIGHT;
                if best.is_none_or(|(_, d)| score < d) {
                    best = Some((idx, score));
                }
            }
            best.map(|(idx, _)| idx)
        }
        SearchMode::Curve => HilbertCurve::new(mesh.geometry())
            .search_from_closest(query.anchor)
            .find(|idx| query.matches(mesh, *idx) && reachable(mesh.position(*idx))),
    }
}

/// Find the probe-reachable undefined cell that is furthest from any defined cell.
///
/// Distances are in cell units with a small random jitter so that, late in
/// a run, equally isolated cells are not picked in a fixed sweep. When no
/// cell is defined yet the grid center is returned when reachable.
pub fn find_furthest_invalid<F, R>(
    mesh: &MeshGrid,
    mut reachable: F,
    rng: &mut R,
) -> Option<GridIndex>
where
    F: FnMut(XyPos) -> bool,
    R: Rng + ?Sized,
{
    let defined: Vec<GridIndex> = mesh.defined().map(|(idx, _)| idx).collect();
    let mut first_invalid = None;
    let mut furthest: Option<(GridIndex, f32)> = None;

    for idx in mesh.indices() {
        if mesh.is_defined(idx) || !reachable(mesh.position(idx)) {
            continue;
        }
        first_invalid.get_or_insert(idx);

        let nearest = defined
            .iter()
            .map(|real| idx.cell_distance(real) + 1.0 / rng.gen_range(13..60) as f32)
            .reduce(f32::min);

        if let Some(d) = nearest {
            if furthest.is_none_or(|(_, best)| d > best) {
                furthest = Some((idx, d));
            }
        }
    }

    if defined.is_empty() {
        let geometry = mesh.geometry();
        let center = geometry.index(geometry.width() / 2, geometry.height() / 2);
        return center
            .filter(|idx| reachable(mesh.position(*idx)))
            .or(first_invalid);
    }
    furthest.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshGeometry;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn mesh(w: usize, h: usize) -> MeshGrid {
        // 10mm spacing starting at the origin
        let g = MeshGeometry::new(
            XyPos::new(0.0, 0.0),
            XyPos::new(10.0 * (w - 1) as f32, 10.0 * (h - 1) as f32),
            w,
            h,
        )
        .unwrap();
        MeshGrid::undefined(g)
    }

    fn query(kind: MeshPointType, at: XyPos) -> NearestQuery<'static> {
        NearestQuery {
            kind,
            anchor: at,
            probe_offset: None,
            current: at,
            visited: None,
        }
    }

    #[test]
    fn test_closest_invalid_brute_force() {
        let mut m = mesh(5, 5);
        m.set(m.index(2, 2).unwrap(), 0.0);
        let q = query(MeshPointType::Invalid, XyPos::new(20.0, 20.0));
        let found = find_closest(&m, &q, |_| true, SearchMode::BruteForce).unwrap();
        // Four equidistant neighbors; x-major order keeps (1, 2)
        assert_eq!(found, m.index(1, 2).unwrap());
    }

    #[test]
    fn test_closest_respects_reachability() {
        let m = mesh(5, 5);
        let q = query(MeshPointType::Invalid, XyPos::new(0.0, 0.0));
        for mode in [SearchMode::BruteForce, SearchMode::Curve] {
            let found = find_closest(&m, &q, |p| p.x >= 25.0, mode).unwrap();
            assert!(m.position(found).x >= 25.0);
        }
    }

    #[test]
    fn test_closest_uses_probe_reference() {
        let m = mesh(5, 5);
        let mut q = query(MeshPointType::Invalid, XyPos::new(0.0, 0.0));
        q.probe_offset = Some(XyPos::new(40.0, 40.0));
        q.current = XyPos::new(40.0, 40.0);
        let found = find_closest(&m, &q, |_| true, SearchMode::BruteForce).unwrap();
        assert_eq!(found, m.index(4, 4).unwrap());
    }

    #[test]
    fn test_travel_bias_breaks_reference_ties() {
        let m = mesh(3, 2);
        let mut q = query(MeshPointType::Invalid, XyPos::new(10.0, 5.0));
        q.current = XyPos::new(20.0, 10.0);
        let found = find_closest(&m, &q, |_| true, SearchMode::BruteForce).unwrap();
        assert_eq!(found, m.index(1, 1).unwrap());
    }

    #[test]
    fn test_closest_real_and_none() {
        let mut m = mesh(4, 4);
        let q = query(MeshPointType::Real, XyPos::new(0.0, 0.0));
        assert!(find_closest(&m, &q, |_| true, SearchMode::BruteForce).is_none());
        assert!(find_closest(&m, &q, |_| true, SearchMode::Curve).is_none());
        m.set(m.index(3, 3).unwrap(), 1.0);
        assert_eq!(
            find_closest(&m, &q, |_| true, SearchMode::Curve),
            m.index(3, 3)
        );
    }

    #[test]
    fn test_not_visited_uses_bitmap() {
        let m = mesh(2, 2);
        let mut bits = CellBitmap::new(m.geometry());
        bits.mark(m.index(0, 0).unwrap());
        let mut q = query(MeshPointType::NotVisited, XyPos::new(0.0, 0.0));
        q.visited = Some(&bits);
        let found = find_closest(&m, &q, |_| true, SearchMode::BruteForce).unwrap();
        assert_ne!(found, m.index(0, 0).unwrap());
    }

    #[test]
    fn test_curve_mode_starts_at_anchor() {
        let m = mesh(4, 4);
        let q = query(MeshPointType::Invalid, XyPos::new(30.0, 30.0));
        assert_eq!(
            find_closest(&m, &q, |_| true, SearchMode::Curve),
            m.index(3, 3)
        );
    }

    #[test]
    fn test_furthest_invalid_empty_mesh_is_center() {
        let m = mesh(5, 4);
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(find_furthest_invalid(&m, |_| true, &mut rng), m.index(2, 2));
    }

    #[test]
    fn test_furthest_invalid_picks_isolated_cell() {
        let mut m = mesh(5, 5);
        m.set(m.index(0, 0).unwrap(), 0.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let found = find_furthest_invalid(&m, |_| true, &mut rng).unwrap();
        assert_eq!(found, m.index(4, 4).unwrap());

        let found = find_furthest_invalid(&m, |p| p.x < 35.0, &mut rng).unwrap();
        assert_eq!(found, m.index(3, 4).unwrap());
    }

    #[test]
    fn test_furthest_invalid_none_when_full() {
        let mut m = mesh(3, 3);
        m.fill_all(0.0);
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(find_furthest_invalid(&m, |_| true, &mut rng).is_none());
    }
}
