//! Hilbert curve enumeration of mesh cells.
//!
//! The curve covers the smallest power-of-two square that holds the grid.
//! Frames are kept in doubled fixed-point so that halving a frame vector
//! stays integral down to the single-cell level; cells outside the real
//! grid are pruned as they are produced.
//!
//! Visiting order for a 4x4 grid (row 0 at the bottom):
//!
//! ```text
//!   y=3   15  12  11  10
//!   y=2   14  13   8   9
//!   y=1    1   2   7   6
//!   y=0    0   3   4   5
//! ```

use crate::core::{GridIndex, MeshGeometry, XyPos};

/// One pending sub-square of the recursive subdivision.
#[derive(Clone, Copy, Debug)]
struct Frame {
    x: i32,
    y: i32,
    xi: i32,
    xj: i32,
    yi: i32,
    yj: i32,
    depth: u32,
}

/// Hilbert enumeration sized for one mesh geometry.
#[derive(Clone, Copy, Debug)]
pub struct HilbertCurve {
    geometry: MeshGeometry,
    order: u32,
    dim: i32,
}

impl HilbertCurve {
    /// Curve covering `geometry`
    pub fn new(geometry: &MeshGeometry) -> Self {
        let longest = geometry.width().max(geometry.height()) as u32;
        // Number of halvings needed to reach single cells
        let order = (longest - 1).ilog2() + 1;
        Self {
            geometry: *geometry,
            order,
            dim: 1 << order,
        }
    }

    /// Curve order (side of the covering square is `2^order`)
    #[inline]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Side of the covering square in cells
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim as usize
    }

    /// One full pass over every in-bounds cell.
    pub fn iter(&self) -> HilbertIter {
        let full = self.dim * 2;
        HilbertIter {
            geometry: self.geometry,
            stack: vec![Frame {
                x: 0,
                y: 0,
                xi: full,
                xj: 0,
                yi: 0,
                yj: full,
                depth: self.order,
            }],
        }
    }

    /// Enumerate starting at `start`.
    ///
    /// The first pass is skipped up to `start`, then a second full pass
    /// yields the cells that precede it. Cells after `start` therefore
    /// appear twice; consumers stop at their first match.
    pub fn search_from(&self, start: GridIndex) -> impl Iterator<Item = GridIndex> + use<> {
        self.iter()
            .skip_while(move |idx| *idx != start)
            .chain(self.iter())
    }

    /// [`search_from`](Self::search_from) the intersection nearest `pos`.
    pub fn search_from_closest(&self, pos: XyPos) -> impl Iterator<Item = GridIndex> + use<> {
        self.search_from(self.geometry.closest_index(pos))
    }
}

/// Lazy iterator produced by [`HilbertCurve::iter`].
///
/// Not restartable; create a new one with [`HilbertCurve::iter`].
#[derive(Clone, Debug)]
pub struct HilbertIter {
    geometry: MeshGeometry,
    stack: Vec<Frame>,
}

impl Iterator for HilbertIter {
    type Item = GridIndex;

    fn next(&mut self) -> Option<GridIndex> {
        while let Some(f) = self.stack.pop() {
            if f.depth == 0 {
                let cx = (f.x + (f.xi + f.yi) / 2) / 2;
                let cy = (f.y + (f.xj + f.yj) / 2) / 2;
                match self.geometry.index_signed(cx, cy) {
                    Some(idx) => return Some(idx),
                    None => continue,
                }
            }

            let d = f.depth - 1;
            let (hxi, hxj, hyi, hyj) = (f.xi / 2, f.xj / 2, f.yi / 2, f.yj / 2);
            // Pushed in reverse so the first quadrant pops first
            self.stack.push(Frame {
                x: f.x + hxi + f.yi,
                y: f.y + hxj + f.yj,
                xi: -hyi,
                xj: -hyj,
                yi: -hxi,
                yj: -hxj,
                depth: d,
            });
            self.stack.push(Frame {
                x: f.x + hxi + hyi,
                y: f.y + hxj + hyj,
                xi: hxi,
                xj: hxj,
                yi: hyi,
                yj: hyj,
                depth: d,
            });
            self.stack.push(Frame {
                x: f.x + hxi,
                y: f.y + hxj,
                xi: hxi,
                xj: hxj,
                yi: hyi,
                yj: hyj,
                depth: d,
            });
            self.stack.push(Frame {
                x: f.x,
                y: f.y,
                xi: hyi,
                xj: hyj,
                yi: hxi,
                yj: hxj,
                depth: d,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn geometry(w: usize, h: usize) -> MeshGeometry {
        MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(100.0, 100.0), w, h).unwrap()
    }

    #[test]
    fn test_order_and_dim() {
        assert_eq!(HilbertCurve::new(&geometry(2, 2)).dim(), 2);
        assert_eq!(HilbertCurve::new(&geometry(4, 3)).dim(), 4);
        assert_eq!(HilbertCurve::new(&geometry(5, 5)).dim(), 8);
        assert_eq!(HilbertCurve::new(&geometry(10, 7)).order(), 4);
    }

    #[test]
    fn test_order_one_sequence() {
        let curve = HilbertCurve::new(&geometry(2, 2));
        let cells: Vec<(usize, usize)> = curve.iter().map(|i| (i.x(), i.y())).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn test_order_two_sequence() {
        let curve = HilbertCurve::new(&geometry(4, 4));
        let cells: Vec<(usize, usize)> = curve.iter().map(|i| (i.x(), i.y())).take(8).collect();
        assert_eq!(
            cells,
            vec![(0, 0), (0, 1), (1, 1), (1, 0), (2, 0), (3, 0), (3, 1), (2, 1)]
        );
    }

    #[test]
    fn test_power_of_two_visits_each_cell_once() {
        for n in [2usize, 4, 8, 16] {
            let g = geometry(n, n);
            let cells: Vec<GridIndex> = HilbertCurve::new(&g).iter().collect();
            assert_eq!(cells.len(), n * n);
            let unique: HashSet<GridIndex> = cells.iter().copied().collect();
            assert_eq!(unique.len(), n * n);
        }
    }

    #[test]
    fn test_consecutive_cells_are_adjacent() {
        let g = geometry(8, 8);
        let cells: Vec<GridIndex> = HilbertCurve::new(&g).iter().collect();
        for pair in cells.windows(2) {
            let dx = pair[0].x().abs_diff(pair[1].x());
            let dy = pair[0].y().abs_diff(pair[1].y());
            assert_eq!(dx + dy, 1, "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_prunes_to_rectangular_grid() {
        let g = geometry(5, 3);
        let cells: HashSet<GridIndex> = HilbertCurve::new(&g).iter().collect();
        assert_eq!(cells.len(), 15);
        assert!(cells.iter().all(|c| c.x() < 5 && c.y() < 3));
    }

    #[test]
    fn test_search_from_covers_all_cells() {
        let g = geometry(4, 4);
        let curve = HilbertCurve::new(&g);
        let all: HashSet<GridIndex> = g.indices().collect();
        for start in g.indices() {
            let seq: Vec<GridIndex> = curve.search_from(start).collect();
            assert_eq!(seq[0], start);
            let seen: HashSet<GridIndex> = seq.iter().copied().collect();
            assert_eq!(seen, all);
        }
    }

    #[test]
    fn test_search_from_closest_snaps() {
        let g = geometry(4, 4);
        let curve = HilbertCurve::new(&g);
        let first = curve.search_from_closest(XyPos::new(95.0, 120.0)).next();
        assert_eq!(first, g.index(3, 3));
    }
}
