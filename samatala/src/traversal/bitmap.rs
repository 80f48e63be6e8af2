//! One bit per mesh cell.

use crate::core::{GridIndex, MeshGeometry};

/// Per-cell flag set, sized to a mesh geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellBitmap {
    width: usize,
    height: usize,
    words: Vec<u64>,
}

impl CellBitmap {
    /// Create a bitmap with every bit clear
    pub fn new(geometry: &MeshGeometry) -> Self {
        Self {
            width: geometry.width(),
            height: geometry.height(),
            words: vec![0; geometry.len().div_ceil(64)],
        }
    }

    #[inline]
    fn bit(&self, idx: GridIndex) -> Option<(usize, u64)> {
        if idx.x() >= self.width || idx.y() >= self.height {
            return None;
        }
        let n = idx.x() * self.height + idx.y();
        Some((n / 64, 1u64 << (n % 64)))
    }

    /// Set the flag of a cell
    #[inline]
    pub fn mark(&mut self, idx: GridIndex) {
        if let Some((word, mask)) = self.bit(idx) {
            self.words[word] |= mask;
        }
    }

    /// True if the cell is flagged
    #[inline]
    pub fn is_marked(&self, idx: GridIndex) -> bool {
        self.bit(idx)
            .is_some_and(|(word, mask)| self.words[word] & mask != 0)
    }

    /// Clear every flag
    pub fn reset(&mut self) {
        self.words.fill(0);
    }

    /// Number of flagged cells
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::XyPos;

    #[test]
    fn test_mark_and_reset() {
        let geometry =
            MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(10.0, 10.0), 9, 9).unwrap();
        let mut bits = CellBitmap::new(&geometry);
        let a = geometry.index(8, 8).unwrap();
        let b = geometry.index(0, 1).unwrap();
        bits.mark(a);
        bits.mark(b);
        assert!(bits.is_marked(a));
        assert!(!bits.is_marked(geometry.index(0, 0).unwrap()));
        assert_eq!(bits.count(), 2);
        bits.reset();
        assert_eq!(bits.count(), 0);
    }

    #[test]
    fn test_index_from_larger_mesh_is_not_aliased() {
        let small = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(30.0, 20.0), 4, 3).unwrap();
        let large = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(30.0, 50.0), 4, 6).unwrap();
        let mut bits = CellBitmap::new(&small);
        let foreign = large.index(0, 5).unwrap();
        bits.mark(foreign);
        assert_eq!(bits.count(), 0);
        assert!(!bits.is_marked(foreign));
        // (0,5) would land on (1,2) with a flat offset
        bits.mark(small.index(1, 2).unwrap());
        assert!(!bits.is_marked(foreign));
        assert_eq!(bits.count(), 1);
    }
}
