//! `MeshGrid`: fixed-size 2D array of bed heights.
//!
//! `NaN` is the only marker for an unprobed cell. Every accessor is keyed by
//! [`GridIndex`], so cell addressing cannot run past the grid.

use serde::{Deserialize, Serialize};

use crate::core::{GridIndex, GridIndices, MeshGeometry, XyPos};
use crate::error::{Error, Result};

/// Summary over the defined cells of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshStatistics {
    /// Number of defined cells
    pub count: usize,
    /// Mean height (mm)
    pub mean: f32,
    /// Spread of heights, normalised by `count + 1`
    pub std_dev: f32,
    /// Lowest defined height
    pub min: f32,
    /// Highest defined height
    pub max: f32,
}

/// Bed height map in millimeters.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGrid {
    geometry: MeshGeometry,
    values: Vec<f32>,
}

impl MeshGrid {
    /// Create a mesh with every cell set to zero
    pub fn zeroed(geometry: MeshGeometry) -> Self {
        Self {
            values: vec![0.0; geometry.len()],
            geometry,
        }
    }

    /// Create a mesh with every cell undefined
    pub fn undefined(geometry: MeshGeometry) -> Self {
        Self {
            values: vec![f32::NAN; geometry.len()],
            geometry,
        }
    }

    /// Build a mesh from column-major values (`values[x * H + y]`).
    pub fn from_values(geometry: MeshGeometry, values: Vec<f32>) -> Result<Self> {
        if values.len() != geometry.len() {
            return Err(Error::Geometry(format!(
                "expected {} mesh values, got {}",
                geometry.len(),
                values.len()
            )));
        }
        Ok(Self { geometry, values })
    }

    /// Build a mesh from rows listed front (`j = 0`) to back.
    pub fn from_rows(geometry: MeshGeometry, rows: &[&[f32]]) -> Result<Self> {
        if rows.len() != geometry.height() || rows.iter().any(|r| r.len() != geometry.width()) {
            return Err(Error::Geometry(format!(
                "row layout does not match {}x{} mesh",
                geometry.width(),
                geometry.height()
            )));
        }
        let mut mesh = Self::undefined(geometry);
        for idx in geometry.indices() {
            mesh.set(idx, rows[idx.y()][idx.x()]);
        }
        Ok(mesh)
    }

    /// Geometry this mesh was created with
    #[inline]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Raw column-major values
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Shorthand for `geometry().index(x, y)`
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<GridIndex> {
        self.geometry.index(x, y)
    }

    /// Iterate every index
    #[inline]
    pub fn indices(&self) -> GridIndices {
        self.geometry.indices()
    }

    /// Height at a cell, `NaN` if undefined
    #[inline]
    pub fn get(&self, idx: GridIndex) -> f32 {
        self.geometry
            .offset(idx)
            .and_then(|offset| self.values.get(offset))
            .copied()
            .unwrap_or(f32::NAN)
    }

    /// Set the height of a cell
    #[inline]
    pub fn set(&mut self, idx: GridIndex, z: f32) {
        if let Some(slot) = self
            .geometry
            .offset(idx)
            .and_then(|offset| self.values.get_mut(offset))
        {
            *slot = z;
        }
    }

    /// True if the cell holds a measurement
    #[inline]
    pub fn is_defined(&self, idx: GridIndex) -> bool {
        !self.get(idx).is_nan()
    }

    /// Bed position of a cell
    #[inline]
    pub fn position(&self, idx: GridIndex) -> XyPos {
        self.geometry.position(idx)
    }

    /// Set every cell, defined or not
    pub fn fill_all(&mut self, value: f32) {
        self.values.fill(value);
    }

    /// Mark every cell undefined
    pub fn invalidate_all(&mut self) {
        self.fill_all(f32::NAN);
    }

    /// Replace all values from a column-major slice of matching length
    pub fn load_values(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(Error::Geometry(format!(
                "expected {} mesh values, got {}",
                self.values.len(),
                values.len()
            )));
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Iterate `(index, height)` over defined cells
    pub fn defined(&self) -> impl Iterator<Item = (GridIndex, f32)> + '_ {
        self.indices()
            .map(|idx| (idx, self.get(idx)))
            .filter(|(_, z)| !z.is_nan())
    }

    /// Number of defined cells
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|z| !z.is_nan()).count()
    }

    /// True if no cell is `NaN`
    pub fn is_fully_defined(&self) -> bool {
        self.values.iter().all(|z| !z.is_nan())
    }

    /// Add `delta` to every defined cell
    pub fn shift_by(&mut self, delta: f32) {
        for z in self.values.iter_mut().filter(|z| !z.is_nan()) {
            *z += delta;
        }
    }

    /// Lowest defined height
    pub fn min(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|z| !z.is_nan())
            .reduce(f32::min)
    }

    /// Highest defined height
    pub fn max(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|z| !z.is_nan())
            .reduce(f32::max)
    }

    /// Mean and spread over defined cells, `None` when nothing is defined.
    ///
    /// The spread divides by `count + 1`, matching the firmware report users
    /// compare against.
    pub fn mean_and_stddev(&self) -> Option<MeshStatistics> {
        let (count, sum) = self
            .values
            .iter()
            .filter(|z| !z.is_nan())
            .fold((0usize, 0.0f32), |(n, s), z| (n + 1, s + z));
        if count == 0 {
            return None;
        }
        let mean = sum / count as f32;
        let sum_sq: f32 = self
            .values
            .iter()
            .filter(|z| !z.is_nan())
            .map(|z| (z - mean) * (z - mean))
            .sum();
        Some(MeshStatistics {
            count,
            mean,
            std_dev: (sum_sq / (count + 1) as f32).sqrt(),
            min: self.min().unwrap_or(mean),
            max: self.max().unwrap_or(mean),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(w: usize, h: usize) -> MeshGeometry {
        MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(100.0, 100.0), w, h).unwrap()
    }

    #[test]
    fn test_get_set_defined() {
        let mut mesh = MeshGrid::undefined(geometry(3, 3));
        let idx = mesh.index(1, 2).unwrap();
        assert!(!mesh.is_defined(idx));
        mesh.set(idx, 0.25);
        assert!(mesh.is_defined(idx));
        assert_eq!(mesh.get(idx), 0.25);
        assert_eq!(mesh.defined_count(), 1);
    }

    #[test]
    fn test_index_from_other_geometry_is_ignored() {
        let mut mesh = MeshGrid::zeroed(geometry(4, 3));
        let foreign = geometry(4, 6).index(0, 5).unwrap();
        mesh.set(foreign, 7.0);
        assert!(mesh.get(foreign).is_nan());
        assert!(!mesh.is_defined(foreign));
        assert!(mesh.values().iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_from_rows_layout() {
        let mesh =
            MeshGrid::from_rows(geometry(3, 2), &[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(mesh.get(mesh.index(0, 0).unwrap()), 1.0);
        assert_eq!(mesh.get(mesh.index(2, 0).unwrap()), 3.0);
        assert_eq!(mesh.get(mesh.index(1, 1).unwrap()), 5.0);
        assert!(MeshGrid::from_rows(geometry(3, 2), &[&[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_shift_skips_undefined() {
        let mut mesh =
            MeshGrid::from_rows(geometry(2, 2), &[&[1.0, f32::NAN], &[0.0, -1.0]]).unwrap();
        mesh.shift_by(0.5);
        assert_eq!(mesh.get(mesh.index(0, 0).unwrap()), 1.5);
        assert!(mesh.get(mesh.index(1, 0).unwrap()).is_nan());
        assert_eq!(mesh.min(), Some(-0.5));
        assert_eq!(mesh.max(), Some(1.5));
    }

    #[test]
    fn test_statistics() {
        let mesh =
            MeshGrid::from_rows(geometry(2, 2), &[&[1.0, 3.0], &[f32::NAN, 2.0]]).unwrap();
        let stats = mesh.mean_and_stddev().unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 2.0).abs() < 1e-6);
        // (1 + 1 + 0) / 4
        assert!((stats.std_dev - 0.5f32.sqrt()).abs() < 1e-6);
        assert!(MeshGrid::undefined(geometry(2, 2)).mean_and_stddev().is_none());
    }

    #[test]
    fn test_fill_and_invalidate() {
        let mut mesh = MeshGrid::zeroed(geometry(4, 3));
        assert!(mesh.is_fully_defined());
        mesh.invalidate_all();
        assert_eq!(mesh.defined_count(), 0);
        mesh.fill_all(0.1);
        assert_eq!(mesh.defined().count(), 12);
    }
}
