//! Numbered mesh slots.
//!
//! [`SlotImage`] packs fixed-size slots into one byte image, the way a
//! mesh is laid out in non-volatile memory. The image can be written to a
//! file with a small header:
//!
//! - Header (16 bytes):
//!   - Magic: "SMTLA" (5 bytes)
//!   - Version: u8
//!   - Layout: u8 (0 = f32, 1 = compressed i16)
//!   - Cells per slot: u32 (little-endian)
//!   - Slot count: u16 (little-endian)
//!   - Reserved: 3 bytes
//! - Slot data: slot count * cells * cell size bytes
//! - Calibration section:
//!   - Table count: u8
//!   - Per table: sensor u8, offset count u16, offsets i16 (little-endian)

use std::io::{Read, Write};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compensation::{CalibrationTable, ProbeTempCompensation, SensorKind};
use crate::config::StorageSection;
use crate::mesh::{MeshGrid, decode_z, encode_z};

/// Magic bytes of a slot image file
const MAGIC: &[u8; 5] = b"SMTLA";

/// Current format version
const VERSION: u8 = 2;

/// Header size in bytes
const HEADER_SIZE: usize = 16;

/// Storage failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// No slot fits into the available space
    #[error("?No unused mesh storage available")]
    NoStorage,
    /// Slot index outside the image
    #[error("?Invalid storage slot {slot}. Use 0 to {}.", .count.saturating_sub(1))]
    InvalidSlot {
        /// Requested slot
        slot: i32,
        /// Slots available
        count: usize,
    },
    /// Mesh and slot disagree on size
    #[error("Mesh has {found} cells, slots hold {expected}")]
    SizeMismatch {
        /// Cells per slot
        expected: usize,
        /// Cells in the mesh
        found: usize,
    },
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(String),
    /// File is not a slot image
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    /// File written by another format version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Supported version
        expected: u8,
        /// Version in the file
        found: u8,
    },
}

/// Encoding of heights inside a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotLayout {
    /// 32-bit float per cell
    Float,
    /// 16-bit micrometers per cell
    Compressed,
}

impl SlotLayout {
    /// Bytes per stored cell
    #[inline]
    pub fn cell_size(self) -> usize {
        match self {
            SlotLayout::Float => 4,
            SlotLayout::Compressed => 2,
        }
    }

    fn tag(self) -> u8 {
        match self {
            SlotLayout::Float => 0,
            SlotLayout::Compressed => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SlotLayout::Float),
            1 => Some(SlotLayout::Compressed),
            _ => None,
        }
    }
}

/// Persisted mesh slots addressed by index.
pub trait MeshStore {
    /// Number of slots available
    fn slot_count(&self) -> usize;

    /// Read a slot into `mesh`
    fn load(&self, slot: usize, mesh: &mut MeshGrid) -> Result<(), StorageError>;

    /// Write `mesh` into a slot
    fn store(&mut self, slot: usize, mesh: &MeshGrid) -> Result<(), StorageError>;
}

/// Persisted probe temperature compensation tables.
pub trait CalibrationStore {
    /// Copy the stored tables into `ptc`; returns how many were restored
    fn load_calibration(&self, ptc: &mut ProbeTempCompensation) -> Result<usize, StorageError>;

    /// Replace the stored tables with those of `ptc`
    fn store_calibration(&mut self, ptc: &ProbeTempCompensation) -> Result<(), StorageError>;
}

/// Byte image holding every slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotImage {
    layout: SlotLayout,
    cells: usize,
    slots: usize,
    data: Vec<u8>,
    calibration: Vec<(SensorKind, Vec<i16>)>,
}

impl SlotImage {
    /// Image with as many slots as fit into `capacity_bytes`, all undefined.
    pub fn new(layout: SlotLayout, cells: usize, capacity_bytes: usize) -> Self {
        let slot_size = cells * layout.cell_size();
        let slots = if slot_size == 0 {
            0
        } else {
            (capacity_bytes / slot_size).min(u16::MAX as usize)
        };
        let mut image = Self {
            layout,
            cells,
            slots,
            data: vec![0; slots * slot_size],
            calibration: Vec::new(),
        };
        for slot in 0..slots {
            image.write_values(slot, std::iter::repeat_n(f32::NAN, cells));
        }
        image
    }

    /// Image sized from the storage settings for meshes of `cells` cells
    pub fn from_config(section: &StorageSection, cells: usize) -> Self {
        let layout = if section.compressed {
            SlotLayout::Compressed
        } else {
            SlotLayout::Float
        };
        Self::new(layout, cells, section.capacity_bytes)
    }

    /// Height encoding
    #[inline]
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// Bytes per slot
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.cells * self.layout.cell_size()
    }

    fn check_slot(&self, slot: usize) -> Result<(), StorageError> {
        if self.slots == 0 {
            return Err(StorageError::NoStorage);
        }
        if slot >= self.slots {
            return Err(StorageError::InvalidSlot {
                slot: slot as i32,
                count: self.slots,
            });
        }
        Ok(())
    }

    fn write_values(&mut self, slot: usize, values: impl Iterator<Item = f32>) {
        let size = self.layout.cell_size();
        let base = slot * self.slot_size();
        for (i, z) in values.enumerate() {
            let at = base + i * size;
            match self.layout {
                SlotLayout::Float => self.data[at..at + 4].copy_from_slice(&z.to_le_bytes()),
                SlotLayout::Compressed => {
                    self.data[at..at + 2].copy_from_slice(&encode_z(z).to_le_bytes())
                }
            }
        }
    }

    fn read_values(&self, slot: usize) -> Vec<f32> {
        let size = self.layout.cell_size();
        let base = slot * self.slot_size();
        self.data[base..base + self.slot_size()]
            .chunks_exact(size)
            .map(|b| match self.layout {
                SlotLayout::Float => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                SlotLayout::Compressed => decode_z(i16::from_le_bytes([b[0], b[1]])),
            })
            .collect()
    }

    /// Save the image to a file
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let mut file = std::fs::File::create(path).map_err(|e| StorageError::Io(e.to_string()))?;
        self.write_to(&mut file)?;
        info!("[Store] Saved {} slots to {}", self.slots, path.display());
        Ok(())
    }

    /// Write the image to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), StorageError> {
        let mut header = [0u8; HEADER_SIZE];
        header[0..5].copy_from_slice(MAGIC);
        header[5] = VERSION;
        header[6] = self.layout.tag();
        header[7..11].copy_from_slice(&(self.cells as u32).to_le_bytes());
        header[11..13].copy_from_slice(&(self.slots as u16).to_le_bytes());

        writer
            .write_all(&header)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        writer
            .write_all(&self.data)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let mut section = vec![self.calibration.len() as u8];
        for (sensor, offsets) in &self.calibration {
            section.push(sensor.index() as u8);
            section.extend_from_slice(&(offsets.len() as u16).to_le_bytes());
            for offset in offsets {
                section.extend_from_slice(&offset.to_le_bytes());
            }
        }
        writer
            .write_all(&section)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    /// Load an image from a file
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut file = std::fs::File::open(path).map_err(|e| StorageError::Io(e.to_string()))?;
        Self::read_from(&mut file)
    }

    /// Read an image from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, StorageError> {
        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        if &header[0..5] != MAGIC {
            return Err(StorageError::InvalidFormat(
                "Invalid magic bytes".to_string(),
            ));
        }
        if header[5] != VERSION {
            return Err(StorageError::VersionMismatch {
                expected: VERSION,
                found: header[5],
            });
        }
        let layout = SlotLayout::from_tag(header[6]).ok_or_else(|| {
            StorageError::InvalidFormat(format!("Unknown slot layout {}", header[6]))
        })?;
        let cells = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
        let slots = u16::from_le_bytes([header[11], header[12]]) as usize;

        let mut data = vec![0u8; slots * cells * layout.cell_size()];
        reader
            .read_exact(&mut data)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let calibration = Self::read_calibration(reader)?;

        Ok(Self {
            layout,
            cells,
            slots,
            data,
            calibration,
        })
    }

    fn read_calibration<R: Read>(reader: &mut R) -> Result<Vec<(SensorKind, Vec<i16>)>, StorageError> {
        let mut read = |len: usize| -> Result<Vec<u8>, StorageError> {
            let mut buf = vec![0u8; len];
            reader
                .read_exact(&mut buf)
                .map_err(|e| StorageError::Io(e.to_string()))?;
            Ok(buf)
        };

        let count = read(1)?[0] as usize;
        let mut tables = Vec::with_capacity(count);
        for _ in 0..count {
            let head = read(3)?;
            let sensor = *SensorKind::ALL.get(head[0] as usize).ok_or_else(|| {
                StorageError::InvalidFormat(format!("Unknown sensor {}", head[0]))
            })?;
            let len = u16::from_le_bytes([head[1], head[2]]) as usize;
            let offsets = read(len * 2)?
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            tables.push((sensor, offsets));
        }
        Ok(tables)
    }
}

impl MeshStore for SlotImage {
    fn slot_count(&self) -> usize {
        self.slots
    }

    fn load(&self, slot: usize, mesh: &mut MeshGrid) -> Result<(), StorageError> {
        self.check_slot(slot)?;
        if mesh.values().len() != self.cells {
            return Err(StorageError::SizeMismatch {
                expected: self.cells,
                found: mesh.values().len(),
            });
        }
        let values = self.read_values(slot);
        mesh.load_values(&values)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        debug!("[Store] Mesh loaded from slot {}", slot);
        Ok(())
    }

    fn store(&mut self, slot: usize, mesh: &MeshGrid) -> Result<(), StorageError> {
        self.check_slot(slot)?;
        if mesh.values().len() != self.cells {
            return Err(StorageError::SizeMismatch {
                expected: self.cells,
                found: mesh.values().len(),
            });
        }
        self.write_values(slot, mesh.values().iter().copied());
        debug!("[Store] Mesh saved in slot {}", slot);
        Ok(())
    }
}

impl CalibrationStore for SlotImage {
    fn load_calibration(&self, ptc: &mut ProbeTempCompensation) -> Result<usize, StorageError> {
        for (sensor, offsets) in &self.calibration {
            let grid = *ptc.table(*sensor).grid();
            if offsets.len() != grid.measurements {
                return Err(StorageError::SizeMismatch {
                    expected: grid.measurements,
                    found: offsets.len(),
                });
            }
            let mut table = CalibrationTable::new(*sensor, grid);
            for (i, &offset) in offsets.iter().enumerate() {
                table
                    .set(i, offset)
                    .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            }
            ptc.restore_table(table);
            debug!("[Store] {} calibration restored", sensor);
        }
        Ok(self.calibration.len())
    }

    fn store_calibration(&mut self, ptc: &ProbeTempCompensation) -> Result<(), StorageError> {
        self.calibration = SensorKind::ALL
            .iter()
            .map(|&sensor| (sensor, ptc.table(sensor).offsets().to_vec()))
            .collect();
        debug!("[Store] Calibration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compensation::SensorCalibration;
    use crate::core::{MeshGeometry, XyPos};

    fn mesh() -> MeshGrid {
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(50.0, 50.0), 3, 3).unwrap();
        let mut m = MeshGrid::zeroed(g);
        m.set(m.index(0, 0).unwrap(), 1.234);
        m.set(m.index(1, 2).unwrap(), f32::NAN);
        m.set(m.index(2, 1).unwrap(), -0.4567);
        m
    }

    #[test]
    fn test_slot_count_from_capacity() {
        assert_eq!(SlotImage::new(SlotLayout::Float, 9, 100).slot_count(), 2);
        assert_eq!(SlotImage::new(SlotLayout::Compressed, 9, 100).slot_count(), 5);
        assert_eq!(SlotImage::new(SlotLayout::Float, 9, 10).slot_count(), 0);
    }

    #[test]
    fn test_float_slots_are_exact() {
        let original = mesh();
        let mut image = SlotImage::new(SlotLayout::Float, 9, 1024);
        image.store(3, &original).unwrap();
        let mut loaded = MeshGrid::zeroed(*original.geometry());
        image.load(3, &mut loaded).unwrap();
        assert_eq!(loaded.get(loaded.index(2, 1).unwrap()), -0.4567);
        assert!(loaded.get(loaded.index(1, 2).unwrap()).is_nan());
    }

    #[test]
    fn test_compressed_slots_round_to_micrometers() {
        let original = mesh();
        let mut image = SlotImage::new(SlotLayout::Compressed, 9, 1024);
        image.store(0, &original).unwrap();
        let mut loaded = MeshGrid::zeroed(*original.geometry());
        image.load(0, &mut loaded).unwrap();
        for idx in original.indices() {
            let (a, b) = (original.get(idx), loaded.get(idx));
            assert!(a.is_nan() && b.is_nan() || (a - b).abs() <= 0.001);
        }
    }

    #[test]
    fn test_fresh_slots_are_undefined() {
        let image = SlotImage::new(SlotLayout::Compressed, 9, 1024);
        let mut loaded = mesh();
        image.load(1, &mut loaded).unwrap();
        assert_eq!(loaded.defined_count(), 0);
    }

    #[test]
    fn test_invalid_slot_and_size() {
        let mut image = SlotImage::new(SlotLayout::Float, 9, 72);
        assert_eq!(
            image.store(2, &mesh()),
            Err(StorageError::InvalidSlot { slot: 2, count: 2 })
        );
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(50.0, 50.0), 2, 2).unwrap();
        assert!(matches!(
            image.store(0, &MeshGrid::zeroed(g)),
            Err(StorageError::SizeMismatch { .. })
        ));
        let mut empty = SlotImage::new(SlotLayout::Float, 9, 0);
        assert_eq!(empty.store(0, &mesh()), Err(StorageError::NoStorage));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.slots");
        let mut image = SlotImage::new(SlotLayout::Compressed, 9, 256);
        image.store(1, &mesh()).unwrap();
        image.save(&path).unwrap();

        let reopened = SlotImage::open(&path).unwrap();
        assert_eq!(reopened, image);
    }

    #[test]
    fn test_calibration_survives_file_round_trip() {
        let mut ptc = ProbeTempCompensation::with_defaults();
        ptc.set_offset(SensorKind::Probe, 0, 20).unwrap();
        ptc.set_offset(SensorKind::Probe, 1, 45).unwrap();
        ptc.set_offset(SensorKind::Bed, 3, -30).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.slots");
        let mut image = SlotImage::new(SlotLayout::Compressed, 9, 256);
        image.store_calibration(&ptc).unwrap();
        image.save(&path).unwrap();

        let mut restored = ProbeTempCompensation::with_defaults();
        let count = SlotImage::open(&path)
            .unwrap()
            .load_calibration(&mut restored)
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(restored.table(SensorKind::Probe).offsets(), ptc.table(SensorKind::Probe).offsets());
        // 37.5C sits halfway between the 20um and 45um points
        approx::assert_abs_diff_eq!(restored.compensate(SensorKind::Probe, 37.5), 0.0325, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(restored.compensate(SensorKind::Bed, 80.0), -0.03, epsilon = 1e-6);
    }

    #[test]
    fn test_calibration_grid_mismatch_rejected() {
        let mut image = SlotImage::new(SlotLayout::Float, 9, 64);
        image
            .store_calibration(&ProbeTempCompensation::with_defaults())
            .unwrap();
        let short = SensorCalibration {
            measurements: 4,
            ..SensorCalibration::default_for(SensorKind::Probe)
        };
        let mut ptc = ProbeTempCompensation::new(
            [
                short,
                SensorCalibration::default_for(SensorKind::Bed),
                SensorCalibration::default_for(SensorKind::Hotend),
            ],
            None,
        );
        assert_eq!(
            image.load_calibration(&mut ptc),
            Err(StorageError::SizeMismatch {
                expected: 4,
                found: 10
            })
        );
    }

    #[test]
    fn test_rejects_foreign_files() {
        let mut bytes: &[u8] = b"NOTAMESHFILE0000";
        assert!(matches!(
            SlotImage::read_from(&mut bytes),
            Err(StorageError::InvalidFormat(_))
        ));
        let mut header = [0u8; HEADER_SIZE];
        header[0..5].copy_from_slice(MAGIC);
        header[5] = 9;
        assert_eq!(
            SlotImage::read_from(&mut &header[..]),
            Err(StorageError::VersionMismatch {
                expected: VERSION,
                found: 9
            })
        );
    }
}
