//! Default value functions for serde deserialization.

use crate::core::XyPos;

pub fn mesh_min() -> f32 {
    10.0
}

pub fn mesh_max() -> f32 {
    210.0
}

pub fn mesh_points() -> usize {
    10
}

pub fn bed_size() -> f32 {
    220.0
}

pub fn probe_offset_xy() -> f32 {
    10.0
}

pub fn probing_margin() -> f32 {
    10.0
}

pub fn tilt_points() -> [XyPos; 3] {
    [
        XyPos::new(20.0, 180.0),
        XyPos::new(20.0, 20.0),
        XyPos::new(180.0, 20.0),
    ]
}

pub fn z_clearance_between_probes() -> f32 {
    5.0
}

pub fn z_clearance_deploy() -> f32 {
    10.0
}

pub fn manual_probe_start_z() -> f32 {
    0.2
}

pub fn max_shim_thickness() -> f32 {
    1.5
}

pub fn fade_height() -> f32 {
    10.0
}

pub fn encoder_step() -> f32 {
    0.01
}

pub fn enabled() -> bool {
    true
}

pub fn capacity_bytes() -> usize {
    4096
}
