//! Lossy 16-bit height codec used by compressed mesh storage.
//!
//! Heights are stored as micrometers in an `i16`. `i16::MAX` is reserved for
//! "undefined", which also absorbs values too large to represent.

/// Encoded value meaning "undefined cell"
pub const MESH_SENTINEL: i16 = i16::MAX;

/// Quantize a height (mm) to micrometers.
pub fn encode_z(z: f32) -> i16 {
    if z.is_nan() {
        return MESH_SENTINEL;
    }
    let scaled = (z * 1000.0).round();
    if scaled >= MESH_SENTINEL as f32 || scaled < i16::MIN as f32 {
        MESH_SENTINEL
    } else {
        scaled as i16
    }
}

/// Expand a stored value back to millimeters.
#[inline]
pub fn decode_z(raw: i16) -> f32 {
    if raw == MESH_SENTINEL {
        f32::NAN
    } else {
        raw as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_precision() {
        for z in [1.234f32, -0.0005, 0.0, -2.5, 32.0] {
            let back = decode_z(encode_z(z));
            assert!((back - z).abs() <= 0.001, "{} -> {}", z, back);
        }
    }

    #[test]
    fn test_nan_uses_sentinel() {
        assert_eq!(encode_z(f32::NAN), MESH_SENTINEL);
        assert!(decode_z(encode_z(f32::NAN)).is_nan());
    }

    #[test]
    fn test_out_of_range_becomes_undefined() {
        assert!(decode_z(encode_z(40.0)).is_nan());
        assert!(decode_z(encode_z(-40.0)).is_nan());
        assert_eq!(encode_z(32.766), 32766);
    }
}
