//! Solved plane and the rotation that levels a mesh onto it.

use serde::{Deserialize, Serialize};

/// Plane `z = a·x + b·y + d`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneFit {
    /// Slope along X (mm per mm)
    pub a: f32,
    /// Slope along Y (mm per mm)
    pub b: f32,
    /// Height at the origin (mm)
    pub d: f32,
}

impl PlaneFit {
    /// Create a plane from its coefficients
    pub fn new(a: f32, b: f32, d: f32) -> Self {
        Self { a, b, d }
    }

    /// Height of the plane at `(x, y)`
    #[inline]
    pub fn z_at(&self, x: f32, y: f32) -> f32 {
        self.a * x + self.b * y + self.d
    }

    /// Distance of a sample above the plane
    #[inline]
    pub fn residual(&self, x: f32, y: f32, z: f32) -> f32 {
        z - self.z_at(x, y)
    }

    /// Rotation that carries mesh heights onto this plane.
    pub fn tilt_rotation(&self) -> TiltRotation {
        TiltRotation::look_at([-self.a, -self.b, 1.0])
    }
}

/// Orthonormal 3x3 rotation built from a plane normal.
///
/// Rows are the new X, Y and Z axes; vectors are multiplied as row vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiltRotation {
    rows: [[f32; 3]; 3],
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return v;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

impl TiltRotation {
    /// Frame whose Z axis points along `normal`.
    pub fn look_at(normal: [f32; 3]) -> Self {
        let z_row = normalize(normal);
        let x_row = normalize([1.0, 0.0, -normal[0] / normal[2]]);
        let y_row = normalize(cross(z_row, x_row));
        Self {
            rows: [x_row, y_row, z_row],
        }
    }

    /// Rotate `(x, y, z)`.
    pub fn apply(&self, x: f32, y: f32, z: f32) -> [f32; 3] {
        let m = &self.rows;
        [
            x * m[0][0] + y * m[1][0] + z * m[2][0],
            x * m[0][1] + y * m[1][1] + z * m[2][1],
            x * m[0][2] + y * m[1][2] + z * m[2][2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_plane_rotation_is_identity() {
        let rot = PlaneFit::new(0.0, 0.0, 0.5).tilt_rotation();
        let [x, y, z] = rot.apply(12.0, -3.0, 0.25);
        assert_relative_eq!(x, 12.0, epsilon = 1e-6);
        assert_relative_eq!(y, -3.0, epsilon = 1e-6);
        assert_relative_eq!(z, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_small_tilt_adds_plane_slope() {
        let plane = PlaneFit::new(0.001, -0.002, 0.0);
        let rot = plane.tilt_rotation();
        let [_, _, z] = rot.apply(100.0, 50.0, 0.0);
        // First-order: z' = a·x + b·y
        assert_relative_eq!(z, 0.001 * 100.0 - 0.002 * 50.0, epsilon = 1e-3);
        let [_, _, z] = rot.apply(200.0, 0.0, 0.0);
        assert_relative_eq!(z, 0.2, epsilon = 1e-3);
    }

    #[test]
    fn test_z_at_and_residual() {
        let plane = PlaneFit::new(0.5, 0.25, 1.0);
        assert_relative_eq!(plane.z_at(2.0, 4.0), 3.0);
        assert_relative_eq!(plane.residual(2.0, 4.0, 3.5), 0.5);
    }
}
