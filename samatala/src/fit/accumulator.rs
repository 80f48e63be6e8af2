//! Running-sum accumulator for weighted plane regression.

use thiserror::Error;

use super::PlaneFit;

/// Fewer effective samples than this cannot define a plane.
const MIN_EFFECTIVE_SAMPLES: f32 = 3.0;

/// Determinant tolerance, scaled by the largest coordinates seen.
const SINGULAR_EPSILON: f32 = 1e-10;

/// Reasons a plane cannot be solved.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FitError {
    /// Not enough (weighted) samples
    #[error("Insufficient data: {count:.2} effective samples, need 3")]
    InsufficientData {
        /// Effective sample count (sum of weights)
        count: f32,
    },
    /// Samples are collinear or coincident
    #[error("Insufficient data: samples do not span a plane")]
    Degenerate,
}

/// Streaming least-squares accumulator.
///
/// Holds sums only; the result does not depend on sample order beyond
/// floating-point rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LinearFitAccumulator {
    sum_x: f32,
    sum_y: f32,
    sum_z: f32,
    sum_x2: f32,
    sum_y2: f32,
    sum_z2: f32,
    sum_xy: f32,
    sum_xz: f32,
    sum_yz: f32,
    n: f32,
    max_abs_x: f32,
    max_abs_y: f32,
}

impl LinearFitAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all accumulated samples
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add one sample with unit weight
    #[inline]
    pub fn accumulate(&mut self, x: f32, y: f32, z: f32) {
        self.accumulate_weighted(x, y, z, 1.0);
    }

    /// Add one sample counted `w` times.
    ///
    /// Non-finite samples and non-positive weights are ignored.
    pub fn accumulate_weighted(&mut self, x: f32, y: f32, z: f32, w: f32) {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) || !(w > 0.0 && w.is_finite()) {
            return;
        }
        self.sum_x += w * x;
        self.sum_y += w * y;
        self.sum_z += w * z;
        self.sum_x2 += w * x * x;
        self.sum_y2 += w * y * y;
        self.sum_z2 += w * z * z;
        self.sum_xy += w * x * y;
        self.sum_xz += w * x * z;
        self.sum_yz += w * y * z;
        self.n += w;
        self.max_abs_x = self.max_abs_x.max(x.abs());
        self.max_abs_y = self.max_abs_y.max(y.abs());
    }

    /// Effective sample count (sum of weights)
    #[inline]
    pub fn count(&self) -> f32 {
        self.n
    }

    /// Solve the normal equations for the best-fit plane.
    pub fn finish(&self) -> Result<PlaneFit, FitError> {
        if self.n < MIN_EFFECTIVE_SAMPLES {
            return Err(FitError::InsufficientData { count: self.n });
        }

        let n = self.n;
        let xbar = self.sum_x / n;
        let ybar = self.sum_y / n;
        let zbar = self.sum_z / n;

        // Centered second moments
        let x2bar = self.sum_x2 / n - xbar * xbar;
        let y2bar = self.sum_y2 / n - ybar * ybar;
        let xybar = self.sum_xy / n - xbar * ybar;
        let xzbar = self.sum_xz / n - xbar * zbar;
        let yzbar = self.sum_yz / n - ybar * zbar;

        let det = x2bar * y2bar - xybar * xybar;
        if det.abs() <= SINGULAR_EPSILON * (self.max_abs_x + self.max_abs_y) || !det.is_finite() {
            return Err(FitError::Degenerate);
        }

        let a = (xzbar * y2bar - yzbar * xybar) / det;
        let b = (yzbar * x2bar - xzbar * xybar) / det;
        let d = zbar - a * xbar - b * ybar;
        Ok(PlaneFit::new(a, b, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points() -> Vec<(f32, f32, f32)> {
        // z = 0.01x - 0.02y + 0.3 with a little deterministic noise
        let mut pts = Vec::new();
        for (k, (x, y)) in [
            (10.0, 10.0),
            (100.0, 10.0),
            (190.0, 10.0),
            (10.0, 100.0),
            (100.0, 100.0),
            (190.0, 100.0),
            (10.0, 190.0),
            (190.0, 190.0),
        ]
        .into_iter()
        .enumerate()
        {
            let noise = if k % 2 == 0 { 0.002 } else { -0.002 };
            pts.push((x, y, 0.01 * x - 0.02 * y + 0.3 + noise));
        }
        pts
    }

    #[test]
    fn test_recovers_known_plane() {
        let mut acc = LinearFitAccumulator::new();
        for (x, y, z) in sample_points() {
            acc.accumulate(x, y, z);
        }
        let plane = acc.finish().unwrap();
        assert_relative_eq!(plane.a, 0.01, epsilon = 1e-4);
        assert_relative_eq!(plane.b, -0.02, epsilon = 1e-4);
        assert_relative_eq!(plane.d, 0.3, epsilon = 0.01);
    }

    #[test]
    fn test_order_invariant() {
        let pts = sample_points();
        let mut forward = LinearFitAccumulator::new();
        let mut reverse = LinearFitAccumulator::new();
        for &(x, y, z) in &pts {
            forward.accumulate(x, y, z);
        }
        for &(x, y, z) in pts.iter().rev() {
            reverse.accumulate(x, y, z);
        }
        let f = forward.finish().unwrap();
        let r = reverse.finish().unwrap();
        assert_relative_eq!(f.a, r.a, epsilon = 1e-5);
        assert_relative_eq!(f.b, r.b, epsilon = 1e-5);
        assert_relative_eq!(f.d, r.d, epsilon = 1e-3);
    }

    #[test]
    fn test_flat_unit_plane() {
        let mut acc = LinearFitAccumulator::new();
        acc.accumulate(0.0, 0.0, 1.0);
        acc.accumulate(1.0, 0.0, 1.0);
        acc.accumulate(0.0, 1.0, 1.0);
        let plane = acc.finish().unwrap();
        assert_relative_eq!(plane.a, 0.0, epsilon = 1e-5);
        assert_relative_eq!(plane.b, 0.0, epsilon = 1e-5);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.5, 0.5)] {
            assert_relative_eq!(plane.residual(x, y, 1.0), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_too_few_samples() {
        let mut acc = LinearFitAccumulator::new();
        acc.accumulate(0.0, 0.0, 1.0);
        acc.accumulate(1.0, 0.0, 1.0);
        assert!(matches!(acc.finish(), Err(FitError::InsufficientData { .. })));
    }

    #[test]
    fn test_collinear_samples_are_degenerate() {
        let mut acc = LinearFitAccumulator::new();
        for i in 0..5 {
            acc.accumulate(i as f32 * 10.0, i as f32 * 10.0, 0.1);
        }
        assert_eq!(acc.finish(), Err(FitError::Degenerate));
    }

    #[test]
    fn test_weight_counts_fractionally() {
        let mut weighted = LinearFitAccumulator::new();
        let mut repeated = LinearFitAccumulator::new();
        let pts = [(0.0, 0.0, 0.0), (10.0, 0.0, 0.5), (0.0, 10.0, 0.2), (10.0, 10.0, 1.0)];
        for (k, &(x, y, z)) in pts.iter().enumerate() {
            let times = if k == 3 { 3 } else { 1 };
            weighted.accumulate_weighted(x, y, z, times as f32);
            for _ in 0..times {
                repeated.accumulate(x, y, z);
            }
        }
        assert_relative_eq!(weighted.count(), 6.0);
        let w = weighted.finish().unwrap();
        let r = repeated.finish().unwrap();
        assert_relative_eq!(w.a, r.a, epsilon = 1e-5);
        assert_relative_eq!(w.b, r.b, epsilon = 1e-5);
        assert_relative_eq!(w.d, r.d, epsilon = 1e-5);
    }

    #[test]
    fn test_reset_and_ignores_nan() {
        let mut acc = LinearFitAccumulator::new();
        acc.accumulate(1.0, 2.0, f32::NAN);
        acc.accumulate_weighted(1.0, 2.0, 3.0, 0.0);
        assert_eq!(acc.count(), 0.0);
        acc.accumulate(1.0, 2.0, 3.0);
        acc.reset();
        assert_eq!(acc, LinearFitAccumulator::new());
    }
}
