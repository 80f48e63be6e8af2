//! Seeded noise for simulated probe readings.

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, Normal, Uniform};

/// Noise generator with configurable seed for reproducibility
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Create a new noise generator
    ///
    /// If seed is 0, uses random entropy for non-deterministic behavior.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Gaussian sample with the given standard deviation
    #[inline]
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        match Normal::new(0.0f32, stddev) {
            Ok(normal) if stddev > 0.0 => normal.sample(&mut self.rng),
            _ => 0.0,
        }
    }

    /// Returns true with given probability
    #[inline]
    pub fn chance(&mut self, probability: f32) -> bool {
        if probability <= 0.0 {
            return false;
        }
        Uniform::new(0.0f32, 1.0).sample(&mut self.rng) < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_seed() {
        let mut a = NoiseGenerator::new(42);
        let mut b = NoiseGenerator::new(42);
        for _ in 0..100 {
            assert_eq!(a.gaussian(0.01), b.gaussian(0.01));
        }
    }

    #[test]
    fn test_zero_stddev_and_probability() {
        let mut noise = NoiseGenerator::new(42);
        for _ in 0..10 {
            assert_eq!(noise.gaussian(0.0), 0.0);
            assert!(!noise.chance(0.0));
        }
    }

    #[test]
    fn test_gaussian_spread() {
        let mut noise = NoiseGenerator::new(7);
        let samples: Vec<f32> = (0..2000).map(|_| noise.gaussian(0.01)).collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.002);
        assert!((var.sqrt() - 0.01).abs() < 0.002);
    }
}
