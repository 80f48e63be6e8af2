//! Z-fade: taper the correction to zero as the print rises.

use serde::{Deserialize, Serialize};

/// Height (mm) at which correction reaches zero; 0 disables fading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FadeHeight(pub f32);

impl FadeHeight {
    /// Fraction of the correction applied at nozzle height `z`
    pub fn factor(&self, z: f32) -> f32 {
        let height = self.0;
        if height <= 0.0 {
            return 1.0;
        }
        if z >= height {
            return 0.0;
        }
        (1.0 - z / height).min(1.0)
    }
}
