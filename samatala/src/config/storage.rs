//! Mesh storage layout.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSection {
    /// Store heights as 16-bit micrometers instead of 32-bit floats
    #[serde(default)]
    pub compressed: bool,
    /// Bytes available for mesh slots
    #[serde(default = "defaults::capacity_bytes")]
    pub capacity_bytes: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            compressed: false,
            capacity_bytes: defaults::capacity_bytes(),
        }
    }
}
