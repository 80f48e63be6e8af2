//! The leveling height map and its persistence codec.

mod codec;
mod grid;

pub use codec::{MESH_SENTINEL, decode_z, encode_z};
pub use grid::{MeshGrid, MeshStatistics};
