//! The grid of terrain tiles.

mod section;
mod tile;

pub use section::TerrainSection;
pub use tile::{GroundPatch, TerrainTile, GROUND_SUBDIVISIONS};
