use crate::result::TerrainResult;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// The settings every tile of a section is built with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct TileSettings {
    /// Half the side length of a tile in world units.
    pub patch_size: f32,
    /// Grass blades per unit area.
    pub grass_density: u32,
    /// Number of stacked quads per blade.
    pub segments: u32,
    pub blade_width: f32,
    pub blade_height: f32,
    /// Rocks per unit area, no rocks are placed when this is zero.
    pub rock_density: u32,
    pub rock_scale: f32,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            patch_size: 1.0,
            grass_density: 10,
            segments: 6,
            blade_width: 0.125,
            blade_height: 2.0,
            rock_density: 0,
            rock_scale: 1.0,
        }
    }
}

impl TileSettings {
    /// The side length of a tile, which is also the spacing between tiles.
    #[inline]
    pub fn tile_size(&self) -> f32 {
        2.0 * self.patch_size
    }

    #[inline]
    pub fn has_rocks(&self) -> bool {
        self.rock_density > 0
    }
}

/// The flat configuration of a grid of terrain tiles.
///
/// Can be loaded as an asset from `*.section.ron` files.
#[derive(Asset, TypePath, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SectionConfig {
    /// Number of tiles along the x axis.
    pub width: u32,
    /// Number of tiles along the z axis.
    pub height: u32,
    /// The position of the first tile, all other tiles extend into negative x and z.
    pub origin: [f32; 3],
    /// The array texture holding per tile data, sampled with the tile id.
    pub tile_data: Option<String>,
    pub tile: TileSettings,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            origin: [0.0; 3],
            tile_data: None,
            tile: TileSettings::default(),
        }
    }
}

impl SectionConfig {
    pub fn from_ron(source: &str) -> TerrainResult<Self> {
        Ok(ron::from_str(source)?)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    #[inline]
    pub fn tile_count(&self) -> u32 {
        self.width * self.height
    }
}
