//! This crate renders a tiled terrain covered in instanced grass and rocks.
//!
//! # Overview
//! A [`TerrainSection`](terrain::TerrainSection) lays out a grid of
//! [`TerrainTile`](terrain::TerrainTile)s. Each tile owns a ground patch and a number of
//! [`FoliageInstance`](foliage::FoliageInstance)s, whose materials are cloned from the
//! templates registered in the [`Library`](library::Library). Cloning gives every tile its
//! own `tile_id` uniform and visibility, while the shader programs, the index topology
//! and all textures are shared.
//!
//! Per tile data, for example the color or height of the ground, is stored in one layer of
//! an [`Atlas`](terrain_data::Atlas) per tile. Atlases are composed from many same-sized
//! images or a raw blob, see the [`terrain_data`] module.
//!
//! The [`TerrainContext`](context::TerrainContext) owns the built sections and pushes the
//! elapsed time and the resolution into every live material once per frame.
//! The [`GrassTerrainPlugin`](plugin::GrassTerrainPlugin) drives all of this inside a
//! Bevy app.

pub mod config;
pub mod context;
pub mod foliage;
pub mod library;
pub mod material;
pub mod plugin;
pub mod result;
pub mod spawn;
pub mod terrain;
pub mod terrain_data;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        config::{SectionConfig, TileSettings},
        context::{SkyDome, TerrainContext},
        foliage::{BladeGeometry, FoliageInstance, FoliageKind, InstancedGeometry},
        library::Library,
        material::{
            GrassUniform, GroundUniform, MaterialKind, MaterialUniforms, RockUniform,
            ShaderMaterial, ShaderProgram, SkyUniform,
        },
        plugin::{GrassTerrainPlugin, RockMesh, TerrainPluginConfig},
        result::{TerrainError, TerrainResult},
        spawn::SpawnSectionCommandsExt,
        terrain::{TerrainSection, TerrainTile},
        terrain_data::{Atlas, AtlasFailed, AtlasReady, AtlasSource, TextureAtlas},
    };
}
