use crate::{
    config::{SectionConfig, TileSettings},
    foliage::FoliageKind,
    library::Library,
    material::{MaterialKind, ShaderMaterial},
    result::{TerrainError, TerrainResult},
    terrain::TerrainTile,
};
use bevy::prelude::*;
use itertools::{iproduct, Itertools};

/// A grid of terrain tiles.
///
/// Tiles are stored in row-major order, so that the index of a tile is also its id.
/// The first tile sits at the origin of the section, the others extend into negative
/// x (columns) and negative z (rows).
#[derive(Clone, Debug)]
pub struct TerrainSection {
    width: u32,
    height: u32,
    origin: Vec3,
    settings: TileSettings,
    tiles: Vec<TerrainTile>,
}

impl TerrainSection {
    /// Builds every tile of the section.
    ///
    /// Fails without building anything if a required template, the rock geometry or the
    /// tile data atlas is missing.
    pub fn new(library: &Library, config: &SectionConfig) -> TerrainResult<Self> {
        Self::validate(library, config)?;

        let settings = config.tile;
        let origin = config.origin();
        let tile_size = settings.tile_size();

        let tile_data = config
            .tile_data
            .as_deref()
            .and_then(|name| library.array_texture(name));

        let tiles = iproduct!(0..config.height, 0..config.width)
            .map(|(row, col)| {
                let id = row * config.width + col;

                let mut tile = TerrainTile::new(library, &settings, id, tile_data.as_ref())?;
                tile.set_position(origin - tile_size * Vec3::new(col as f32, 0.0, row as f32));

                Ok(tile)
            })
            .collect::<TerrainResult<Vec<_>>>()?;

        info!(
            "Built a {}x{} terrain section with {} tiles.",
            config.width,
            config.height,
            tiles.len()
        );

        Ok(Self {
            width: config.width,
            height: config.height,
            origin,
            settings,
            tiles,
        })
    }

    fn validate(library: &Library, config: &SectionConfig) -> TerrainResult<()> {
        library.template_of_kind(MaterialKind::Ground.name(), MaterialKind::Ground)?;
        library.template_of_kind(MaterialKind::Grass.name(), MaterialKind::Grass)?;

        if config.tile.has_rocks() {
            library.template_of_kind(MaterialKind::Rocks.name(), MaterialKind::Rocks)?;
            library.instanced_geometry(FoliageKind::Rocks.name())?;
        }

        if let Some(name) = &config.tile_data {
            if library.array_texture(name).is_none() {
                return Err(TerrainError::MissingAtlas(name.clone()));
            }
        }

        Ok(())
    }

    fn tile_mut(&mut self, id: u32) -> TerrainResult<&mut TerrainTile> {
        let count = self.tiles.len() as u32;

        self.tiles
            .get_mut(id as usize)
            .ok_or(TerrainError::TileOutOfRange { id, count })
    }

    /// Shows the tile `id`.
    pub fn enable(&mut self, id: u32) -> TerrainResult<()> {
        self.tile_mut(id)?.set_visible(true);
        Ok(())
    }

    /// Hides the tile `id`, its geometry and materials are kept.
    pub fn disable(&mut self, id: u32) -> TerrainResult<()> {
        self.tile_mut(id)?.set_visible(false);
        Ok(())
    }

    pub fn tile(&self, id: u32) -> Option<&TerrainTile> {
        self.tiles.get(id as usize)
    }

    /// The tile in column `col` and row `row`.
    pub fn tile_at(&self, col: u32, row: u32) -> Option<&TerrainTile> {
        if col >= self.width || row >= self.height {
            return None;
        }

        self.tile(row * self.width + col)
    }

    /// The `(col, row)` coordinate of the tile `id`.
    pub fn coordinate_of(&self, id: u32) -> Option<UVec2> {
        (id < self.tile_count()).then(|| UVec2::new(id % self.width, id / self.width))
    }

    pub fn tiles(&self) -> &[TerrainTile] {
        &self.tiles
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles.len() as u32
    }

    /// Every live material of the section, tile by tile.
    pub fn materials(&self) -> Vec<&ShaderMaterial> {
        self.tiles
            .iter()
            .flat_map(|tile| tile.materials())
            .collect_vec()
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut ShaderMaterial> {
        self.tiles.iter_mut().flat_map(|tile| tile.materials_mut())
    }

    /// The grid size in tiles.
    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn tile_size(&self) -> f32 {
        self.settings.tile_size()
    }

    pub fn settings(&self) -> &TileSettings {
        &self.settings
    }
}
