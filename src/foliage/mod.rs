//! Instanced foliage drawn on top of the ground of every tile.

mod geometry;
mod grass;
mod rock;

pub use geometry::InstancedGeometry;
pub use grass::{grass_params, BladeGeometry};
pub use rock::rock_params;

use crate::{
    material::{MaterialKind, ShaderMaterial},
    result::{TerrainError, TerrainResult},
};
use bevy::prelude::*;

/// The foliage layers a tile can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FoliageKind {
    Grass,
    Rocks,
}

impl FoliageKind {
    pub fn material_kind(self) -> MaterialKind {
        match self {
            FoliageKind::Grass => MaterialKind::Grass,
            FoliageKind::Rocks => MaterialKind::Rocks,
        }
    }

    /// The name of the template and geometry this layer is built from.
    pub fn name(self) -> &'static str {
        self.material_kind().name()
    }
}

/// Number of instances placed on a tile of the given patch size.
///
/// Only whole units of the patch size are populated. Fails if the count does not fit into
/// the `u32` instance count of a draw.
pub fn instance_count(patch_size: f32, density: u32) -> TerrainResult<u32> {
    if density == 0 {
        return Ok(0);
    }

    let whole = patch_size.max(0.0).floor() as u64;

    whole
        .checked_mul(whole)
        .and_then(|area| area.checked_mul(density as u64))
        .and_then(|count| u32::try_from(count).ok())
        .ok_or(TerrainError::InstanceOverflow {
            patch_size,
            density,
        })
}

/// The radius of the culling sphere of a tile, which includes a margin for swaying blades.
pub fn bounding_radius(patch_size: f32) -> f32 {
    1.0 + 2.0 * patch_size
}

/// One instanced draw of a foliage layer, owned by a single tile.
#[derive(Clone, Debug, PartialEq)]
pub struct FoliageInstance {
    kind: FoliageKind,
    material: ShaderMaterial,
    geometry: InstancedGeometry,
    transform: Transform,
    visible: bool,
}

impl FoliageInstance {
    pub(crate) fn new(
        kind: FoliageKind,
        material: ShaderMaterial,
        geometry: InstancedGeometry,
    ) -> Self {
        Self {
            kind,
            material,
            geometry,
            transform: Transform::IDENTITY,
            visible: true,
        }
    }

    pub fn kind(&self) -> FoliageKind {
        self.kind
    }

    pub fn material(&self) -> &ShaderMaterial {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut ShaderMaterial {
        &mut self.material
    }

    pub fn geometry(&self) -> &InstancedGeometry {
        &self.geometry
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.transform.rotate_y(angle);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn id(&self) -> u32 {
        self.material.tile_id().unwrap_or_default()
    }

    pub fn set_id(&mut self, id: u32) {
        self.material.set_tile_id(id);
    }
}
