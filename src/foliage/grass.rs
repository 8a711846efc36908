use crate::{
    config::TileSettings,
    foliage::{bounding_radius, instance_count, FoliageInstance, FoliageKind, InstancedGeometry},
    library::Library,
    material::{MaterialKind, MaterialUniforms},
    result::TerrainResult,
};
use bevy::prelude::*;

/// The index topology and instance count of one patch of grass blades.
///
/// A blade consists of `segments` stacked quads. It is drawn double sided by two strips
/// that share the same vertex positions: the front strip uses the vertices
/// `0..2 * (segments + 1)`, the back strip the following block of the same size, wound
/// in reverse so that back face culling keeps the blade visible from behind.
/// The vertex positions themselves are generated in the vertex stage from the
/// `grass_params` uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct BladeGeometry {
    pub segments: u32,
    pub indices: Vec<u32>,
    pub instance_count: u32,
    pub bounding_radius: f32,
}

impl BladeGeometry {
    /// Fails if the instance count does not fit into a `u32`.
    pub fn build(segments: u32, patch_size: f32, density: u32) -> TerrainResult<Self> {
        let vertex_count = (segments + 1) * 2;

        let indices = (0..segments)
            .flat_map(|segment| {
                let vi = segment * 2;
                let fi = vertex_count + vi;

                [
                    // front
                    vi,
                    vi + 1,
                    vi + 2,
                    vi + 2,
                    vi + 1,
                    vi + 3,
                    // back
                    fi + 2,
                    fi + 1,
                    fi,
                    fi + 3,
                    fi + 1,
                    fi + 2,
                ]
            })
            .collect();

        Ok(Self {
            segments,
            indices,
            instance_count: instance_count(patch_size, density)?,
            bounding_radius: bounding_radius(patch_size),
        })
    }

    /// Vertex slots referenced by one blade, front and back block combined.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        4 * (self.segments + 1)
    }

    pub fn into_instanced(self) -> InstancedGeometry {
        let mut geometry = InstancedGeometry::from_indices(self.indices);
        geometry.set_instance_count(self.instance_count);
        geometry.set_bounding_sphere(Vec3::ZERO, self.bounding_radius);
        geometry
    }
}

/// The uniform payload driving the blade shape: `(segments, patch_size, width, height)`.
pub fn grass_params(settings: &TileSettings) -> Vec4 {
    Vec4::new(
        settings.segments as f32,
        settings.patch_size,
        settings.blade_width,
        settings.blade_height,
    )
}

impl FoliageInstance {
    /// Creates the grass of one tile from the `"grass"` template.
    pub fn grass(library: &Library, settings: &TileSettings, id: u32) -> TerrainResult<Self> {
        let mut material = library.clone_material_of_kind(MaterialKind::Grass)?;

        if let MaterialUniforms::Grass(uniform) = material.uniforms_mut() {
            uniform.grass_params = grass_params(settings);
        }

        let geometry = BladeGeometry::build(
            settings.segments,
            settings.patch_size,
            settings.grass_density,
        )?
        .into_instanced();

        let mut grass = Self::new(FoliageKind::Grass, material, geometry);
        grass.set_id(id);

        Ok(grass)
    }
}
