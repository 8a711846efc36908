use crate::{
    config::TileSettings,
    foliage::{FoliageInstance, FoliageKind},
    library::Library,
    material::{MaterialKind, MaterialUniforms, ShaderMaterial},
    result::TerrainResult,
    terrain_data::Atlas,
};
use bevy::prelude::*;
use std::{f32::consts::PI, sync::Arc};

/// Subdivisions of the unit ground plane, which yields 128 x 128 quads.
pub const GROUND_SUBDIVISIONS: u32 = 127;

/// The ground mesh of a tile.
#[derive(Clone, Debug)]
pub struct GroundPatch {
    material: ShaderMaterial,
    mesh: Mesh,
    transform: Transform,
    visible: bool,
}

impl GroundPatch {
    fn new(mut material: ShaderMaterial, settings: &TileSettings) -> Self {
        if let MaterialUniforms::Ground(uniform) = material.uniforms_mut() {
            uniform.patch_size = settings.patch_size;
        }

        let mesh = Plane3d::default()
            .mesh()
            .size(1.0, 1.0)
            .subdivisions(GROUND_SUBDIVISIONS)
            .build();

        // the plane faces up already, it is only turned around to line up with the blades
        let transform = Transform::from_rotation(Quat::from_rotation_y(PI))
            .with_scale(Vec3::splat(settings.tile_size()));

        Self {
            material,
            mesh,
            transform,
            visible: true,
        }
    }

    pub fn material(&self) -> &ShaderMaterial {
        &self.material
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// One cell of a terrain section.
///
/// A tile exclusively owns a ground patch and its foliage layers, each with a material
/// cloned from the library. All of them carry the id of the tile in their `tile_id`
/// uniform, which selects the layer of the tile data atlas they sample.
#[derive(Clone, Debug)]
pub struct TerrainTile {
    id: u32,
    visible: bool,
    ground: GroundPatch,
    foliage: Vec<FoliageInstance>,
}

impl TerrainTile {
    /// Builds a tile from the templates in the library.
    ///
    /// The grass layer is always present, rocks are added when the settings ask for them.
    /// If `tile_data` is given, it is bound as the array texture of every material.
    pub fn new(
        library: &Library,
        settings: &TileSettings,
        id: u32,
        tile_data: Option<&Arc<Atlas>>,
    ) -> TerrainResult<Self> {
        let ground = GroundPatch::new(
            library.clone_material_of_kind(MaterialKind::Ground)?,
            settings,
        );

        let mut foliage = vec![FoliageInstance::grass(library, settings, id)?];

        if settings.has_rocks() {
            foliage.push(FoliageInstance::rocks(library, settings, id)?);
        }

        let mut tile = Self {
            id,
            visible: true,
            ground,
            foliage,
        };

        if let Some(tile_data) = tile_data {
            for material in tile.materials_mut() {
                material.textures_mut().array_texture = Some(tile_data.clone());
            }
        }

        tile.set_id(id);

        Ok(tile)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Assigns the id to the tile and to every material it owns.
    pub fn set_id(&mut self, id: u32) {
        self.id = id;

        for material in self.materials_mut() {
            material.set_tile_id(id);
        }
    }

    pub fn position(&self) -> Vec3 {
        self.ground.transform.translation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.ground.transform.translation = position;

        for foliage in &mut self.foliage {
            foliage.set_position(position);
        }
    }

    /// Rotates the whole tile around the vertical axis.
    pub fn rotate(&mut self, angle: f32) {
        self.ground.transform.rotate_y(angle);

        for foliage in &mut self.foliage {
            foliage.rotate_y(angle);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.ground.visible = visible;

        for foliage in &mut self.foliage {
            foliage.set_visible(visible);
        }
    }

    pub fn ground(&self) -> &GroundPatch {
        &self.ground
    }

    pub fn foliage(&self) -> &[FoliageInstance] {
        &self.foliage
    }

    pub fn foliage_of_kind(&self, kind: FoliageKind) -> Option<&FoliageInstance> {
        self.foliage.iter().find(|foliage| foliage.kind() == kind)
    }

    /// The foliage materials followed by the ground material.
    pub fn materials(&self) -> impl Iterator<Item = &ShaderMaterial> {
        self.foliage
            .iter()
            .map(FoliageInstance::material)
            .chain(std::iter::once(&self.ground.material))
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut ShaderMaterial> {
        self.foliage
            .iter_mut()
            .map(FoliageInstance::material_mut)
            .chain(std::iter::once(&mut self.ground.material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foliage::InstancedGeometry,
        material::{GrassUniform, GroundUniform, RockUniform, ShaderProgram},
        result::TerrainError,
    };

    fn library() -> Library {
        let mut library = Library::new();
        library.register_template("ground", ShaderProgram::default(), GroundUniform::default());
        library.register_template("grass", ShaderProgram::default(), GrassUniform::default());
        library
    }

    #[test]
    fn ground_covers_the_tile() {
        let settings = TileSettings {
            patch_size: 10.0,
            ..default()
        };
        let tile = TerrainTile::new(&library(), &settings, 0, None).unwrap();

        assert_eq!(tile.ground().mesh().count_vertices(), 129 * 129);
        assert_eq!(tile.ground().transform().scale, Vec3::splat(20.0));
        assert_eq!(
            tile.ground().material().uniforms(),
            &MaterialUniforms::Ground(GroundUniform {
                patch_size: 10.0,
                ..default()
            })
        );
    }

    #[test]
    fn id_reaches_every_material() {
        let mut tile = TerrainTile::new(&library(), &default(), 3, None).unwrap();

        assert!(tile.materials().all(|material| material.tile_id() == Some(3)));
        assert_eq!(tile.materials().count(), 2);

        tile.set_id(9);

        assert_eq!(tile.id(), 9);
        assert!(tile.materials().all(|material| material.tile_id() == Some(9)));
        assert!(tile.foliage().iter().all(|foliage| foliage.id() == 9));
    }

    #[test]
    fn position_and_visibility_apply_to_all_meshes() {
        let mut tile = TerrainTile::new(&library(), &default(), 0, None).unwrap();

        tile.set_position(Vec3::new(-4.0, 1.0, 2.0));
        tile.set_visible(false);

        assert_eq!(tile.position(), Vec3::new(-4.0, 1.0, 2.0));
        assert!(!tile.ground().is_visible());
        for foliage in tile.foliage() {
            assert_eq!(foliage.position(), Vec3::new(-4.0, 1.0, 2.0));
            assert!(!foliage.is_visible());
        }
    }

    #[test]
    fn rotation_turns_ground_and_foliage() {
        let mut tile = TerrainTile::new(&library(), &default(), 0, None).unwrap();
        let ground = tile.ground().transform().rotation;

        tile.rotate(PI / 2.0);

        let grass = tile.foliage_of_kind(FoliageKind::Grass).unwrap();
        assert!(grass
            .transform()
            .rotation
            .abs_diff_eq(Quat::from_rotation_y(PI / 2.0), 1e-6));
        assert!(tile
            .ground()
            .transform()
            .rotation
            .abs_diff_eq(Quat::from_rotation_y(PI / 2.0) * ground, 1e-6));
    }

    #[test]
    fn rocks_are_optional() {
        let mut library = library();
        let settings = TileSettings {
            rock_density: 2,
            ..default()
        };

        library.register_template("rocks", ShaderProgram::default(), RockUniform::default());
        assert!(matches!(
            TerrainTile::new(&library, &settings, 0, None),
            Err(TerrainError::MissingGeometry(_))
        ));

        library.insert_instanced_geometry("rocks", InstancedGeometry::from_indices(vec![0, 1, 2]));
        let tile = TerrainTile::new(&library, &settings, 0, None).unwrap();

        assert_eq!(tile.foliage().len(), 2);
        assert!(tile.foliage_of_kind(FoliageKind::Rocks).is_some());
    }

    #[test]
    fn tile_data_is_shared() {
        let mut library = library();
        let atlas = library
            .load_array_texture_from_binary("tile_data", vec![0; 4 * 4], 2, 2, 1)
            .unwrap();

        let a = TerrainTile::new(&library, &default(), 0, Some(&atlas)).unwrap();
        let b = TerrainTile::new(&library, &default(), 1, Some(&atlas)).unwrap();

        for (a, b) in a.materials().zip(b.materials()) {
            assert!(a.textures().shares_array_texture(b.textures()));
            assert!(a.shares_program(b));
        }
    }
}
