use crate::{
    config::TileSettings,
    foliage::{bounding_radius, instance_count, FoliageInstance, FoliageKind},
    library::Library,
    material::{MaterialKind, MaterialUniforms},
    result::TerrainResult,
};
use bevy::prelude::*;

/// The uniform payload placing rocks: `(patch_size, scale, 0, 0)`.
pub fn rock_params(settings: &TileSettings) -> Vec4 {
    Vec4::new(settings.patch_size, settings.rock_scale, 0.0, 0.0)
}

impl FoliageInstance {
    /// Creates the rocks of one tile from the `"rocks"` template and the `"rocks"` geometry.
    ///
    /// The rock geometry has to be registered in the library beforehand.
    pub fn rocks(library: &Library, settings: &TileSettings, id: u32) -> TerrainResult<Self> {
        let name = FoliageKind::Rocks.name();

        let mut geometry = library.instanced_geometry(name)?.clone();
        geometry.set_instance_count(instance_count(settings.patch_size, settings.rock_density)?);
        geometry.set_bounding_sphere(Vec3::ZERO, bounding_radius(settings.patch_size));

        let mut material = library.clone_material_of_kind(MaterialKind::Rocks)?;

        if let MaterialUniforms::Rocks(uniform) = material.uniforms_mut() {
            uniform.rock_params = rock_params(settings);
        }

        let mut rocks = Self::new(FoliageKind::Rocks, material, geometry);
        rocks.set_id(id);

        Ok(rocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foliage::InstancedGeometry,
        material::{RockUniform, ShaderProgram},
        result::TerrainError,
    };

    fn library() -> Library {
        let mut library = Library::new();
        library.register_template("rocks", ShaderProgram::default(), RockUniform::default());
        library
    }

    fn settings() -> TileSettings {
        TileSettings {
            patch_size: 10.0,
            rock_density: 1,
            rock_scale: 0.5,
            ..default()
        }
    }

    #[test]
    fn rocks_need_their_geometry() {
        assert!(matches!(
            FoliageInstance::rocks(&library(), &settings(), 0),
            Err(TerrainError::MissingGeometry(name)) if name == "rocks"
        ));
    }

    #[test]
    fn rocks_copy_the_registered_geometry() {
        let mut library = library();
        library.insert_instanced_geometry(
            "rocks",
            InstancedGeometry::from_indices(vec![0, 1, 2, 0, 2, 3]),
        );

        let a = FoliageInstance::rocks(&library, &settings(), 1).unwrap();
        let mut b = FoliageInstance::rocks(&library, &settings(), 2).unwrap();
        b.material_mut().set_time(4.0);

        assert_eq!(a.kind(), FoliageKind::Rocks);
        assert_eq!(a.geometry().indices(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(a.geometry().instance_count(), 100);
        assert_eq!(a.geometry().bounding_radius(), 21.0);
        assert_eq!(
            library.instanced_geometry("rocks").unwrap().instance_count(),
            0
        );
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(a.material().uniforms().time(), 0.0);
        assert_eq!(
            a.material().uniforms(),
            &MaterialUniforms::Rocks(RockUniform {
                tile_id: 1,
                rock_params: Vec4::new(10.0, 0.5, 0.0, 0.0),
                ..default()
            })
        );
    }
}
