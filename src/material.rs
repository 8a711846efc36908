//! Shading state of the terrain.
//!
//! Every material kind declares a closed set of uniforms, which is checked when a material
//! is constructed instead of when it is drawn. Templates are registered once in the
//! [`Library`](crate::library::Library) and cloned by every tile. A clone owns its uniform
//! values, while the program text and all textures stay shared.

use crate::terrain_data::Atlas;
use bevy::{prelude::*, render::render_resource::ShaderType};
use derive_more::derive::From;
use std::sync::Arc;

/// The kinds of materials the terrain knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Ground,
    Grass,
    Rocks,
    Sky,
}

impl MaterialKind {
    /// The name the template of this kind is registered under by default.
    pub const fn name(self) -> &'static str {
        match self {
            MaterialKind::Ground => "ground",
            MaterialKind::Grass => "grass",
            MaterialKind::Rocks => "rocks",
            MaterialKind::Sky => "sky",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct GroundUniform {
    pub tile_id: u32,
    pub patch_size: f32,
    pub time: f32,
    pub resolution: Vec2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct GrassUniform {
    pub tile_id: u32,
    /// `(segments, patch_size, blade width, blade height)`
    pub grass_params: Vec4,
    pub time: f32,
    pub resolution: Vec2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct RockUniform {
    pub tile_id: u32,
    /// `(patch_size, rock scale, 0, 0)`
    pub rock_params: Vec4,
    pub time: f32,
    pub resolution: Vec2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct SkyUniform {
    pub time: f32,
    pub resolution: Vec2,
}

/// The uniform values of a material, one variant per [`MaterialKind`].
#[derive(Clone, Copy, Debug, PartialEq, From)]
pub enum MaterialUniforms {
    Ground(GroundUniform),
    Grass(GrassUniform),
    Rocks(RockUniform),
    Sky(SkyUniform),
}

impl MaterialUniforms {
    pub fn kind(&self) -> MaterialKind {
        match self {
            MaterialUniforms::Ground(_) => MaterialKind::Ground,
            MaterialUniforms::Grass(_) => MaterialKind::Grass,
            MaterialUniforms::Rocks(_) => MaterialKind::Rocks,
            MaterialUniforms::Sky(_) => MaterialKind::Sky,
        }
    }

    /// The tile id, if this kind is sampled per tile.
    pub fn tile_id(&self) -> Option<u32> {
        match self {
            MaterialUniforms::Ground(uniform) => Some(uniform.tile_id),
            MaterialUniforms::Grass(uniform) => Some(uniform.tile_id),
            MaterialUniforms::Rocks(uniform) => Some(uniform.tile_id),
            MaterialUniforms::Sky(_) => None,
        }
    }

    fn set_tile_id(&mut self, tile_id: u32) {
        match self {
            MaterialUniforms::Ground(uniform) => uniform.tile_id = tile_id,
            MaterialUniforms::Grass(uniform) => uniform.tile_id = tile_id,
            MaterialUniforms::Rocks(uniform) => uniform.tile_id = tile_id,
            MaterialUniforms::Sky(_) => {}
        }
    }

    pub fn time(&self) -> f32 {
        match self {
            MaterialUniforms::Ground(uniform) => uniform.time,
            MaterialUniforms::Grass(uniform) => uniform.time,
            MaterialUniforms::Rocks(uniform) => uniform.time,
            MaterialUniforms::Sky(uniform) => uniform.time,
        }
    }

    fn set_time(&mut self, time: f32) {
        match self {
            MaterialUniforms::Ground(uniform) => uniform.time = time,
            MaterialUniforms::Grass(uniform) => uniform.time = time,
            MaterialUniforms::Rocks(uniform) => uniform.time = time,
            MaterialUniforms::Sky(uniform) => uniform.time = time,
        }
    }

    pub fn resolution(&self) -> Vec2 {
        match self {
            MaterialUniforms::Ground(uniform) => uniform.resolution,
            MaterialUniforms::Grass(uniform) => uniform.resolution,
            MaterialUniforms::Rocks(uniform) => uniform.resolution,
            MaterialUniforms::Sky(uniform) => uniform.resolution,
        }
    }

    fn set_resolution(&mut self, resolution: Vec2) {
        match self {
            MaterialUniforms::Ground(uniform) => uniform.resolution = resolution,
            MaterialUniforms::Grass(uniform) => uniform.resolution = resolution,
            MaterialUniforms::Rocks(uniform) => uniform.resolution = resolution,
            MaterialUniforms::Sky(uniform) => uniform.resolution = resolution,
        }
    }
}

/// Externally authored program text. Opaque to the terrain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderProgram {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderProgram {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Texture bindings of a material. Cloning a material shares these by reference.
#[derive(Clone, Debug, Default)]
pub struct MaterialTextures {
    pub diffuse: Option<Handle<Image>>,
    pub array_texture: Option<Arc<Atlas>>,
}

impl MaterialTextures {
    /// Whether both bind the very same atlas.
    pub fn shares_array_texture(&self, other: &Self) -> bool {
        match (&self.array_texture, &other.array_texture) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for MaterialTextures {
    fn eq(&self, other: &Self) -> bool {
        let same_atlas = match (&self.array_texture, &other.array_texture) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };

        self.diffuse == other.diffuse && same_atlas
    }
}

/// A read-only material configuration, which is cloned into [`ShaderMaterial`]s.
#[derive(Clone, Debug)]
pub struct MaterialTemplate {
    pub(crate) name: String,
    pub(crate) program: Arc<ShaderProgram>,
    pub(crate) uniforms: MaterialUniforms,
    pub(crate) textures: MaterialTextures,
}

impl MaterialTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MaterialKind {
        self.uniforms.kind()
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn uniforms(&self) -> &MaterialUniforms {
        &self.uniforms
    }

    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    /// Creates an independent material from this template.
    pub fn instantiate(&self) -> ShaderMaterial {
        ShaderMaterial {
            name: self.name.clone(),
            program: self.program.clone(),
            uniforms: self.uniforms,
            textures: self.textures.clone(),
        }
    }
}

/// A live material instance, owned by exactly one mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderMaterial {
    name: String,
    program: Arc<ShaderProgram>,
    uniforms: MaterialUniforms,
    textures: MaterialTextures,
}

impl ShaderMaterial {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MaterialKind {
        self.uniforms.kind()
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Whether both materials were cloned from the same template program.
    pub fn shares_program(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.program, &other.program)
    }

    pub fn uniforms(&self) -> &MaterialUniforms {
        &self.uniforms
    }

    pub(crate) fn uniforms_mut(&mut self) -> &mut MaterialUniforms {
        &mut self.uniforms
    }

    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    pub(crate) fn textures_mut(&mut self) -> &mut MaterialTextures {
        &mut self.textures
    }

    pub fn tile_id(&self) -> Option<u32> {
        self.uniforms.tile_id()
    }

    /// Sets the `tile_id` uniform. Materials without one ignore this.
    pub fn set_tile_id(&mut self, tile_id: u32) {
        self.uniforms.set_tile_id(tile_id);
    }

    pub fn set_time(&mut self, time: f32) {
        self.uniforms.set_time(time);
    }

    pub fn set_resolution(&mut self, resolution: Vec2) {
        self.uniforms.set_resolution(resolution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass_template() -> MaterialTemplate {
        MaterialTemplate {
            name: "grass".into(),
            program: Arc::new(ShaderProgram::new("vertex", "fragment")),
            uniforms: GrassUniform::default().into(),
            textures: default(),
        }
    }

    #[test]
    fn instances_are_independent() {
        let template = grass_template();

        let mut a = template.instantiate();
        let b = template.instantiate();

        a.set_tile_id(7);
        a.set_time(1.5);

        assert_eq!(a.tile_id(), Some(7));
        assert_eq!(b.tile_id(), Some(0));
        assert_eq!(template.uniforms().tile_id(), Some(0));
        assert_eq!(b.uniforms().time(), 0.0);
        assert!(a.shares_program(&b));
    }

    #[test]
    fn sky_has_no_tile_id() {
        let mut uniforms = MaterialUniforms::from(SkyUniform::default());
        uniforms.set_tile_id(3);
        uniforms.set_resolution(Vec2::new(640.0, 480.0));

        assert_eq!(uniforms.kind(), MaterialKind::Sky);
        assert_eq!(uniforms.tile_id(), None);
        assert_eq!(uniforms.resolution(), Vec2::new(640.0, 480.0));
    }

    #[test]
    fn uniforms_have_a_gpu_layout() {
        assert!(GrassUniform::min_size().get() >= 32);
        assert!(SkyUniform::min_size().get() >= 12);
    }
}
