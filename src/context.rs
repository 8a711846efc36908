use crate::{
    library::Library,
    material::{MaterialKind, ShaderMaterial},
    result::TerrainResult,
    terrain::TerrainSection,
};
use bevy::prelude::*;

pub const SKY_RADIUS: f32 = 5000.0;
pub const SKY_SECTORS: u32 = 32;
pub const SKY_STACKS: u32 = 15;

/// The sphere surrounding the terrain.
#[derive(Clone, Debug)]
pub struct SkyDome {
    material: ShaderMaterial,
    mesh: Mesh,
}

impl SkyDome {
    /// Creates the sky from the `"sky"` template.
    pub fn new(library: &Library) -> TerrainResult<Self> {
        let material = library.clone_material_of_kind(MaterialKind::Sky)?;
        let mesh = Sphere::new(SKY_RADIUS).mesh().uv(SKY_SECTORS, SKY_STACKS);

        Ok(Self { material, mesh })
    }

    pub fn material(&self) -> &ShaderMaterial {
        &self.material
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}

/// Everything the per frame update of the terrain works on.
///
/// Owns the built sections and the sky, the accumulated time and the current resolution,
/// and pushes the latter two into every live material.
#[derive(Resource, Default)]
pub struct TerrainContext {
    sections: Vec<TerrainSection>,
    sky: Option<SkyDome>,
    total_time: f32,
    resolution: Vec2,
}

impl TerrainContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a built section, whose materials are brought up to date right away.
    pub fn add_section(&mut self, mut section: TerrainSection) -> usize {
        for material in section.materials_mut() {
            material.set_time(self.total_time);
            material.set_resolution(self.resolution);
        }

        self.sections.push(section);
        self.sections.len() - 1
    }

    pub fn set_sky(&mut self, mut sky: SkyDome) {
        sky.material.set_time(self.total_time);
        sky.material.set_resolution(self.resolution);

        self.sky = Some(sky);
    }

    /// Advances the time by `delta` seconds.
    pub fn step(&mut self, delta: f32) {
        self.total_time += delta.max(0.0);

        let time = self.total_time;
        for material in self.live_materials_mut() {
            material.set_time(time);
        }
    }

    /// Sets the resolution from the logical window size and its scale factor.
    pub fn resize(&mut self, width: f32, height: f32, scale_factor: f32) {
        self.resolution = Vec2::new(width, height) * scale_factor;

        let resolution = self.resolution;
        for material in self.live_materials_mut() {
            material.set_resolution(resolution);
        }
    }

    /// The materials of every tile of every section, followed by the sky.
    pub fn live_materials(&self) -> impl Iterator<Item = &ShaderMaterial> {
        self.sections
            .iter()
            .flat_map(|section| section.materials())
            .chain(self.sky.as_ref().map(SkyDome::material))
    }

    fn live_materials_mut(&mut self) -> impl Iterator<Item = &mut ShaderMaterial> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.materials_mut())
            .chain(self.sky.as_mut().map(|sky| &mut sky.material))
    }

    pub fn sections(&self) -> &[TerrainSection] {
        &self.sections
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut TerrainSection> {
        self.sections.get_mut(index)
    }

    pub fn sky(&self) -> Option<&SkyDome> {
        self.sky.as_ref()
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SectionConfig,
        material::{GrassUniform, GroundUniform, ShaderProgram, SkyUniform},
    };

    fn library() -> Library {
        let mut library = Library::new();
        library.register_template("ground", ShaderProgram::default(), GroundUniform::default());
        library.register_template("grass", ShaderProgram::default(), GrassUniform::default());
        library.register_template("sky", ShaderProgram::default(), SkyUniform::default());
        library
    }

    fn section(library: &Library) -> TerrainSection {
        let config = SectionConfig {
            width: 2,
            height: 2,
            ..default()
        };

        TerrainSection::new(library, &config).unwrap()
    }

    #[test]
    fn step_reaches_every_material() {
        let library = library();
        let mut context = TerrainContext::new();
        context.add_section(section(&library));
        context.set_sky(SkyDome::new(&library).unwrap());

        context.step(0.25);
        context.step(0.5);
        context.step(-1.0);

        assert_eq!(context.total_time(), 0.75);
        assert_eq!(context.live_materials().count(), 9);
        assert!(context
            .live_materials()
            .all(|material| material.uniforms().time() == 0.75));
    }

    #[test]
    fn resize_uses_physical_pixels() {
        let library = library();
        let mut context = TerrainContext::new();
        context.set_sky(SkyDome::new(&library).unwrap());

        context.resize(800.0, 600.0, 2.0);

        assert_eq!(context.resolution(), Vec2::new(1600.0, 1200.0));
        assert_eq!(
            context.sky().unwrap().material().uniforms().resolution(),
            Vec2::new(1600.0, 1200.0)
        );
    }

    #[test]
    fn late_sections_catch_up() {
        let library = library();
        let mut context = TerrainContext::new();

        context.step(3.0);
        context.resize(100.0, 50.0, 1.0);
        let index = context.add_section(section(&library));

        assert!(context.section_mut(index).is_some());
        assert!(context.live_materials().all(|material| {
            material.uniforms().time() == 3.0
                && material.uniforms().resolution() == Vec2::new(100.0, 50.0)
        }));
    }

    #[test]
    fn sky_needs_its_template() {
        let mut mismatched = Library::new();
        mismatched.register_template("sky", ShaderProgram::default(), GroundUniform::default());

        assert!(SkyDome::new(&mismatched).is_err());
        assert!(SkyDome::new(&library()).unwrap().mesh().count_vertices() > 0);
    }
}
