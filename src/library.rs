use crate::{
    foliage::InstancedGeometry,
    material::{
        MaterialKind, MaterialTemplate, MaterialTextures, MaterialUniforms, ShaderMaterial,
        ShaderProgram,
    },
    result::{TerrainError, TerrainResult},
    terrain_data::{Atlas, AtlasSource, TextureAtlas},
};
use bevy::{prelude::*, utils::HashMap};
use std::{path::PathBuf, sync::Arc};

/// The shared registry of everything tiles are built from.
///
/// Holds the material templates, plain textures, composed array textures and the
/// instanced geometry templates, all by logical name. Everything stored here is read-only
/// once the first tile has been built from it.
#[derive(Default, Resource)]
pub struct Library {
    templates: HashMap<String, MaterialTemplate>,
    textures: HashMap<String, Handle<Image>>,
    texture_atlas: TextureAtlas,
    instanced_geometry: HashMap<String, InstancedGeometry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the template material `name`.
    pub fn register_template(
        &mut self,
        name: impl Into<String>,
        program: ShaderProgram,
        uniforms: impl Into<MaterialUniforms>,
    ) {
        let name = name.into();
        let uniforms = uniforms.into();

        debug!("Registered {:?} material template `{name}`.", uniforms.kind());

        let template = MaterialTemplate {
            name: name.clone(),
            program: Arc::new(program),
            uniforms,
            textures: MaterialTextures::default(),
        };

        if self.templates.insert(name.clone(), template).is_some() {
            warn!("Material template `{name}` has been replaced.");
        }
    }

    pub fn template(&self, name: &str) -> TerrainResult<&MaterialTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| TerrainError::MissingTemplate(name.to_string()))
    }

    /// Looks up a template and checks that it declares the uniforms of `kind`.
    pub fn template_of_kind(
        &self,
        name: &str,
        kind: MaterialKind,
    ) -> TerrainResult<&MaterialTemplate> {
        let template = self.template(name)?;

        if template.kind() != kind {
            return Err(TerrainError::TemplateKind {
                name: name.to_string(),
                expected: kind,
                found: template.kind(),
            });
        }

        Ok(template)
    }

    /// Clones the template `name` into an independent material.
    pub fn clone_material(&self, name: &str) -> TerrainResult<ShaderMaterial> {
        self.template(name).map(MaterialTemplate::instantiate)
    }

    /// Clones the template registered under the default name of `kind`.
    pub fn clone_material_of_kind(&self, kind: MaterialKind) -> TerrainResult<ShaderMaterial> {
        self.template_of_kind(kind.name(), kind)
            .map(MaterialTemplate::instantiate)
    }

    fn template_mut(&mut self, name: &str) -> TerrainResult<&mut MaterialTemplate> {
        self.templates
            .get_mut(name)
            .ok_or_else(|| TerrainError::MissingTemplate(name.to_string()))
    }

    /// Binds the texture `texture` as the diffuse texture of the template `template`.
    pub fn bind_diffuse(&mut self, template: &str, texture: &str) -> TerrainResult<()> {
        let handle = self
            .texture(texture)
            .ok_or_else(|| TerrainError::MissingTexture(texture.to_string()))?;

        self.template_mut(template)?.textures.diffuse = Some(handle);

        Ok(())
    }

    /// Binds the composed atlas `atlas` as the array texture of the template `template`.
    pub fn bind_array_texture(&mut self, template: &str, atlas: &str) -> TerrainResult<()> {
        let atlas = self
            .array_texture(atlas)
            .ok_or_else(|| TerrainError::MissingAtlas(atlas.to_string()))?;

        self.template_mut(template)?.textures.array_texture = Some(atlas);

        Ok(())
    }

    pub fn insert_texture(&mut self, name: impl Into<String>, texture: Handle<Image>) {
        self.textures.insert(name.into(), texture);
    }

    /// Starts loading a plain texture through the asset server.
    pub fn load_texture(
        &mut self,
        asset_server: &AssetServer,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Handle<Image> {
        let texture: Handle<Image> = asset_server.load(path.into());
        self.insert_texture(name, texture.clone());
        texture
    }

    pub fn texture(&self, name: &str) -> Option<Handle<Image>> {
        self.textures.get(name).cloned()
    }

    pub fn texture_atlas(&self) -> &TextureAtlas {
        &self.texture_atlas
    }

    pub fn texture_atlas_mut(&mut self) -> &mut TextureAtlas {
        &mut self.texture_atlas
    }

    /// The composed array texture `name`, once it is ready.
    pub fn array_texture(&self, name: &str) -> Option<Arc<Atlas>> {
        self.texture_atlas.get(name)
    }

    pub fn insert_array_texture(
        &mut self,
        name: impl Into<String>,
        atlas: Atlas,
    ) -> TerrainResult<Arc<Atlas>> {
        self.texture_atlas.insert(name, atlas)
    }

    /// Starts composing the array texture `name` from same-sized images.
    pub fn load_array_texture_from_images(
        &mut self,
        name: impl Into<String>,
        sources: Vec<AtlasSource>,
    ) -> TerrainResult<()> {
        self.texture_atlas.load_atlas_from_images(name, sources)
    }

    /// Starts reading the array texture `name` from a raw RGBA8 file.
    pub fn load_array_texture_from_binary_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> TerrainResult<()> {
        self.texture_atlas
            .load_atlas_from_binary_file(name, path, width, height, depth)
    }

    /// Composes the array texture `name` from raw RGBA8 bytes already in memory.
    pub fn load_array_texture_from_binary(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> TerrainResult<Arc<Atlas>> {
        self.texture_atlas
            .load_atlas_from_binary(name, bytes, width, height, depth)
    }

    pub fn insert_instanced_geometry(
        &mut self,
        name: impl Into<String>,
        geometry: InstancedGeometry,
    ) {
        self.instanced_geometry.insert(name.into(), geometry);
    }

    pub fn instanced_geometry(&self, name: &str) -> TerrainResult<&InstancedGeometry> {
        self.instanced_geometry
            .get(name)
            .ok_or_else(|| TerrainError::MissingGeometry(name.to_string()))
    }

    pub fn has_instanced_geometry(&self, name: &str) -> bool {
        self.instanced_geometry.contains_key(name)
    }
}
