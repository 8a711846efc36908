use crate::{
    config::SectionConfig,
    context::TerrainContext,
    foliage::{FoliageKind, InstancedGeometry},
    library::Library,
    spawn::{spawn_sections, spawn_sky, SectionsToSpawn},
    terrain_data::{AtlasFailed, AtlasReady},
};
use bevy::{prelude::*, window::WindowResized};
use bevy_common_assets::ron::RonAssetPlugin;

#[derive(Clone, Resource)]
pub struct TerrainPluginConfig {
    /// Whether a sky dome is created once the `"sky"` template is registered.
    pub sky: bool,
}

impl Default for TerrainPluginConfig {
    fn default() -> Self {
        Self { sky: true }
    }
}

/// The mesh that is converted into the `"rocks"` instanced geometry once it is loaded.
#[derive(Resource, Default)]
pub struct RockMesh(Option<Handle<Mesh>>);

impl RockMesh {
    pub fn load(&mut self, mesh: Handle<Mesh>) {
        self.0 = Some(mesh);
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

/// Polls the atlas builds and forwards their outcome as [`AtlasReady`] and [`AtlasFailed`]
/// events.
///
/// Every ready atlas is also uploaded as an array texture image, which is registered in the
/// library as a texture under the name of the atlas.
pub(crate) fn update_atlases(
    mut library: ResMut<Library>,
    mut images: Option<ResMut<Assets<Image>>>,
    mut atlas_ready: EventWriter<AtlasReady>,
    mut atlas_failed: EventWriter<AtlasFailed>,
) {
    if library.texture_atlas().loading_count() > 0 {
        atlas_failed.send_batch(library.texture_atlas_mut().update());
    }

    let ready = library.texture_atlas().on_ready();
    while let Ok(event) = ready.try_recv() {
        if let (Some(images), Some(atlas)) = (&mut images, library.array_texture(&event.name)) {
            let image = images.add(atlas.to_image());
            library.insert_texture(event.name.clone(), image);
        }

        atlas_ready.send(event);
    }
}

/// Converts the rock mesh once it is loaded.
///
/// A mesh that fails to load is given up on, so sections with rocks are no longer held back
/// and fail to build instead.
pub(crate) fn register_rock_meshes(
    mut rock_mesh: ResMut<RockMesh>,
    meshes: Option<Res<Assets<Mesh>>>,
    asset_server: Option<Res<AssetServer>>,
    mut library: ResMut<Library>,
) {
    let Some(handle) = &rock_mesh.0 else {
        return;
    };

    if asset_server.is_some_and(|asset_server| asset_server.load_state(handle).is_failed()) {
        error!("Failed to load the rock mesh {:?}.", handle.path());
        rock_mesh.0 = None;
        return;
    }

    let Some(mesh) = meshes.as_ref().and_then(|meshes| meshes.get(handle)) else {
        return;
    };

    match InstancedGeometry::from_mesh(mesh) {
        Ok(geometry) => {
            debug!("Registered the rock geometry with {} indices.", geometry.indices().len());
            library.insert_instanced_geometry(FoliageKind::Rocks.name(), geometry);
        }
        Err(error) => error!("Failed to convert the rock mesh: {error}"),
    }

    rock_mesh.0 = None;
}

pub(crate) fn step_terrain(time: Res<Time>, mut context: ResMut<TerrainContext>) {
    context.step(time.delta_secs());
}

pub(crate) fn resize_terrain(
    mut resized: EventReader<WindowResized>,
    windows: Query<&Window>,
    mut context: ResMut<TerrainContext>,
) {
    let Some(event) = resized.read().last() else {
        return;
    };

    let scale_factor = windows
        .get(event.window)
        .map_or(1.0, |window| window.scale_factor());

    context.resize(event.width, event.height, scale_factor);
}

/// The plugin for the grass terrain.
///
/// Sections are queued with [`SpawnSectionCommandsExt`](crate::spawn::SpawnSectionCommandsExt)
/// and built as soon as everything they depend on is available.
/// Templates, textures and atlases are registered in the [`Library`] resource.
///
/// The plugin consumes the notifications of
/// [`TextureAtlas::on_ready`](crate::terrain_data::TextureAtlas::on_ready) and reports every
/// atlas as an [`AtlasReady`] or [`AtlasFailed`] event instead.
#[derive(Default)]
pub struct GrassTerrainPlugin {
    pub config: TerrainPluginConfig,
}

impl Plugin for GrassTerrainPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RonAssetPlugin::<SectionConfig>::new(&["section.ron"]))
            .insert_resource(self.config.clone())
            .init_resource::<Library>()
            .init_resource::<TerrainContext>()
            .init_resource::<SectionsToSpawn>()
            .init_resource::<RockMesh>()
            .add_event::<AtlasReady>()
            .add_event::<AtlasFailed>()
            .add_event::<WindowResized>()
            .add_systems(
                Update,
                (
                    update_atlases,
                    register_rock_meshes,
                    spawn_sections,
                    spawn_sky,
                    resize_terrain,
                    step_terrain,
                )
                    .chain(),
            );
    }
}
