use crate::{
    config::SectionConfig,
    context::{SkyDome, TerrainContext},
    foliage::FoliageKind,
    library::Library,
    plugin::{RockMesh, TerrainPluginConfig},
    terrain::TerrainSection,
};
use bevy::prelude::*;

#[derive(Resource, Default)]
pub(crate) struct SectionsToSpawn(pub(crate) Vec<Handle<SectionConfig>>);

enum Readiness {
    Ready,
    Waiting,
    Failed(String),
}

fn readiness(config: &SectionConfig, library: &Library, rock_mesh: &RockMesh) -> Readiness {
    if let Some(name) = &config.tile_data {
        if library.array_texture(name).is_none() {
            return if library.texture_atlas().is_loading(name) {
                Readiness::Waiting
            } else {
                Readiness::Failed(format!("atlas `{name}` is neither composed nor loading"))
            };
        }
    }

    if config.tile.has_rocks()
        && !library.has_instanced_geometry(FoliageKind::Rocks.name())
        && rock_mesh.is_pending()
    {
        return Readiness::Waiting;
    }

    Readiness::Ready
}

/// Builds the queued sections once their config, tile data and rock geometry are available.
pub(crate) fn spawn_sections(
    mut sections: ResMut<SectionsToSpawn>,
    asset_server: Res<AssetServer>,
    configs: Res<Assets<SectionConfig>>,
    library: Res<Library>,
    rock_mesh: Res<RockMesh>,
    mut context: ResMut<TerrainContext>,
) {
    sections.0.retain(|handle| {
        let Some(config) = configs.get(handle) else {
            if asset_server.load_state(handle).is_failed() {
                error!("Failed to load the section config {:?}.", handle.path());
                return false;
            }

            return true;
        };

        match readiness(config, &library, &rock_mesh) {
            Readiness::Waiting => return true,
            Readiness::Failed(reason) => {
                error!("Dropped a terrain section: {reason}.");
                return false;
            }
            Readiness::Ready => {}
        }

        match TerrainSection::new(&library, config) {
            Ok(section) => {
                context.add_section(section);
            }
            Err(error) => error!("Failed to build a terrain section: {error}"),
        }

        false
    });
}

/// Creates the sky as soon as its template is registered.
pub(crate) fn spawn_sky(
    config: Res<TerrainPluginConfig>,
    library: Res<Library>,
    mut context: ResMut<TerrainContext>,
    mut failed: Local<bool>,
) {
    if !config.sky || *failed || context.sky().is_some() || library.template("sky").is_err() {
        return;
    }

    match SkyDome::new(&library) {
        Ok(sky) => context.set_sky(sky),
        Err(error) => {
            error!("Failed to create the sky: {error}");
            *failed = true;
        }
    }
}

pub trait SpawnSectionCommandsExt {
    /// Queues a section to be built once everything it depends on is available.
    fn spawn_section(&mut self, config: Handle<SectionConfig>);
}

impl<'w, 's> SpawnSectionCommandsExt for Commands<'w, 's> {
    fn spawn_section(&mut self, config: Handle<SectionConfig>) {
        self.queue(move |world: &mut World| {
            world.resource_mut::<SectionsToSpawn>().0.push(config);
        });
    }
}
