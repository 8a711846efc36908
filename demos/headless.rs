use bevy::{asset::AssetPlugin, log::LogPlugin, prelude::*};
use bevy_grass_terrain::prelude::*;
use image::{DynamicImage, Rgba, RgbaImage};
use std::{thread, time::Duration};

const WIDTH: u32 = 8;
const HEIGHT: u32 = 8;
const LAYER_SIZE: u32 = 16;

/// One layer of tile data per tile, with a gradient across the section.
fn tile_data() -> Vec<AtlasSource> {
    (0..WIDTH * HEIGHT)
        .map(|id| {
            let shade = (255 * id / (WIDTH * HEIGHT - 1)) as u8;
            let layer = RgbaImage::from_pixel(LAYER_SIZE, LAYER_SIZE, Rgba([shade, 255, 0, 255]));

            DynamicImage::from(layer).into()
        })
        .collect()
}

fn setup(
    mut commands: Commands,
    mut library: ResMut<Library>,
    mut configs: ResMut<Assets<SectionConfig>>,
) -> Result<(), TerrainError> {
    library.register_template("ground", ShaderProgram::default(), GroundUniform::default());
    library.register_template("grass", ShaderProgram::default(), GrassUniform::default());
    library.register_template("sky", ShaderProgram::default(), SkyUniform::default());

    library.load_array_texture_from_images("tile_data", tile_data())?;

    let config = SectionConfig {
        width: WIDTH,
        height: HEIGHT,
        tile_data: Some("tile_data".into()),
        tile: TileSettings {
            patch_size: 10.0,
            grass_density: 50,
            segments: 6,
            blade_width: 0.125,
            blade_height: 3.0,
            ..default()
        },
        ..default()
    };

    commands.spawn_section(configs.add(config));

    Ok(())
}

fn report(mut ready: EventReader<AtlasReady>, mut failed: EventReader<AtlasFailed>) {
    for event in ready.read() {
        info!("Atlas `{}` is available to the terrain.", event.name);
    }

    for event in failed.read() {
        warn!("Atlas `{}` will not be available: {}", event.name, event.error);
    }
}

fn main() -> anyhow::Result<()> {
    let mut app = App::new();

    app.add_plugins((
        MinimalPlugins,
        LogPlugin::default(),
        AssetPlugin::default(),
        GrassTerrainPlugin::default(),
    ))
    .add_systems(Startup, setup.pipe(|In(result): In<Result<(), TerrainError>>| {
        if let Err(error) = result {
            error!("Failed to set up the terrain: {error}");
        }
    }))
    .add_systems(Update, report);

    for _ in 0..10_000 {
        app.update();

        if !app.world().resource::<TerrainContext>().sections().is_empty() {
            break;
        }

        thread::sleep(Duration::from_millis(1));
    }

    let context = app.world().resource::<TerrainContext>();
    let section = context
        .sections()
        .first()
        .ok_or_else(|| anyhow::anyhow!("the terrain section was never built"))?;

    let tile = section
        .tile(0)
        .ok_or_else(|| anyhow::anyhow!("the section has no tiles"))?;
    let blades: u32 = section
        .tiles()
        .iter()
        .flat_map(TerrainTile::foliage)
        .map(|foliage| foliage.geometry().instance_count())
        .sum();

    info!(
        "Built {} tiles of size {} with {} blades in total, {} indices per blade.",
        section.tile_count(),
        section.tile_size(),
        blades,
        tile.foliage()[0].geometry().indices().len()
    );
    info!("Live materials: {}", context.live_materials().count());

    Ok(())
}
