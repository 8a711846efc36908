use crate::{
    result::{TerrainError, TerrainResult},
    terrain_data::atlas::Atlas,
};
use async_channel::{Receiver, Sender};
use bevy::{
    prelude::*,
    tasks::{futures_lite::future, AsyncComputeTaskPool, Task},
    utils::HashMap,
};
use derive_more::derive::From;
use image::{DynamicImage, ImageReader, RgbaImage};
use itertools::Itertools;
use slab::Slab;
use std::{fs, mem, path::PathBuf, sync::Arc};

/// A single layer of an atlas, before it has been decoded.
#[derive(Clone, Debug, From)]
pub enum AtlasSource {
    /// An image file on disk.
    Path(PathBuf),
    /// An encoded image (png, jpeg, ...) already fetched into memory.
    Encoded(Vec<u8>),
    /// An image that has already been decoded.
    Image(DynamicImage),
}

impl AtlasSource {
    /// Decodes the source into an RGBA plane whose first row is the bottom row of the image.
    pub fn decode(self) -> TerrainResult<RgbaImage> {
        let image = match self {
            AtlasSource::Path(path) => ImageReader::open(&path)
                .map_err(|source| TerrainError::Fetch {
                    path: path.clone(),
                    source,
                })?
                .decode()?,
            AtlasSource::Encoded(bytes) => image::load_from_memory(&bytes)?,
            AtlasSource::Image(image) => image,
        };

        Ok(image.flipv().into_rgba8())
    }
}

/// Packs decoded planes into one atlas, in input order.
///
/// The first plane fixes the layer size, every other plane has to match it exactly.
fn compose_planes(planes: Vec<RgbaImage>) -> TerrainResult<Atlas> {
    let Some(first) = planes.first() else {
        return Err(TerrainError::EmptyAtlas);
    };

    let expected = UVec2::from(first.dimensions());
    let layer_size = Atlas::layer_size(expected.x, expected.y);
    let layer_count = planes.len() as u32;

    let mut data = vec![0; layer_size * planes.len()];

    for (layer, plane) in planes.iter().enumerate() {
        let found = UVec2::from(plane.dimensions());

        if found != expected {
            return Err(TerrainError::DimensionMismatch {
                layer: layer as u32,
                expected,
                found,
            });
        }

        let offset = layer * layer_size;
        data[offset..offset + layer_size].copy_from_slice(plane.as_raw());
    }

    Atlas::from_raw(data, expected.x, expected.y, layer_count)
}

/// Decodes all sources and packs them into one atlas. Layer `k` is source `k`.
///
/// Fails with [`TerrainError::DimensionMismatch`] if any source differs in size from the
/// first one. No partial atlas is ever produced.
pub fn compose_from_images(
    sources: impl IntoIterator<Item = AtlasSource>,
) -> TerrainResult<Atlas> {
    let planes = sources
        .into_iter()
        .map(AtlasSource::decode)
        .collect::<TerrainResult<Vec<_>>>()?;

    compose_planes(planes)
}

/// Wraps a pre-packed blob of `width * height * 4 * depth` RGBA8 bytes.
pub fn compose_from_binary(
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    depth: u32,
) -> TerrainResult<Atlas> {
    Atlas::from_raw(bytes, width, height, depth)
}

/// Notification that the atlas with the given name has been composed and can be used.
#[derive(Clone, Debug, PartialEq, Eq, Event)]
pub struct AtlasReady {
    pub name: String,
}

/// Notification that the atlas with the given name could not be composed.
///
/// No atlas is stored under the name, so it can be loaded again.
#[derive(Debug, Event)]
pub struct AtlasFailed {
    pub name: String,
    pub error: TerrainError,
}

struct PendingAtlas {
    name: String,
    task: Task<TerrainResult<Atlas>>,
}

impl PendingAtlas {
    fn from_images(name: String, sources: Vec<AtlasSource>) -> Self {
        let pool = AsyncComputeTaskPool::get();

        let decodes = sources
            .into_iter()
            .map(|source| pool.spawn(async move { source.decode() }))
            .collect_vec();

        let task = pool.spawn(async move {
            let mut planes = Vec::with_capacity(decodes.len());

            // dropping the remaining tasks cancels their decoding
            for decode in decodes {
                planes.push(decode.await?);
            }

            compose_planes(planes)
        });

        Self { name, task }
    }

    fn from_binary_file(name: String, path: PathBuf, width: u32, height: u32, depth: u32) -> Self {
        let task = AsyncComputeTaskPool::get().spawn(async move {
            let bytes = fs::read(&path).map_err(|source| TerrainError::Fetch {
                path: path.clone(),
                source,
            })?;

            compose_from_binary(bytes, width, height, depth)
        });

        Self { name, task }
    }
}

/// Composes atlases and stores them by name.
///
/// Every atlas is composed exactly once. When it becomes available an [`AtlasReady`]
/// notification is sent, which can be received from [`TextureAtlas::on_ready`].
/// Builds from images run on the [`AsyncComputeTaskPool`], one task per source, and
/// only finish once every source has been decoded.
pub struct TextureAtlas {
    atlases: HashMap<String, Arc<Atlas>>,
    loading: Slab<PendingAtlas>,
    ready_sender: Sender<AtlasReady>,
    ready_receiver: Receiver<AtlasReady>,
}

impl Default for TextureAtlas {
    fn default() -> Self {
        let (ready_sender, ready_receiver) = async_channel::unbounded();

        Self {
            atlases: default(),
            loading: Slab::with_capacity(4),
            ready_sender,
            ready_receiver,
        }
    }
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// The receiving end of the ready notifications. All clones share the same queue, so
    /// every notification is delivered to only one of them.
    ///
    /// [`GrassTerrainPlugin`](crate::plugin::GrassTerrainPlugin) drains this queue every
    /// frame and forwards each notification as an [`AtlasReady`] event. Apps using the
    /// plugin should read those events instead, as nothing will be left in the queue.
    pub fn on_ready(&self) -> Receiver<AtlasReady> {
        self.ready_receiver.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Atlas>> {
        self.atlases.get(name).cloned()
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.loading.iter().any(|(_, pending)| pending.name == name)
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    fn reserve(&self, name: &str) -> TerrainResult<()> {
        if self.atlases.contains_key(name) || self.is_loading(name) {
            Err(TerrainError::AtlasExists(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn finish(
        atlases: &mut HashMap<String, Arc<Atlas>>,
        ready_sender: &Sender<AtlasReady>,
        name: String,
        atlas: Atlas,
    ) -> Arc<Atlas> {
        info!(
            "Atlas `{name}` is ready: {}x{} with {} layers.",
            atlas.width(),
            atlas.height(),
            atlas.layer_count()
        );

        let atlas = Arc::new(atlas);
        atlases.insert(name.clone(), atlas.clone());

        // the receiver is owned by self, so the channel can not be closed
        let _ = ready_sender.try_send(AtlasReady { name });

        atlas
    }

    /// Stores an atlas that has been composed elsewhere.
    pub fn insert(&mut self, name: impl Into<String>, atlas: Atlas) -> TerrainResult<Arc<Atlas>> {
        let name = name.into();
        self.reserve(&name)?;

        Ok(Self::finish(
            &mut self.atlases,
            &self.ready_sender,
            name,
            atlas,
        ))
    }

    /// Composes an atlas from a blob that is already in memory.
    pub fn load_atlas_from_binary(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> TerrainResult<Arc<Atlas>> {
        let name = name.into();
        self.reserve(&name)?;

        let atlas = compose_from_binary(bytes, width, height, depth)?;

        Ok(Self::finish(
            &mut self.atlases,
            &self.ready_sender,
            name,
            atlas,
        ))
    }

    /// Starts reading and composing an atlas from a binary file.
    pub fn load_atlas_from_binary_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> TerrainResult<()> {
        let name = name.into();
        self.reserve(&name)?;

        self.loading.insert(PendingAtlas::from_binary_file(
            name,
            path.into(),
            width,
            height,
            depth,
        ));

        Ok(())
    }

    /// Starts decoding all sources concurrently and composing them into an atlas.
    pub fn load_atlas_from_images(
        &mut self,
        name: impl Into<String>,
        sources: Vec<AtlasSource>,
    ) -> TerrainResult<()> {
        let name = name.into();
        self.reserve(&name)?;

        debug!("Composing atlas `{name}` from {} images.", sources.len());

        self.loading.insert(PendingAtlas::from_images(name, sources));

        Ok(())
    }

    /// Collects all finished builds without blocking.
    ///
    /// Returns the builds that failed. Their names can be used again afterwards.
    pub fn update(&mut self) -> Vec<AtlasFailed> {
        let Self {
            atlases,
            loading,
            ready_sender,
            ..
        } = self;

        let mut failed = Vec::new();

        loading.retain(|_, pending| {
            future::block_on(future::poll_once(&mut pending.task)).map_or(true, |result| {
                let name = mem::take(&mut pending.name);

                match result {
                    Ok(atlas) => {
                        Self::finish(atlases, ready_sender, name, atlas);
                    }
                    Err(error) => {
                        error!("Failed to compose atlas `{name}`: {error}");
                        failed.push(AtlasFailed { name, error });
                    }
                }

                false
            })
        });

        failed
    }

    /// Waits for every pending build. Meant for headless hosts and tests.
    pub fn finish_blocking(&mut self) -> Vec<AtlasFailed> {
        let mut failed = Vec::new();

        for pending in self.loading.drain().collect_vec() {
            match future::block_on(pending.task) {
                Ok(atlas) => {
                    Self::finish(&mut self.atlases, &self.ready_sender, pending.name, atlas);
                }
                Err(error) => {
                    error!("Failed to compose atlas `{}`: {error}", pending.name);
                    failed.push(AtlasFailed {
                        name: pending.name,
                        error,
                    });
                }
            }
        }

        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::tasks::TaskPool;
    use image::{ImageFormat, Rgba};
    use rand::Rng;
    use std::io::Cursor;

    fn random_image(width: u32, height: u32) -> RgbaImage {
        let mut rng = rand::rng();
        RgbaImage::from_fn(width, height, |_, _| Rgba(rng.random()))
    }

    fn init_pool() {
        AsyncComputeTaskPool::get_or_init(TaskPool::new);
    }

    #[test]
    fn layers_follow_input_order() {
        let images = (0..3).map(|_| random_image(8, 4)).collect_vec();

        let atlas = compose_from_images(
            images
                .iter()
                .cloned()
                .map(|image| AtlasSource::from(DynamicImage::from(image))),
        )
        .unwrap();

        assert_eq!(atlas.data().len(), 4 * 8 * 4 * 3);

        for (layer, image) in images.iter().enumerate() {
            let flipped = image::imageops::flip_vertical(image);
            assert_eq!(atlas.layer(layer as u32).unwrap(), flipped.as_raw().as_slice());
        }
    }

    #[test]
    fn bottom_row_comes_first() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 1, Rgba([9, 8, 7, 6]));

        let atlas = compose_from_images([AtlasSource::from(DynamicImage::from(image))]).unwrap();

        assert_eq!(atlas.texel(0, 0, 0), Some([9, 8, 7, 6]));
        assert_eq!(atlas.texel(0, 0, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn mismatching_dimensions_fail() {
        let sources = [random_image(4, 4), random_image(4, 4), random_image(4, 2)]
            .map(|image| AtlasSource::from(DynamicImage::from(image)));

        let result = compose_from_images(sources);

        assert!(matches!(
            result,
            Err(TerrainError::DimensionMismatch { layer: 2, expected, found })
                if expected == UVec2::new(4, 4) && found == UVec2::new(4, 2)
        ));
    }

    #[test]
    fn no_sources_is_an_error() {
        assert!(matches!(
            compose_from_images(Vec::new()),
            Err(TerrainError::EmptyAtlas)
        ));
    }

    #[test]
    fn decodes_encoded_images() {
        let image = random_image(3, 5);
        let mut bytes = Vec::new();
        DynamicImage::from(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let atlas = compose_from_images([AtlasSource::Encoded(bytes)]).unwrap();

        assert_eq!(atlas.size(), UVec3::new(3, 5, 1));
        assert_eq!(
            atlas.layer(0).unwrap(),
            image::imageops::flip_vertical(&image).as_raw().as_slice()
        );
    }

    #[test]
    fn ready_fires_once_per_atlas() {
        init_pool();

        let mut texture_atlas = TextureAtlas::new();
        let ready = texture_atlas.on_ready();

        let sources = (0..4)
            .map(|_| AtlasSource::from(DynamicImage::from(random_image(16, 16))))
            .collect_vec();

        texture_atlas
            .load_atlas_from_images("blades", sources)
            .unwrap();
        assert!(texture_atlas.is_loading("blades"));
        assert!(texture_atlas.get("blades").is_none());

        assert!(texture_atlas.finish_blocking().is_empty());
        texture_atlas.update();

        assert_eq!(
            ready.try_recv().unwrap(),
            AtlasReady {
                name: "blades".into()
            }
        );
        assert!(ready.try_recv().is_err());
        assert_eq!(texture_atlas.get("blades").unwrap().layer_count(), 4);
        assert_eq!(texture_atlas.loading_count(), 0);
    }

    #[test]
    fn failed_build_produces_no_atlas() {
        init_pool();

        let mut texture_atlas = TextureAtlas::new();
        let ready = texture_atlas.on_ready();

        let sources = vec![
            AtlasSource::from(DynamicImage::from(random_image(8, 8))),
            AtlasSource::from(DynamicImage::from(random_image(8, 7))),
        ];
        texture_atlas.load_atlas_from_images("tiles", sources).unwrap();

        let failed = texture_atlas.finish_blocking();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "tiles");
        assert!(matches!(
            failed[0].error,
            TerrainError::DimensionMismatch { layer: 1, .. }
        ));
        assert!(texture_atlas.get("tiles").is_none());
        assert!(ready.try_recv().is_err());
    }

    #[test]
    fn missing_binary_file_is_a_fetch_failure() {
        init_pool();

        let mut texture_atlas = TextureAtlas::new();
        texture_atlas
            .load_atlas_from_binary_file("tile_data", "does/not/exist.bin", 4, 4, 1)
            .unwrap();

        let failed = texture_atlas.finish_blocking();

        assert!(matches!(failed[0].error, TerrainError::Fetch { .. }));
    }

    #[test]
    fn undecodable_layer_fails_the_whole_atlas() {
        init_pool();

        let mut texture_atlas = TextureAtlas::new();
        let ready = texture_atlas.on_ready();

        let sources = vec![
            AtlasSource::from(DynamicImage::from(random_image(8, 8))),
            AtlasSource::Encoded(vec![1, 2, 3]),
            AtlasSource::from(DynamicImage::from(random_image(8, 8))),
        ];
        texture_atlas.load_atlas_from_images("blades", sources).unwrap();

        let failed = texture_atlas.finish_blocking();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "blades");
        assert!(matches!(failed[0].error, TerrainError::Decode(_)));
        assert!(texture_atlas.get("blades").is_none());
        assert!(!texture_atlas.is_loading("blades"));
        assert!(ready.try_recv().is_err());

        // the name is free again
        let retry = vec![AtlasSource::from(DynamicImage::from(random_image(8, 8)))];
        texture_atlas.load_atlas_from_images("blades", retry).unwrap();
        assert!(texture_atlas.finish_blocking().is_empty());
        assert_eq!(ready.try_recv().unwrap().name, "blades");
    }

    #[test]
    fn names_are_composed_once() {
        let mut texture_atlas = TextureAtlas::new();
        let ready = texture_atlas.on_ready();

        texture_atlas
            .load_atlas_from_binary("tile_data", vec![7; 4 * 2 * 2 * 3], 2, 2, 3)
            .unwrap();
        let second = texture_atlas.load_atlas_from_binary("tile_data", vec![0; 16], 2, 2, 1);

        assert!(matches!(second, Err(TerrainError::AtlasExists(_))));
        assert_eq!(ready.try_recv().unwrap().name, "tile_data");
        assert!(ready.try_recv().is_err());
        assert_eq!(texture_atlas.get("tile_data").unwrap().data(), &[7; 48]);
    }
}
