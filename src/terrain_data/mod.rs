//! Composition of texture atlases.
//!
//! An [`Atlas`] is one layered texture assembled from many same-sized images, or read
//! from a raw RGBA8 blob. Every tile samples its own layer, selected by its tile id.
//! The [`TextureAtlas`] composes atlases in the background and stores them by name.

mod atlas;
mod texture_atlas;

pub use atlas::{Atlas, CHANNEL_COUNT};
pub use texture_atlas::{
    compose_from_binary, compose_from_images, AtlasFailed, AtlasReady, AtlasSource,
    TextureAtlas,
};
