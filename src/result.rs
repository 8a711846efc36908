use crate::material::MaterialKind;
use bevy::math::UVec2;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("texture dimensions do not match: layer {layer} is {found}, expected {expected}")]
    DimensionMismatch {
        layer: u32,
        expected: UVec2,
        found: UVec2,
    },
    #[error("binary atlas holds {found} bytes, expected {expected}")]
    BinarySizeMismatch { expected: usize, found: usize },
    #[error("an atlas needs at least one layer of non-zero size")]
    EmptyAtlas,
    #[error("atlas `{0}` has already been composed")]
    AtlasExists(String),
    #[error("atlas `{0}` is not loaded")]
    MissingAtlas(String),
    #[error("texture `{0}` is not registered")]
    MissingTexture(String),
    #[error("material template `{0}` is not registered")]
    MissingTemplate(String),
    #[error("material template `{name}` is a {found:?} material, expected {expected:?}")]
    TemplateKind {
        name: String,
        expected: MaterialKind,
        found: MaterialKind,
    },
    #[error("instanced geometry `{0}` is not registered")]
    MissingGeometry(String),
    #[error("mesh has no `{0}` attribute")]
    MissingAttribute(&'static str),
    #[error("{density} instances per unit on a patch of size {patch_size} exceed the instance limit")]
    InstanceOverflow { patch_size: f32, density: u32 },
    #[error("tile {id} does not exist, the section has {count} tiles")]
    TileOutOfRange { id: u32, count: u32 },
    #[error("failed to fetch `{path}`")]
    Fetch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),
    #[error("invalid section config")]
    Config(#[from] ron::error::SpannedError),
}

pub type TerrainResult<T> = Result<T, TerrainError>;
