use crate::result::{TerrainError, TerrainResult};
use bevy::{
    image::{ImageAddressMode, ImageFilterMode, ImageSampler, ImageSamplerDescriptor},
    prelude::*,
    render::{
        render_asset::RenderAssetUsages,
        render_resource::{
            Extent3d, TextureDimension, TextureFormat, TextureViewDescriptor, TextureViewDimension,
        },
    },
};
use ndarray::ArrayView4;

/// RGBA, one byte per channel.
pub const CHANNEL_COUNT: usize = 4;

/// A layered RGBA8 texture, composed from equally sized layers.
///
/// The bytes are stored layer-major, and row-major inside each layer, so layer `k` starts
/// at `k * 4 * width * height`. Row `0` of every layer is the *bottom* row of the source
/// image, which matches the texture coordinate convention of the shaders sampling it.
///
/// An atlas is never mutated after it has been composed. Share it with [`Arc`](std::sync::Arc).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atlas {
    width: u32,
    height: u32,
    layer_count: u32,
    data: Vec<u8>,
}

impl Atlas {
    /// Wraps already packed bytes, which have to be exactly `4 * width * height * layer_count` long.
    pub(crate) fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layer_count: u32,
    ) -> TerrainResult<Self> {
        if width == 0 || height == 0 || layer_count == 0 {
            return Err(TerrainError::EmptyAtlas);
        }

        let expected = Self::layer_size(width, height) * layer_count as usize;

        if data.len() != expected {
            return Err(TerrainError::BinarySizeMismatch {
                expected,
                found: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            layer_count,
            data,
        })
    }

    /// The byte size of a single layer.
    #[inline]
    pub fn layer_size(width: u32, height: u32) -> usize {
        CHANNEL_COUNT * width as usize * height as usize
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn size(&self) -> UVec3 {
        UVec3::new(self.width, self.height, self.layer_count)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The bytes of one layer, or `None` if the layer does not exist.
    pub fn layer(&self, layer: u32) -> Option<&[u8]> {
        if layer >= self.layer_count {
            return None;
        }

        let size = Self::layer_size(self.width, self.height);
        let start = layer as usize * size;

        Some(&self.data[start..start + size])
    }

    /// The texels of one layer, bottom row first.
    pub fn texels(&self, layer: u32) -> Option<&[[u8; 4]]> {
        self.layer(layer).map(bytemuck::cast_slice)
    }

    /// Samples a single texel. `y` counts from the bottom row.
    pub fn texel(&self, layer: u32, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        self.texels(layer)
            .map(|texels| texels[(y * self.width + x) as usize])
    }

    /// A `(layer, row, column, channel)` view of the atlas.
    pub fn view(&self) -> Option<ArrayView4<u8>> {
        let shape = (
            self.layer_count as usize,
            self.height as usize,
            self.width as usize,
            CHANNEL_COUNT,
        );

        ArrayView4::from_shape(shape, &self.data).ok()
    }

    /// Creates the GPU facing array texture of this atlas.
    pub fn to_image(&self) -> Image {
        let mut image = Image::new(
            Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: self.layer_count,
            },
            TextureDimension::D2,
            self.data.clone(),
            TextureFormat::Rgba8Unorm,
            RenderAssetUsages::RENDER_WORLD,
        );

        image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
            address_mode_u: ImageAddressMode::ClampToEdge,
            address_mode_v: ImageAddressMode::ClampToEdge,
            mag_filter: ImageFilterMode::Linear,
            min_filter: ImageFilterMode::Linear,
            ..default()
        });

        // a single layer would otherwise be viewed as a plain 2D texture
        image.texture_view_descriptor = Some(TextureViewDescriptor {
            dimension: Some(TextureViewDimension::D2Array),
            ..default()
        });

        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: u32, height: u32, layer_count: u32) -> Atlas {
        let data = (0..layer_count)
            .flat_map(|layer| {
                (0..width * height).flat_map(move |i| [layer as u8, i as u8, 0, 255])
            })
            .collect();

        Atlas::from_raw(data, width, height, layer_count).unwrap()
    }

    #[test]
    fn layers_are_addressed_layer_major() {
        let atlas = striped(3, 2, 4);

        assert_eq!(atlas.data().len(), 4 * 3 * 2 * 4);
        assert_eq!(atlas.layer(2).unwrap()[0], 2);
        assert_eq!(atlas.texel(3, 1, 1), Some([3, 4, 0, 255]));
        assert_eq!(atlas.layer(4), None);
        assert_eq!(atlas.texel(0, 3, 0), None);
    }

    #[test]
    fn view_matches_texels() {
        let atlas = striped(5, 3, 2);
        let view = atlas.view().unwrap();

        assert_eq!(view.shape(), &[2, 3, 5, 4]);
        assert_eq!(view[[1, 2, 4, 1]], atlas.texel(1, 4, 2).unwrap()[1]);
    }

    #[test]
    fn rejects_wrong_length() {
        let result = Atlas::from_raw(vec![0; 15], 2, 2, 1);

        assert!(matches!(
            result,
            Err(TerrainError::BinarySizeMismatch {
                expected: 16,
                found: 15
            })
        ));
        assert!(matches!(
            Atlas::from_raw(vec![], 0, 2, 1),
            Err(TerrainError::EmptyAtlas)
        ));
    }

    #[test]
    fn image_is_a_texture_array() {
        let image = striped(4, 4, 3).to_image();

        assert_eq!(image.texture_descriptor.size.depth_or_array_layers, 3);
        assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba8Unorm);
        assert_eq!(image.data.len(), 4 * 4 * 4 * 3);
    }

    #[test]
    fn sampler_only_filters_within_the_base_level() {
        let image = striped(4, 4, 2).to_image();

        assert_eq!(image.texture_descriptor.mip_level_count, 1);

        let ImageSampler::Descriptor(sampler) = image.sampler else {
            panic!("the atlas has no sampler of its own");
        };
        assert_eq!(sampler.min_filter, ImageFilterMode::Linear);
        assert_eq!(sampler.mipmap_filter, ImageFilterMode::Nearest);
    }
}
