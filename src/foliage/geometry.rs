use crate::result::{TerrainError, TerrainResult};
use bevy::{
    math::bounding::BoundingSphere,
    prelude::*,
    render::{
        mesh::{Indices, VertexAttributeValues},
        render_asset::RenderAssetUsages,
        render_resource::PrimitiveTopology,
    },
};

/// Index buffer and optional vertex data of a mesh that is drawn `instance_count` times.
///
/// Each tile owns its own copy, so that independently positioned tiles never share
/// GPU buffers. Copies of the same template keep the same topology.
#[derive(Clone, Debug, PartialEq)]
pub struct InstancedGeometry {
    indices: Vec<u32>,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    instance_count: u32,
    bounding_center: Vec3,
    bounding_radius: f32,
}

impl InstancedGeometry {
    /// Geometry without vertex attributes, whose vertices are generated in the vertex stage.
    pub fn from_indices(indices: Vec<u32>) -> Self {
        Self {
            indices,
            positions: Vec::new(),
            normals: Vec::new(),
            instance_count: 0,
            bounding_center: Vec3::ZERO,
            bounding_radius: 0.0,
        }
    }

    /// Extracts the triangles of a mesh, for example a rock loaded with the glTF loader.
    pub fn from_mesh(mesh: &Mesh) -> TerrainResult<Self> {
        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            return Err(TerrainError::MissingAttribute("position"));
        };

        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(normals)) => normals.clone(),
            _ => Vec::new(),
        };

        let indices = match mesh.indices() {
            Some(indices) => indices.iter().map(|index| index as u32).collect(),
            None => (0..positions.len() as u32).collect(),
        };

        Ok(Self {
            indices,
            positions: positions.clone(),
            normals,
            ..Self::from_indices(Vec::new())
        })
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The index buffer as raw bytes, ready for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn set_instance_count(&mut self, instance_count: u32) {
        self.instance_count = instance_count;
    }

    /// The culling volume, in the local space of the tile.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.bounding_center, self.bounding_radius)
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn set_bounding_sphere(&mut self, center: Vec3, radius: f32) {
        self.bounding_center = center;
        self.bounding_radius = radius;
    }

    /// Builds a mesh with the index buffer and whatever vertex attributes are present.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
        .with_inserted_indices(Indices::U32(self.indices.clone()));

        if !self.positions.is_empty() {
            mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        }
        if !self.normals.is_empty() {
            mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        }

        mesh
    }
}
