//! The decoded object graph.

use std::ops::Range;

use glam::{Mat4, Vec2, Vec3, Vec4};
use indexmap::IndexMap;
use serde_derive::Serialize;

/// A named collection of [`SolidObject`]s.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SolidList {
    /// Source path label recorded by the authoring tools.
    pub path: String,
    /// Class/section label.
    pub class_name: String,
    pub declared_object_count: u32,
    /// Object hashes as listed by the header's hash table.
    pub object_hashes: Vec<u32>,
    pub objects: Vec<SolidObject>,
    #[serde(skip)]
    by_hash: IndexMap<u32, usize>,
}

impl SolidList {
    pub fn push_object(&mut self, object: SolidObject) {
        self.by_hash.entry(object.hash).or_insert(self.objects.len());
        self.objects.push(object);
    }

    pub fn object_by_hash(&self, hash: u32) -> Option<&SolidObject> {
        self.by_hash.get(&hash).map(|&idx| &self.objects[idx])
    }
}

/// One mesh entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SolidObject {
    pub name: String,
    pub hash: u32,
    pub min_point: Vec4,
    pub max_point: Vec4,
    pub transform: Mat4,
    pub texture_hashes: Vec<u32>,
    pub materials: Vec<SolidObjectMaterial>,
    /// Raw per-stream buffers; emptied once the vertex sets are built.
    #[serde(skip)]
    pub vertex_buffers: Vec<VertexBuffer>,
    /// One decoded vertex array per stream.
    pub vertex_sets: Vec<Vec<SolidMeshVertex>>,
    pub indices: Vec<u16>,
    /// Vertex ranges transformed by `matrices` during post-processing.
    pub vertex_ranges: Vec<VertexRange>,
    pub matrices: Vec<Mat4>,
}

impl SolidObject {
    pub fn vertex_count(&self) -> usize { self.vertex_sets.iter().map(Vec::len).sum() }

    /// The vertices drawn by `material`.
    pub fn material_vertices(&self, material: &SolidObjectMaterial) -> &[SolidMeshVertex] {
        self.vertex_sets
            .get(material.vertex_stream_index as usize)
            .and_then(|set| set.get(material.vertex_range()))
            .unwrap_or(&[])
    }
}

/// One drawable sub-range of a [`SolidObject`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SolidObjectMaterial {
    pub name: Option<String>,
    pub flags: u32,
    /// Declared vertex count; 0 means "the rest of the stream".
    pub num_verts: u32,
    pub num_indices: u32,
    pub vertex_stream_index: u32,
    /// Start of this material's slice in its vertex set.
    pub vertex_offset: usize,
    /// Vertices actually bound during reconstruction.
    pub vertex_len: usize,
    pub min_point: Vec3,
    pub max_point: Vec3,
    pub texture_hashes: Vec<u32>,
    pub effect_id: u32,
    pub indices: Vec<u16>,
}

impl SolidObjectMaterial {
    pub fn vertex_range(&self) -> Range<usize> {
        self.vertex_offset..self.vertex_offset + self.vertex_len
    }
}

/// Raw bytes of one vertex stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexBuffer {
    data: Vec<u8>,
}

impl VertexBuffer {
    pub fn new(data: Vec<u8>) -> Self { Self { data } }

    /// Builds a buffer from already-decoded floats.
    pub fn from_floats(values: &[f32]) -> Self {
        Self { data: bytemuck::cast_slice(values).to_vec() }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] { &self.data }

    #[inline]
    pub fn len(&self) -> usize { self.data.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct SolidMeshVertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    pub tangent: Option<Vec3>,
    pub color: Option<u32>,
    pub color2: Option<u32>,
    pub tex_coords: Vec2,
    pub tex_coords2: Option<Vec2>,
    pub blend_weights: Option<Vec4>,
    pub blend_indices: Option<[u8; 4]>,
}

/// An inclusive vertex index range bound to one matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VertexRange {
    pub first: u32,
    pub last: u32,
    pub matrix_index: u32,
}
