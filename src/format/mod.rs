pub mod chunk;
pub mod cursor;
pub mod decoder;
pub mod padding;
pub mod profile;
pub mod reconstruct;
pub mod solid;
pub mod titles;
pub mod vertex;

use std::fmt::{Debug, Display, Formatter};

use binrw::binrw;
use glam::{Mat4, Vec3, Vec4};
use serde_derive::Serialize;

#[binrw]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize)]
pub struct ChunkId(pub u32);

impl ChunkId {
    const CONTAINER_BIT: u32 = 0x8000_0000;

    /// Containers nest further chunks; everything else is a leaf.
    #[inline]
    pub const fn is_container(self) -> bool { self.0 & Self::CONTAINER_BIT != 0 }

    /// A zero tag is an explicit skip.
    #[inline]
    pub const fn is_skip(self) -> bool { self.0 == 0 }
}

impl Display for ChunkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{:#010X}", self.0) }
}

impl Debug for ChunkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "ChunkId({self})") }
}

// Solid list root
pub const K_CHUNK_SOLID_LIST: ChunkId = ChunkId(0x8013_4000);
// List header sub-tree
pub const K_CHUNK_LIST_HEADER: ChunkId = ChunkId(0x8013_4001);
// List info record
pub const K_CHUNK_LIST_INFO: ChunkId = ChunkId(0x0013_4002);
// Object hash table
pub const K_CHUNK_HASH_TABLE: ChunkId = ChunkId(0x0013_4003);
// Compressed object table
pub const K_CHUNK_COMPRESSION_TABLE: ChunkId = ChunkId(0x0013_4004);
// Solid object
pub const K_CHUNK_OBJECT: ChunkId = ChunkId(0x8013_4010);
// Object header + name
pub const K_CHUNK_OBJECT_HEADER: ChunkId = ChunkId(0x0013_4011);
// Texture references
pub const K_CHUNK_TEXTURE_REFS: ChunkId = ChunkId(0x0013_4012);
// Shader references
pub const K_CHUNK_SHADER_REFS: ChunkId = ChunkId(0x0013_4013);
// Morph/bone vertex ranges
pub const K_CHUNK_VERTEX_RANGES: ChunkId = ChunkId(0x0013_4017);
// Morph/bone matrices
pub const K_CHUNK_MATRICES: ChunkId = ChunkId(0x0013_4018);
// Resident (platform) data
pub const K_CHUNK_OBJECT_RESIDENT: ChunkId = ChunkId(0x8013_4100);
// Mesh descriptor
pub const K_CHUNK_MESH_DESCRIPTOR: ChunkId = ChunkId(0x0013_4900);
// Vertex buffer
pub const K_CHUNK_VERTEX_BUFFER: ChunkId = ChunkId(0x0013_4B01);
// Mesh entries (materials)
pub const K_CHUNK_MESH_ENTRIES: ChunkId = ChunkId(0x0013_4B02);
// Index buffer
pub const K_CHUNK_INDEX_BUFFER: ChunkId = ChunkId(0x0013_4B03);
// Material name
pub const K_CHUNK_MATERIAL_NAME: ChunkId = ChunkId(0x0013_4C02);

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CVector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<CVector3f> for Vec3 {
    fn from(v: CVector3f) -> Self { Vec3::new(v.x, v.y, v.z) }
}

impl From<Vec3> for CVector3f {
    fn from(v: Vec3) -> Self { Self { x: v.x, y: v.y, z: v.z } }
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CVector4f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<CVector4f> for Vec4 {
    fn from(v: CVector4f) -> Self { Vec4::new(v.x, v.y, v.z, v.w) }
}

impl From<Vec4> for CVector4f {
    fn from(v: Vec4) -> Self { Self { x: v.x, y: v.y, z: v.z, w: v.w } }
}

/// Column-major 4x4 matrix.
#[binrw]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CMatrix4f {
    pub m: [f32; 16],
}

impl Default for CMatrix4f {
    fn default() -> Self { Mat4::IDENTITY.into() }
}

impl From<CMatrix4f> for Mat4 {
    fn from(v: CMatrix4f) -> Self { Mat4::from_cols_array(&v.m) }
}

impl From<Mat4> for CMatrix4f {
    fn from(v: Mat4) -> Self { Self { m: v.to_cols_array() } }
}
