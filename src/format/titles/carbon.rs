use binrw::binrw;
use strum::FromRepr;

use crate::{
    format::{
        padding::{OddLengthFix, PaddingRule},
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        solid::{ListBuilder, ObjectBuilder},
        titles::{
            dispatch_list_common, dispatch_object_common, MaterialRecord, MeshDescriptorRecord,
            ObjectHeaderRecord, ObjectRecords, Title,
        },
        vertex::{attr, VertexComponent::*, VertexFormat::*, VertexLayout},
        CMatrix4f, CVector3f, CVector4f,
    },
    model::{SolidMeshVertex, SolidObject, SolidObjectMaterial},
    Error, Result,
};

/// Object header shared by Carbon and every later title.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectHeader {
    pub unk0: [u32; 3],
    pub hash: u32,
    pub num_tris: u32,
    pub unk1: [u32; 3],
    pub min_point: CVector4f,
    pub max_point: CVector4f,
    pub transform: CMatrix4f,
    pub unk2: [u32; 8],
}

impl ObjectHeaderRecord for ObjectHeader {
    fn apply(&self, object: &mut SolidObject) {
        object.hash = self.hash;
        object.min_point = self.min_point.into();
        object.max_point = self.max_point.into();
        object.transform = self.transform.into();
    }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescriptor {
    pub unk0: [u32; 2],
    pub flags: u32,
    pub num_materials: u32,
    pub num_vertex_streams: u32,
    pub num_verts: u32,
    pub num_tris: u32,
    pub unk1: [u32; 3],
}

impl MeshDescriptorRecord for MeshDescriptor {
    fn apply(&self, builder: &mut ObjectBuilder) {
        builder.vertex_count_hint = self.num_verts;
        builder.declared_streams = self.num_vertex_streams;
    }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialEntry {
    pub flags: u32,
    pub texture_indices: [u8; 8],
    pub effect_id: u32,
    pub min_point: CVector3f,
    pub max_point: CVector3f,
    pub num_indices: u32,
    pub num_verts: u32,
    pub unk: [u32; 3],
}

impl MaterialRecord for MaterialEntry {
    const RECORD_SIZE: usize = 0x3C;

    fn to_material(&self, builder: &ObjectBuilder) -> Result<(SolidObjectMaterial, u32)> {
        let material = SolidObjectMaterial {
            flags: self.flags,
            num_verts: self.num_verts,
            num_indices: self.num_indices,
            min_point: self.min_point.into(),
            max_point: self.max_point.into(),
            texture_hashes: builder.resolve_textures(&self.texture_indices)?,
            effect_id: self.effect_id,
            ..Default::default()
        };
        Ok((material, 0))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum Effect {
    WorldPrelit = 0,
    World = 1,
    WorldNormalMap = 2,
    Car = 3,
    CarNormalMap = 4,
    Sky = 5,
}

const PRELIT: VertexLayout = VertexLayout {
    name: "Prelit",
    attributes: &[attr(Position, Float3), attr(Color0, Packed32), attr(TexCoord0, Float2)],
};

const STANDARD: VertexLayout = VertexLayout {
    name: "Standard",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
    ],
};

const TANGENT: VertexLayout = VertexLayout {
    name: "Tangent",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
        attr(Tangent, Float4),
    ],
};

impl Effect {
    pub fn layout(self) -> &'static VertexLayout {
        match self {
            Effect::WorldPrelit | Effect::Sky => &PRELIT,
            Effect::World | Effect::Car => &STANDARD,
            Effect::WorldNormalMap | Effect::CarNormalMap => &TANGENT,
        }
    }
}

pub struct CarbonRecords;

impl ObjectRecords for CarbonRecords {
    type Descriptor = MeshDescriptor;
    type Header = ObjectHeader;
    type Material = MaterialEntry;

    const MAPPING: StreamMapping = StreamMapping::DeclaredStreams;
}

pub struct CarbonProfile;

impl FormatProfile for CarbonProfile {
    fn title(&self) -> Title { Title::Carbon }

    fn padding(&self) -> PaddingRule { PaddingRule::filler(0x11, OddLengthFix::Rewind) }

    fn dispatch_list(&self, list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool> {
        dispatch_list_common(list, chunk)
    }

    fn dispatch_object(
        &self,
        object: &mut ObjectBuilder,
        context: Context,
        chunk: &LeafChunk,
    ) -> Result<bool> {
        dispatch_object_common::<CarbonRecords>(object, context, chunk)
    }

    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex> {
        let effect = Effect::from_repr(effect_id)
            .ok_or_else(|| Error::Unsupported(format!("Carbon effect {effect_id:#X}")))?;
        effect.layout().decode(data, stride)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn normal_mapped_vertices_carry_tangents() {
        let floats = [1.0f32, 2.0, 3.0, 0.0, 1.0, 0.0];
        let mut data: Vec<u8> = floats.iter().flat_map(|f| f.to_le_bytes()).collect();
        data.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        for f in [0.5f32, 0.5, 1.0, 0.0, 0.0, 1.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        assert_eq!(data.len(), TANGENT.byte_size());

        let vertex = CarbonProfile
            .decode_vertex(&data, Effect::CarNormalMap as u32, data.len())
            .unwrap();
        assert_eq!(vertex.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(vertex.tangent, Some(Vec3::X));
    }
}
