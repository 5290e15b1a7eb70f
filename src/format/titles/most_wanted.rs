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

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectHeader {
    pub unk0: [u32; 3],
    pub flags: u32,
    pub hash: u32,
    pub num_tris: u32,
    pub unk1: [u32; 2],
    pub min_point: CVector4f,
    pub max_point: CVector4f,
    pub transform: CMatrix4f,
    pub unk2: [u32; 6],
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
    pub unk1: u32,
    pub num_verts: u32,
    pub num_tris: u32,
    pub unk2: [u32; 2],
}

impl MeshDescriptorRecord for MeshDescriptor {
    fn apply(&self, builder: &mut ObjectBuilder) { builder.vertex_count_hint = self.num_verts; }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialEntry {
    pub flags: u32,
    /// Indices into the object's texture table; `0xFF` is unused.
    pub texture_indices: [u8; 4],
    pub effect_id: u32,
    /// Entries sharing a vertex buffer repeat the same value here.
    pub group_key: u32,
    pub min_point: CVector3f,
    pub max_point: CVector3f,
    pub num_tris: u32,
    pub num_verts: u32,
    pub unk: [u32; 2],
}

impl MaterialRecord for MaterialEntry {
    const RECORD_SIZE: usize = 0x38;

    fn to_material(&self, builder: &ObjectBuilder) -> Result<(SolidObjectMaterial, u32)> {
        let num_indices = self.num_tris.checked_mul(3).ok_or_else(|| {
            Error::Invariant(format!(
                "material triangle count {:#X} overflows its index count",
                self.num_tris
            ))
        })?;
        let material = SolidObjectMaterial {
            flags: self.flags,
            num_verts: self.num_verts,
            num_indices,
            min_point: self.min_point.into(),
            max_point: self.max_point.into(),
            texture_hashes: builder.resolve_textures(&self.texture_indices)?,
            effect_id: self.effect_id,
            ..Default::default()
        };
        Ok((material, self.group_key))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum Effect {
    WorldPrelit = 0,
    WorldNormalMap = 1,
    Car = 2,
    CarNormalMap = 3,
    Skybox = 4,
}

const STANDARD: VertexLayout = VertexLayout {
    name: "Standard",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
    ],
};

const PRELIT: VertexLayout = VertexLayout {
    name: "Prelit",
    attributes: &[attr(Position, Float3), attr(Color0, Packed32), attr(TexCoord0, Float2)],
};

const DUAL_UV: VertexLayout = VertexLayout {
    name: "DualUv",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
        attr(TexCoord1, Float2),
    ],
};

impl Effect {
    pub fn layout(self) -> &'static VertexLayout {
        match self {
            Effect::WorldPrelit | Effect::Skybox => &PRELIT,
            Effect::WorldNormalMap | Effect::CarNormalMap => &DUAL_UV,
            Effect::Car => &STANDARD,
        }
    }
}

pub struct MostWantedRecords;

impl ObjectRecords for MostWantedRecords {
    type Descriptor = MeshDescriptor;
    type Header = ObjectHeader;
    type Material = MaterialEntry;

    const MAPPING: StreamMapping = StreamMapping::GroupedByKey;
}

pub struct MostWantedProfile;

impl FormatProfile for MostWantedProfile {
    fn title(&self) -> Title { Title::MostWanted }

    fn padding(&self) -> PaddingRule { PaddingRule::filler(0x11, OddLengthFix::None) }

    fn dispatch_list(&self, list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool> {
        dispatch_list_common(list, chunk)
    }

    fn dispatch_object(
        &self,
        object: &mut ObjectBuilder,
        context: Context,
        chunk: &LeafChunk,
    ) -> Result<bool> {
        dispatch_object_common::<MostWantedRecords>(object, context, chunk)
    }

    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex> {
        let effect = Effect::from_repr(effect_id)
            .ok_or_else(|| Error::Unsupported(format!("Most Wanted effect {effect_id:#X}")))?;
        effect.layout().decode(data, stride)
    }
}
