//! World stores most objects outside the chunk tree: the list header carries
//! a table of block-compressed object containers, decoded after the walk.

use binrw::binrw;
use strum::FromRepr;

use crate::{
    format::{
        padding::{OddLengthFix, PaddingRule},
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        solid::{CompressedObject, ListBuilder, ObjectBuilder},
        titles::{
            carbon::ObjectHeader, dispatch_list_common, dispatch_object_common, MaterialRecord,
            MeshDescriptorRecord, ObjectRecords, Title,
        },
        vertex::{attr, VertexComponent::*, VertexFormat::*, VertexLayout},
        CVector3f, K_CHUNK_COMPRESSION_TABLE,
    },
    model::{SolidMeshVertex, SolidObjectMaterial},
    util::compression::BlockOrder,
    Error, Result,
};

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescriptor {
    pub unk0: [u32; 2],
    pub flags: u32,
    pub num_materials: u32,
    pub num_vertex_streams: u32,
    pub num_verts: u32,
    pub num_tris: u32,
    pub unk1: [u32; 4],
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
    pub vertex_stream_index: u32,
    pub num_verts: u32,
    pub num_indices: u32,
    pub min_point: CVector3f,
    pub max_point: CVector3f,
    pub unk: [u32; 2],
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
        Ok((material, self.vertex_stream_index))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum Effect {
    World = 0,
    WorldNormalMap = 1,
    Car = 2,
    CarNormalMap = 3,
    Skin = 4,
}

const WORLD: VertexLayout = VertexLayout {
    name: "World",
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
        attr(Tangent, Float3),
    ],
};

const SKIN: VertexLayout = VertexLayout {
    name: "Skin",
    attributes: &[
        attr(Position, Float3),
        attr(BlendWeights, Float4),
        attr(BlendIndices, Packed32),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
        attr(Tangent, Float3),
    ],
};

impl Effect {
    pub fn layout(self) -> &'static VertexLayout {
        match self {
            Effect::World | Effect::Car => &WORLD,
            Effect::WorldNormalMap | Effect::CarNormalMap => &TANGENT,
            Effect::Skin => &SKIN,
        }
    }
}

pub struct WorldRecords;

impl ObjectRecords for WorldRecords {
    type Descriptor = MeshDescriptor;
    type Header = ObjectHeader;
    type Material = MaterialEntry;

    const MAPPING: StreamMapping = StreamMapping::Explicit;
}

pub struct WorldProfile;

impl FormatProfile for WorldProfile {
    fn title(&self) -> Title { Title::World }

    fn padding(&self) -> PaddingRule { PaddingRule::filler(0x11, OddLengthFix::Rewind) }

    // Resident data carries platform tags without handlers.
    fn requires_recognition(&self, _context: Context) -> bool { false }

    fn dispatch_list(&self, list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool> {
        if chunk.id == K_CHUNK_COMPRESSION_TABLE {
            let entries: Vec<CompressedObject> = chunk.read_records(CompressedObject::RECORD_SIZE)?;
            list.compressed.extend(entries);
            return Ok(true);
        }
        dispatch_list_common(list, chunk)
    }

    fn dispatch_object(
        &self,
        object: &mut ObjectBuilder,
        context: Context,
        chunk: &LeafChunk,
    ) -> Result<bool> {
        dispatch_object_common::<WorldRecords>(object, context, chunk)
    }

    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex> {
        let effect = Effect::from_repr(effect_id)
            .ok_or_else(|| Error::Unsupported(format!("World effect {effect_id:#X}")))?;
        effect.layout().decode(data, stride)
    }

    fn block_order(&self) -> BlockOrder { BlockOrder::LastFirst }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_tolerates_unknown_resident_tags() {
        assert!(!WorldProfile.requires_recognition(Context::ObjectResident));
        assert_eq!(WorldProfile.block_order(), BlockOrder::LastFirst);
        assert_eq!(Effect::Skin.layout().byte_size(), 68);
    }
}
