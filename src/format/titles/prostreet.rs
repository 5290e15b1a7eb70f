use binrw::binrw;
use strum::FromRepr;

use crate::{
    format::{
        padding::{OddLengthFix, PaddingRule},
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        solid::{ListBuilder, ObjectBuilder},
        titles::{
            carbon::ObjectHeader, dispatch_list_common, dispatch_object_common, MaterialRecord,
            MeshDescriptorRecord, ObjectRecords, Title,
        },
        vertex::{attr, VertexComponent::*, VertexFormat::*, VertexLayout},
        CVector3f,
    },
    model::{SolidMeshVertex, SolidObjectMaterial},
    Error, Result,
};

pub const K_SENTINEL_WORD: u32 = 0x1111_1111;

/// Mesh descriptor shared with Undercover.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescriptor {
    pub unk0: [u32; 2],
    pub flags: u32,
    pub num_materials: u32,
    pub unk1: u32,
    pub num_verts: u32,
    pub num_tris: u32,
    pub unk2: [u32; 5],
}

impl MeshDescriptorRecord for MeshDescriptor {
    fn apply(&self, builder: &mut ObjectBuilder) { builder.vertex_count_hint = self.num_verts; }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialEntry {
    pub flags: u32,
    pub texture_indices: [u8; 8],
    pub effect_id: u32,
    pub num_verts: u32,
    pub num_indices: u32,
    pub min_point: CVector3f,
    pub max_point: CVector3f,
    pub unk: [u32; 4],
}

impl MaterialRecord for MaterialEntry {
    const RECORD_SIZE: usize = 0x40;

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
        attr(Color0, Packed32),
        attr(TexCoord0, Half2),
    ],
};

const STANDARD: VertexLayout = VertexLayout {
    name: "Standard",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Half2),
    ],
};

const TANGENT: VertexLayout = VertexLayout {
    name: "Tangent",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Half2),
        attr(Tangent, Snorm16x4),
    ],
};

const SKIN: VertexLayout = VertexLayout {
    name: "Skin",
    attributes: &[
        attr(Position, Float3),
        attr(BlendWeights, Unorm8x4),
        attr(BlendIndices, Packed32),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Half2),
    ],
};

impl Effect {
    pub fn layout(self) -> &'static VertexLayout {
        match self {
            Effect::World => &WORLD,
            Effect::Car => &STANDARD,
            Effect::WorldNormalMap | Effect::CarNormalMap => &TANGENT,
            Effect::Skin => &SKIN,
        }
    }
}

pub struct ProStreetRecords;

impl ObjectRecords for ProStreetRecords {
    type Descriptor = MeshDescriptor;
    type Header = ObjectHeader;
    type Material = MaterialEntry;

    const MAPPING: StreamMapping = StreamMapping::PerEntry;
}

pub struct ProStreetProfile;

impl FormatProfile for ProStreetProfile {
    fn title(&self) -> Title { Title::ProStreet }

    fn padding(&self) -> PaddingRule {
        PaddingRule::sentinel(K_SENTINEL_WORD, 0x11, OddLengthFix::CountOnly)
    }

    fn dispatch_list(&self, list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool> {
        dispatch_list_common(list, chunk)
    }

    fn dispatch_object(
        &self,
        object: &mut ObjectBuilder,
        context: Context,
        chunk: &LeafChunk,
    ) -> Result<bool> {
        dispatch_object_common::<ProStreetRecords>(object, context, chunk)
    }

    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex> {
        let effect = Effect::from_repr(effect_id)
            .ok_or_else(|| Error::Unsupported(format!("ProStreet effect {effect_id:#X}")))?;
        effect.layout().decode(data, stride)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use half::f16;

    use super::*;

    #[test]
    fn world_vertices_use_half_uvs() {
        let mut data: Vec<u8> = [4.0f32, 5.0, 6.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        data.extend_from_slice(&0x8040_2010u32.to_le_bytes());
        data.extend_from_slice(&f16::from_f32(0.25).to_bits().to_le_bytes());
        data.extend_from_slice(&f16::from_f32(-2.0).to_bits().to_le_bytes());
        assert_eq!(data.len(), 20);

        let vertex = ProStreetProfile.decode_vertex(&data, Effect::World as u32, 20).unwrap();
        assert_eq!(vertex.tex_coords, Vec2::new(0.25, -2.0));
        assert_eq!(vertex.color, Some(0x8040_2010));
        assert_eq!(vertex.normal, None);
    }
}
