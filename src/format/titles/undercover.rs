//! Undercover adds morph/bone data to the ProStreet layout: vertex ranges of
//! stream 0 that are moved by one of the object's matrices after decoding.

use binrw::binrw;
use strum::FromRepr;

use crate::{
    ensure_invariant,
    format::{
        padding::{OddLengthFix, PaddingRule},
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        solid::{ListBuilder, ObjectBuilder},
        titles::{
            carbon::ObjectHeader, dispatch_list_common, dispatch_object_common,
            prostreet::{MeshDescriptor, K_SENTINEL_WORD},
            MaterialRecord, ObjectRecords, Title,
        },
        vertex::{attr, VertexComponent::*, VertexFormat::*, VertexLayout},
        CMatrix4f, CVector3f, K_CHUNK_MATRICES, K_CHUNK_VERTEX_RANGES,
    },
    model::{SolidMeshVertex, SolidObject, SolidObjectMaterial, VertexRange},
    Error, Result,
};

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
    pub morph_flags: u32,
    pub unk: [u32; 5],
}

impl MaterialRecord for MaterialEntry {
    const RECORD_SIZE: usize = 0x48;

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

#[binrw]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct VertexRangeEntry {
    pub first: u32,
    pub last: u32,
    pub matrix_index: u32,
    pub pad: u32,
}

impl VertexRangeEntry {
    pub const RECORD_SIZE: usize = 0x10;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum Effect {
    World = 0,
    WorldNormalMap = 1,
    Car = 2,
    CarNormalMap = 3,
    Skin = 4,
    Morph = 5,
}

const WORLD: VertexLayout = VertexLayout {
    name: "World",
    attributes: &[attr(Position, Float3), attr(Color0, Packed32), attr(TexCoord0, Half2)],
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

const SKIN: VertexLayout = VertexLayout {
    name: "Skin",
    attributes: &[
        attr(Position, Float3),
        attr(BlendWeights, Float4),
        attr(BlendIndices, Packed32),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(TexCoord0, Float2),
    ],
};

const MORPH: VertexLayout = VertexLayout {
    name: "Morph",
    attributes: &[
        attr(Position, Float3),
        attr(Normal, Float3),
        attr(Color0, Packed32),
        attr(Color1, Packed32),
        attr(TexCoord0, Float2),
        attr(TexCoord1, Float2),
    ],
};

impl Effect {
    pub fn layout(self) -> &'static VertexLayout {
        match self {
            Effect::World => &WORLD,
            Effect::Car => &STANDARD,
            Effect::WorldNormalMap | Effect::CarNormalMap => &TANGENT,
            Effect::Skin => &SKIN,
            Effect::Morph => &MORPH,
        }
    }
}

pub struct UndercoverRecords;

impl ObjectRecords for UndercoverRecords {
    type Descriptor = MeshDescriptor;
    type Header = ObjectHeader;
    type Material = MaterialEntry;

    const MAPPING: StreamMapping = StreamMapping::PerEntry;
}

pub struct UndercoverProfile;

impl FormatProfile for UndercoverProfile {
    fn title(&self) -> Title { Title::Undercover }

    fn padding(&self) -> PaddingRule {
        PaddingRule::sentinel(K_SENTINEL_WORD, 0x11, OddLengthFix::Rewind)
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
        match (context, chunk.id) {
            (Context::Object, K_CHUNK_VERTEX_RANGES) => {
                let entries: Vec<VertexRangeEntry> =
                    chunk.read_records(VertexRangeEntry::RECORD_SIZE)?;
                object.object.vertex_ranges = entries
                    .into_iter()
                    .map(|e| VertexRange { first: e.first, last: e.last, matrix_index: e.matrix_index })
                    .collect();
                Ok(true)
            }
            (Context::Object, K_CHUNK_MATRICES) => {
                let matrices: Vec<CMatrix4f> = chunk.read_records(0x40)?;
                object.object.matrices = matrices.into_iter().map(Into::into).collect();
                Ok(true)
            }
            _ => dispatch_object_common::<UndercoverRecords>(object, context, chunk),
        }
    }

    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex> {
        let effect = Effect::from_repr(effect_id)
            .ok_or_else(|| Error::Unsupported(format!("Undercover effect {effect_id:#X}")))?;
        effect.layout().decode(data, stride)
    }

    /// Moves every vertex range of stream 0 by its matrix.
    fn post_process(
        &self,
        object: &SolidObject,
        stream: usize,
        vertices: &mut [SolidMeshVertex],
    ) -> Result<()> {
        if stream != 0 {
            return Ok(());
        }
        for range in &object.vertex_ranges {
            ensure_invariant!(
                range.first <= range.last && (range.last as usize) < vertices.len(),
                "vertex range {}..={} outside of {} vertices",
                range.first,
                range.last,
                vertices.len()
            );
            let Some(matrix) = object.matrices.get(range.matrix_index as usize) else {
                return Err(Error::Invariant(format!(
                    "vertex range uses matrix {} of {}",
                    range.matrix_index,
                    object.matrices.len()
                )));
            };
            for vertex in &mut vertices[range.first as usize..=range.last as usize] {
                vertex.position = matrix.transform_point3(vertex.position);
                vertex.normal = vertex.normal.map(|n| matrix.transform_vector3(n));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::ErrorKind;

    fn vertex(x: f32) -> SolidMeshVertex {
        SolidMeshVertex { position: Vec3::new(x, 0.0, 0.0), normal: Some(Vec3::X), ..Default::default() }
    }

    #[test]
    fn ranges_move_positions_and_rotate_normals() {
        let object = SolidObject {
            vertex_ranges: vec![VertexRange { first: 1, last: 2, matrix_index: 0 }],
            matrices: vec![
                Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0))
                    * Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2),
            ],
            ..Default::default()
        };
        let mut vertices = vec![vertex(1.0), vertex(2.0), vertex(3.0)];
        UndercoverProfile.post_process(&object, 0, &mut vertices).unwrap();

        assert_eq!(vertices[0].position, Vec3::new(1.0, 0.0, 0.0));
        assert!(vertices[1].position.abs_diff_eq(Vec3::new(0.0, 12.0, 0.0), 1e-5));
        assert!(vertices[2].position.abs_diff_eq(Vec3::new(0.0, 13.0, 0.0), 1e-5));
        assert!(vertices[2].normal.unwrap().abs_diff_eq(Vec3::Y, 1e-5));

        let mut untouched = vec![vertex(1.0), vertex(2.0), vertex(3.0)];
        UndercoverProfile.post_process(&object, 1, &mut untouched).unwrap();
        assert_eq!(untouched[1].position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_data_is_rejected() {
        let mut object = SolidObject {
            vertex_ranges: vec![VertexRange { first: 0, last: 3, matrix_index: 0 }],
            matrices: vec![Mat4::IDENTITY],
            ..Default::default()
        };
        let mut vertices = vec![vertex(0.0); 3];
        let err = UndercoverProfile.post_process(&object, 0, &mut vertices).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);

        object.vertex_ranges[0] = VertexRange { first: 0, last: 2, matrix_index: 1 };
        let err = UndercoverProfile.post_process(&object, 0, &mut vertices).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }
}
