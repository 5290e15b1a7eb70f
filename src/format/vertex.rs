//! Vertex layouts as data.
//!
//! Each title maps its effect IDs to a [`VertexLayout`]: an ordered list of
//! attributes packed at the start of every vertex. Bytes past the layout, up to
//! the stream stride, are ignored.

use std::io::{Cursor, Seek, SeekFrom};

use binrw::{BinReaderExt, Endian};
use glam::{Vec2, Vec4};
use half::f16;

use crate::{ensure_invariant, model::SolidMeshVertex, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
    Half2,
    Half4,
    /// Four normalized signed shorts.
    Snorm16x4,
    /// Four normalized unsigned bytes.
    Unorm8x4,
    /// Packed 32-bit value kept as-is (colors, bone indices).
    Packed32,
    /// Bytes skipped without decoding.
    Skip(u8),
}

impl VertexFormat {
    pub const fn byte_size(self) -> usize {
        match self {
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::Half2 => 4,
            VertexFormat::Half4 => 8,
            VertexFormat::Snorm16x4 => 8,
            VertexFormat::Unorm8x4 => 4,
            VertexFormat::Packed32 => 4,
            VertexFormat::Skip(n) => n as usize,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VertexComponent {
    Position,
    Normal,
    Tangent,
    Color0,
    Color1,
    TexCoord0,
    TexCoord1,
    BlendWeights,
    BlendIndices,
    Unused,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub component: VertexComponent,
    pub format: VertexFormat,
}

/// Shorthand for layout tables.
pub const fn attr(component: VertexComponent, format: VertexFormat) -> VertexAttribute {
    VertexAttribute { component, format }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VertexLayout {
    pub name: &'static str,
    pub attributes: &'static [VertexAttribute],
}

enum Value {
    Float(Vec4),
    Packed(u32),
}

impl VertexLayout {
    pub fn byte_size(&self) -> usize { self.attributes.iter().map(|a| a.format.byte_size()).sum() }

    /// Decodes one vertex from `data`, which must hold exactly `stride` bytes.
    pub fn decode(&self, data: &[u8], stride: usize) -> Result<SolidMeshVertex> {
        ensure_invariant!(
            data.len() == stride,
            "vertex window is {} bytes, expected stride {stride}",
            data.len()
        );
        ensure_invariant!(
            stride >= self.byte_size(),
            "stride {stride} is smaller than layout {} ({} bytes)",
            self.name,
            self.byte_size()
        );

        let mut reader = Cursor::new(data);
        let mut out = SolidMeshVertex::default();
        for attribute in self.attributes {
            let value = match read_value(&mut reader, attribute.format)? {
                Some(value) => value,
                None => continue,
            };
            match (attribute.component, value) {
                (VertexComponent::Position, Value::Float(v)) => out.position = v.truncate(),
                (VertexComponent::Normal, Value::Float(v)) => out.normal = Some(v.truncate()),
                (VertexComponent::Tangent, Value::Float(v)) => out.tangent = Some(v.truncate()),
                (VertexComponent::TexCoord0, Value::Float(v)) => {
                    out.tex_coords = Vec2::new(v.x, v.y)
                }
                (VertexComponent::TexCoord1, Value::Float(v)) => {
                    out.tex_coords2 = Some(Vec2::new(v.x, v.y))
                }
                (VertexComponent::BlendWeights, Value::Float(v)) => out.blend_weights = Some(v),
                (VertexComponent::Color0, Value::Packed(c)) => out.color = Some(c),
                (VertexComponent::Color1, Value::Packed(c)) => out.color2 = Some(c),
                (VertexComponent::BlendIndices, Value::Packed(c)) => {
                    out.blend_indices = Some(c.to_le_bytes())
                }
                (VertexComponent::Unused, _) => {}
                (component, _) => {
                    return Err(crate::Error::Unsupported(format!(
                        "layout {} stores {component:?} as {:?}",
                        self.name, attribute.format
                    )))
                }
            }
        }
        Ok(out)
    }
}

fn read_value(reader: &mut Cursor<&[u8]>, format: VertexFormat) -> Result<Option<Value>> {
    let e = Endian::Little;
    let value = match format {
        VertexFormat::Float2 => {
            let v: [f32; 2] = reader.read_type(e)?;
            Value::Float(Vec4::new(v[0], v[1], 0.0, 0.0))
        }
        VertexFormat::Float3 => {
            let v: [f32; 3] = reader.read_type(e)?;
            Value::Float(Vec4::new(v[0], v[1], v[2], 0.0))
        }
        VertexFormat::Float4 => Value::Float(Vec4::from_array(reader.read_type(e)?)),
        VertexFormat::Half2 => {
            let v: [u16; 2] = reader.read_type(e)?;
            Value::Float(Vec4::new(f16::from_bits(v[0]).to_f32(), f16::from_bits(v[1]).to_f32(), 0.0, 0.0))
        }
        VertexFormat::Half4 => {
            let v: [u16; 4] = reader.read_type(e)?;
            Value::Float(Vec4::from_array(v.map(|h| f16::from_bits(h).to_f32())))
        }
        VertexFormat::Snorm16x4 => {
            let v: [i16; 4] = reader.read_type(e)?;
            Value::Float(Vec4::from_array(v.map(|c| (c as f32 / i16::MAX as f32).max(-1.0))))
        }
        VertexFormat::Unorm8x4 => {
            let v: [u8; 4] = reader.read_type(e)?;
            Value::Float(Vec4::from_array(v.map(|c| c as f32 / u8::MAX as f32)))
        }
        VertexFormat::Packed32 => Value::Packed(reader.read_type(e)?),
        VertexFormat::Skip(n) => {
            reader.seek(SeekFrom::Current(n as i64))?;
            return Ok(None);
        }
    };
    Ok(Some(value))
}
