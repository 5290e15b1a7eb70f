//! The per-title extension point of the chunk tree decoder.

use std::io::{Cursor, Seek, SeekFrom};

use binrw::{BinRead, Endian};

use crate::{
    ensure_invariant,
    format::{
        padding::PaddingRule,
        solid::{ListBuilder, ObjectBuilder},
        titles::Title,
        ChunkId, K_CHUNK_LIST_HEADER, K_CHUNK_OBJECT, K_CHUNK_OBJECT_RESIDENT, K_CHUNK_SOLID_LIST,
    },
    model::{SolidMeshVertex, SolidObject, SolidObjectMaterial},
    util::compression::BlockOrder,
    Result,
};

/// Interpretation context of the chunks inside a container.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Context {
    ListRoot,
    ListHeader,
    /// Object-logical data.
    Object,
    /// Object resident/platform data.
    ObjectResident,
}

/// A leaf chunk with its leading filler already skipped.
#[derive(Copy, Clone, Debug)]
pub struct LeafChunk<'a> {
    pub id: ChunkId,
    /// Absolute offset of the chunk header.
    pub offset: u64,
    pub payload: &'a [u8],
}

impl<'a> LeafChunk<'a> {
    #[inline]
    pub fn reader(&self) -> Cursor<&'a [u8]> { Cursor::new(self.payload) }

    pub fn read<T>(&self) -> Result<T>
    where T: for<'b> BinRead<Args<'b> = ()> {
        Ok(T::read_options(&mut self.reader(), Endian::Little, ())?)
    }

    /// Reads a table of fixed-size records filling the whole payload.
    pub fn read_records<T>(&self, record_size: usize) -> Result<Vec<T>>
    where T: for<'b> BinRead<Args<'b> = ()> {
        ensure_invariant!(
            record_size != 0 && self.payload.len() % record_size == 0,
            "chunk {} at {:#X}: {} bytes is not a multiple of record size {record_size}",
            self.id,
            self.offset,
            self.payload.len()
        );
        let count = self.payload.len() / record_size;
        let mut reader = self.reader();
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            reader.seek(SeekFrom::Start((i * record_size) as u64))?;
            out.push(T::read_options(&mut reader, Endian::Little, ())?);
        }
        Ok(out)
    }
}

/// How material entries are bound to vertex streams.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StreamMapping {
    /// Entry `i` draws from stream `i`.
    PerEntry,
    /// A new stream starts whenever the entry's grouping key changes.
    GroupedByKey,
    /// One stream for everything, or one per entry when the descriptor
    /// declares as many streams as there are entries.
    DeclaredStreams,
    /// The key is the stream index.
    Explicit,
}

impl StreamMapping {
    /// Assigns `vertex_stream_index` for every material. `keys` holds the
    /// title-specific per-entry field the mapping is derived from.
    pub fn assign(
        self,
        materials: &mut [SolidObjectMaterial],
        keys: &[u32],
        declared_streams: u32,
    ) -> Result<()> {
        ensure_invariant!(
            keys.len() == materials.len(),
            "{} stream keys for {} materials",
            keys.len(),
            materials.len()
        );
        match self {
            StreamMapping::PerEntry => {
                for (i, material) in materials.iter_mut().enumerate() {
                    material.vertex_stream_index = i as u32;
                }
            }
            StreamMapping::GroupedByKey => {
                let mut stream = 0u32;
                for i in 0..materials.len() {
                    if i > 0 && keys[i] != keys[i - 1] {
                        stream += 1;
                    }
                    materials[i].vertex_stream_index = stream;
                }
            }
            StreamMapping::DeclaredStreams => match declared_streams as usize {
                0 | 1 => materials.iter_mut().for_each(|m| m.vertex_stream_index = 0),
                n if n == materials.len() => {
                    for (i, material) in materials.iter_mut().enumerate() {
                        material.vertex_stream_index = i as u32;
                    }
                }
                n => {
                    return Err(crate::Error::Invariant(format!(
                        "{n} declared vertex streams cannot map onto {} materials",
                        materials.len()
                    )))
                }
            },
            StreamMapping::Explicit => {
                for (material, &key) in materials.iter_mut().zip(keys) {
                    material.vertex_stream_index = key;
                }
            }
        }
        Ok(())
    }
}

/// A title-specific set of tag handlers, record layouts and vertex decoders.
///
/// Profiles carry no per-object state; everything mutable lives in the
/// builders passed to the handlers, so one profile may serve concurrent
/// decodes.
pub trait FormatProfile: Sync {
    fn title(&self) -> Title;

    fn padding(&self) -> PaddingRule;

    /// The context a container switches to. Unknown containers inherit their parent's.
    fn container_context(&self, id: ChunkId, parent: Context) -> Context {
        match id {
            K_CHUNK_SOLID_LIST => Context::ListRoot,
            K_CHUNK_LIST_HEADER => Context::ListHeader,
            K_CHUNK_OBJECT => Context::Object,
            K_CHUNK_OBJECT_RESIDENT => Context::ObjectResident,
            _ => parent,
        }
    }

    /// Whether an unhandled leaf in `context` is fatal.
    fn requires_recognition(&self, context: Context) -> bool {
        matches!(context, Context::ObjectResident)
    }

    /// Handles a leaf of the list root or header. Returns whether it was recognized.
    fn dispatch_list(&self, list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool>;

    /// Handles a leaf of an object. Returns whether it was recognized.
    fn dispatch_object(
        &self,
        object: &mut ObjectBuilder,
        context: Context,
        chunk: &LeafChunk,
    ) -> Result<bool>;

    /// Decodes exactly one `stride`-byte vertex.
    fn decode_vertex(&self, data: &[u8], effect_id: u32, stride: usize) -> Result<SolidMeshVertex>;

    /// Runs once per decoded stream.
    fn post_process(
        &self,
        _object: &SolidObject,
        _stream: usize,
        _vertices: &mut [SolidMeshVertex],
    ) -> Result<()> {
        Ok(())
    }

    /// Logical order of compressed object blocks.
    fn block_order(&self) -> BlockOrder { BlockOrder::Sequential }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn materials(n: usize) -> Vec<SolidObjectMaterial> { vec![SolidObjectMaterial::default(); n] }

    fn streams(materials: &[SolidObjectMaterial]) -> Vec<u32> {
        materials.iter().map(|m| m.vertex_stream_index).collect()
    }

    #[test]
    fn grouped_by_key_starts_new_stream_on_change() {
        let mut m = materials(5);
        StreamMapping::GroupedByKey.assign(&mut m, &[4, 4, 9, 9, 4], 0).unwrap();
        assert_eq!(streams(&m), [0, 0, 1, 1, 2]);
    }

    #[test]
    fn declared_streams() {
        let mut m = materials(3);
        StreamMapping::DeclaredStreams.assign(&mut m, &[0; 3], 1).unwrap();
        assert_eq!(streams(&m), [0, 0, 0]);
        StreamMapping::DeclaredStreams.assign(&mut m, &[0; 3], 3).unwrap();
        assert_eq!(streams(&m), [0, 1, 2]);
        let err = StreamMapping::DeclaredStreams.assign(&mut m, &[0; 3], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn per_entry_and_explicit() {
        let mut m = materials(3);
        StreamMapping::PerEntry.assign(&mut m, &[7, 7, 7], 0).unwrap();
        assert_eq!(streams(&m), [0, 1, 2]);
        StreamMapping::Explicit.assign(&mut m, &[1, 0, 1], 0).unwrap();
        assert_eq!(streams(&m), [1, 0, 1]);
    }

    #[test]
    fn record_table_must_divide_payload() {
        let payload = [0u8; 10];
        let chunk = LeafChunk {
            id: ChunkId(0x0013_4B02),
            offset: 0,
            payload: &payload,
        };
        let err = chunk.read_records::<u32>(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        let ok: Vec<u16> = chunk.read_records(2).unwrap();
        assert_eq!(ok.len(), 5);
    }
}
