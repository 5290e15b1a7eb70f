//! Solid list and object decoding.
//!
//! The builders here are the per-parse state handed to a title's handlers:
//! a fresh [`ObjectBuilder`] per object and one [`ListBuilder`] per list.
//! Nothing about a decode outlives the call that started it.

use binrw::binrw;

use crate::{
    ensure_invariant,
    format::{
        chunk::{ChunkHeader, CHUNK_HEADER_SIZE},
        cursor::ChunkSpan,
        decoder::{ChunkTreeDecoder, ChunkVisitor, Flow},
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        reconstruct::{bind_indices, reconstruct},
        ChunkId, K_CHUNK_OBJECT, K_CHUNK_SOLID_LIST,
    },
    model::{SolidList, SolidObject, SolidObjectMaterial, VertexBuffer},
    options::DecodeOptions,
    util::{
        compression::{decompress_blocks, Decompressor},
        read::read_cstring,
    },
    Error, Result,
};

/// An entry of the compressed object table.
#[binrw]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[brw(little)]
pub struct CompressedObject {
    pub hash: u32,
    /// Offset of the block run from the start of the input.
    pub offset: u32,
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl CompressedObject {
    pub const RECORD_SIZE: usize = 16;
}

/// The object under construction plus the counters its handlers share.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    pub object: SolidObject,
    /// Set by the object header handler; an object without one is malformed.
    pub has_header: bool,
    /// Total vertex count from the mesh descriptor.
    pub vertex_count_hint: u32,
    /// Stream count from the mesh descriptor, for titles that declare it.
    pub declared_streams: u32,
    stream_keys: Vec<u32>,
    named_materials: usize,
}

impl ObjectBuilder {
    pub fn new() -> Self { Self::default() }

    /// Maps per-material texture indices onto the object's texture table.
    /// `0xFF` marks an unused slot.
    pub fn resolve_textures(&self, indices: &[u8]) -> Result<Vec<u32>> {
        let table = &self.object.texture_hashes;
        let mut out = Vec::with_capacity(indices.len());
        for &index in indices.iter().filter(|&&i| i != 0xFF) {
            let Some(&hash) = table.get(index as usize) else {
                return Err(Error::Invariant(format!(
                    "texture index {index} out of range for {} texture references",
                    table.len()
                )));
            };
            out.push(hash);
        }
        Ok(out)
    }

    /// Appends material entries with their stream keys and re-derives every
    /// material's stream index.
    pub fn push_materials<I>(&mut self, entries: I, mapping: StreamMapping) -> Result<()>
    where I: IntoIterator<Item = (SolidObjectMaterial, u32)> {
        for (material, key) in entries {
            self.object.materials.push(material);
            self.stream_keys.push(key);
        }
        mapping.assign(&mut self.object.materials, &self.stream_keys, self.declared_streams)
    }

    pub fn push_vertex_buffer(&mut self, chunk: &LeafChunk) {
        self.object.vertex_buffers.push(VertexBuffer::new(chunk.payload.to_vec()));
    }

    pub fn push_indices(&mut self, chunk: &LeafChunk) -> Result<()> {
        let indices: Vec<u16> = chunk.read_records(2)?;
        self.object.indices.extend(indices);
        Ok(())
    }

    /// Names the first material that has not been named yet.
    pub fn name_next_material(&mut self, chunk: &LeafChunk) -> Result<()> {
        let name = read_cstring(&mut chunk.reader())?;
        let idx = self.named_materials;
        let Some(material) = self.object.materials.get_mut(idx) else {
            return Err(Error::Invariant(format!(
                "material name {name:?} at {:#X} but only {} materials",
                chunk.offset,
                self.object.materials.len()
            )));
        };
        material.name = Some(name);
        self.named_materials += 1;
        Ok(())
    }

    /// Rebuilds the vertex sets and hands out index slices.
    pub fn finish(mut self, profile: &dyn FormatProfile) -> Result<SolidObject> {
        if !self.has_header {
            return Err(Error::Malformed("object has no header chunk".to_string()));
        }
        reconstruct(profile, &mut self.object, self.vertex_count_hint)?;
        bind_indices(&mut self.object)?;
        log::debug!(
            "Decoded object {} ({:#010X}): {} materials, {} vertices, {} indices",
            self.object.name,
            self.object.hash,
            self.object.materials.len(),
            self.object.vertex_count(),
            self.object.indices.len()
        );
        Ok(self.object)
    }
}

/// The list under construction.
#[derive(Debug, Default)]
pub struct ListBuilder {
    pub list: SolidList,
    /// Objects stored outside the chunk tree, decoded after the walk.
    pub compressed: Vec<CompressedObject>,
}

struct ObjectVisitor<'a> {
    profile: &'a dyn FormatProfile,
    builder: &'a mut ObjectBuilder,
}

impl ChunkVisitor for ObjectVisitor<'_> {
    fn enter(&mut self, _: Context, _: &ChunkSpan, _: &[u8]) -> Result<Flow> { Ok(Flow::Descend) }

    fn leaf(&mut self, context: Context, chunk: &LeafChunk) -> Result<bool> {
        self.profile.dispatch_object(self.builder, context, chunk)
    }
}

struct ListVisitor<'a> {
    profile: &'a dyn FormatProfile,
    options: &'a DecodeOptions,
    builder: ListBuilder,
}

impl ListVisitor<'_> {
    fn accept(&mut self, result: Result<SolidObject>, offset: u64) -> Result<()> {
        match result {
            Ok(object) => self.builder.list.push_object(object),
            Err(e) if self.options.skip_failed_objects => {
                log::warn!("Skipping object at {offset:#X}: {e}");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl ChunkVisitor for ListVisitor<'_> {
    fn enter(&mut self, context: Context, span: &ChunkSpan, payload: &[u8]) -> Result<Flow> {
        if context != Context::Object {
            return Ok(Flow::Descend);
        }
        let base = span.offset + CHUNK_HEADER_SIZE as u64;
        let result = decode_object(self.profile, payload, base);
        self.accept(result, span.offset)?;
        Ok(Flow::Skip)
    }

    fn leaf(&mut self, _: Context, chunk: &LeafChunk) -> Result<bool> {
        self.profile.dispatch_list(&mut self.builder, chunk)
    }
}

/// Decodes the payload of one object container. `base` is its absolute offset.
pub fn decode_object(profile: &dyn FormatProfile, payload: &[u8], base: u64) -> Result<SolidObject> {
    let mut builder = ObjectBuilder::new();
    let mut visitor = ObjectVisitor { profile, builder: &mut builder };
    ChunkTreeDecoder::new(profile).walk(payload, base, Context::Object, &mut visitor)?;
    builder.finish(profile)
}

/// Splits off the root chunk of `data`, which must carry `expected`.
fn root_payload(data: &[u8], expected: ChunkId) -> Result<&[u8]> {
    let (header, payload, remain) = ChunkHeader::slice(data)?;
    if header.id() != expected {
        return Err(Error::Structural {
            offset: 0,
            tag: header.id(),
            reason: format!("expected root chunk {expected}"),
        });
    }
    if !remain.is_empty() {
        log::debug!("Ignoring {:#X} bytes after root chunk", remain.len());
    }
    Ok(payload)
}

/// Decodes a complete object container (header included).
pub fn decode_object_container(profile: &dyn FormatProfile, data: &[u8]) -> Result<SolidObject> {
    let payload = root_payload(data, K_CHUNK_OBJECT)?;
    decode_object(profile, payload, CHUNK_HEADER_SIZE as u64)
}

fn decode_compressed(
    profile: &dyn FormatProfile,
    data: &[u8],
    entry: &CompressedObject,
    codec: &dyn Decompressor,
) -> Result<SolidObject> {
    let start = entry.offset as usize;
    let Some(blocks) = start
        .checked_add(entry.compressed_size as usize)
        .and_then(|end| data.get(start..end))
    else {
        return Err(Error::Malformed(format!(
            "compressed object {:#010X} at {start:#X} (size {:#X}) lies outside the input",
            entry.hash, entry.compressed_size
        )));
    };
    let bytes = decompress_blocks(blocks, profile.block_order(), codec)?;
    ensure_invariant!(
        bytes.len() == entry.decompressed_size as usize,
        "compressed object {:#010X} decompressed to {:#X} bytes, expected {:#X}",
        entry.hash,
        bytes.len(),
        entry.decompressed_size
    );
    let object = decode_object_container(profile, &bytes)?;
    if object.hash != entry.hash {
        log::warn!(
            "Compressed object table lists {:#010X} but object {} has hash {:#010X}",
            entry.hash,
            object.name,
            object.hash
        );
    }
    Ok(object)
}

/// Decodes a complete solid list. `codec` handles compressed object entries.
pub fn decode_list(
    profile: &dyn FormatProfile,
    data: &[u8],
    options: &DecodeOptions,
    codec: &dyn Decompressor,
) -> Result<SolidList> {
    let payload = root_payload(data, K_CHUNK_SOLID_LIST)?;
    let mut visitor = ListVisitor { profile, options, builder: ListBuilder::default() };
    ChunkTreeDecoder::new(profile).walk(
        payload,
        CHUNK_HEADER_SIZE as u64,
        Context::ListRoot,
        &mut visitor,
    )?;

    let compressed = std::mem::take(&mut visitor.builder.compressed);
    for entry in &compressed {
        let result = decode_compressed(profile, data, entry, codec);
        visitor.accept(result, entry.offset as u64)?;
    }

    let list = visitor.builder.list;
    if list.declared_object_count as usize != list.objects.len() {
        log::debug!(
            "List {} declares {} objects, decoded {}",
            list.path,
            list.declared_object_count,
            list.objects.len()
        );
    }
    Ok(list)
}
