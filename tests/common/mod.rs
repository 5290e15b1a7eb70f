#![allow(dead_code)]

use std::io::{Cursor, Write};

use binrw::{BinWrite, Endian};
use solidlist::{
    format::{
        chunk::ChunkHeader,
        titles::{HashEntry, ListInfo},
        ChunkId, K_CHUNK_HASH_TABLE, K_CHUNK_INDEX_BUFFER, K_CHUNK_LIST_HEADER, K_CHUNK_LIST_INFO,
        K_CHUNK_MATERIAL_NAME, K_CHUNK_MESH_DESCRIPTOR, K_CHUNK_MESH_ENTRIES, K_CHUNK_OBJECT,
        K_CHUNK_OBJECT_HEADER, K_CHUNK_OBJECT_RESIDENT, K_CHUNK_SOLID_LIST, K_CHUNK_TEXTURE_REFS,
        K_CHUNK_VERTEX_BUFFER,
    },
    util::read::to_fixed,
    Result,
};

pub type Writer = Cursor<Vec<u8>>;

pub fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }

pub fn leaf(w: &mut Writer, id: ChunkId, payload: &[u8]) -> Result<()> {
    ChunkHeader::write(w, id, |w| {
        w.write_all(payload)?;
        Ok(())
    })
}

pub fn record<T>(w: &mut Writer, value: &T) -> Result<()>
where T: for<'a> BinWrite<Args<'a> = ()> {
    value.write_options(w, Endian::Little, ())?;
    Ok(())
}

pub fn record_chunk<T>(w: &mut Writer, id: ChunkId, value: &T) -> Result<()>
where T: for<'a> BinWrite<Args<'a> = ()> {
    ChunkHeader::write(w, id, |w| record(w, value))
}

pub fn table_chunk<T>(w: &mut Writer, id: ChunkId, values: &[T]) -> Result<()>
where T: for<'a> BinWrite<Args<'a> = ()> {
    ChunkHeader::write(w, id, |w| {
        for value in values {
            record(w, value)?;
        }
        Ok(())
    })
}

pub fn hash_table(hashes: &[u32]) -> Vec<HashEntry> {
    hashes.iter().map(|&hash| HashEntry { hash, pad: 0 }).collect()
}

pub fn floats(values: &[f32]) -> Vec<u8> { values.iter().flat_map(|v| v.to_le_bytes()).collect() }

/// `count` vertices of the 36-byte position/normal/color/uv layout with
/// positions `(first + i, i, 0)`.
pub fn standard_vertices(count: usize, first: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(count * 36);
    for i in 0..count {
        out.extend(floats(&[first + i as f32, i as f32, 0.0, 0.0, 1.0, 0.0]));
        out.extend_from_slice(&0xFF80_8080u32.to_le_bytes());
        out.extend(floats(&[0.5, 0.25]));
    }
    out
}

/// Everything needed to write one object container.
pub struct ObjectParts<'a, H, D, M> {
    pub header: H,
    pub name: &'a str,
    pub textures: Vec<u32>,
    pub descriptor: D,
    pub materials: Vec<M>,
    pub buffers: Vec<Vec<u8>>,
    /// Filler bytes written ahead of every vertex buffer payload.
    pub buffer_filler: Vec<u8>,
    pub indices: Vec<u16>,
    pub material_names: Vec<&'a str>,
    /// Extra object-level chunks written after the texture table.
    pub extra: Vec<(ChunkId, Vec<u8>)>,
    /// Extra resident chunks written after the index buffer.
    pub extra_resident: Vec<(ChunkId, Vec<u8>)>,
}

impl<'a, H, D, M> ObjectParts<'a, H, D, M>
where
    H: for<'b> BinWrite<Args<'b> = ()>,
    D: for<'b> BinWrite<Args<'b> = ()>,
    M: for<'b> BinWrite<Args<'b> = ()>,
{
    pub fn new(header: H, name: &'a str, descriptor: D) -> Self {
        Self {
            header,
            name,
            textures: Vec::new(),
            descriptor,
            materials: Vec::new(),
            buffers: Vec::new(),
            buffer_filler: Vec::new(),
            indices: Vec::new(),
            material_names: Vec::new(),
            extra: Vec::new(),
            extra_resident: Vec::new(),
        }
    }

    pub fn write(&self, w: &mut Writer) -> Result<()> {
        ChunkHeader::write(w, K_CHUNK_OBJECT, |w| {
            ChunkHeader::write(w, K_CHUNK_OBJECT_HEADER, |w| {
                record(w, &self.header)?;
                w.write_all(self.name.as_bytes())?;
                w.write_all(&[0])?;
                Ok(())
            })?;
            if !self.textures.is_empty() {
                table_chunk(w, K_CHUNK_TEXTURE_REFS, &hash_table(&self.textures))?;
            }
            for (id, payload) in &self.extra {
                leaf(w, *id, payload)?;
            }
            ChunkHeader::write(w, K_CHUNK_OBJECT_RESIDENT, |w| {
                record_chunk(w, K_CHUNK_MESH_DESCRIPTOR, &self.descriptor)?;
                table_chunk(w, K_CHUNK_MESH_ENTRIES, &self.materials)?;
                for buffer in &self.buffers {
                    ChunkHeader::write(w, K_CHUNK_VERTEX_BUFFER, |w| {
                        w.write_all(&self.buffer_filler)?;
                        w.write_all(buffer)?;
                        Ok(())
                    })?;
                }
                if !self.indices.is_empty() {
                    let bytes: Vec<u8> = self.indices.iter().flat_map(|i| i.to_le_bytes()).collect();
                    leaf(w, K_CHUNK_INDEX_BUFFER, &bytes)?;
                }
                for name in &self.material_names {
                    leaf(w, K_CHUNK_MATERIAL_NAME, format!("{name}\0").as_bytes())?;
                }
                for (id, payload) in &self.extra_resident {
                    leaf(w, *id, payload)?;
                }
                Ok(())
            })
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Cursor::new(Vec::new());
        self.write(&mut w).unwrap();
        w.into_inner()
    }
}

/// Writes a list root holding a header sub-tree and the given object containers.
pub fn list_bytes(
    path: &str,
    class_name: &str,
    hashes: &[u32],
    objects: &[Vec<u8>],
    header_extra: &[(ChunkId, Vec<u8>)],
) -> Vec<u8> {
    let mut w = Cursor::new(Vec::new());
    ChunkHeader::write(&mut w, K_CHUNK_SOLID_LIST, |w| {
        ChunkHeader::write(w, K_CHUNK_LIST_HEADER, |w| {
            record_chunk(w, K_CHUNK_LIST_INFO, &ListInfo {
                version: 1,
                object_count: hashes.len() as u32,
                path: to_fixed(path),
                class_name: to_fixed(class_name),
            })?;
            table_chunk(w, K_CHUNK_HASH_TABLE, &hash_table(hashes))?;
            for (id, payload) in header_extra {
                leaf(w, *id, payload)?;
            }
            Ok(())
        })?;
        for object in objects {
            w.write_all(object)?;
        }
        Ok(())
    })
    .unwrap();
    w.into_inner()
}
