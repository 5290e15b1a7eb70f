use std::{
    io::{Seek, SeekFrom, Write},
    mem::size_of,
};

use zerocopy::{
    byteorder::{LittleEndian, U32},
    AsBytes, FromBytes, FromZeroes,
};

use crate::{format::ChunkId, Error, Result};

pub const CHUNK_HEADER_SIZE: usize = size_of::<ChunkHeader>();

/// The 8-byte envelope header preceding every chunk payload.
#[derive(Clone, Debug, Default, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct ChunkHeader {
    pub id: U32<LittleEndian>,
    pub size: U32<LittleEndian>,
}

impl ChunkHeader {
    pub fn new(id: ChunkId, size: u32) -> Self { Self { id: U32::new(id.0), size: U32::new(size) } }

    #[inline]
    pub fn id(&self) -> ChunkId { ChunkId(self.id.get()) }

    #[inline]
    pub fn size(&self) -> u32 { self.size.get() }

    /// Splits `data` into (header, payload, remainder).
    pub fn slice(data: &[u8]) -> Result<(&Self, &[u8], &[u8])> {
        let header = Self::ref_from_prefix(data).ok_or_else(|| Error::Structural {
            offset: 0,
            tag: ChunkId::default(),
            reason: format!("truncated chunk header ({} bytes)", data.len()),
        })?;
        let end = CHUNK_HEADER_SIZE + header.size() as usize;
        if end > data.len() {
            return Err(Error::Structural {
                offset: 0,
                tag: header.id(),
                reason: format!("declared end {end:#X} beyond available {:#X}", data.len()),
            });
        }
        Ok((header, &data[CHUNK_HEADER_SIZE..end], &data[end..]))
    }

    /// Writes a chunk, back-patching the size once the callback has written the payload.
    pub fn write<W, CB>(w: &mut W, id: ChunkId, mut cb: CB) -> Result<()>
    where
        W: Write + Seek,
        CB: FnMut(&mut W) -> Result<()>,
    {
        // Skip over the header
        let chunk_pos = w.stream_position()?;
        let data_pos = chunk_pos + CHUNK_HEADER_SIZE as u64;
        w.seek(SeekFrom::Start(data_pos))?;

        // Write the data and determine the size
        cb(w)?;
        let end_pos = w.stream_position()?;
        let size = u32::try_from(end_pos - data_pos)
            .map_err(|_| Error::Invariant(format!("chunk {id} payload exceeds 4 GiB")))?;

        // Return to the start of the chunk and write the header
        w.seek(SeekFrom::Start(chunk_pos))?;
        w.write_all(Self::new(id, size).as_bytes())?;

        // Seek to the end
        w.seek(SeekFrom::Start(end_pos))?;
        Ok(())
    }
}

/// Writes `filler` bytes until the stream position is a multiple of `align`.
pub fn write_padding<W: Write + Seek>(w: &mut W, filler: u8, align: u64) -> Result<()> {
    let pos = w.stream_position()?;
    let pad = (align - pos % align) % align;
    w.write_all(&vec![filler; pad as usize])?;
    Ok(())
}

/// Recursively dump a chunk tree
pub fn dump_chunks<W: Write>(w: &mut W, mut data: &[u8], indent: usize) -> Result<()> {
    let indstr = "  ".repeat(indent);
    while !data.is_empty() {
        let (header, payload, remain) = ChunkHeader::slice(data)?;
        writeln!(w, "{indstr}- {} size {:#X}", header.id(), header.size())?;
        if header.id().is_container() {
            dump_chunks(w, payload, indent + 1)?;
        }
        data = remain;
    }
    Ok(())
}
