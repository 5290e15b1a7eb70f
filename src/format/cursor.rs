use zerocopy::FromBytes;

use crate::{
    format::{
        chunk::{ChunkHeader, CHUNK_HEADER_SIZE},
        ChunkId,
    },
    Error, Result,
};

/// One chunk located by [`ChunkCursor::next_chunk`].
/// `start`/`end` bound the payload and are relative to the cursor's slice.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChunkSpan {
    pub id: ChunkId,
    /// Absolute offset of the chunk header in the input.
    pub offset: u64,
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    #[inline]
    pub fn size(&self) -> usize { self.end - self.start }
}

/// Sequential reader over a chunk stream.
pub struct ChunkCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> ChunkCursor<'a> {
    /// `base` is the absolute offset of `data[0]`, used for diagnostics only.
    pub fn new(data: &'a [u8], base: u64) -> Self { Self { data, pos: 0, base } }

    #[inline]
    pub fn position(&self) -> usize { self.pos }

    #[inline]
    pub fn absolute(&self, pos: usize) -> u64 { self.base + pos as u64 }

    #[inline]
    pub fn data(&self) -> &'a [u8] { self.data }

    pub fn seek(&mut self, pos: usize) {
        debug_assert!(pos <= self.data.len());
        self.pos = pos;
    }

    /// Reads the next chunk header and leaves the cursor at the payload start.
    /// The chunk's declared end must not exceed `limit`.
    pub fn next_chunk(&mut self, limit: usize) -> Result<ChunkSpan> {
        let offset = self.absolute(self.pos);
        if limit - self.pos < CHUNK_HEADER_SIZE {
            return Err(Error::Structural {
                offset,
                tag: ChunkId::default(),
                reason: format!("{} trailing bytes cannot hold a chunk header", limit - self.pos),
            });
        }
        let header = ChunkHeader::ref_from_prefix(&self.data[self.pos..limit]).ok_or_else(|| {
            Error::Structural {
                offset,
                tag: ChunkId::default(),
                reason: "unreadable chunk header".to_string(),
            }
        })?;
        let start = self.pos + CHUNK_HEADER_SIZE;
        let end = start
            .checked_add(header.size() as usize)
            .filter(|&end| end <= limit)
            .ok_or_else(|| Error::Structural {
                offset,
                tag: header.id(),
                reason: format!(
                    "declared size {:#X} ends beyond enclosing container end {:#X}",
                    header.size(),
                    self.absolute(limit)
                ),
            })?;
        self.pos = start;
        Ok(ChunkSpan { id: header.id(), offset, start, end })
    }
}
