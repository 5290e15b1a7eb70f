//! Block-compressed object payloads.
//!
//! A compressed object is a run of blocks, each a [`CompressBlockHeader`]
//! followed by a codec stream. The codec itself is pluggable; the stored and
//! zlib codecs ship with the crate.

use std::io::Read;

use anyhow::{bail, ensure};
use binrw::{binrw, BinReaderExt};
use flate2::read::ZlibDecoder;

use crate::{ensure_invariant, Error, Result};

pub const K_COMPRESS_BLOCK_MAGIC: u32 = 0x55441122;
pub const COMPRESS_BLOCK_HEADER_SIZE: usize = 24;
pub const CODEC_HEADER_SIZE: usize = 16;

/// Decompresses one codec stream into exactly `out_len` bytes.
pub trait Decompressor {
    fn decompress(&self, data: &[u8], out_len: usize) -> anyhow::Result<Vec<u8>>;
}

/// Logical order of the physical blocks of a compressed object.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BlockOrder {
    #[default]
    Sequential,
    /// The last physical block holds the start of the object.
    LastFirst,
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[brw(little, magic = 0x55441122u32)]
pub struct CompressBlockHeader {
    /// Decompressed size of this block.
    pub out_size: u32,
    /// Size of this block including the header.
    pub total_block_size: u32,
    pub unk: [u32; 3],
}

/// Header shared by the codec streams: a four-character codec name,
/// flags, and both sizes (the compressed one includes this header).
#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[brw(little)]
pub struct CodecHeader {
    pub magic: [u8; 4],
    pub flags: u32,
    pub decompressed_size: u32,
    pub compressed_size: u32,
}

/// Handles stored (`RAWW`) and zlib streams. `JDLZ` and `HUFF` streams must
/// be handled by a caller-supplied [`Decompressor`].
#[derive(Copy, Clone, Debug, Default)]
pub struct StandardDecompressor;

impl Decompressor for StandardDecompressor {
    fn decompress(&self, data: &[u8], out_len: usize) -> anyhow::Result<Vec<u8>> {
        if data.first() == Some(&0x78) {
            // One byte past the declared size is enough to tell the stream is too long.
            let mut out = Vec::new();
            ZlibDecoder::new(data).take(out_len as u64 + 1).read_to_end(&mut out)?;
            ensure!(out.len() == out_len, "zlib stream produced {} bytes, expected {out_len}", out.len());
            return Ok(out);
        }
        ensure!(data.len() >= CODEC_HEADER_SIZE, "Invalid compressed data size: {}", data.len());
        let header: CodecHeader = std::io::Cursor::new(data).read_le()?;
        match &header.magic {
            b"RAWW" => {
                let stored = &data[CODEC_HEADER_SIZE..];
                ensure!(
                    stored.len() == out_len,
                    "stored stream holds {} bytes, expected {out_len}",
                    stored.len()
                );
                Ok(stored.to_vec())
            }
            magic => bail!("Unsupported compression codec {}", String::from_utf8_lossy(magic)),
        }
    }
}

/// Decompresses the block at the start of `data`. Returns the block's bytes
/// and the number of input bytes it occupied.
pub fn decompress_block(data: &[u8], codec: &dyn Decompressor) -> Result<(Vec<u8>, usize)> {
    if data.len() < COMPRESS_BLOCK_HEADER_SIZE {
        return Err(Error::Malformed(format!("truncated compressed block header ({} bytes)", data.len())));
    }
    let header: CompressBlockHeader = std::io::Cursor::new(data).read_le()?;
    let total = header.total_block_size as usize;
    if total < COMPRESS_BLOCK_HEADER_SIZE || total > data.len() {
        return Err(Error::Malformed(format!(
            "compressed block size {total:#X} outside of {:#X} available bytes",
            data.len()
        )));
    }
    let out = codec.decompress(&data[COMPRESS_BLOCK_HEADER_SIZE..total], header.out_size as usize)?;
    ensure_invariant!(
        out.len() == header.out_size as usize,
        "block decompressed to {} bytes, header declares {}",
        out.len(),
        header.out_size
    );
    Ok((out, total))
}

/// Decompresses every block in `data` and reassembles them in `order`.
pub fn decompress_blocks(data: &[u8], order: BlockOrder, codec: &dyn Decompressor) -> Result<Vec<u8>> {
    let mut blocks = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let (block, consumed) = decompress_block(&data[pos..], codec)?;
        log::trace!("Block at {pos:#X}: {consumed:#X} -> {:#X} bytes", block.len());
        blocks.push(block);
        pos += consumed;
    }
    if order == BlockOrder::LastFirst && blocks.len() > 1 {
        blocks.rotate_right(1);
    }
    Ok(blocks.concat())
}
