use std::io::Read;

use binrw::{BinReaderExt, NullString};

use crate::Result;

/// Reads a NUL-terminated string, lossily decoding non-UTF-8 bytes.
pub fn read_cstring<R: Read + std::io::Seek>(reader: &mut R) -> Result<String> {
    let s: NullString = reader.read_le()?;
    Ok(String::from_utf8_lossy(&s.0).into_owned())
}

/// Decodes a fixed-size, NUL-padded string field.
pub fn fixed_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encodes `s` into a fixed-size, NUL-padded field, truncating if needed.
pub fn to_fixed<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let len = s.len().min(N.saturating_sub(1));
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}
