//! On-disk layout of a fortified file.
//!
//! ```text
//! "FTFY" | format (1 byte) | header length (u32 BE) | header JSON
//! chunk* where chunk = length (u32 BE, high bit = last) | ciphertext + tag
//! ```
//!
//! The raw header bytes double as the associated data of every chunk.

use std::io::{self, Read, Write};

use super::{FortifyError, Metadata};

pub const MAGIC: &[u8; 4] = b"FTFY";
pub const FORMAT_VERSION: u8 = 1;

/// Headers are small JSON objects; anything bigger is not ours.
const MAX_HEADER_LEN: u32 = 64 * 1024;
const LAST_CHUNK: u32 = 1 << 31;

/// Header as read back from a file: the parsed metadata plus the exact bytes
/// that were authenticated.
#[derive(Debug, Clone)]
pub struct Header {
    pub metadata: Metadata,
    pub raw: Vec<u8>,
}

pub fn write_header<W: Write>(writer: &mut W, metadata: &Metadata) -> Result<Vec<u8>, FortifyError> {
    let raw = serde_json::to_vec(metadata).map_err(|e| FortifyError::Header(format!("{e}")))?;
    let len = u32::try_from(raw.len())
        .ok()
        .filter(|len| *len <= MAX_HEADER_LEN)
        .ok_or_else(|| FortifyError::Header("header too large".to_string()))?;
    writer.write_all(MAGIC)?;
    writer.write_all(&[FORMAT_VERSION])?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&raw)?;
    Ok(raw)
}

pub fn read_header<R: Read>(reader: &mut R) -> Result<Header, FortifyError> {
    let mut magic = [0u8; 4];
    read_exact_or_truncated(reader, &mut magic)?;
    if &magic != MAGIC {
        return Err(FortifyError::BadMagic);
    }
    let mut version = [0u8; 1];
    read_exact_or_truncated(reader, &mut version)?;
    if version[0] != FORMAT_VERSION {
        return Err(FortifyError::UnsupportedVersion(version[0]));
    }
    let mut len = [0u8; 4];
    read_exact_or_truncated(reader, &mut len)?;
    let len = u32::from_be_bytes(len);
    if len > MAX_HEADER_LEN {
        return Err(FortifyError::Header(format!("header length {len} exceeds limit")));
    }
    let mut raw = vec![0u8; len as usize];
    read_exact_or_truncated(reader, &mut raw)?;
    let metadata: Metadata =
        serde_json::from_slice(&raw).map_err(|e| FortifyError::Header(format!("{e}")))?;
    metadata.check()?;
    Ok(Header { metadata, raw })
}

pub fn write_chunk<W: Write>(writer: &mut W, sealed: &[u8], last: bool) -> Result<(), FortifyError> {
    let len = u32::try_from(sealed.len())
        .ok()
        .filter(|len| *len < LAST_CHUNK)
        .ok_or(FortifyError::ChunkTooLarge)?;
    let tagged = if last { len | LAST_CHUNK } else { len };
    writer.write_all(&tagged.to_be_bytes())?;
    writer.write_all(sealed)?;
    Ok(())
}

/// Reads the next chunk; `max_len` bounds the allocation.
pub fn read_chunk<R: Read>(reader: &mut R, max_len: usize) -> Result<(Vec<u8>, bool), FortifyError> {
    let mut len = [0u8; 4];
    read_exact_or_truncated(reader, &mut len)?;
    let tagged = u32::from_be_bytes(len);
    let last = tagged & LAST_CHUNK != 0;
    let len = (tagged & !LAST_CHUNK) as usize;
    if len > max_len {
        return Err(FortifyError::ChunkTooLarge);
    }
    let mut sealed = vec![0u8; len];
    read_exact_or_truncated(reader, &mut sealed)?;
    Ok((sealed, last))
}

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FortifyError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FortifyError::Truncated,
        _ => FortifyError::Io(e),
    })
}
