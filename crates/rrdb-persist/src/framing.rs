//! Shared on-disk framing for both the `map` and `save` backends: a
//! length-prefixed bincode header followed by the raw little-endian `i32`
//! value array, with a CRC32 of the value bytes carried inside the header.

use crate::error::PersistError;
use serde::{de::DeserializeOwned, Serialize};

fn values_to_bytes(values: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Computes the CRC32 a header's `checksum` field should carry for `values`.
#[must_use]
pub fn checksum_for(values: &[i32]) -> u32 {
    crc32fast::hash(&values_to_bytes(values))
}

/// Serializes `header` (whose `checksum` field the caller has already set
/// via [`checksum_for`]) followed by `values`, into a single byte buffer.
pub fn encode<H: Serialize>(header: &H, values: &[i32]) -> Result<Vec<u8>, PersistError> {
    let header_bytes = bincode::serialize(header)?;
    let mut buf = Vec::with_capacity(8 + header_bytes.len() + values.len() * 4);
    buf.extend_from_slice(&(header_bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&values_to_bytes(values));
    Ok(buf)
}

/// Decodes a buffer produced by [`encode`], returning the header and the raw
/// value array. Does not itself verify the checksum; callers compare it
/// against [`checksum_for`] so they can attach the file path to the error.
pub fn decode<H: DeserializeOwned>(path: &str, bytes: &[u8]) -> Result<(H, Vec<i32>), PersistError> {
    if bytes.len() < 8 {
        return Err(PersistError::SizeMismatch { path: path.to_string() });
    }
    let header_len = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
    if bytes.len() < 8 + header_len {
        return Err(PersistError::SizeMismatch { path: path.to_string() });
    }
    let header: H = bincode::deserialize(&bytes[8..8 + header_len])?;
    let value_bytes = &bytes[8 + header_len..];
    let values = value_bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    Ok((header, values))
}
