//! Little-endian byte codecs shared by [`crate::page_db`] and
//! [`crate::link_stream`] for the fixed-width pieces of the on-disk layout
//! (page indices, the `links` row format). Variable-length records
//! ([`crate::page_info::PageInfo`]) have their own codec.

use crate::error::{DbResult, Error};

pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

pub fn decode_u64(bytes: &[u8]) -> DbResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::internal("corrupted record: expected 8-byte little-endian u64"))?;
    Ok(u64::from_le_bytes(array))
}

/// Packs the `links` row value: the ordered array of `to` page indices for
/// one `from` page, in the order declared by the most recent crawl.
pub fn encode_links(indices: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * 8);
    for idx in indices {
        out.extend_from_slice(&idx.to_le_bytes());
    }
    out
}

pub fn decode_links(bytes: &[u8]) -> DbResult<Vec<u64>> {
    if bytes.len() % 8 != 0 {
        return Err(Error::internal(
            "corrupted links record: length not a multiple of 8",
        ));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().expect("chunk is exactly 8 bytes")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_round_trip() {
        let indices = vec![0, 1, 2, 1_000_000];
        assert_eq!(decode_links(&encode_links(&indices)).unwrap(), indices);
    }

    #[test]
    fn links_round_trip_empty() {
        assert_eq!(decode_links(&encode_links(&[])).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn u64_round_trip() {
        assert_eq!(decode_u64(&encode_u64(42)).unwrap(), 42);
    }

    #[test]
    fn rejects_misaligned_links_buffer() {
        assert!(decode_links(&[0u8; 5]).is_err());
    }
}
