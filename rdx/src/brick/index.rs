//! The 32-byte page index entry (spec §3.5) and the `log2_ceil` helper used
//! to size a reader's decompression buffer without inspecting the
//! compressed bytes first.

use rdx_types::Id;

use crate::error::{Error, Result};

pub const INDEX_ENTRY_LEN: usize = 32;

/// How a page's bytes are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTag {
    Raw,
    Lz4,
}

impl CompressionTag {
    fn to_byte(self) -> u8 {
        match self {
            CompressionTag::Raw => 0,
            CompressionTag::Lz4 => 1,
        }
    }

    fn from_byte(b: u8) -> Result<CompressionTag> {
        match b {
            0 => Ok(CompressionTag::Raw),
            1 => Ok(CompressionTag::Lz4),
            _ => Err(Error::BlockNotSupported),
        }
    }
}

/// One data-page index entry: the page's first id, where its stored bytes
/// live, how they're packed, and a bloom filter over the ids it holds.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub from: Id,
    pub tag: CompressionTag,
    /// `log2_ceil` of the page's *unpacked* (decompressed) size.
    pub log2_unpacked: u8,
    /// Byte offset of the page within the Data section. 48 bits.
    pub offset: u64,
    pub bloom: u64,
}

impl IndexEntry {
    pub fn encode(&self) -> [u8; INDEX_ENTRY_LEN] {
        let mut buf = [0u8; INDEX_ENTRY_LEN];
        buf[0..8].copy_from_slice(&self.from.sequence.to_le_bytes());
        buf[8..16].copy_from_slice(&self.from.source.to_le_bytes());
        let pos_word = ((self.tag.to_byte() as u64) << 56)
            | ((self.log2_unpacked as u64) << 48)
            | (self.offset & 0x0000_ffff_ffff_ffff);
        buf[16..24].copy_from_slice(&pos_word.to_le_bytes());
        buf[24..32].copy_from_slice(&self.bloom.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<IndexEntry> {
        if bytes.len() != INDEX_ENTRY_LEN {
            return Err(Error::BadHeader);
        }
        let sequence = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let source = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let pos_word = u64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let bloom = u64::from_le_bytes(bytes[24..32].try_into().unwrap());
        let tag = CompressionTag::from_byte((pos_word >> 56) as u8)?;
        let log2_unpacked = ((pos_word >> 48) & 0xff) as u8;
        let offset = pos_word & 0x0000_ffff_ffff_ffff;
        let from = Id::new(source, sequence)?;
        Ok(IndexEntry { from, tag, log2_unpacked, offset, bloom })
    }
}

/// Smallest `k` with `2^k >= n` (`0` for `n <= 1`).
pub fn log2_ceil(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_entry_round_trips() {
        let entry = IndexEntry {
            from: Id::new(7, 1 << 10).unwrap(),
            tag: CompressionTag::Lz4,
            log2_unpacked: 12,
            offset: 4096,
            bloom: 0xdead_beef,
        };
        let encoded = entry.encode();
        let decoded = IndexEntry::decode(&encoded).unwrap();
        assert_eq!(decoded.from, entry.from);
        assert_eq!(decoded.tag, entry.tag);
        assert_eq!(decoded.log2_unpacked, entry.log2_unpacked);
        assert_eq!(decoded.offset, entry.offset);
        assert_eq!(decoded.bloom, entry.bloom);
    }

    #[test]
    fn log2_ceil_matches_powers_of_two() {
        assert_eq!(log2_ceil(0), 0);
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(2), 1);
        assert_eq!(log2_ceil(4096), 12);
        assert_eq!(log2_ceil(4097), 13);
    }
}
