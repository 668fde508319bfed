//! Block table of a block-compressed container.
//!
//! The physical file ends with a u16 block count, immediately preceded by
//! `count` u16 compressed-block sizes in physical order.  The whole tail is
//! obfuscated with the keystream like everything else.  Block payloads are
//! physically contiguous starting at offset 0, so each block's physical
//! start is the sum of all prior compressed sizes.
//!
//! The table is an index only: the declared logical length
//! (`count * BLOCK_LOGICAL_SIZE`) may overshoot the true payload, whose
//! extent is bounded by the entry table instead.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

use crate::crypto;
use crate::error::{Error, Result};

/// Decompressed size of every block window.
pub const BLOCK_LOGICAL_SIZE: usize = 0xce3c;

/// Upper bound on a block's compressed size (u16 field) and the size of the
/// reader's scratch buffers.
pub const MAX_BLOCK_SIZE: usize = 0xffff;

/// Ordered per-block compressed sizes with precomputed physical starts.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    sizes: Vec<u16>,
    /// `starts[i]` = physical offset of block `i`; one extra trailing entry
    /// holds the total compressed length.
    starts: Vec<u64>,
}

impl BlockIndex {
    /// Read the block table from the tail of a physical file of length
    /// `physical_len`, deciphering each field at its own physical offset.
    pub fn read_from_tail<R: Read + Seek>(inner: &mut R, physical_len: u64) -> Result<Self> {
        if physical_len < 2 {
            return Err(Error::truncated("block count"));
        }
        let mut raw = [0u8; 2];
        inner.seek(SeekFrom::Start(physical_len - 2))?;
        inner
            .read_exact(&mut raw)
            .map_err(|_| Error::truncated("block count"))?;
        crypto::decrypt(&mut raw, physical_len - 2);
        let count = u16::from_le_bytes(raw) as usize;

        let table_len = count as u64 * 2;
        if physical_len < table_len + 2 {
            return Err(Error::truncated("block size table"));
        }
        let table_offset = physical_len - 2 - table_len;
        let mut table = vec![0u8; table_len as usize];
        inner.seek(SeekFrom::Start(table_offset))?;
        inner
            .read_exact(&mut table)
            .map_err(|_| Error::truncated("block size table"))?;
        crypto::decrypt(&mut table, table_offset);

        let mut cursor = &table[..];
        let mut sizes = Vec::with_capacity(count);
        for _ in 0..count {
            sizes.push(cursor.read_u16::<LittleEndian>()?);
        }

        Self::new(sizes, table_offset)
    }

    /// Build an index from raw sizes, checking that the declared compressed
    /// bytes fit in front of the table region (`available` bytes).
    pub fn new(sizes: Vec<u16>, available: u64) -> Result<Self> {
        let mut starts = Vec::with_capacity(sizes.len() + 1);
        let mut off = 0u64;
        for &sz in &sizes {
            starts.push(off);
            off += sz as u64;
        }
        starts.push(off);
        if off > available {
            return Err(Error::InconsistentBlockTable {
                claimed: off,
                available,
            });
        }
        Ok(Self { sizes, starts })
    }

    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Compressed size of block `idx`.
    pub fn size(&self, idx: usize) -> usize {
        self.sizes[idx] as usize
    }

    /// Physical offset where block `idx` begins.
    pub fn start(&self, idx: usize) -> u64 {
        self.starts[idx]
    }

    /// Declared logical length of the whole container.
    pub fn logical_len(&self) -> u64 {
        self.sizes.len() as u64 * BLOCK_LOGICAL_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tail_bytes(sizes: &[u16], lead: usize) -> Vec<u8> {
        // `lead` bytes of block payload, then the obfuscated size table and
        // count, laid out exactly as on disk.
        let mut file = vec![0u8; lead];
        let table_offset = file.len() as u64;
        let mut table = Vec::new();
        for &s in sizes {
            table.extend_from_slice(&s.to_le_bytes());
        }
        crypto::encrypt(&mut table, table_offset);
        file.extend_from_slice(&table);
        let count_offset = file.len() as u64;
        let mut count = (sizes.len() as u16).to_le_bytes();
        crypto::encrypt(&mut count, count_offset);
        file.extend_from_slice(&count);
        file
    }

    #[test]
    fn parses_deciphered_tail() {
        let file = tail_bytes(&[100, 200, 50], 350);
        let len = file.len() as u64;
        let idx = BlockIndex::read_from_tail(&mut Cursor::new(file), len).unwrap();
        assert_eq!(idx.count(), 3);
        assert_eq!(idx.size(1), 200);
        assert_eq!(idx.start(0), 0);
        assert_eq!(idx.start(2), 300);
        assert_eq!(idx.logical_len(), 3 * BLOCK_LOGICAL_SIZE as u64);
    }

    #[test]
    fn rejects_oversized_claims() {
        // Table claims 350 compressed bytes but only 100 precede it.
        let file = tail_bytes(&[100, 200, 50], 100);
        let len = file.len() as u64;
        let err = BlockIndex::read_from_tail(&mut Cursor::new(file), len).unwrap_err();
        assert!(matches!(err, Error::InconsistentBlockTable { .. }));
    }

    #[test]
    fn rejects_tail_shorter_than_its_table() {
        // Count says 3 blocks but the file cannot hold a 3-entry table.
        let mut count = 3u16.to_le_bytes();
        crypto::encrypt(&mut count, 2);
        let file = [vec![0u8; 2], count.to_vec()].concat();
        let err = BlockIndex::read_from_tail(&mut Cursor::new(file), 4).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
