//! Fixed container header at logical offset 0.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::reader::ContainerReader;

/// Magic signature shared by both container variants.
pub const SIGNATURE: u32 = 0x7870_6b66;

/// Size of the on-disk header record.
pub const HEADER_LEN: usize = 12;

/// `signature`, entry-table offset and top-level entry count, all u32 LE.
#[derive(Debug, Clone, Copy)]
pub struct ContainerHeader {
    pub entry_table_offset: u32,
    pub entry_count: u32,
}

impl ContainerHeader {
    /// Read and validate the header through the reader's logical path.
    ///
    /// Variant detection has already probed the signature on raw physical
    /// bytes; this second check runs after block decoding, so a mismatch
    /// here means the container is corrupt rather than the other variant.
    pub fn read<R: Read + Seek>(reader: &mut ContainerReader<R>) -> Result<Self> {
        let mut raw = [0u8; HEADER_LEN];
        reader.seek(0)?;
        if reader.read(&mut raw)? != HEADER_LEN {
            return Err(Error::truncated("container header"));
        }
        let mut cursor = &raw[..];
        let signature = cursor.read_u32::<LittleEndian>()?;
        if signature != SIGNATURE {
            return Err(Error::WrongSignature(signature));
        }
        Ok(Self {
            entry_table_offset: cursor.read_u32::<LittleEndian>()?,
            entry_count: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_plain_header() {
        let mut file = Vec::new();
        file.extend_from_slice(&SIGNATURE.to_le_bytes());
        file.extend_from_slice(&0x40u32.to_le_bytes());
        file.extend_from_slice(&7u32.to_le_bytes());
        let mut reader = ContainerReader::open(Cursor::new(file)).unwrap();
        let head = ContainerHeader::read(&mut reader).unwrap();
        assert_eq!(head.entry_table_offset, 0x40);
        assert_eq!(head.entry_count, 7);
    }

    #[test]
    fn short_header_is_truncated() {
        let file = SIGNATURE.to_le_bytes().to_vec();
        let mut reader = ContainerReader::open(Cursor::new(file)).unwrap();
        assert!(matches!(
            ContainerHeader::read(&mut reader),
            Err(Error::Truncated { .. })
        ));
    }
}
