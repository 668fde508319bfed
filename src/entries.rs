//! Entry records and the recursive tree walker.
//!
//! The entry table is a flat, pre-order serialization: each record is a u16
//! name length, the name bytes (length 0 reuses the parent path), then a
//! fixed 22-byte body.  A directory entry is followed in-stream by exactly
//! `child_count` nested records — the declared count is the only boundary,
//! there is no end marker.
//!
//! The walker only consumes the entry stream and dispatches file payload
//! coordinates to an [`EntrySink`]; it never touches payload bytes itself.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// Directory bit in `type_flags`.
pub const TYPE_DIR: u32 = 0x10;
/// File bit in `type_flags`.
pub const TYPE_FILE: u32 = 0x20;

/// Hard cap on a concatenated entry path.  Exceeding it is a format error,
/// never a truncation.
pub const MAX_PATH_LEN: usize = 4096;

/// Fixed-size body following the name field.
#[derive(Debug, Clone, Copy)]
pub struct EntryRecord {
    pub type_flags: u32,
    pub file_size: u32,
    pub timestamp: u64,
    pub data_offset: u32,
    /// Immediate children for directories; aliases the same field position
    /// for files, where it is meaningless.
    pub child_count: u16,
}

impl EntryRecord {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let short = |_| Error::truncated("entry record");
        Ok(Self {
            type_flags: cursor.read_u32::<LittleEndian>().map_err(short)?,
            file_size: cursor.read_u32::<LittleEndian>().map_err(short)?,
            timestamp: cursor.read_u64::<LittleEndian>().map_err(short)?,
            data_offset: cursor.read_u32::<LittleEndian>().map_err(short)?,
            child_count: cursor.read_u16::<LittleEndian>().map_err(short)?,
        })
    }
}

/// Receiver for file entries discovered by [`walk`].
pub trait EntrySink {
    fn file(&mut self, path: &str, data_offset: u32, file_size: u32, timestamp: u64)
        -> Result<()>;
}

/// Consume `count` entry records from `cursor`, extending `path` in place
/// and dispatching every file entry to `sink`.
///
/// Directory entries recurse over their declared child count against the
/// same cursor; `path` is restored to its pre-entry length before each next
/// sibling.  Walking stops early if the table runs out — trailing logical
/// bytes past the true payload are not an error.
pub fn walk<S: EntrySink>(
    cursor: &mut Cursor<&[u8]>,
    count: u32,
    path: &mut String,
    sink: &mut S,
) -> Result<()> {
    for _ in 0..count {
        if cursor.position() as usize >= cursor.get_ref().len() {
            break;
        }
        let name_len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| Error::truncated("entry name length"))? as usize;

        let saved_len = path.len();
        if name_len > 0 {
            let sep = !path.is_empty() && !path.ends_with('/');
            // Checked before any name bytes land in the buffer.
            if saved_len + usize::from(sep) + name_len > MAX_PATH_LEN {
                return Err(Error::PathTooLong {
                    parent: path.clone(),
                    len: name_len,
                });
            }
            let mut name = vec![0u8; name_len];
            cursor
                .read_exact(&mut name)
                .map_err(|_| Error::truncated("entry name"))?;
            if sep {
                path.push('/');
            }
            path.push_str(&String::from_utf8_lossy(&name));
        }

        let record = EntryRecord::read(cursor)?;
        if record.type_flags & TYPE_DIR != 0 {
            walk(cursor, u32::from(record.child_count), path, sink)?;
        } else if record.type_flags & TYPE_FILE != 0 {
            sink.file(path, record.data_offset, record.file_size, record.timestamp)?;
        } else {
            return Err(Error::UnknownEntryType(record.type_flags));
        }
        path.truncate(saved_len);
    }
    Ok(())
}
