//! Crate-wide error type.
//!
//! Every variant except [`Error::Io`] describes a defect in the container
//! itself.  None of them are recoverable: the format carries no redundancy,
//! so the driver aborts the whole run on the first error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The header read through the logical path did not carry the expected
    /// signature.  Distinct from variant detection, which probes raw bytes.
    #[error("wrong signature ({0:#010x})")]
    WrongSignature(u32),

    /// An entry carried neither the directory bit (0x10) nor the file bit
    /// (0x20).
    #[error("unknown entry type ({0:#x})")]
    UnknownEntryType(u32),

    /// Concatenating an entry name onto its parent path would exceed
    /// [`MAX_PATH_LEN`](crate::entries::MAX_PATH_LEN).
    #[error("entry path too long ({len} bytes under \"{parent}\")")]
    PathTooLong { parent: String, len: usize },

    /// The block table claims more compressed bytes than the physical file
    /// holds.
    #[error(
        "block table inconsistent: {claimed} compressed bytes declared, \
         {available} available"
    )]
    InconsistentBlockTable { claimed: u64, available: u64 },

    /// The header's entry-table offset points past the end of the logical
    /// stream.
    #[error("entry table offset {offset:#x} beyond container end ({len:#x})")]
    EntryTableOutOfBounds { offset: u64, len: u64 },

    /// A seek targeted a block past the block count.
    #[error("seek to {offset:#x} past container end ({len:#x})")]
    SeekOutOfBounds { offset: u64, len: u64 },

    /// A physical read came up short of a declared length.
    #[error("truncated input while reading {what}")]
    Truncated { what: &'static str },

    /// A compressed block did not terminate as a complete deflate stream.
    /// The container is corrupt or the wrong variant was assumed.
    #[error("block {index} failed to inflate: {reason}")]
    BadBlock { index: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn truncated(what: &'static str) -> Self {
        Error::Truncated { what }
    }
}
