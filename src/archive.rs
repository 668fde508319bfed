//! High-level [`Archive`] API — the primary embedding surface.
//!
//! ```no_run
//! use wsarc::archive::{Archive, ExtractOptions};
//!
//! let mut ar = Archive::open("data.xe")?;
//! for entry in ar.entries()? {
//!     println!("{:>10}  {}", entry.file_size, entry.path);
//! }
//! ar.extract("out".as_ref(), &ExtractOptions::default())?;
//! # Ok::<(), wsarc::Error>(())
//! ```

use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::blocks::MAX_BLOCK_SIZE;
use crate::entries::{walk, EntrySink};
use crate::error::{Error, Result};
use crate::filter::{base_name, WildcardPattern};
use crate::header::ContainerHeader;
use crate::reader::{ContainerKind, ContainerReader};

// ── Options and listing types ────────────────────────────────────────────────

/// Configuration for [`Archive::extract`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Report matching entries without writing anything.
    pub list_only: bool,
    /// When set, only file entries whose final path component matches are
    /// extracted.
    pub pattern: Option<WildcardPattern>,
}

/// One file entry in the container tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Full `/`-separated path.
    pub path: String,
    pub file_size: u32,
    /// Opaque on-disk timestamp, surfaced untouched.
    pub timestamp: u64,
    pub data_offset: u32,
}

/// Counters returned by [`Archive::extract`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStats {
    /// File entries that passed the wildcard filter.
    pub matched: u64,
    /// Files actually written (0 in list-only mode).
    pub written: u64,
}

// ── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Archive<R: Read + Seek> {
    reader: ContainerReader<R>,
    header: ContainerHeader,
    /// Entry-table bytes, read once through the virtual reader at open time.
    table: Vec<u8>,
}

impl Archive<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open a container from any seekable byte source: detect the variant,
    /// validate the header through the logical path, and slurp the entry
    /// table.
    pub fn from_reader(inner: R) -> Result<Self> {
        let mut reader = ContainerReader::open(inner)?;
        let header = ContainerHeader::read(&mut reader)?;

        let logical_len = reader.logical_len();
        let table_offset = u64::from(header.entry_table_offset);
        if table_offset > logical_len {
            return Err(Error::EntryTableOutOfBounds {
                offset: table_offset,
                len: logical_len,
            });
        }

        // The declared logical length may overshoot the true payload; keep
        // whatever the stream actually yields.
        let mut table = vec![0u8; (logical_len - table_offset) as usize];
        reader.seek(table_offset)?;
        let got = reader.read(&mut table)?;
        table.truncate(got);
        debug!(
            "entry table: {} bytes at logical {table_offset:#x}, {} top-level entries",
            table.len(),
            header.entry_count
        );

        Ok(Self {
            reader,
            header,
            table,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        self.reader.kind()
    }

    /// Top-level entry count declared by the header.
    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    pub fn logical_len(&self) -> u64 {
        self.reader.logical_len()
    }

    /// Flat listing of every file entry, in serialization order.
    pub fn entries(&self) -> Result<Vec<EntryInfo>> {
        struct Collect(Vec<EntryInfo>);
        impl EntrySink for Collect {
            fn file(&mut self, path: &str, off: u32, size: u32, ts: u64) -> Result<()> {
                self.0.push(EntryInfo {
                    path: path.to_owned(),
                    file_size: size,
                    timestamp: ts,
                    data_offset: off,
                });
                Ok(())
            }
        }
        let mut sink = Collect(Vec::new());
        let mut path = String::new();
        walk(
            &mut Cursor::new(&self.table[..]),
            self.header.entry_count,
            &mut path,
            &mut sink,
        )?;
        Ok(sink.0)
    }

    /// Walk the tree and extract every matching file under `dest`, creating
    /// intermediate directories as needed.  Existing files are overwritten.
    /// Any error aborts the whole run.
    pub fn extract(&mut self, dest: &Path, options: &ExtractOptions) -> Result<ExtractStats> {
        let mut sink = DumpSink {
            reader: &mut self.reader,
            dest,
            options,
            chunk: vec![0u8; MAX_BLOCK_SIZE],
            stats: ExtractStats::default(),
        };
        let mut path = String::new();
        walk(
            &mut Cursor::new(&self.table[..]),
            self.header.entry_count,
            &mut path,
            &mut sink,
        )?;
        Ok(sink.stats)
    }

    /// Convenience whole-file read by exact entry path.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries()?
            .into_iter()
            .find(|e| e.path == path)
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such entry: {path}"),
                ))
            })?;
        let mut data = vec![0u8; entry.file_size as usize];
        self.reader.seek(u64::from(entry.data_offset))?;
        if self.reader.read(&mut data)? != data.len() {
            return Err(Error::truncated("file payload"));
        }
        Ok(data)
    }
}

// ── Extraction sink ──────────────────────────────────────────────────────────

/// Streams each dispatched file's payload through the virtual reader in
/// bounded chunks and writes it under the output directory.
struct DumpSink<'a, R: Read + Seek> {
    reader: &'a mut ContainerReader<R>,
    dest: &'a Path,
    options: &'a ExtractOptions,
    chunk: Vec<u8>,
    stats: ExtractStats,
}

impl<R: Read + Seek> EntrySink for DumpSink<'_, R> {
    fn file(&mut self, path: &str, data_offset: u32, file_size: u32, _ts: u64) -> Result<()> {
        if let Some(pattern) = &self.options.pattern {
            if !pattern.matches(base_name(path)) {
                return Ok(());
            }
        }
        self.stats.matched += 1;
        info!("{file_size:>10}  {path}");
        if self.options.list_only {
            return Ok(());
        }

        let target = self.dest.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;

        self.reader.seek(u64::from(data_offset))?;
        let mut left = file_size as usize;
        while left > 0 {
            let want = left.min(self.chunk.len());
            let got = self.reader.read(&mut self.chunk[..want])?;
            if got == 0 {
                return Err(Error::truncated("file payload"));
            }
            out.write_all(&self.chunk[..got])?;
            left -= got;
        }

        self.stats.written += 1;
        Ok(())
    }
}
