//! Container-specific I/O implementations
//!
//! Each container format has an I/O implementation that knows how to recognise
//! and parse that specific file structure. A generic front end can hold several
//! of them and route a buffer to whichever one's [`ContainerIO::detect`] accepts it.

pub mod png_io;

use crate::error::Result;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Trait for container-specific I/O operations
pub trait ContainerIO {
    /// Parsed representation of one file
    type Output;

    /// File extensions this I/O implementation accepts (e.g., ["png"])
    fn extensions() -> &'static [&'static str]
    where
        Self: Sized;

    /// MIME types this I/O implementation accepts
    fn mime_types() -> &'static [&'static str]
    where
        Self: Sized;

    /// Cheap check of the leading bytes; never fails
    fn detect(&self, header: &[u8]) -> bool;

    /// Parse `total_len` bytes from a sequential source
    ///
    /// The length must be known up front: it is how the parser knows where the
    /// stream ends and how it rejects truncated input.
    fn parse<R: Read>(&self, source: R, total_len: u64) -> Result<Self::Output>;

    /// Parse an in-memory buffer
    fn parse_bytes(&self, data: &[u8]) -> Result<Self::Output> {
        self.parse(Cursor::new(data), data.len() as u64)
    }

    /// Parse from the current position to the end of a seekable source
    fn parse_seekable<R: Read + Seek>(&self, mut source: R) -> Result<Self::Output> {
        let start = source.stream_position()?;
        let end = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(start))?;
        self.parse(source, end.saturating_sub(start))
    }

    /// Parse a whole file
    ///
    /// The file handle is closed on every return path, including parse errors.
    fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Self::Output> {
        let file = File::open(path.as_ref())?;
        let total_len = file.metadata()?.len();
        self.parse(BufReader::new(file), total_len)
    }
}
