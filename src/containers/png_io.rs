//! PNG container I/O implementation

use super::ContainerIO;
use crate::{
    chunk_slice::ChunkSlice,
    error::Result,
    reader::{ChunkReader, ParseOptions},
};
use std::io::Read;

/// PNG signature: 89 50 4E 47 0D 0A 1A 0A
pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

/// PNG container I/O implementation
///
/// # Example
///
/// ```no_run
/// use png_structure::{ContainerIO, PngIO};
///
/// # fn main() -> png_structure::Result<()> {
/// let png = PngIO::new().parse_file("image.png")?;
/// for chunk in png.chunks() {
///     println!("{} at {}: {} bytes", chunk.chunk_type(), chunk.offset(), chunk.length());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PngIO {
    options: ParseOptions,
}

impl PngIO {
    /// Create a new PNG I/O implementation
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// True iff `header` starts with the PNG signature
    pub fn looks_like_format(header: &[u8]) -> bool {
        header.len() >= PNG_SIGNATURE.len() && header[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
    }

    /// Parse a file through a read-only memory map
    ///
    /// Avoids buffered reads for large files; the chunks are still copied out of
    /// the map, so the result doesn't borrow from it.
    #[cfg(feature = "memory-mapped")]
    pub fn parse_file_mmap<P: AsRef<std::path::Path>>(&self, path: P) -> Result<ChunkSlice> {
        let file = std::fs::File::open(path.as_ref())?;
        // SAFETY: the map is read-only and dropped before returning; concurrent
        // truncation of the file by another process is outside our control, as with
        // any mmap user.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        self.parse_bytes(&mmap)
    }
}

impl ContainerIO for PngIO {
    type Output = ChunkSlice;

    fn extensions() -> &'static [&'static str] {
        &["png"]
    }

    fn mime_types() -> &'static [&'static str] {
        &["image/png"]
    }

    fn detect(&self, header: &[u8]) -> bool {
        Self::looks_like_format(header)
    }

    fn parse<R: Read>(&self, source: R, total_len: u64) -> Result<ChunkSlice> {
        ChunkReader::with_options(source, total_len, self.options)?.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chunk::ChunkType, error::Error, test_utils::*};
    use std::io::{Cursor, Seek, SeekFrom};

    #[test]
    fn test_looks_like_format() {
        assert!(PngIO::looks_like_format(&minimal_png()));
        assert!(PngIO::looks_like_format(&PNG_SIGNATURE));
        assert!(!PngIO::looks_like_format(&[]));
        assert!(!PngIO::looks_like_format(&PNG_SIGNATURE[..7]));
        assert!(!PngIO::looks_like_format(b"\xFF\xD8\xFF\xE0 not a png"));
        assert!(PngIO::new().detect(&sample_png()[..16]));
    }

    #[test]
    fn test_png_minimal_parse() {
        let png = PngIO::new().parse_bytes(&minimal_png()).unwrap();

        let types: Vec<ChunkType> = png.chunks().iter().map(|c| c.chunk_type()).collect();
        assert_eq!(types, [ChunkType::IHDR, ChunkType::IDAT, ChunkType::IEND]);
    }

    #[test]
    fn test_png_invalid_signature() {
        let data = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let result = PngIO::new().parse_bytes(&data);

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_seekable_from_offset() {
        let mut data = b"junk".to_vec();
        data.extend_from_slice(&minimal_png());

        let mut cursor = Cursor::new(data);
        cursor.seek(SeekFrom::Start(4)).unwrap();
        let png = PngIO::new().parse_seekable(cursor).unwrap();
        assert_eq!(png.len(), 3);
    }

    #[test]
    fn test_options_are_applied() {
        let mut data = minimal_png();
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        assert!(PngIO::new().parse_bytes(&data).is_ok());
        let strict = PngIO::with_options(ParseOptions::new().verify_crc(true));
        assert!(matches!(
            strict.parse_bytes(&data),
            Err(Error::CrcMismatch { .. })
        ));
    }
}
