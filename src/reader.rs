//! Streaming PNG chunk reader
//!
//! Reads the signature, then one chunk at a time, until exactly `total_len` bytes
//! have been consumed. The total length must be known up front so that a chunk
//! claiming more data than the stream holds is caught before anything is allocated.

use crate::{
    chunk::{Chunk, ChunkType, CHUNK_OVERHEAD, MAX_CHUNK_SIZE},
    chunk_slice::ChunkSlice,
    containers::png_io::PNG_SIGNATURE,
    error::{Error, Result},
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

/// Options controlling how strictly a chunk stream is parsed
///
/// # Example
///
/// ```
/// use png_structure::ParseOptions;
///
/// let options = ParseOptions::new().verify_crc(true).max_chunk_size(16 * 1024 * 1024);
/// assert!(options.verifies_crc());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    verify_crc: bool,
    max_chunk_size: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_crc: false,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }
}

impl ParseOptions {
    /// Default options: no CRC verification, PNG's own chunk size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`Error::CrcMismatch`] on the first chunk whose CRC doesn't match
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Reject chunks declaring more than `max` data bytes
    pub fn max_chunk_size(mut self, max: u32) -> Self {
        self.max_chunk_size = max.min(MAX_CHUNK_SIZE);
        self
    }

    pub fn verifies_crc(&self) -> bool {
        self.verify_crc
    }

    pub fn chunk_size_limit(&self) -> u32 {
        self.max_chunk_size
    }
}

/// Pull-based reader producing one [`Chunk`] per call
pub struct ChunkReader<R> {
    source: R,
    total_len: u64,
    offset: u64,
    options: ParseOptions,
    failed: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Check the PNG signature and prepare to read chunks
    pub fn new(source: R, total_len: u64) -> Result<Self> {
        Self::with_options(source, total_len, ParseOptions::default())
    }

    pub fn with_options(source: R, total_len: u64, options: ParseOptions) -> Result<Self> {
        let mut reader = Self {
            source,
            total_len,
            offset: 0,
            options,
            failed: false,
        };

        if total_len < PNG_SIGNATURE.len() as u64 {
            return Err(Error::Truncated {
                offset: 0,
                reason: format!("{} bytes is shorter than the PNG signature", total_len),
            });
        }

        let mut sig = [0u8; 8];
        reader.read_exact(&mut sig, "signature")?;
        if sig != PNG_SIGNATURE {
            return Err(Error::InvalidFormat("Not a PNG file".into()));
        }
        reader.offset = PNG_SIGNATURE.len() as u64;

        log::debug!("PNG signature ok, {} bytes of chunks to read", total_len - 8);
        Ok(reader)
    }

    /// Bytes consumed so far, signature included
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next chunk, or `None` once the declared total length is reached
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.offset == self.total_len {
            return Ok(None);
        }

        let chunk_start = self.offset;
        let remaining = self.total_len - self.offset;
        if remaining < CHUNK_OVERHEAD {
            return Err(Error::Truncated {
                offset: chunk_start,
                reason: format!(
                    "{} trailing bytes cannot hold a chunk (need at least {})",
                    remaining, CHUNK_OVERHEAD
                ),
            });
        }

        let length = self.read_u32("chunk length")?;

        let mut type_bytes = [0u8; 4];
        self.read_exact(&mut type_bytes, "chunk type")?;
        let chunk_type = ChunkType::new(type_bytes).ok_or(Error::InvalidChunkType {
            offset: chunk_start,
            bytes: type_bytes,
        })?;

        // Validate chunk length to prevent allocation attacks
        if length > self.options.max_chunk_size {
            return Err(Error::InvalidChunk {
                offset: chunk_start,
                chunk_type,
                reason: format!(
                    "chunk length {} exceeds limit {}",
                    length, self.options.max_chunk_size
                ),
            });
        }
        if length as u64 > remaining - CHUNK_OVERHEAD {
            return Err(Error::Truncated {
                offset: chunk_start,
                reason: format!(
                    "{} chunk declares {} bytes but only {} remain",
                    chunk_type,
                    length,
                    remaining - CHUNK_OVERHEAD
                ),
            });
        }

        let mut data = Vec::with_capacity(length as usize);
        let read = (&mut self.source)
            .take(length as u64)
            .read_to_end(&mut data)?;
        if read < length as usize {
            return Err(Error::Truncated {
                offset: chunk_start,
                reason: format!(
                    "source ended after {} of {} {} data bytes",
                    read, length, chunk_type
                ),
            });
        }

        let crc = self.read_u32("chunk CRC")?;
        let chunk = Chunk::from_parts(chunk_start, length, chunk_type, data, Some(crc));

        if self.options.verify_crc && !chunk.check_crc() {
            return Err(Error::CrcMismatch {
                offset: chunk_start,
                chunk_type,
                expected: crc,
                actual: crate::crc::chunk_crc(&chunk_type, chunk.data()),
            });
        }

        log::trace!("{} chunk at {}: {} bytes", chunk_type, chunk_start, length);
        self.offset += chunk.encoded_len();
        Ok(Some(chunk))
    }

    /// Read every remaining chunk into a [`ChunkSlice`]
    pub fn read_all(mut self) -> Result<ChunkSlice> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            chunks.push(chunk);
        }
        log::debug!("parsed {} chunks ({} bytes)", chunks.len(), self.offset);
        Ok(ChunkSlice::new(chunks))
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        let offset = self.offset;
        self.source
            .read_exact(buf)
            .map_err(|e| eof_as_truncation(e, offset, what))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let offset = self.offset;
        self.source
            .read_u32::<BigEndian>()
            .map_err(|e| eof_as_truncation(e, offset, what))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn eof_as_truncation(err: io::Error, offset: u64, what: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated {
            offset,
            reason: format!("source ended while reading {}", what),
        }
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk_bytes(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let chunk_type = ChunkType::new(*chunk_type).unwrap();
        Chunk::new(chunk_type, data.to_vec())
            .unwrap()
            .to_bytes()
            .unwrap()
    }

    fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        for chunk in chunks {
            data.extend_from_slice(chunk);
        }
        data
    }

    fn reader(data: &[u8]) -> Result<ChunkReader<Cursor<&[u8]>>> {
        ChunkReader::new(Cursor::new(data), data.len() as u64)
    }

    #[test]
    fn test_reads_chunks_with_offsets() {
        let data = png(&[chunk_bytes(b"IHDR", &[0; 13]), chunk_bytes(b"IEND", &[])]);

        let chunks: Vec<Chunk> = reader(&data).unwrap().collect::<Result<_>>().unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_type(), ChunkType::IHDR);
        assert_eq!(chunks[0].offset(), 8);
        assert_eq!(chunks[1].chunk_type(), ChunkType::IEND);
        assert_eq!(chunks[1].offset(), 8 + 12 + 13);
        assert!(chunks.iter().all(Chunk::check_crc));

        // Each chunk re-encodes to exactly the bytes at its offset
        for chunk in &chunks {
            let start = chunk.offset() as usize;
            let end = start + chunk.encoded_len() as usize;
            assert_eq!(chunk.to_bytes().unwrap(), &data[start..end]);
        }
    }

    #[test]
    fn test_invalid_signature() {
        let data = vec![0u8; 8];
        assert!(matches!(reader(&data), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_short_signature_is_truncation() {
        let data = &PNG_SIGNATURE[..5];
        assert!(matches!(reader(data), Err(Error::Truncated { offset: 0, .. })));
    }

    #[test]
    fn test_declared_length_past_end() {
        let mut data = png(&[chunk_bytes(b"IHDR", &[0; 13])]);
        // Bump IHDR length to 200
        data[8..12].copy_from_slice(&200u32.to_be_bytes());

        let err = reader(&data).unwrap().read_all().unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 8, .. }));
    }

    #[test]
    fn test_source_shorter_than_declared_total() {
        let data = png(&[chunk_bytes(b"IHDR", &[0; 13])]);
        let claimed = data.len() as u64 + 40;

        let err = ChunkReader::new(Cursor::new(&data), claimed)
            .unwrap()
            .read_all()
            .unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_truncation() {
        let mut data = png(&[chunk_bytes(b"IEND", &[])]);
        data.extend_from_slice(&[0, 0, 0]);

        let err = reader(&data).unwrap().read_all().unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 20, .. }));
    }

    #[test]
    fn test_invalid_chunk_type() {
        let mut data = png(&[chunk_bytes(b"IEND", &[])]);
        data[12] = b'1';

        let err = reader(&data).unwrap().read_all().unwrap_err();
        assert!(matches!(err, Error::InvalidChunkType { offset: 8, .. }));
    }

    #[test]
    fn test_crc_not_verified_by_default() {
        let mut data = png(&[chunk_bytes(b"IEND", &[])]);
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let slice = reader(&data).unwrap().read_all().unwrap();
        assert!(!slice.chunks()[0].check_crc());

        let strict = ChunkReader::with_options(
            Cursor::new(&data),
            data.len() as u64,
            ParseOptions::new().verify_crc(true),
        )
        .unwrap()
        .read_all();
        assert!(matches!(strict, Err(Error::CrcMismatch { offset: 8, .. })));
    }

    #[test]
    fn test_chunk_size_limit() {
        let data = png(&[chunk_bytes(b"IDAT", &[0; 64])]);
        let result = ChunkReader::with_options(
            Cursor::new(&data),
            data.len() as u64,
            ParseOptions::new().max_chunk_size(32),
        )
        .unwrap()
        .read_all();
        assert!(matches!(result, Err(Error::InvalidChunk { .. })));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut data = png(&[chunk_bytes(b"IEND", &[])]);
        data.push(0);

        let mut reader = reader(&data).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_signature_only_is_empty() {
        let slice = reader(&PNG_SIGNATURE).unwrap().read_all().unwrap();
        assert!(slice.is_empty());
    }
}
