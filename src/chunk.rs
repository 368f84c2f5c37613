//! PNG chunk representation
//!
//! Chunk layout on disk:
//! `[length: u32 BE][type: 4 bytes][data: length bytes][crc: u32 BE]`

use crate::{
    crc::chunk_crc,
    error::{Error, Result},
};
use byteorder::{BigEndian, WriteBytesExt};
use std::fmt;
use std::io::Write;

/// Largest chunk length a PNG stream may declare (2^31 - 1)
pub const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

/// Bytes of framing around every chunk's data: length (4) + type (4) + CRC (4)
pub const CHUNK_OVERHEAD: u64 = 12;

/// Four-letter chunk type tag
///
/// Case is significant and carries meaning in PNG (critical vs ancillary, public vs
/// private, safe-to-copy), but nothing in this crate enforces those rules.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkType([u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const PLTE: ChunkType = ChunkType(*b"PLTE");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    /// EXIF metadata (PNG 1.5 extension)
    pub const EXIF: ChunkType = ChunkType(*b"eXIf");
    pub const PHYS: ChunkType = ChunkType(*b"pHYs");
    pub const TIME: ChunkType = ChunkType(*b"tIME");
    pub const TEXT: ChunkType = ChunkType(*b"tEXt");
    pub const ITXT: ChunkType = ChunkType(*b"iTXt");
    pub const ZTXT: ChunkType = ChunkType(*b"zTXt");

    /// Create a chunk type, rejecting anything that isn't four ASCII letters
    pub fn new(bytes: [u8; 4]) -> Option<Self> {
        if Self::is_valid(&bytes) {
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Check whether raw bytes form a legal chunk type
    pub fn is_valid(bytes: &[u8; 4]) -> bool {
        bytes.iter().all(u8::is_ascii_alphabetic)
    }

    /// Raw tag bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Critical chunks have an uppercase first letter
    pub fn is_critical(&self) -> bool {
        self.0[0].is_ascii_uppercase()
    }

    /// Public chunks have an uppercase second letter
    pub fn is_public(&self) -> bool {
        self.0[1].is_ascii_uppercase()
    }

    /// Safe-to-copy chunks have a lowercase fourth letter
    pub fn is_safe_to_copy(&self) -> bool {
        self.0[3].is_ascii_lowercase()
    }

    /// Get human-readable label for a PNG chunk type
    pub fn label(&self) -> &'static str {
        match &self.0 {
            b"IHDR" => "IHDR",
            b"PLTE" => "PLTE",
            b"IDAT" => "IDAT",
            b"IEND" => "IEND",
            b"tRNS" => "tRNS",
            b"gAMA" => "gAMA",
            b"cHRM" => "cHRM",
            b"sRGB" => "sRGB",
            b"iCCP" => "iCCP",
            b"iTXt" => "iTXt",
            b"tEXt" => "tEXt",
            b"zTXt" => "zTXt",
            b"bKGD" => "bKGD",
            b"pHYs" => "pHYs",
            b"tIME" => "tIME",
            b"eXIf" => "eXIf",
            _ => "OTHER",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always ASCII letters, so this is lossless
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self)
    }
}

/// One PNG chunk held in memory
///
/// `length` is kept separately from `data` so a decoded chunk reproduces its
/// original bytes exactly; serialization refuses to run if the two disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    offset: u64,
    length: u32,
    chunk_type: ChunkType,
    data: Vec<u8>,
    crc: Option<u32>,
}

impl Chunk {
    /// Build a new chunk; the CRC is left unset and computed when first needed
    pub fn new(chunk_type: ChunkType, data: Vec<u8>) -> Result<Self> {
        let length = checked_length(data.len())?;
        Ok(Self {
            offset: 0,
            length,
            chunk_type,
            data,
            crc: None,
        })
    }

    /// Build a chunk from raw fields exactly as given, without any validation
    pub fn from_parts(
        offset: u64,
        length: u32,
        chunk_type: ChunkType,
        data: Vec<u8>,
        crc: Option<u32>,
    ) -> Self {
        Self {
            offset,
            length,
            chunk_type,
            data,
            crc,
        }
    }

    /// Position of the length field in the stream this chunk was read from
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Declared data length
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the chunk data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The CRC as read or last computed, if any
    pub fn stored_crc(&self) -> Option<u32> {
        self.crc
    }

    /// The CRC that will be written: the stored value, or a fresh one if unset
    pub fn crc(&self) -> u32 {
        self.crc.unwrap_or_else(|| chunk_crc(&self.chunk_type, &self.data))
    }

    /// Replace the chunk data, updating the length and CRC to match
    pub fn set_data(&mut self, data: Vec<u8>) -> Result<()> {
        self.length = checked_length(data.len())?;
        self.data = data;
        self.update_crc();
        Ok(())
    }

    /// Recompute and store the CRC over type + data
    pub fn update_crc(&mut self) {
        self.crc = Some(chunk_crc(&self.chunk_type, &self.data));
    }

    /// Check the stored CRC against the chunk contents
    ///
    /// Returns `false` when no CRC is stored. Never modifies the chunk.
    pub fn check_crc(&self) -> bool {
        self.crc == Some(chunk_crc(&self.chunk_type, &self.data))
    }

    /// Total encoded size: length + type + data + CRC
    pub fn encoded_len(&self) -> u64 {
        CHUNK_OVERHEAD + self.length as u64
    }

    /// Serialize the full chunk including its framing
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.ensure_consistent()?;

        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.write_u32::<BigEndian>(self.length)?;
        buf.extend_from_slice(self.chunk_type.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.write_u32::<BigEndian>(self.crc())?;
        Ok(buf)
    }

    /// Write the full chunk to `writer` in a single `write_all`
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    fn ensure_consistent(&self) -> Result<()> {
        if self.length as usize != self.data.len() {
            return Err(Error::LengthMismatch {
                chunk_type: self.chunk_type,
                declared: self.length,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

fn checked_length(len: usize) -> Result<u32> {
    if len > MAX_CHUNK_SIZE as usize {
        return Err(Error::DataTooLarge {
            size: len,
            max: MAX_CHUNK_SIZE as usize,
        });
    }
    Ok(len as u32)
}
