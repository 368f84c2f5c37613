//! Typed views of structural chunk payloads
//!
//! Only a handful of fixed-layout chunks are decoded. Every other chunk type maps to
//! [`ChunkData::Opaque`], so unknown or private chunks never cause a failure here.

use crate::{
    chunk::{Chunk, ChunkType},
    error::{Error, Result},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

const IHDR_SIZE: usize = 13;
const PHYS_SIZE: usize = 9;
const TIME_SIZE: usize = 7;

/// Decoded payload of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkData {
    /// IHDR
    Header(ImageHeader),
    /// pHYs
    PhysicalDimensions(PhysicalDimensions),
    /// tIME
    LastModified(LastModified),
    /// IEND (always empty)
    End,
    /// Any chunk type without a structural decoder
    Opaque(ChunkType),
}

impl ChunkData {
    /// Decode the payload of `chunk` according to its type
    pub fn decode(chunk: &Chunk) -> Result<Self> {
        match chunk.chunk_type() {
            ChunkType::IHDR => ImageHeader::decode(chunk).map(Self::Header),
            ChunkType::PHYS => PhysicalDimensions::decode(chunk).map(Self::PhysicalDimensions),
            ChunkType::TIME => LastModified::decode(chunk).map(Self::LastModified),
            ChunkType::IEND => Ok(Self::End),
            other => Ok(Self::Opaque(other)),
        }
    }
}

/// IHDR: image dimensions and pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}

impl ImageHeader {
    /// Decode an IHDR chunk
    pub fn decode(chunk: &Chunk) -> Result<Self> {
        let data = expect_payload(chunk, ChunkType::IHDR, IHDR_SIZE)?;
        let mut cursor = Cursor::new(data);

        Ok(Self {
            width: cursor.read_u32::<BigEndian>()?,
            height: cursor.read_u32::<BigEndian>()?,
            bit_depth: cursor.read_u8()?,
            color_type: cursor.read_u8()?,
            compression_method: cursor.read_u8()?,
            filter_method: cursor.read_u8()?,
            interlace_method: cursor.read_u8()?,
        })
    }

    /// Encode into a fresh IHDR chunk with its CRC set
    pub fn to_chunk(&self) -> Result<Chunk> {
        let mut data = Vec::with_capacity(IHDR_SIZE);
        data.write_u32::<BigEndian>(self.width)?;
        data.write_u32::<BigEndian>(self.height)?;
        data.extend_from_slice(&[
            self.bit_depth,
            self.color_type,
            self.compression_method,
            self.filter_method,
            self.interlace_method,
        ]);

        let mut chunk = Chunk::new(ChunkType::IHDR, data)?;
        chunk.update_crc();
        Ok(chunk)
    }
}

/// pHYs: intended pixel size or aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDimensions {
    pub pixels_per_unit_x: u32,
    pub pixels_per_unit_y: u32,
    /// 0 = unknown (aspect ratio only), 1 = metre
    pub unit: u8,
}

impl PhysicalDimensions {
    pub fn decode(chunk: &Chunk) -> Result<Self> {
        let data = expect_payload(chunk, ChunkType::PHYS, PHYS_SIZE)?;
        let mut cursor = Cursor::new(data);

        Ok(Self {
            pixels_per_unit_x: cursor.read_u32::<BigEndian>()?,
            pixels_per_unit_y: cursor.read_u32::<BigEndian>()?,
            unit: cursor.read_u8()?,
        })
    }
}

/// tIME: last modification time (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastModified {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LastModified {
    pub fn decode(chunk: &Chunk) -> Result<Self> {
        let data = expect_payload(chunk, ChunkType::TIME, TIME_SIZE)?;
        let mut cursor = Cursor::new(data);

        Ok(Self {
            year: cursor.read_u16::<BigEndian>()?,
            month: cursor.read_u8()?,
            day: cursor.read_u8()?,
            hour: cursor.read_u8()?,
            minute: cursor.read_u8()?,
            second: cursor.read_u8()?,
        })
    }
}

fn expect_payload(chunk: &Chunk, expected_type: ChunkType, size: usize) -> Result<&[u8]> {
    if chunk.chunk_type() != expected_type {
        return Err(Error::InvalidChunk {
            offset: chunk.offset(),
            chunk_type: chunk.chunk_type(),
            reason: format!("expected a {} chunk", expected_type),
        });
    }
    if chunk.data().len() != size {
        return Err(Error::InvalidChunk {
            offset: chunk.offset(),
            chunk_type: chunk.chunk_type(),
            reason: format!("payload is {} bytes, expected {}", chunk.data().len(), size),
        });
    }
    Ok(chunk.data())
}
