//! Test utilities for building PNG fixtures.
//!
//! Fixtures are synthesised in memory, so tests need no binary files on disk:
//! - [`minimal_png`]: IHDR, one IDAT, IEND
//! - [`sample_png`]: IHDR, pHYs, tIME, [`SAMPLE_IDAT_COUNT`] IDAT chunks, IEND
//! - [`exif_png`]: IHDR, eXIf (ImageWidth = 11, ImageLength = 22), IDAT, IEND
//!
//! # Usage
//!
//! ```no_run
//! use png_structure::test_utils::*;
//! use png_structure::{ContainerIO, PngIO};
//!
//! # fn example() -> png_structure::Result<()> {
//! let png = PngIO::new().parse_bytes(&sample_png())?;
//!
//! // Or go through the file system
//! let path = write_temp_fixture("sample.png", &sample_png())?;
//! let png = PngIO::new().parse_file(&path)?;
//! # Ok(())
//! # }
//! ```

use std::{fs, path::PathBuf};

use crate::{chunk::ChunkType, containers::png_io::PNG_SIGNATURE, crc::chunk_crc, Result};

/// Number of IDAT chunks in [`sample_png`]
pub const SAMPLE_IDAT_COUNT: usize = 222;

/// IHDR payload of [`minimal_png`]
const MINIMAL_IHDR: [u8; 13] = [0, 0, 0, 1, 0, 0, 0, 1, 0x08, 0x02, 0x00, 0x00, 0x00];

/// Compressed scanline of [`minimal_png`]
const MINIMAL_IDAT: [u8; 12] = [
    0x78, 0x9c, 0x63, 0x60, 0x60, 0x60, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01,
];

/// IHDR payload of a 1472x598, 8-bit RGB, non-interlaced image
pub const SAMPLE_IHDR: [u8; 13] = [
    0x00, 0x00, 0x05, 0xc0, // Width: 1472
    0x00, 0x00, 0x02, 0x56, // Height: 598
    0x08, // Bit depth: 8
    0x02, // Color type: RGB
    0x00, // Compression: deflate
    0x00, // Filter: adaptive
    0x00, // Interlace: none
];

/// Encode one chunk with a correct CRC
pub fn chunk_bytes(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + data.len());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);

    let crc = match ChunkType::new(*chunk_type) {
        Some(chunk_type) => chunk_crc(&chunk_type, data),
        None => 0,
    };
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Signature followed by the given encoded chunks
pub fn png_from_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    for chunk in chunks {
        data.extend_from_slice(chunk);
    }
    data
}

/// Smallest useful PNG: a 1x1 RGB image
pub fn minimal_png() -> Vec<u8> {
    png_from_chunks(&[
        chunk_bytes(b"IHDR", &MINIMAL_IHDR),
        chunk_bytes(b"IDAT", &MINIMAL_IDAT),
        chunk_bytes(b"IEND", &[]),
    ])
}

/// A larger image split across many IDAT chunks, with pHYs and tIME
pub fn sample_png() -> Vec<u8> {
    let mut chunks = vec![
        chunk_bytes(b"IHDR", &SAMPLE_IHDR),
        chunk_bytes(b"pHYs", &[0x00, 0x00, 0x0b, 0x13, 0x00, 0x00, 0x0b, 0x13, 0x01]),
        chunk_bytes(b"tIME", &[0x07, 0xcc, 0x06, 0x07, 0x11, 0x3a, 0x08]),
    ];
    for i in 0..SAMPLE_IDAT_COUNT {
        // Arbitrary, varying content; nothing decompresses it
        let data: Vec<u8> = (0..64 + i % 7).map(|b| (b * 31 + i) as u8).collect();
        chunks.push(chunk_bytes(b"IDAT", &data));
    }
    chunks.push(chunk_bytes(b"IEND", &[]));
    png_from_chunks(&chunks)
}

/// Big-endian eXIf payload with ImageWidth = 11 and ImageLength = 22 (both LONG)
pub fn sample_exif_payload() -> Vec<u8> {
    let mut data = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
    data.extend_from_slice(&[0x00, 0x02]);
    data.extend_from_slice(&[0x01, 0x00, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 11]);
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 22]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

/// [`minimal_png`] with the given eXIf payload right after IHDR
pub fn png_with_exif(payload: &[u8]) -> Vec<u8> {
    png_from_chunks(&[
        chunk_bytes(b"IHDR", &MINIMAL_IHDR),
        chunk_bytes(b"eXIf", payload),
        chunk_bytes(b"IDAT", &MINIMAL_IDAT),
        chunk_bytes(b"IEND", &[]),
    ])
}

/// [`png_with_exif`] carrying [`sample_exif_payload`]
pub fn exif_png() -> Vec<u8> {
    png_with_exif(&sample_exif_payload())
}

/// Write a fixture into the system temp directory and return its path
///
/// The directory can be overridden with the `PNG_STRUCTURE_TEST_DIR` env var.
pub fn write_temp_fixture(file_name: &str, data: &[u8]) -> Result<PathBuf> {
    let mut path = match std::env::var("PNG_STRUCTURE_TEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => std::env::temp_dir(),
    };
    path.push(format!("png_structure_{}_{}", std::process::id(), file_name));
    fs::write(&path, data)?;
    Ok(path)
}
