//! PNG chunk CRC-32
//!
//! The checksum covers the chunk type followed by the chunk data, never the
//! length field.

use crate::chunk::ChunkType;

/// Calculate the CRC-32 stored at the end of a PNG chunk
pub fn chunk_crc(chunk_type: &ChunkType, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        let phys = [0x00, 0x00, 0x0b, 0x13, 0x00, 0x00, 0x0b, 0x13, 0x01];
        assert_eq!(chunk_crc(&ChunkType::PHYS, &phys), 0x009a_9c18);

        let time = [0x07, 0xcc, 0x06, 0x07, 0x11, 0x3a, 0x08];
        assert_eq!(chunk_crc(&ChunkType::TIME, &time), 0x8eff_267a);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(chunk_crc(&ChunkType::IEND, &[]), 0xAE42_6082);
    }

    #[test]
    fn test_crc_calculation() {
        // IHDR chunk type + 13 bytes of data
        let data = &[
            0x00, 0x00, 0x00, 0x01, // Width: 1
            0x00, 0x00, 0x00, 0x01, // Height: 1
            0x08, // Bit depth: 8
            0x02, // Color type: RGB
            0x00, // Compression: deflate
            0x00, // Filter: adaptive
            0x00, // Interlace: none
        ];

        let crc = chunk_crc(&ChunkType::IHDR, data);
        assert_eq!(crc, chunk_crc(&ChunkType::IHDR, data));
        assert_eq!(crc, 0x9077_53de);

        let mut different_data = data.to_vec();
        different_data[0] = 0xFF;
        assert_ne!(crc, chunk_crc(&ChunkType::IHDR, &different_data));
    }
}
