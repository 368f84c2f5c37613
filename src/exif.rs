//! EXIF embedding for the eXIf chunk
//!
//! PNG's eXIf chunk holds raw TIFF data with no "Exif\0\0" prefix (unlike JPEG's
//! APP1). The 8-byte TIFF header is handled here so the tag codec never needs to
//! know how it is embedded:
//!
//! ```text
//! [byte order: "II" | "MM"][magic: 0x002A][IFD0 offset: u32][IFDs ...]
//! ```
//!
//! New payloads are always written big-endian with IFD0 directly after the header.

use crate::tiff::{self, ByteOrder, Ifd, IfdBuilder, TiffError};

/// Size of the TIFF header at the start of the eXIf payload
pub const EXIF_HEADER_SIZE: usize = 8;

/// Byte order used for every payload this crate writes
pub const DEFAULT_BYTE_ORDER: ByteOrder = ByteOrder::BigEndian;

/// IFD0 offset used for every payload this crate writes
pub const ROOT_IFD_OFFSET: u32 = EXIF_HEADER_SIZE as u32;

const TIFF_MAGIC: u16 = 0x002A;

/// The TIFF header leading an eXIf payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExifHeader {
    pub byte_order: ByteOrder,
    /// Offset of IFD0 from the start of the payload
    pub ifd_offset: u32,
}

impl Default for ExifHeader {
    fn default() -> Self {
        Self {
            byte_order: DEFAULT_BYTE_ORDER,
            ifd_offset: ROOT_IFD_OFFSET,
        }
    }
}

impl ExifHeader {
    /// Parse the header from the start of an eXIf payload
    pub fn parse(data: &[u8]) -> Result<Self, TiffError> {
        if data.len() < EXIF_HEADER_SIZE {
            return Err(TiffError::InvalidHeader(format!(
                "{} bytes is too short for a TIFF header",
                data.len()
            )));
        }

        // Byte order: "II" (0x4949) = little endian, "MM" (0x4D4D) = big endian
        let byte_order = ByteOrder::from_marker(&data[0..2]).ok_or_else(|| {
            TiffError::InvalidHeader(format!("unknown byte order marker {:02x?}", &data[0..2]))
        })?;

        let magic = byte_order.read_u16(&data[2..4]);
        if magic != TIFF_MAGIC {
            return Err(TiffError::InvalidHeader(format!(
                "bad magic number {:#06x}",
                magic
            )));
        }

        let ifd_offset = byte_order.read_u32(&data[4..8]);
        if (ifd_offset as usize) < EXIF_HEADER_SIZE {
            return Err(TiffError::InvalidHeader(format!(
                "IFD0 offset {} points into the header",
                ifd_offset
            )));
        }

        Ok(Self {
            byte_order,
            ifd_offset,
        })
    }

    pub fn to_bytes(&self) -> [u8; EXIF_HEADER_SIZE] {
        let mut header = [0u8; EXIF_HEADER_SIZE];
        header[0..2].copy_from_slice(&self.byte_order.marker());
        self.byte_order.write_u16(&mut header[2..4], TIFF_MAGIC);
        self.byte_order.write_u32(&mut header[4..8], self.ifd_offset);
        header
    }
}

/// Decode the IFD tree stored in an eXIf payload
pub fn decode_payload(data: &[u8]) -> Result<Ifd, TiffError> {
    let header = ExifHeader::parse(data)?;
    log::debug!(
        "decoding EXIF: {:?}, IFD0 at {}, {} bytes",
        header.byte_order,
        header.ifd_offset,
        data.len()
    );
    tiff::decode(data, header.byte_order, header.ifd_offset)
}

/// Build an eXIf payload: canonical header followed by the encoded tree
pub fn encode_payload(builder: &IfdBuilder) -> Result<Vec<u8>, TiffError> {
    let header = ExifHeader::default();
    let ifds = builder.encode(header.byte_order, header.ifd_offset)?;

    let mut payload = Vec::with_capacity(EXIF_HEADER_SIZE + ifds.len());
    payload.extend_from_slice(&header.to_bytes());
    payload.extend_from_slice(&ifds);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::TagValue;

    #[test]
    fn test_header_round_trip() {
        let header = ExifHeader::default();
        let bytes = header.to_bytes();
        assert_eq!(bytes, *b"MM\x00\x2a\x00\x00\x00\x08");
        assert_eq!(ExifHeader::parse(&bytes).unwrap(), header);

        let le = ExifHeader::parse(b"II\x2a\x00\x10\x00\x00\x00").unwrap();
        assert_eq!(le.byte_order, ByteOrder::LittleEndian);
        assert_eq!(le.ifd_offset, 16);
    }

    #[test]
    fn test_bad_headers() {
        assert!(ExifHeader::parse(b"MM\x00\x2a").is_err());
        assert!(ExifHeader::parse(b"Exif\x00\x00MM").is_err());
        assert!(ExifHeader::parse(b"MM\x00\x2b\x00\x00\x00\x08").is_err());
        assert!(ExifHeader::parse(b"MM\x00\x2a\x00\x00\x00\x04").is_err());
    }

    #[test]
    fn test_payload_round_trip() {
        let mut builder = IfdBuilder::root();
        builder
            .add(0x0100, TagValue::Long(vec![11]))
            .add(0x0101, TagValue::Long(vec![22]));

        let payload = encode_payload(&builder).unwrap();
        assert_eq!(&payload[..8], b"MM\x00\x2a\x00\x00\x00\x08");

        let ifd = decode_payload(&payload).unwrap();
        assert_eq!(ifd.offset, 8);
        let ids: Vec<u16> = ifd.entries().iter().map(|e| e.tag_id).collect();
        assert_eq!(ids, [0x0100, 0x0101]);
        assert_eq!(ifd.get(0x0101), Some(&TagValue::Long(vec![22])));
    }

    #[test]
    fn test_little_endian_payload_decodes() {
        // II header, IFD0 at 8 with one SHORT tag (Orientation = 6)
        let mut payload = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
        payload.extend_from_slice(&[0x01, 0x00]);
        payload.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 1, 0, 0, 0, 6, 0, 0, 0]);
        payload.extend_from_slice(&[0, 0, 0, 0]);

        let ifd = decode_payload(&payload).unwrap();
        assert_eq!(ifd.get(0x0112), Some(&TagValue::Short(vec![6])));
    }
}
