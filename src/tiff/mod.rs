//! Minimal TIFF/EXIF tag codec
//!
//! Decodes and encodes the IFD (Image File Directory) tree used by EXIF. The codec
//! only deals with IFDs and tag values: the 8-byte TIFF header and wherever the
//! tree is embedded are the caller's concern (see [`crate::exif`]).
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! All offsets are relative to the start of the TIFF data, i.e. the header.

mod builder;
mod decode;
pub mod tags;

pub use builder::IfdBuilder;
pub use decode::decode;

use byteorder::{BigEndian, ByteOrder as Endianness, LittleEndian};

/// Maximum number of tags in an IFD (prevents DOS attacks)
pub const MAX_IFD_TAGS: u16 = 1000;

/// Maximum number of IFDs in one tree, across sub-IFDs and next-IFD chains
pub const MAX_IFDS: usize = 32;

/// Errors raised by the tag codec
#[derive(Debug, thiserror::Error)]
pub enum TiffError {
    /// Byte-order marker or magic number is wrong
    #[error("Invalid TIFF header: {0}")]
    InvalidHeader(String),

    /// A structure or value runs past the end of the data
    #[error("TIFF data truncated: {what} needs {size} bytes at offset {offset}, data is {len} bytes")]
    OutOfBounds {
        what: &'static str,
        offset: u64,
        size: u64,
        len: usize,
    },

    #[error("IFD at offset {offset} declares {count} tags (max {max})")]
    TooManyTags { offset: u64, count: usize, max: u16 },

    #[error("Too many IFDs (max {0})")]
    TooManyIfds(usize),

    /// An IFD pointer leads back to an IFD that was already decoded
    #[error("IFD loop detected at offset {0}")]
    IfdLoop(u32),

    /// A tag locates data by offset and the tree doesn't hold that data
    #[error("Tag {0:#06x} points at data that is not carried in the tree")]
    UnresolvedOffset(u16),

    #[error("{offsets} data offsets but {lengths} lengths")]
    MismatchedOffsets { offsets: usize, lengths: usize },

    #[error("Raw value of type {type_code} has {len} bytes, not a whole number of components")]
    MalformedRaw { type_code: u16, len: usize },

    #[error("Unknown tag name: {0}")]
    UnknownTagName(String),

    #[error("{0:?} IFDs cannot be nested as a sub-IFD")]
    InvalidSubIfd(IfdKind),

    /// A value or the whole tree is too big for 32-bit TIFF offsets and counts
    #[error("Encoded TIFF data too large: {0}")]
    TooLarge(String),
}

/// Byte order for reading and writing multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Parse the two-byte marker at the start of a TIFF header
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// "II" (0x4949) = little endian, "MM" (0x4D4D) = big endian
    pub fn marker(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Read a u16 from the first two bytes of `data`; the caller checks the length
    pub fn read_u16(&self, data: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u16(data),
            ByteOrder::BigEndian => BigEndian::read_u16(data),
        }
    }

    /// Read a u32 from the first four bytes of `data`; the caller checks the length
    pub fn read_u32(&self, data: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u32(data),
            ByteOrder::BigEndian => BigEndian::read_u32(data),
        }
    }

    pub fn write_u16(&self, buf: &mut [u8], value: u16) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u16(buf, value),
            ByteOrder::BigEndian => BigEndian::write_u16(buf, value),
        }
    }

    pub fn write_u32(&self, buf: &mut [u8], value: u32) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u32(buf, value),
            ByteOrder::BigEndian => BigEndian::write_u32(buf, value),
        }
    }
}

/// TIFF data types
pub mod types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
    pub const FLOAT: u16 = 11;
    pub const DOUBLE: u16 = 12;
    /// Offset to a sub-IFD (TIFF-EP); treated like LONG for pointer tags
    pub const IFD: u16 = 13;

    /// Size in bytes of one component of the given type
    pub fn component_size(type_code: u16) -> Option<usize> {
        match type_code {
            BYTE | ASCII | SBYTE | UNDEFINED => Some(1),
            SHORT | SSHORT => Some(2),
            LONG | SLONG | FLOAT | IFD => Some(4),
            RATIONAL | SRATIONAL | DOUBLE => Some(8),
            _ => None,
        }
    }
}

/// Value of one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Byte(Vec<u8>),
    /// Raw bytes without the terminating NUL, which is added back on encode
    ///
    /// Not necessarily UTF-8 (Latin-1 is common), so nothing is transcoded.
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// Numerator / denominator pairs
    Rational(Vec<(u32, u32)>),
    Undefined(Vec<u8>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    /// Any other sized type (SBYTE, SSHORT, FLOAT, DOUBLE, IFD, or ASCII without a
    /// terminating NUL), kept verbatim with each component in big-endian order
    Raw { type_code: u16, bytes: Vec<u8> },
}

impl TagValue {
    /// TIFF type code written in the entry
    pub fn type_code(&self) -> u16 {
        match self {
            TagValue::Byte(_) => types::BYTE,
            TagValue::Ascii(_) => types::ASCII,
            TagValue::Short(_) => types::SHORT,
            TagValue::Long(_) => types::LONG,
            TagValue::Rational(_) => types::RATIONAL,
            TagValue::Undefined(_) => types::UNDEFINED,
            TagValue::SLong(_) => types::SLONG,
            TagValue::SRational(_) => types::SRATIONAL,
            TagValue::Raw { type_code, .. } => *type_code,
        }
    }

    /// Component count written in the entry
    pub fn count(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Ascii(s) => s.len() + 1,
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Raw { type_code, bytes } => {
                bytes.len() / types::component_size(*type_code).unwrap_or(1)
            }
        }
    }

    /// First value as an unsigned integer, for SHORT/LONG/BYTE tags
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => v.first().map(|&b| b as u32),
            TagValue::Short(v) => v.first().map(|&s| s as u32),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    /// All values as unsigned integers, for SHORT/LONG tags
    pub fn as_u32s(&self) -> Option<Vec<u32>> {
        match self {
            TagValue::Short(v) => Some(v.iter().map(|&s| s as u32).collect()),
            TagValue::Long(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// ASCII text, if it is valid UTF-8; trailing NUL padding is dropped
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(|s| s.trim_end_matches('\0')),
            _ => None,
        }
    }

    pub(crate) fn encode(&self, order: ByteOrder) -> Result<Vec<u8>, TiffError> {
        let mut out = Vec::with_capacity(self.count() * 8);
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => out.extend_from_slice(v),
            TagValue::Ascii(bytes) => {
                out.extend_from_slice(bytes);
                out.push(0);
            }
            TagValue::Short(v) => {
                for &value in v {
                    push_u16(&mut out, order, value);
                }
            }
            TagValue::Long(v) => {
                for &value in v {
                    push_u32(&mut out, order, value);
                }
            }
            TagValue::Rational(v) => {
                for &(num, den) in v {
                    push_u32(&mut out, order, num);
                    push_u32(&mut out, order, den);
                }
            }
            TagValue::SLong(v) => {
                for &value in v {
                    push_u32(&mut out, order, value as u32);
                }
            }
            TagValue::SRational(v) => {
                for &(num, den) in v {
                    push_u32(&mut out, order, num as u32);
                    push_u32(&mut out, order, den as u32);
                }
            }
            TagValue::Raw { type_code, bytes } => {
                let size = raw_component_size(*type_code, bytes)?;
                out.extend_from_slice(&swap_components(bytes, size, order));
            }
        }
        Ok(out)
    }

    /// Decode `raw` (exactly `count` components) as the given type
    pub(crate) fn decode(type_code: u16, raw: &[u8], order: ByteOrder) -> Option<TagValue> {
        let value = match type_code {
            types::BYTE => TagValue::Byte(raw.to_vec()),
            types::UNDEFINED => TagValue::Undefined(raw.to_vec()),
            types::ASCII => match raw.split_last() {
                Some((0, text)) => TagValue::Ascii(text.to_vec()),
                _ => TagValue::Raw {
                    type_code,
                    bytes: raw.to_vec(),
                },
            },
            types::SHORT => {
                TagValue::Short(raw.chunks_exact(2).map(|c| order.read_u16(c)).collect())
            }
            types::LONG => {
                TagValue::Long(raw.chunks_exact(4).map(|c| order.read_u32(c)).collect())
            }
            types::SLONG => TagValue::SLong(
                raw.chunks_exact(4)
                    .map(|c| order.read_u32(c) as i32)
                    .collect(),
            ),
            types::RATIONAL => TagValue::Rational(
                raw.chunks_exact(8)
                    .map(|c| (order.read_u32(&c[0..4]), order.read_u32(&c[4..8])))
                    .collect(),
            ),
            types::SRATIONAL => TagValue::SRational(
                raw.chunks_exact(8)
                    .map(|c| {
                        (
                            order.read_u32(&c[0..4]) as i32,
                            order.read_u32(&c[4..8]) as i32,
                        )
                    })
                    .collect(),
            ),
            types::SBYTE | types::SSHORT | types::FLOAT | types::DOUBLE | types::IFD => {
                let size = types::component_size(type_code)?;
                TagValue::Raw {
                    type_code,
                    bytes: swap_components(raw, size, order),
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

fn raw_component_size(type_code: u16, bytes: &[u8]) -> Result<usize, TiffError> {
    match types::component_size(type_code) {
        Some(size) if bytes.len() % size == 0 => Ok(size),
        _ => Err(TiffError::MalformedRaw {
            type_code,
            len: bytes.len(),
        }),
    }
}

/// Convert components between big-endian and `order`; the swap is its own inverse
fn swap_components(bytes: &[u8], size: usize, order: ByteOrder) -> Vec<u8> {
    match order {
        ByteOrder::BigEndian => bytes.to_vec(),
        ByteOrder::LittleEndian => bytes
            .chunks(size)
            .flat_map(|component| component.iter().rev().copied())
            .collect(),
    }
}

fn push_u16(out: &mut Vec<u8>, order: ByteOrder, value: u16) {
    let mut buf = [0u8; 2];
    order.write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn push_u32(out: &mut Vec<u8>, order: ByteOrder, value: u32) {
    let mut buf = [0u8; 4];
    order.write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Which directory of the EXIF tree an IFD is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfdKind {
    /// IFD0, the main image
    Root,
    /// EXIF sub-IFD
    Exif,
    /// GPS sub-IFD
    Gps,
    /// Interoperability sub-IFD (hangs off the EXIF IFD)
    Interop,
    /// IFD1 and later links of the next-IFD chain
    Thumbnail,
}

impl IfdKind {
    /// Tag in the parent IFD that points at this sub-IFD
    pub fn pointer_tag(&self) -> Option<u16> {
        match self {
            IfdKind::Exif => Some(tags::EXIF_IFD_POINTER),
            IfdKind::Gps => Some(tags::GPS_IFD_POINTER),
            IfdKind::Interop => Some(tags::INTEROP_IFD_POINTER),
            IfdKind::Root | IfdKind::Thumbnail => None,
        }
    }

    pub fn from_pointer_tag(tag_id: u16) -> Option<Self> {
        match tag_id {
            tags::EXIF_IFD_POINTER => Some(IfdKind::Exif),
            tags::GPS_IFD_POINTER => Some(IfdKind::Gps),
            tags::INTEROP_IFD_POINTER => Some(IfdKind::Interop),
            _ => None,
        }
    }

    /// Kind given to the IFD reached through this one's next-IFD link
    pub(crate) fn next_kind(&self) -> Self {
        match self {
            IfdKind::Root => IfdKind::Thumbnail,
            other => *other,
        }
    }
}

/// One tag in an IFD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag_id: u16,
    pub value: TagValue,
}

impl IfdEntry {
    pub fn new(tag_id: u16, value: TagValue) -> Self {
        Self { tag_id, value }
    }

    /// Standard name of this tag, if known
    pub fn name(&self, kind: IfdKind) -> Option<&'static str> {
        tags::tag_name(self.tag_id, kind)
    }
}

/// Bytes an IFD locates by offset rather than holding in a tag value
///
/// `offset_tag` gives where each segment starts and `length_tag` how long it is,
/// e.g. JPEGInterchangeFormat / JPEGInterchangeFormatLength for the IFD1
/// thumbnail. Segments are relocated on encode and both tags rewritten to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetData {
    pub offset_tag: u16,
    pub length_tag: u16,
    pub segments: Vec<Vec<u8>>,
}

impl OffsetData {
    /// Single-segment thumbnail data for JPEGInterchangeFormat
    pub fn thumbnail(jpeg: Vec<u8>) -> Self {
        Self {
            offset_tag: tags::JPEG_INTERCHANGE_FORMAT,
            length_tag: tags::JPEG_INTERCHANGE_FORMAT_LENGTH,
            segments: vec![jpeg],
        }
    }

    pub(crate) fn as_thumbnail(&self) -> Option<&[u8]> {
        match self.segments.as_slice() {
            [jpeg] if self.offset_tag == tags::JPEG_INTERCHANGE_FORMAT => Some(jpeg),
            _ => None,
        }
    }
}

/// A decoded IFD with its sub-IFDs and next-IFD chain
///
/// Sub-IFD pointer tags are not kept in `entries`; the IFDs they lead to are in
/// `children` instead, and the pointers are regenerated on encode. Offset tags
/// stay in `entries`, with the bytes they point at copied into `offset_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    pub kind: IfdKind,
    /// Offset of this IFD within the TIFF data
    pub offset: u32,
    pub entries: Vec<IfdEntry>,
    pub children: Vec<Ifd>,
    pub next: Option<Box<Ifd>>,
    pub offset_data: Vec<OffsetData>,
}

impl Ifd {
    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }

    /// First value stored under `tag_id`
    pub fn get(&self, tag_id: u16) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|e| e.tag_id == tag_id)
            .map(|e| &e.value)
    }

    /// Look a tag up by its standard name
    pub fn get_named(&self, name: &str) -> Option<&TagValue> {
        tags::tag_id(name).and_then(|id| self.get(id))
    }

    pub fn child(&self, kind: IfdKind) -> Option<&Ifd> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn next(&self) -> Option<&Ifd> {
        self.next.as_deref()
    }

    /// Embedded JPEG thumbnail (normally in IFD1)
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.offset_data.iter().find_map(OffsetData::as_thumbnail)
    }
}
