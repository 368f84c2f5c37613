//! TIFF/EXIF tag IDs and standard names

use super::IfdKind;

// IFD0 (main image) tags
pub const IMAGE_WIDTH: u16 = 0x0100;
pub const IMAGE_LENGTH: u16 = 0x0101;
pub const BITS_PER_SAMPLE: u16 = 0x0102;
pub const MAKE: u16 = 0x010F;
pub const MODEL: u16 = 0x0110;
pub const STRIP_OFFSETS: u16 = 0x0111;
pub const ORIENTATION: u16 = 0x0112;
pub const STRIP_BYTE_COUNTS: u16 = 0x0117;
pub const TILE_OFFSETS: u16 = 0x0144;
pub const TILE_BYTE_COUNTS: u16 = 0x0145;
pub const SUB_IFDS: u16 = 0x014A;
pub const SOFTWARE: u16 = 0x0131;
pub const DATE_TIME: u16 = 0x0132;
pub const ARTIST: u16 = 0x013B;
pub const COPYRIGHT: u16 = 0x8298;

// Sub-IFD pointers
pub const EXIF_IFD_POINTER: u16 = 0x8769;
pub const GPS_IFD_POINTER: u16 = 0x8825;
pub const INTEROP_IFD_POINTER: u16 = 0xA005;

// EXIF sub-IFD tags
pub const EXPOSURE_TIME: u16 = 0x829A;
pub const F_NUMBER: u16 = 0x829D;
pub const ISO_SPEED: u16 = 0x8827;
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const FOCAL_LENGTH: u16 = 0x920A;

// IFD1 (thumbnail) tags
pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

/// (offset tag, length tag) pairs that locate data outside the IFD
pub const OFFSET_LENGTH_PAIRS: &[(u16, u16)] = &[
    (JPEG_INTERCHANGE_FORMAT, JPEG_INTERCHANGE_FORMAT_LENGTH),
    (STRIP_OFFSETS, STRIP_BYTE_COUNTS),
    (TILE_OFFSETS, TILE_BYTE_COUNTS),
];

/// Length tag paired with an offset tag
pub fn length_tag_for(offset_tag: u16) -> Option<u16> {
    OFFSET_LENGTH_PAIRS
        .iter()
        .find(|&&(offset, _)| offset == offset_tag)
        .map(|&(_, length)| length)
}

/// (name, tag ID, IFD the tag normally lives in)
const STANDARD_TAGS: &[(&str, u16, IfdKind)] = &[
    ("ImageWidth", IMAGE_WIDTH, IfdKind::Root),
    ("ImageLength", IMAGE_LENGTH, IfdKind::Root),
    ("BitsPerSample", BITS_PER_SAMPLE, IfdKind::Root),
    ("Compression", 0x0103, IfdKind::Root),
    ("PhotometricInterpretation", 0x0106, IfdKind::Root),
    ("ImageDescription", 0x010E, IfdKind::Root),
    ("Make", MAKE, IfdKind::Root),
    ("Model", MODEL, IfdKind::Root),
    ("StripOffsets", STRIP_OFFSETS, IfdKind::Root),
    ("Orientation", ORIENTATION, IfdKind::Root),
    ("SamplesPerPixel", 0x0115, IfdKind::Root),
    ("RowsPerStrip", 0x0116, IfdKind::Root),
    ("StripByteCounts", STRIP_BYTE_COUNTS, IfdKind::Root),
    ("XResolution", 0x011A, IfdKind::Root),
    ("YResolution", 0x011B, IfdKind::Root),
    ("PlanarConfiguration", 0x011C, IfdKind::Root),
    ("ResolutionUnit", 0x0128, IfdKind::Root),
    ("TileOffsets", TILE_OFFSETS, IfdKind::Root),
    ("TileByteCounts", TILE_BYTE_COUNTS, IfdKind::Root),
    ("SubIFDs", SUB_IFDS, IfdKind::Root),
    ("Software", SOFTWARE, IfdKind::Root),
    ("DateTime", DATE_TIME, IfdKind::Root),
    ("Artist", ARTIST, IfdKind::Root),
    ("JPEGInterchangeFormat", JPEG_INTERCHANGE_FORMAT, IfdKind::Thumbnail),
    ("JPEGInterchangeFormatLength", JPEG_INTERCHANGE_FORMAT_LENGTH, IfdKind::Thumbnail),
    ("YCbCrPositioning", 0x0213, IfdKind::Root),
    ("Copyright", COPYRIGHT, IfdKind::Root),
    ("ExifTag", EXIF_IFD_POINTER, IfdKind::Root),
    ("GPSTag", GPS_IFD_POINTER, IfdKind::Root),
    ("ExposureTime", EXPOSURE_TIME, IfdKind::Exif),
    ("FNumber", F_NUMBER, IfdKind::Exif),
    ("ExposureProgram", 0x8822, IfdKind::Exif),
    ("ISOSpeedRatings", ISO_SPEED, IfdKind::Exif),
    ("ExifVersion", 0x9000, IfdKind::Exif),
    ("DateTimeOriginal", DATE_TIME_ORIGINAL, IfdKind::Exif),
    ("DateTimeDigitized", 0x9004, IfdKind::Exif),
    ("ShutterSpeedValue", 0x9201, IfdKind::Exif),
    ("ApertureValue", 0x9202, IfdKind::Exif),
    ("Flash", 0x9209, IfdKind::Exif),
    ("FocalLength", FOCAL_LENGTH, IfdKind::Exif),
    ("MakerNote", 0x927C, IfdKind::Exif),
    ("UserComment", 0x9286, IfdKind::Exif),
    ("ColorSpace", 0xA001, IfdKind::Exif),
    ("PixelXDimension", 0xA002, IfdKind::Exif),
    ("PixelYDimension", 0xA003, IfdKind::Exif),
    ("InteroperabilityTag", INTEROP_IFD_POINTER, IfdKind::Exif),
    ("InteroperabilityIndex", 0x0001, IfdKind::Interop),
    ("GPSVersionID", 0x0000, IfdKind::Gps),
    ("GPSLatitudeRef", 0x0001, IfdKind::Gps),
    ("GPSLatitude", 0x0002, IfdKind::Gps),
    ("GPSLongitudeRef", 0x0003, IfdKind::Gps),
    ("GPSLongitude", 0x0004, IfdKind::Gps),
    ("GPSAltitudeRef", 0x0005, IfdKind::Gps),
    ("GPSAltitude", 0x0006, IfdKind::Gps),
    ("GPSTimeStamp", 0x0007, IfdKind::Gps),
];

/// Tag ID for a standard tag name (e.g. "ImageWidth" -> 0x0100)
pub fn tag_id(name: &str) -> Option<u16> {
    STANDARD_TAGS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, id, _)| id)
}

/// Standard name of a tag as it appears in an IFD of the given kind
///
/// GPS and interoperability tags reuse low IDs, so the IFD kind is needed to
/// disambiguate. IFD1 carries the same tags as IFD0.
pub fn tag_name(tag_id: u16, kind: IfdKind) -> Option<&'static str> {
    let lookup_kind = match kind {
        IfdKind::Gps | IfdKind::Interop => kind,
        _ => IfdKind::Root,
    };
    STANDARD_TAGS
        .iter()
        .find(|&&(_, id, k)| {
            id == tag_id
                && match lookup_kind {
                    IfdKind::Gps | IfdKind::Interop => k == lookup_kind,
                    _ => !matches!(k, IfdKind::Gps | IfdKind::Interop),
                }
        })
        .map(|&(name, _, _)| name)
}
