//! Ordered chunk sequence with lookup, EXIF editing and re-serialization

use crate::{
    chunk::{Chunk, ChunkType},
    chunk_data::ImageHeader,
    containers::png_io::PNG_SIGNATURE,
    error::{Error, Result},
    exif,
    tiff::{Ifd, IfdBuilder},
};
use std::collections::BTreeMap;
use std::io::Write;

/// Chunks grouped by type, in stream order within each group
///
/// Borrowed from the [`ChunkSlice`] it was built from, so it can never outlive a
/// mutation of that slice.
#[derive(Debug, Clone)]
pub struct ChunkIndex<'a> {
    map: BTreeMap<ChunkType, Vec<&'a Chunk>>,
}

impl<'a> ChunkIndex<'a> {
    fn build(chunks: &'a [Chunk]) -> Self {
        let mut map: BTreeMap<ChunkType, Vec<&'a Chunk>> = BTreeMap::new();
        for chunk in chunks {
            map.entry(chunk.chunk_type()).or_default().push(chunk);
        }
        Self { map }
    }

    /// All chunks of the given type (empty if none)
    pub fn get(&self, chunk_type: &ChunkType) -> &[&'a Chunk] {
        self.map.get(chunk_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, chunk_type: &ChunkType) -> usize {
        self.get(chunk_type).len()
    }

    pub fn contains(&self, chunk_type: &ChunkType) -> bool {
        self.map.contains_key(chunk_type)
    }

    /// Number of chunks per type
    pub fn tallies(&self) -> BTreeMap<ChunkType, usize> {
        self.map.iter().map(|(t, c)| (*t, c.len())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkType, &[&'a Chunk])> {
        self.map.iter().map(|(t, c)| (t, c.as_slice()))
    }
}

/// The chunks of one PNG stream, in the order they are written back
///
/// By convention the first chunk is IHDR and the last IEND; this is not enforced,
/// except that adding EXIF needs at least one chunk to insert after.
///
/// # Example
///
/// ```
/// use png_structure::{ChunkSlice, ImageHeader};
/// use png_structure::tiff::TagValue;
///
/// # fn main() -> png_structure::Result<()> {
/// let header = ImageHeader {
///     width: 1,
///     height: 1,
///     bit_depth: 8,
///     color_type: 2,
///     compression_method: 0,
///     filter_method: 0,
///     interlace_method: 0,
/// };
/// let mut png = ChunkSlice::with_header(header)?;
///
/// let mut exif = png.exif_builder()?;
/// exif.set_named("ImageWidth", TagValue::Long(vec![1]))?;
/// png.set_exif(&exif)?;
///
/// let bytes = png.to_bytes()?;
/// assert_eq!(bytes.len() as u64, png.total_len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSlice {
    chunks: Vec<Chunk>,
}

impl ChunkSlice {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// A minimal image skeleton: IHDR followed by IEND
    pub fn with_header(header: ImageHeader) -> Result<Self> {
        let mut end = Chunk::new(ChunkType::IEND, Vec::new())?;
        end.update_crc();
        Ok(Self::new(vec![header.to_chunk()?, end]))
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    /// Insert a chunk at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&mut self, index: usize, chunk: Chunk) {
        self.chunks.insert(index, chunk);
    }

    /// Remove the chunk at `index`, if there is one
    pub fn remove(&mut self, index: usize) -> Option<Chunk> {
        if index < self.chunks.len() {
            Some(self.chunks.remove(index))
        } else {
            None
        }
    }

    /// Group chunks by type, reflecting the current sequence
    pub fn index(&self) -> ChunkIndex<'_> {
        ChunkIndex::build(&self.chunks)
    }

    /// Decoded IHDR, if the first chunk is one
    pub fn image_header(&self) -> Result<Option<ImageHeader>> {
        match self.chunks.first() {
            Some(chunk) if chunk.chunk_type() == ChunkType::IHDR => {
                ImageHeader::decode(chunk).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Chunks whose stored CRC doesn't match their contents
    pub fn corrupt_chunks(&self) -> Vec<&Chunk> {
        self.chunks.iter().filter(|c| !c.check_crc()).collect()
    }

    /// The eXIf chunk, or `None` if the image has no EXIF
    ///
    /// If several are present the first one is returned.
    pub fn find_exif(&self) -> Option<&Chunk> {
        self.exif_position().map(|i| &self.chunks[i])
    }

    /// Decode the EXIF tree from the eXIf chunk
    ///
    /// Fails with [`Error::ExifNotFound`] when there is no eXIf chunk.
    pub fn exif(&self) -> Result<Ifd> {
        let index = self.exif_position().ok_or(Error::ExifNotFound)?;
        exif::decode_payload(self.chunks[index].data()).map_err(|source| Error::Exif {
            operation: "decode",
            index,
            source,
        })
    }

    /// A builder holding the current EXIF tags, or an empty one if there is no EXIF
    pub fn exif_builder(&self) -> Result<IfdBuilder> {
        match self.exif() {
            Ok(ifd) => Ok(IfdBuilder::from_ifd(&ifd)),
            Err(Error::ExifNotFound) => Ok(IfdBuilder::root()),
            Err(e) => Err(e),
        }
    }

    /// Encode `builder` into the eXIf chunk
    ///
    /// An existing eXIf chunk is updated in place. Otherwise a new one is inserted
    /// right after the first chunk (IHDR), ahead of any image data.
    pub fn set_exif(&mut self, builder: &IfdBuilder) -> Result<()> {
        let position = self.exif_position();
        if position.is_none() && self.chunks.is_empty() {
            return Err(Error::MissingHeaderChunk);
        }

        let index = position.unwrap_or(1);
        let payload = exif::encode_payload(builder).map_err(|source| Error::Exif {
            operation: "encode",
            index,
            source,
        })?;

        match position {
            Some(index) => {
                self.chunks[index].set_data(payload)?;
                log::debug!("replaced eXIf chunk at index {}", index);
            }
            None => {
                let mut chunk = Chunk::new(ChunkType::EXIF, payload)?;
                chunk.update_crc();
                self.chunks.insert(index, chunk);
                log::debug!("inserted eXIf chunk at index {}", index);
            }
        }
        Ok(())
    }

    /// Remove the (first) eXIf chunk
    pub fn remove_exif(&mut self) -> Option<Chunk> {
        let index = self.exif_position()?;
        Some(self.chunks.remove(index))
    }

    /// Encoded size: signature plus every chunk with its framing
    pub fn total_len(&self) -> u64 {
        PNG_SIGNATURE.len() as u64 + self.chunks.iter().map(Chunk::encoded_len).sum::<u64>()
    }

    /// Write the signature and every chunk in order
    ///
    /// Stops at the first chunk that fails to serialize or write; nothing is
    /// retried. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        writer.write_all(&PNG_SIGNATURE)?;
        let mut written = PNG_SIGNATURE.len() as u64;
        for chunk in &self.chunks {
            written += chunk.write_to(writer)?;
        }
        Ok(written)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.total_len() as usize);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    fn exif_position(&self) -> Option<usize> {
        let mut positions = self
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.chunk_type() == ChunkType::EXIF)
            .map(|(i, _)| i);

        let first = positions.next()?;
        let extra = positions.count();
        if extra > 0 {
            log::warn!(
                "{} eXIf chunks present, using the one at index {}",
                extra + 1,
                first
            );
        }
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::tiff::{tags, types, TagValue};
    use crate::{ContainerIO, PngIO};

    fn parse(data: &[u8]) -> ChunkSlice {
        PngIO::new().parse_bytes(data).unwrap()
    }

    fn image_width_length(width: u32, length: u32) -> IfdBuilder {
        let mut builder = IfdBuilder::root();
        builder
            .add_named("ImageWidth", TagValue::Long(vec![width]))
            .unwrap()
            .add_named("ImageLength", TagValue::Long(vec![length]))
            .unwrap();
        builder
    }

    #[test]
    fn test_index_tallies() {
        let slice = parse(&sample_png());
        let tallies = slice.index().tallies();

        let expected: BTreeMap<ChunkType, usize> = [
            (ChunkType::IDAT, SAMPLE_IDAT_COUNT),
            (ChunkType::IEND, 1),
            (ChunkType::IHDR, 1),
            (ChunkType::PHYS, 1),
            (ChunkType::TIME, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(tallies, expected);
        assert_eq!(SAMPLE_IDAT_COUNT, 222);
    }

    #[test]
    fn test_index_follows_mutation() {
        let mut slice = parse(&sample_png());
        assert_eq!(slice.index().count(&ChunkType::PHYS), 1);

        slice.remove(1);
        assert_eq!(slice.index().count(&ChunkType::PHYS), 0);
        assert!(!slice.index().contains(&ChunkType::PHYS));
    }

    #[test]
    fn test_find_exif_miss() {
        let slice = parse(&sample_png());
        assert!(slice.find_exif().is_none());

        let err = slice.exif().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_exif_hit() {
        let slice = parse(&exif_png());
        let chunk = slice.find_exif().unwrap();
        assert_eq!(chunk.data(), sample_exif_payload().as_slice());
    }

    #[test]
    fn test_decode_exif() {
        let slice = parse(&exif_png());
        let ifd = slice.exif().unwrap();

        let ids: Vec<u16> = ifd.entries().iter().map(|e| e.tag_id).collect();
        assert_eq!(ids, [0x0100, 0x0101]);
        assert_eq!(ifd.get(0x0100), Some(&TagValue::Long(vec![11])));
        assert_eq!(ifd.get(0x0101), Some(&TagValue::Long(vec![22])));
    }

    #[test]
    fn test_malformed_exif_is_not_not_found() {
        let mut slice = parse(&exif_png());
        let index = slice.exif_position().unwrap();
        slice.chunks[index].set_data(b"junk".to_vec()).unwrap();

        let err = slice.exif().unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(
            err,
            Error::Exif {
                operation: "decode",
                index: 1,
                ..
            }
        ));
        assert!(slice.exif_builder().is_err());
    }

    #[test]
    fn test_set_exif_existing() {
        let mut slice = parse(&exif_png());
        let position = slice.exif_position();

        slice.set_exif(&image_width_length(33, 44)).unwrap();
        assert_eq!(slice.exif_position(), position);

        let reparsed = parse(&slice.to_bytes().unwrap());
        let chunk = reparsed.find_exif().unwrap();
        assert_eq!(chunk.length() as usize, chunk.data().len());
        assert!(chunk.check_crc());

        let ifd = reparsed.exif().unwrap();
        let ids: Vec<u16> = ifd.entries().iter().map(|e| e.tag_id).collect();
        assert_eq!(ids, [0x0100, 0x0101]);
        assert_eq!(ifd.get(0x0100), Some(&TagValue::Long(vec![33])));
        assert_eq!(ifd.get(0x0101), Some(&TagValue::Long(vec![44])));
    }

    #[test]
    fn test_set_exif_inserts_after_header() {
        let mut slice = parse(&sample_png());
        slice.set_exif(&image_width_length(11, 22)).unwrap();

        let types: Vec<ChunkType> = slice.chunks().iter().map(Chunk::chunk_type).collect();
        assert_eq!(types[0], ChunkType::IHDR);
        assert_eq!(types[1], ChunkType::EXIF);
        assert_eq!(types[2], ChunkType::PHYS);
        assert!(slice.chunks()[1].check_crc());
    }

    #[test]
    fn test_set_exif_on_new_image() {
        let mut slice = ChunkSlice::with_header(ImageHeader {
            width: 1,
            height: 1,
            bit_depth: 8,
            color_type: 2,
            compression_method: 0,
            filter_method: 0,
            interlace_method: 0,
        })
        .unwrap();
        slice.set_exif(&image_width_length(11, 22)).unwrap();

        let chunk = slice.find_exif().unwrap();
        let bytes = chunk.to_bytes().unwrap();
        assert_eq!(chunk.length() as usize, bytes.len() - 12);

        // Decoding the raw chunk bytes past length + type gives back the two tags
        let payload = &bytes[8..bytes.len() - 4];
        let ifd = crate::exif::decode_payload(payload).unwrap();
        let ids: Vec<u16> = ifd.entries().iter().map(|e| e.tag_id).collect();
        assert_eq!(ids, [0x0100, 0x0101]);
        assert_eq!(slice.chunks().last().unwrap().chunk_type(), ChunkType::IEND);
    }

    #[test]
    fn test_set_exif_empty_slice() {
        let mut slice = ChunkSlice::default();
        let err = slice.set_exif(&image_width_length(11, 22)).unwrap_err();
        assert!(matches!(err, Error::MissingHeaderChunk));
        assert!(slice.is_empty());
    }

    #[test]
    fn test_exif_builder_edits() {
        let mut slice = parse(&exif_png());

        let mut builder = slice.exif_builder().unwrap();
        builder
            .set_named("ImageLength", TagValue::Long(vec![44]))
            .unwrap()
            .add_named("BitsPerSample", TagValue::Short(vec![33]))
            .unwrap();
        slice.set_exif(&builder).unwrap();

        let reparsed = parse(&slice.to_bytes().unwrap());
        let ifd = reparsed.exif().unwrap();
        let entries = ifd.entries();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].tag_id, 0x0100);
        assert_eq!(entries[0].value, TagValue::Long(vec![11]));
        assert_eq!(entries[1].tag_id, 0x0101);
        assert_eq!(entries[1].value, TagValue::Long(vec![44]));
        assert_eq!(entries[2].tag_id, 0x0102);
        assert_eq!(entries[2].value, TagValue::Short(vec![33]));
    }

    #[test]
    fn test_exif_edit_keeps_thumbnail() {
        let jpeg = [0xff, 0xd8, 0xff, 0xd9];
        let mut payload = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        payload.extend_from_slice(&[0x00, 0x01]);
        payload.extend_from_slice(&[0x01, 0x00, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 11]);
        payload.extend_from_slice(&[0, 0, 0, 26]); // IFD1
        payload.extend_from_slice(&[0x00, 0x02]);
        payload.extend_from_slice(&[0x02, 0x01, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 56]);
        payload.extend_from_slice(&[0x02, 0x02, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 4]);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        payload.extend_from_slice(&jpeg);

        let mut slice = parse(&png_with_exif(&payload));
        let mut builder = slice.exif_builder().unwrap();
        builder.set_named("ImageLength", TagValue::Long(vec![22])).unwrap();
        slice.set_exif(&builder).unwrap();

        let reparsed = parse(&slice.to_bytes().unwrap());
        let ifd = reparsed.exif().unwrap();
        let ifd1 = ifd.next().expect("IFD1 kept");
        assert_eq!(ifd1.thumbnail(), Some(&jpeg[..]));

        // The offset tag points at the thumbnail bytes inside the new payload
        let data = reparsed.find_exif().unwrap().data();
        let offset = ifd1
            .get(tags::JPEG_INTERCHANGE_FORMAT)
            .and_then(TagValue::as_u32)
            .unwrap() as usize;
        assert_eq!(data.get(offset..offset + jpeg.len()), Some(&jpeg[..]));
        assert_eq!(
            ifd1.get(tags::JPEG_INTERCHANGE_FORMAT_LENGTH).and_then(TagValue::as_u32),
            Some(4)
        );
    }

    #[test]
    fn test_exif_edit_keeps_non_utf8_text() {
        // Make = "Caf\xe9" in Latin-1, stored out of line at 26
        let mut payload = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        payload.extend_from_slice(&[0x00, 0x01]);
        payload.extend_from_slice(&[0x01, 0x0f, 0x00, 0x02, 0, 0, 0, 5, 0, 0, 0, 26]);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        payload.extend_from_slice(&[0x43, 0x61, 0x66, 0xe9, 0x00]);

        let mut slice = parse(&png_with_exif(&payload));
        let mut builder = slice.exif_builder().unwrap();
        builder.set_named("ImageWidth", TagValue::Long(vec![11])).unwrap();
        slice.set_exif(&builder).unwrap();

        let reparsed = parse(&slice.to_bytes().unwrap());
        let ifd = reparsed.exif().unwrap();
        assert_eq!(
            ifd.get(tags::MAKE),
            Some(&TagValue::Ascii(vec![0x43, 0x61, 0x66, 0xe9]))
        );
        let data = reparsed.find_exif().unwrap().data();
        assert!(data.windows(5).any(|w| w == [0x43, 0x61, 0x66, 0xe9, 0x00]));
    }

    #[test]
    fn test_exif_edit_keeps_signed_values() {
        // ImageWidth LONG 7, ExposureBiasValue SSHORT -1
        let mut payload = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        payload.extend_from_slice(&[0x00, 0x02]);
        payload.extend_from_slice(&[0x01, 0x00, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 7]);
        payload.extend_from_slice(&[0x92, 0x04, 0x00, 0x08, 0, 0, 0, 1, 0xff, 0xff, 0, 0]);
        payload.extend_from_slice(&[0, 0, 0, 0]);

        let mut slice = parse(&png_with_exif(&payload));
        assert_eq!(slice.exif().unwrap().entries().len(), 2);

        let mut builder = slice.exif_builder().unwrap();
        builder.set_named("ImageWidth", TagValue::Long(vec![8])).unwrap();
        slice.set_exif(&builder).unwrap();

        let ifd = parse(&slice.to_bytes().unwrap()).exif().unwrap();
        assert_eq!(ifd.entries().len(), 2);
        assert_eq!(ifd.get(tags::IMAGE_WIDTH), Some(&TagValue::Long(vec![8])));
        assert_eq!(
            ifd.get(0x9204),
            Some(&TagValue::Raw {
                type_code: types::SSHORT,
                bytes: vec![0xff, 0xff],
            })
        );
    }

    #[test]
    fn test_exif_builder_without_exif_is_empty() {
        let slice = parse(&sample_png());
        let builder = slice.exif_builder().unwrap();
        assert!(builder.entries().is_empty());
        assert_eq!(slice, parse(&sample_png()));
    }

    #[test]
    fn test_duplicate_exif_first_wins() {
        let mut slice = parse(&exif_png());
        let mut second = Chunk::new(ChunkType::EXIF, b"second".to_vec()).unwrap();
        second.update_crc();
        let len = slice.len();
        slice.insert(len - 1, second.clone());

        slice.set_exif(&image_width_length(5, 6)).unwrap();
        assert_eq!(slice.index().count(&ChunkType::EXIF), 2);
        assert_eq!(slice.exif().unwrap().get(0x0100), Some(&TagValue::Long(vec![5])));
        assert_eq!(slice.chunks()[len - 1], second);
    }

    #[test]
    fn test_remove_exif() {
        let mut slice = parse(&exif_png());
        let removed = slice.remove_exif().unwrap();
        assert_eq!(removed.chunk_type(), ChunkType::EXIF);
        assert!(slice.find_exif().is_none());
        assert!(slice.remove_exif().is_none());
    }

    #[test]
    fn test_write_round_trip() {
        let original = sample_png();
        let slice = parse(&original);

        let mut out = Vec::new();
        let written = slice.write_to(&mut out).unwrap();
        assert_eq!(out, original);
        assert_eq!(written, original.len() as u64);
        assert_eq!(slice.total_len(), original.len() as u64);
    }

    #[test]
    fn test_write_known_chunks() {
        let chunk_data = [
            0x00, 0x00, 0x00, 0x0d, // IHDR
            0x49, 0x48, 0x44, 0x52, //
            0x00, 0x00, 0x05, 0xc0, 0x00, 0x00, 0x02, 0x56, 0x08, 0x02, 0x00, 0x00, 0x00,
            0xf0, 0x49, 0xb3, 0x65, //
            0x00, 0x00, 0x00, 0x09, // pHYs
            0x70, 0x48, 0x59, 0x73, //
            0x00, 0x00, 0x0b, 0x13, 0x00, 0x00, 0x0b, 0x13, 0x01, //
            0x00, 0x9a, 0x9c, 0x18,
        ];
        let mut original = PNG_SIGNATURE.to_vec();
        original.extend_from_slice(&chunk_data);

        let slice = parse(&original);
        assert_eq!(slice.len(), 2);
        assert!(slice.corrupt_chunks().is_empty());
        assert_eq!(slice.image_header().unwrap().unwrap().width, 1472);
        assert_eq!(slice.to_bytes().unwrap(), original);
    }

    #[test]
    fn test_corrupt_chunks_reported() {
        let mut data = minimal_png();
        // Flip a byte of IHDR data
        data[16] ^= 0x01;

        let slice = parse(&data);
        let corrupt = slice.corrupt_chunks();
        assert_eq!(corrupt.len(), 1);
        assert_eq!(corrupt[0].chunk_type(), ChunkType::IHDR);

        // Bytes still round-trip exactly, stale CRC included
        assert_eq!(slice.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_write_stops_on_bad_chunk() {
        let mut slice = parse(&minimal_png());
        slice.insert(1, Chunk::from_parts(0, 10, ChunkType::TEXT, vec![0; 2], None));

        let mut out = Vec::new();
        let err = slice.write_to(&mut out).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
        // Signature and IHDR were written, nothing of the bad chunk
        assert_eq!(out.len(), 8 + 25);
    }
}
