//! IFD tree decoding

use super::{
    tags, types, ByteOrder, Ifd, IfdEntry, IfdKind, OffsetData, TagValue, TiffError, MAX_IFDS,
    MAX_IFD_TAGS,
};
use std::collections::HashSet;

/// Size of one IFD entry: tag (2) + type (2) + count (4) + value/offset (4)
const ENTRY_SIZE: usize = 12;

/// Decode the IFD tree rooted at `ifd_offset`
///
/// `data` is the complete TIFF data, header included, since every offset inside it
/// is relative to its start. Sub-IFDs reached through the EXIF, GPS and interop
/// pointer tags become `children`; the next-IFD link becomes `next`. Data located
/// by offset/length tag pairs (thumbnail, strips, tiles) is copied into
/// `offset_data`. A pair that cannot be resolved is logged and left out.
pub fn decode(data: &[u8], byte_order: ByteOrder, ifd_offset: u32) -> Result<Ifd, TiffError> {
    let mut decoder = Decoder {
        data,
        order: byte_order,
        visited: HashSet::new(),
    };
    decoder.decode_ifd(ifd_offset, IfdKind::Root)
}

struct Decoder<'a> {
    data: &'a [u8],
    order: ByteOrder,
    visited: HashSet<u32>,
}

impl<'a> Decoder<'a> {
    fn decode_ifd(&mut self, offset: u32, kind: IfdKind) -> Result<Ifd, TiffError> {
        if !self.visited.insert(offset) {
            return Err(TiffError::IfdLoop(offset));
        }
        if self.visited.len() > MAX_IFDS {
            return Err(TiffError::TooManyIfds(MAX_IFDS));
        }

        let start = offset as usize;
        let tag_count = self.order.read_u16(self.slice(start, 2, "IFD tag count")?) as usize;

        // Validate tag count to prevent DOS attacks
        if tag_count > MAX_IFD_TAGS as usize {
            return Err(TiffError::TooManyTags {
                offset: offset as u64,
                count: tag_count,
                max: MAX_IFD_TAGS,
            });
        }

        let entries_start = start + 2;
        let table = self.slice(entries_start, tag_count * ENTRY_SIZE + 4, "IFD entries")?;

        let mut entries = Vec::with_capacity(tag_count);
        let mut pointers = Vec::new();

        for raw in table[..tag_count * ENTRY_SIZE].chunks_exact(ENTRY_SIZE) {
            let tag_id = self.order.read_u16(&raw[0..2]);
            let tag_type = self.order.read_u16(&raw[2..4]);
            let count = self.order.read_u32(&raw[4..8]);
            let value_field = &raw[8..12];

            if let Some(child_kind) = IfdKind::from_pointer_tag(tag_id) {
                if tag_type == types::LONG || tag_type == types::IFD {
                    pointers.push((child_kind, self.order.read_u32(value_field)));
                    continue;
                }
            }

            let Some(component_size) = types::component_size(tag_type) else {
                log::debug!(
                    "skipping tag {:#06x} in {:?} IFD: unsupported type {}",
                    tag_id,
                    kind,
                    tag_type
                );
                continue;
            };

            let size = component_size as u64 * count as u64;
            let raw_value = if size <= 4 {
                &value_field[..size as usize]
            } else {
                let value_offset = self.order.read_u32(value_field) as usize;
                if size > self.data.len() as u64 {
                    return Err(self.out_of_bounds("tag value", value_offset, size));
                }
                self.slice(value_offset, size as usize, "tag value")?
            };

            if let Some(value) = TagValue::decode(tag_type, raw_value, self.order) {
                entries.push(IfdEntry::new(tag_id, value));
            }
        }

        let next_offset = self.order.read_u32(&table[tag_count * ENTRY_SIZE..]);
        let offset_data = self.read_offset_data(&entries, kind);

        let mut children = Vec::with_capacity(pointers.len());
        for (child_kind, child_offset) in pointers {
            children.push(self.decode_ifd(child_offset, child_kind)?);
        }

        let next = if next_offset != 0 {
            Some(Box::new(self.decode_ifd(next_offset, kind.next_kind())?))
        } else {
            None
        };

        log::trace!(
            "{:?} IFD at {}: {} tags, {} sub-IFDs",
            kind,
            offset,
            entries.len(),
            children.len()
        );

        Ok(Ifd {
            kind,
            offset,
            entries,
            children,
            next,
            offset_data,
        })
    }

    fn read_offset_data(&self, entries: &[IfdEntry], kind: IfdKind) -> Vec<OffsetData> {
        let lookup = |tag_id: u16| {
            entries
                .iter()
                .find(|e| e.tag_id == tag_id)
                .and_then(|e| e.value.as_u32s())
        };

        let mut blocks = Vec::new();
        for &(offset_tag, length_tag) in tags::OFFSET_LENGTH_PAIRS {
            let (Some(offsets), Some(lengths)) = (lookup(offset_tag), lookup(length_tag)) else {
                continue;
            };
            match self.read_segments(&offsets, &lengths) {
                Ok(segments) => blocks.push(OffsetData {
                    offset_tag,
                    length_tag,
                    segments,
                }),
                Err(err) => log::warn!(
                    "dropping data of tag {:#06x} in {:?} IFD: {}",
                    offset_tag,
                    kind,
                    err
                ),
            }
        }
        blocks
    }

    fn read_segments(&self, offsets: &[u32], lengths: &[u32]) -> Result<Vec<Vec<u8>>, TiffError> {
        if offsets.len() != lengths.len() {
            return Err(TiffError::MismatchedOffsets {
                offsets: offsets.len(),
                lengths: lengths.len(),
            });
        }

        let total: u64 = lengths.iter().map(|&l| l as u64).sum();
        if total > self.data.len() as u64 {
            return Err(self.out_of_bounds("offset data", 0, total));
        }

        offsets
            .iter()
            .zip(lengths)
            .map(|(&offset, &length)| {
                self.slice(offset as usize, length as usize, "offset data")
                    .map(<[u8]>::to_vec)
            })
            .collect()
    }

    fn slice(&self, offset: usize, size: usize, what: &'static str) -> Result<&'a [u8], TiffError> {
        let end = offset
            .checked_add(size)
            .ok_or_else(|| self.out_of_bounds(what, offset, size as u64))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| self.out_of_bounds(what, offset, size as u64))
    }

    fn out_of_bounds(&self, what: &'static str, offset: usize, size: u64) -> TiffError {
        TiffError::OutOfBounds {
            what,
            offset: offset as u64,
            size,
            len: self.data.len(),
        }
    }
}
