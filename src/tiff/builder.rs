//! Mutable IFD tree and its encoder

use super::{
    tags, types, ByteOrder, Ifd, IfdEntry, IfdKind, OffsetData, TagValue, TiffError,
    MAX_IFD_TAGS,
};
use std::borrow::Cow;

const ENTRY_SIZE: usize = 12;

/// Builder for an IFD tree
///
/// Entries are encoded in insertion order. Sub-IFDs are attached with
/// [`IfdBuilder::child_mut`] and their pointer tags are generated when encoding,
/// after the regular entries.
///
/// Data located by offset tags (the IFD1 thumbnail, strips, tiles) is carried in
/// [`OffsetData`] blocks and written after the IFD's values, with the offset and
/// length tags rewritten to match. An offset tag whose data is not carried makes
/// [`encode`](Self::encode) fail with [`TiffError::UnresolvedOffset`].
///
/// # Example
///
/// ```
/// use png_structure::tiff::{ByteOrder, IfdBuilder, TagValue};
///
/// # fn main() -> Result<(), png_structure::tiff::TiffError> {
/// let mut ifd = IfdBuilder::root();
/// ifd.add_named("ImageWidth", TagValue::Long(vec![11]))?;
/// ifd.add_named("ImageLength", TagValue::Long(vec![22]))?;
///
/// let bytes = ifd.encode(ByteOrder::BigEndian, 8)?;
/// assert_eq!(&bytes[0..2], &[0x00, 0x02]); // tag count
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdBuilder {
    kind: IfdKind,
    entries: Vec<IfdEntry>,
    children: Vec<IfdBuilder>,
    next: Option<Box<IfdBuilder>>,
    offset_data: Vec<OffsetData>,
}

impl IfdBuilder {
    pub fn new(kind: IfdKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            children: Vec::new(),
            next: None,
            offset_data: Vec::new(),
        }
    }

    /// Empty IFD0
    pub fn root() -> Self {
        Self::new(IfdKind::Root)
    }

    /// Seed a builder from a decoded tree, keeping entry order
    pub fn from_ifd(ifd: &Ifd) -> Self {
        Self {
            kind: ifd.kind,
            entries: ifd.entries.clone(),
            children: ifd.children.iter().map(Self::from_ifd).collect(),
            next: ifd.next.as_deref().map(|n| Box::new(Self::from_ifd(n))),
            offset_data: ifd.offset_data.clone(),
        }
    }

    pub fn kind(&self) -> IfdKind {
        self.kind
    }

    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }

    /// Append a tag, even if one with the same ID exists
    pub fn add(&mut self, tag_id: u16, value: TagValue) -> &mut Self {
        self.entries.push(IfdEntry::new(tag_id, value));
        self
    }

    /// Replace the first tag with this ID, or append it if absent
    pub fn set(&mut self, tag_id: u16, value: TagValue) -> &mut Self {
        match self.entries.iter_mut().find(|e| e.tag_id == tag_id) {
            Some(entry) => entry.value = value,
            None => self.entries.push(IfdEntry::new(tag_id, value)),
        }
        self
    }

    /// [`add`](Self::add) by standard tag name
    pub fn add_named(&mut self, name: &str, value: TagValue) -> Result<&mut Self, TiffError> {
        let tag_id = lookup(name)?;
        Ok(self.add(tag_id, value))
    }

    /// [`set`](Self::set) by standard tag name
    pub fn set_named(&mut self, name: &str, value: TagValue) -> Result<&mut Self, TiffError> {
        let tag_id = lookup(name)?;
        Ok(self.set(tag_id, value))
    }

    pub fn get(&self, tag_id: u16) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|e| e.tag_id == tag_id)
            .map(|e| &e.value)
    }

    /// Remove the first tag with this ID
    pub fn remove(&mut self, tag_id: u16) -> Option<TagValue> {
        let index = self.entries.iter().position(|e| e.tag_id == tag_id)?;
        Some(self.entries.remove(index).value)
    }

    pub fn child(&self, kind: IfdKind) -> Option<&IfdBuilder> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Sub-IFD of the given kind, created empty if missing
    ///
    /// Only EXIF, GPS and interop IFDs can be nested.
    pub fn child_mut(&mut self, kind: IfdKind) -> Result<&mut IfdBuilder, TiffError> {
        if kind.pointer_tag().is_none() {
            return Err(TiffError::InvalidSubIfd(kind));
        }
        let index = match self.children.iter().position(|c| c.kind == kind) {
            Some(index) => index,
            None => {
                self.children.push(IfdBuilder::new(kind));
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[index])
    }

    pub fn next(&self) -> Option<&IfdBuilder> {
        self.next.as_deref()
    }

    /// Link an IFD after this one (e.g. IFD1 after IFD0)
    pub fn set_next(&mut self, next: IfdBuilder) -> &mut Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn offset_data(&self) -> &[OffsetData] {
        &self.offset_data
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.offset_data.iter().find_map(OffsetData::as_thumbnail)
    }

    /// Embed a JPEG thumbnail, replacing any existing one
    ///
    /// JPEGInterchangeFormat and JPEGInterchangeFormatLength are set to
    /// placeholders here and get their real values on encode.
    pub fn set_thumbnail(&mut self, jpeg: Vec<u8>) -> &mut Self {
        self.offset_data.retain(|block| block.offset_tag != tags::JPEG_INTERCHANGE_FORMAT);
        self.offset_data.push(OffsetData::thumbnail(jpeg));
        self.set(tags::JPEG_INTERCHANGE_FORMAT, TagValue::Long(vec![0]))
            .set(tags::JPEG_INTERCHANGE_FORMAT_LENGTH, TagValue::Long(vec![0]))
    }

    /// Drop the thumbnail and both of its tags
    pub fn remove_thumbnail(&mut self) -> Option<Vec<u8>> {
        self.remove(tags::JPEG_INTERCHANGE_FORMAT);
        self.remove(tags::JPEG_INTERCHANGE_FORMAT_LENGTH);
        let index = self
            .offset_data
            .iter()
            .position(|block| block.offset_tag == tags::JPEG_INTERCHANGE_FORMAT)?;
        self.offset_data.remove(index).segments.into_iter().next()
    }

    /// Value to encode for an entry, plus the block it locates if it is an offset tag
    fn resolve<'a>(
        &'a self,
        entry: &'a IfdEntry,
    ) -> Result<(Cow<'a, TagValue>, Option<&'a OffsetData>), TiffError> {
        let tag_id = entry.tag_id;

        if let Some(block) = self.offset_data.iter().find(|b| b.offset_tag == tag_id) {
            // Placeholder offsets, patched once the segments are written
            let offsets = TagValue::Long(vec![0; block.segments.len()]);
            return Ok((Cow::Owned(offsets), Some(block)));
        }

        if tags::length_tag_for(tag_id).is_some()
            || tag_id == tags::SUB_IFDS
            || entry.value.type_code() == types::IFD
        {
            return Err(TiffError::UnresolvedOffset(tag_id));
        }

        let located = self
            .offset_data
            .iter()
            .find(|b| b.length_tag == tag_id && self.get(b.offset_tag).is_some());
        if let Some(block) = located {
            let lengths = block
                .segments
                .iter()
                .map(|segment| u32::try_from(segment.len()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    TiffError::TooLarge(format!("data of tag {:#06x} exceeds 4 GB", tag_id))
                })?;
            return Ok((Cow::Owned(TagValue::Long(lengths)), None));
        }

        Ok((Cow::Borrowed(&entry.value), None))
    }

    /// Encode the tree as IFD bytes meant to sit at `base_offset` in the TIFF data
    ///
    /// The first IFD starts at the beginning of the returned buffer, so its offset
    /// is `base_offset`. The header itself is not written.
    pub fn encode(&self, byte_order: ByteOrder, base_offset: u32) -> Result<Vec<u8>, TiffError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf, byte_order, base_offset)?;
        Ok(buf)
    }

    fn encode_into(
        &self,
        buf: &mut Vec<u8>,
        order: ByteOrder,
        base: u32,
    ) -> Result<u32, TiffError> {
        // IFDs and out-of-line values start on word boundaries
        pad_to_word(buf);

        let ifd_pos = buf.len();
        let ifd_offset = absolute_offset(base, ifd_pos)?;
        let tag_count = self.entries.len() + self.children.len();
        if tag_count > MAX_IFD_TAGS as usize {
            return Err(TiffError::TooManyTags {
                offset: ifd_offset as u64,
                count: tag_count,
                max: MAX_IFD_TAGS,
            });
        }

        let next_pos = ifd_pos + 2 + tag_count * ENTRY_SIZE;
        buf.resize(next_pos + 4, 0);
        order.write_u16(&mut buf[ifd_pos..], tag_count as u16);

        // (block, position of its offset values in buf)
        let mut relocations = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let field = ifd_pos + 2 + i * ENTRY_SIZE;
            let (value, block) = self.resolve(entry)?;
            let count = u32::try_from(value.count()).map_err(|_| {
                TiffError::TooLarge(format!("tag {:#06x} has too many values", entry.tag_id))
            })?;
            write_entry_header(buf, order, field, entry.tag_id, value.type_code(), count);

            let encoded = value.encode(order)?;
            let value_pos = if encoded.len() <= 4 {
                buf[field + 8..field + 8 + encoded.len()].copy_from_slice(&encoded);
                field + 8
            } else {
                pad_to_word(buf);
                let value_pos = buf.len();
                buf.extend_from_slice(&encoded);
                order.write_u32(&mut buf[field + 8..], absolute_offset(base, value_pos)?);
                value_pos
            };
            if let Some(block) = block {
                relocations.push((block, value_pos));
            }
        }

        for (block, value_pos) in relocations {
            for (k, segment) in block.segments.iter().enumerate() {
                pad_to_word(buf);
                let segment_offset = absolute_offset(base, buf.len())?;
                buf.extend_from_slice(segment);
                order.write_u32(&mut buf[value_pos + 4 * k..], segment_offset);
            }
        }

        for (j, child) in self.children.iter().enumerate() {
            let field = ifd_pos + 2 + (self.entries.len() + j) * ENTRY_SIZE;
            let pointer_tag = child
                .kind
                .pointer_tag()
                .ok_or(TiffError::InvalidSubIfd(child.kind))?;
            write_entry_header(buf, order, field, pointer_tag, types::LONG, 1);

            let child_offset = child.encode_into(buf, order, base)?;
            order.write_u32(&mut buf[field + 8..], child_offset);
        }

        if let Some(next) = &self.next {
            let next_offset = next.encode_into(buf, order, base)?;
            order.write_u32(&mut buf[next_pos..], next_offset);
        }

        Ok(ifd_offset)
    }
}

fn lookup(name: &str) -> Result<u16, TiffError> {
    tags::tag_id(name).ok_or_else(|| TiffError::UnknownTagName(name.to_string()))
}

fn pad_to_word(buf: &mut Vec<u8>) {
    if buf.len() % 2 == 1 {
        buf.push(0);
    }
}

fn absolute_offset(base: u32, pos: usize) -> Result<u32, TiffError> {
    u32::try_from(pos)
        .ok()
        .and_then(|pos| base.checked_add(pos))
        .ok_or_else(|| TiffError::TooLarge(format!("offset {} past 4 GB", pos)))
}

fn write_entry_header(
    buf: &mut [u8],
    order: ByteOrder,
    field: usize,
    tag_id: u16,
    type_code: u16,
    count: u32,
) {
    order.write_u16(&mut buf[field..], tag_id);
    order.write_u16(&mut buf[field + 2..], type_code);
    order.write_u32(&mut buf[field + 4..], count);
}
