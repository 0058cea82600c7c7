// SPDX-License-Identifier: MIT

//! A minimal streaming decoder for HID report descriptor short items. This
//! module handles splitting a report descriptor byte stream into its
//! individual items. Interpretation of the resulting [Item]s is left to
//! the caller.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! # Itemizing HID Report Descriptors
//!
//! Entry point is [items()], a lazy iterator that yields one [Item] per
//! short item and stops at the end of the buffer:
//!
//! ```
//! # use padscreen::item::*;
//! # fn scan(bytes: &[u8]) -> Result<(), DecodeError> {
//! for item in items(bytes) {
//!     let item = item?;
//!     if item.tag() == ItemTag::Collection {
//!         println!("Collection at offset {:02x}", item.offset());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Long items (Section 6.2.2.3) are not supported, the decoder treats every
//! header byte as a short item header.
//!
//! # Building HID Report Descriptors
//!
//! The [DescriptorBuilder] emits short items, mostly to build descriptors
//! for tests:
//!
//! ```
//! # use padscreen::item::*;
//! # use padscreen::types::*;
//! let rdesc: Vec<u8> = DescriptorBuilder::new()
//!     .usage_page(UsagePage(0x0d))
//!     .usage(UsageId(0x05))
//!     .open_collection(CollectionKind::Application)
//!     .close_collection()
//!     .build();
//! assert_eq!(rdesc, [0x05, 0x0d, 0x09, 0x05, 0xa1, 0x01, 0xc0]);
//! ```
//!
//! Note that the [DescriptorBuilder] does **not** validate the items.

use crate::ensure;
use crate::types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Item at offset {offset} needs {needed} bytes but only {available} remain")]
    TruncatedItem {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

type Result<T> = std::result::Result<T, DecodeError>;

/// Mask for the tag and type bits of a short item header byte, Section 6.2.2.2.
const TAG_MASK: u8 = 0b11111100;

/// Mask for the size code of a short item header byte.
const SIZE_MASK: u8 = 0b00000011;

/// The number of data bytes following a short item header. The size code
/// `3` means four bytes.
fn data_len(header: u8) -> usize {
    match header & SIZE_MASK {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    }
}

/// The tag of a short item, i.e. the header byte without the size code.
/// Only the tags needed to find collections, usages and the report
/// configuration are named, everything else is [ItemTag::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTag {
    Input,
    Output,
    Feature,
    Collection,
    EndCollection,
    UsagePage,
    ReportSize,
    ReportId,
    ReportCount,
    Usage,
    /// Any other tag, the value is the header byte masked with `0xFC`.
    Other(u8),
}

impl ItemTag {
    /// The header byte of this tag with a size code of zero.
    pub fn prefix(&self) -> u8 {
        match self {
            ItemTag::Input => 0b10000000,
            ItemTag::Output => 0b10010000,
            ItemTag::Feature => 0b10110000,
            ItemTag::Collection => 0b10100000,
            ItemTag::EndCollection => 0b11000000,
            ItemTag::UsagePage => 0b00000100,
            ItemTag::ReportSize => 0b01110100,
            ItemTag::ReportId => 0b10000100,
            ItemTag::ReportCount => 0b10010100,
            ItemTag::Usage => 0b00001000,
            ItemTag::Other(prefix) => *prefix & TAG_MASK,
        }
    }
}

impl From<u8> for ItemTag {
    fn from(header: u8) -> ItemTag {
        match header & TAG_MASK {
            0b10000000 => ItemTag::Input,
            0b10010000 => ItemTag::Output,
            0b10110000 => ItemTag::Feature,
            0b10100000 => ItemTag::Collection,
            0b11000000 => ItemTag::EndCollection,
            0b00000100 => ItemTag::UsagePage,
            0b01110100 => ItemTag::ReportSize,
            0b10000100 => ItemTag::ReportId,
            0b10010100 => ItemTag::ReportCount,
            0b00001000 => ItemTag::Usage,
            other => ItemTag::Other(other),
        }
    }
}

/// A single short item borrowed from a report descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item<'a> {
    offset: usize,
    header: u8,
    data: &'a [u8],
}

impl<'a> Item<'a> {
    /// The offset of this item's header byte in the report descriptor.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The offset of the first data byte. For items without data this is
    /// the offset of the next item.
    pub fn data_offset(&self) -> usize {
        self.offset + 1
    }

    /// The length of this item in bytes, inclusive of the header byte.
    pub fn size(&self) -> usize {
        self.data.len() + 1
    }

    /// The header byte, comprising tag, type and size code.
    pub fn header(&self) -> u8 {
        self.header
    }

    pub fn tag(&self) -> ItemTag {
        ItemTag::from(self.header)
    }

    /// The data bytes, 0, 1, 2 or 4 of them.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The data bytes as little endian unsigned value. Items without
    /// data have the value zero (Section 6.2.2.4).
    pub fn value(&self) -> u32 {
        match *self.data {
            [] => 0,
            [b0] => b0 as u32,
            [b0, b1] => u16::from_le_bytes([b0, b1]) as u32,
            [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
            // data_len() never yields three bytes
            _ => 0,
        }
    }

    /// Value of a Usage Page item. Usage pages are 16 bits, anything
    /// above is discarded.
    pub fn usage_page(&self) -> UsagePage {
        UsagePage((self.value() & 0xffff) as u16)
    }

    /// Value of a Usage item without its (optional) Usage Page half.
    pub fn usage_id(&self) -> UsageId {
        UsageId((self.value() & 0xffff) as u16)
    }

    /// True if this is a Usage item that carries its own Usage Page in
    /// the upper 16 bits (Section 6.2.2.8). This crate does not interpret
    /// those.
    pub fn is_extended_usage(&self) -> bool {
        self.tag() == ItemTag::Usage && self.data.len() == 4
    }

    pub fn report_id(&self) -> ReportId {
        ReportId((self.value() & 0xff) as u8)
    }

    pub fn report_size(&self) -> ReportSize {
        ReportSize(self.value())
    }

    pub fn report_count(&self) -> ReportCount {
        ReportCount(self.value())
    }
}

/// Lazy iterator over the short items of a report descriptor, see [items()].
///
/// The iterator yields at most one [DecodeError] and stops afterwards;
/// it never reads past the end of the buffer.
#[derive(Debug, Clone)]
pub struct Items<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Items<'a> {
    fn next_item(&mut self) -> Result<Item<'a>> {
        let offset = self.offset;
        let remaining = &self.bytes[offset..];
        let header = remaining[0];
        let needed = 1 + data_len(header);
        ensure!(
            remaining.len() >= needed,
            DecodeError::TruncatedItem {
                offset,
                needed,
                available: remaining.len(),
            }
        );
        self.offset += needed;
        Ok(Item {
            offset,
            header,
            data: &remaining[1..needed],
        })
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Item<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        let item = self.next_item();
        self.failed = item.is_err();
        Some(item)
    }
}

impl std::iter::FusedIterator for Items<'_> {}

/// Split the HID Report Descriptor represented by bytes into its
/// items, one at a time.
pub fn items(bytes: &[u8]) -> Items<'_> {
    Items {
        bytes,
        offset: 0,
        failed: false,
    }
}

/// The data bytes of a HID item, guaranteed to be of length 1, 2, or 4
/// bytes depending on the input and in LE byte order.
///
/// This struct only exists for conversion from numbers to
/// a hid-compatible byte array.
struct HidBytes(Vec<u8>);

impl HidBytes {
    fn take(self) -> Vec<u8> {
        self.0
    }

    /// The size code for the header byte.
    fn size_code(&self) -> u8 {
        match self.0.len() {
            1 => 0b01,
            2 => 0b10,
            _ => 0b11,
        }
    }
}

impl From<u32> for HidBytes {
    fn from(value: u32) -> HidBytes {
        let bytes = value.to_le_bytes();
        let cutoff = match value {
            0..=255 => 1,
            256..=0xffff => 2,
            _ => 4,
        };
        HidBytes(bytes[0..cutoff].to_vec())
    }
}

/// The type of a Collection item, Section 6.2.2.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Physical,
    Application,
    Logical,
    Report,
}

impl From<CollectionKind> for u8 {
    fn from(c: CollectionKind) -> u8 {
        match c {
            CollectionKind::Physical => 0x00,
            CollectionKind::Application => 0x01,
            CollectionKind::Logical => 0x02,
            CollectionKind::Report => 0x03,
        }
    }
}

/// Data, Variable, Absolute: the usual flags for an Input or Feature item.
pub const DATA_VAR_ABS: u8 = 0x02;

/// Constant, Variable, Absolute: padding.
pub const CNST_VAR_ABS: u8 = 0x03;

/// Builds a report descriptor from short items. Values are encoded in
/// the smallest of 1, 2 or 4 bytes.
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    bytes: Vec<u8>,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item with the given tag and value.
    pub fn item(mut self, tag: ItemTag, value: u32) -> Self {
        let data = HidBytes::from(value);
        self.bytes.push(tag.prefix() | data.size_code());
        self.bytes.append(&mut data.take());
        self
    }

    /// Append an item with the given tag and no data bytes.
    pub fn empty_item(mut self, tag: ItemTag) -> Self {
        self.bytes.push(tag.prefix());
        self
    }

    /// Append raw bytes, e.g. items this builder has no method for.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn usage_page(self, usage_page: UsagePage) -> Self {
        self.item(ItemTag::UsagePage, u16::from(usage_page) as u32)
    }

    pub fn usage(self, usage_id: UsageId) -> Self {
        self.item(ItemTag::Usage, u16::from(usage_id) as u32)
    }

    pub fn open_collection(self, kind: CollectionKind) -> Self {
        self.item(ItemTag::Collection, u8::from(kind) as u32)
    }

    pub fn close_collection(self) -> Self {
        self.empty_item(ItemTag::EndCollection)
    }

    pub fn report_id(self, id: ReportId) -> Self {
        self.item(ItemTag::ReportId, u8::from(id) as u32)
    }

    pub fn report_size(self, size: ReportSize) -> Self {
        self.item(ItemTag::ReportSize, size.into())
    }

    pub fn report_count(self, count: ReportCount) -> Self {
        self.item(ItemTag::ReportCount, count.into())
    }

    /// Append an Input item with the given flags, e.g. [DATA_VAR_ABS].
    pub fn input(self, flags: u8) -> Self {
        self.item(ItemTag::Input, flags as u32)
    }

    /// Append a Feature item with the given flags, e.g. [DATA_VAR_ABS].
    pub fn feature(self, flags: u8) -> Self {
        self.item(ItemTag::Feature, flags as u32)
    }

    /// Append the Usage Page of the given HUT usage page.
    #[cfg(feature = "hut")]
    pub fn hut_usage_page(self, usage_page: impl hut::AsUsagePage) -> Self {
        self.usage_page(UsagePage(usage_page.usage_page_value()))
    }

    /// Append the Usage ID of the given HUT usage.
    ///
    /// This only appends the Usage ID but not the Usage Page, see
    /// [Self::hut_usage_page()].
    #[cfg(feature = "hut")]
    pub fn hut_usage(self, usage: impl hut::AsUsage) -> Self {
        self.usage(UsageId((usage.usage_value() & 0xffff) as u16))
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8]) -> Vec<Result<Item<'_>>> {
        items(bytes).collect()
    }

    #[test]
    fn item_size() {
        for size in 0..4u8 {
            let tag = 0b00010100; // Logical Minimum
            let bytes: [u8; 5] = [tag | size, 1, 2, 3, 4];
            let item = items(&bytes).next().unwrap().unwrap();
            match size {
                0 => assert_eq!(item.size(), 1),
                1 => assert_eq!(item.size(), 2),
                2 => assert_eq!(item.size(), 3),
                3 => assert_eq!(item.size(), 5),
                _ => panic!("Size {size} cannot happen"),
            }
        }
    }

    #[test]
    fn item_value() {
        let bytes = [0x27, 0x01, 0x02, 0x03, 0x04];
        let item = items(&bytes).next().unwrap().unwrap();
        assert_eq!(item.value(), 0x04030201);
        let bytes = [0x26, 0x01, 0x02];
        let item = items(&bytes).next().unwrap().unwrap();
        assert_eq!(item.value(), 0x0201);
        let bytes = [0xc0];
        let item = items(&bytes).next().unwrap().unwrap();
        assert_eq!(item.value(), 0);
        assert!(item.data().is_empty());
    }

    #[test]
    fn item_tags() {
        assert_eq!(ItemTag::from(0xa1), ItemTag::Collection);
        assert_eq!(ItemTag::from(0xa0), ItemTag::Collection);
        assert_eq!(ItemTag::from(0xc0), ItemTag::EndCollection);
        assert_eq!(ItemTag::from(0x05), ItemTag::UsagePage);
        assert_eq!(ItemTag::from(0x06), ItemTag::UsagePage);
        assert_eq!(ItemTag::from(0x09), ItemTag::Usage);
        assert_eq!(ItemTag::from(0x0a), ItemTag::Usage);
        assert_eq!(ItemTag::from(0x85), ItemTag::ReportId);
        assert_eq!(ItemTag::from(0x75), ItemTag::ReportSize);
        assert_eq!(ItemTag::from(0x95), ItemTag::ReportCount);
        assert_eq!(ItemTag::from(0xb1), ItemTag::Feature);
        assert_eq!(ItemTag::from(0x81), ItemTag::Input);
        assert_eq!(ItemTag::from(0x91), ItemTag::Output);
        assert_eq!(ItemTag::from(0x15), ItemTag::Other(0x14));
        assert_eq!(ItemTag::Other(0x15).prefix(), 0x14);
    }

    #[test]
    fn itemize() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x0d,                    // Usage Page (Digitizers)
            0x09, 0x05,                    // Usage (Touch Pad)
            0xa1, 0x01,                    // Collection (Application)
            0x26, 0xff, 0x0f,              //   Logical Maximum (4095)
            0xc0,                          // End Collection
        ];
        let items: Vec<Item> = items(&bytes).map(|i| i.unwrap()).collect();
        let offsets: Vec<usize> = items.iter().map(|i| i.offset()).collect();
        assert_eq!(offsets, [0, 2, 4, 6, 9]);
        let tags: Vec<ItemTag> = items.iter().map(|i| i.tag()).collect();
        assert_eq!(
            tags,
            [
                ItemTag::UsagePage,
                ItemTag::Usage,
                ItemTag::Collection,
                ItemTag::Other(0x24),
                ItemTag::EndCollection
            ]
        );
        assert_eq!(items[0].usage_page(), UsagePage(0x0d));
        assert_eq!(items[1].usage_id(), UsageId(0x05));
        assert_eq!(items[1].data_offset(), 3);
        assert_eq!(items[3].value(), 4095);
    }

    #[test]
    fn empty_buffer() {
        assert!(collect(&[]).is_empty());
    }

    #[test]
    fn truncated_item() {
        // Logical Maximum announces 2 data bytes, only 1 present
        let bytes = [0x05, 0x0d, 0x26, 0xff];
        let result = collect(&bytes);
        assert_eq!(result.len(), 2);
        assert!(result[0].is_ok());
        assert_eq!(
            result[1],
            Err(DecodeError::TruncatedItem {
                offset: 2,
                needed: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn truncated_four_byte_item() {
        // size code 3 means 4 data bytes, not 3
        let bytes = [0x27, 0x01, 0x02, 0x03];
        let mut iter = items(&bytes);
        assert!(matches!(
            iter.next(),
            Some(Err(DecodeError::TruncatedItem {
                offset: 0,
                needed: 5,
                available: 4
            }))
        ));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn extended_usage() {
        let bytes = [0x0b, 0x05, 0x00, 0x0d, 0x00];
        let item = items(&bytes).next().unwrap().unwrap();
        assert!(item.is_extended_usage());
        assert_eq!(item.usage_id(), UsageId(0x05));
    }

    #[test]
    fn hidbytes() {
        assert_eq!(HidBytes::from(1u32).take(), [0x1]);
        assert_eq!(HidBytes::from(255u32).take(), [0xff]);
        assert_eq!(HidBytes::from(256u32).take(), [0x0, 0x1]);
        assert_eq!(HidBytes::from(0x10000u32).take(), [0x0, 0x0, 0x1, 0x0]);
        assert_eq!(HidBytes::from(u32::MAX).take(), [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(HidBytes::from(0x10000u32).size_code(), 0b11);
    }

    #[test]
    fn builder() {
        #[rustfmt::skip]
        let expected_bytes = [
            0x05, 0x0d,                    // Usage Page (Digitizers)
            0x09, 0x0e,                    // Usage (Device Configuration)
            0xa1, 0x01,                    // Collection (Application)
            0x85, 0x03,                    //   Report ID (3)
            0x09, 0x52,                    //   Usage (Device Mode)
            0x75, 0x08,                    //   Report Size (8)
            0x95, 0x01,                    //   Report Count (1)
            0xb1, 0x02,                    //   Feature (Data,Var,Abs)
            0x75, 0x10,                    //   Report Size (16)
            0x96, 0x00, 0x01,              //   Report Count (256)
            0xb1, 0x03,                    //   Feature (Cnst,Var,Abs)
            0xc0,                          // End Collection
        ];
        let rdesc = DescriptorBuilder::new()
            .usage_page(UsagePage(0x0d))
            .usage(UsageId(0x0e))
            .open_collection(CollectionKind::Application)
            .report_id(ReportId(3))
            .usage(UsageId(0x52))
            .report_size(ReportSize(8))
            .report_count(ReportCount(1))
            .feature(DATA_VAR_ABS)
            .report_size(ReportSize(16))
            .report_count(ReportCount(256))
            .feature(CNST_VAR_ABS)
            .close_collection()
            .build();
        assert_eq!(rdesc, expected_bytes);
    }

    #[cfg(feature = "hut")]
    #[test]
    fn builder_hut() {
        let rdesc = DescriptorBuilder::new()
            .hut_usage_page(hut::UsagePage::Digitizers)
            .hut_usage(hut::Digitizers::TouchPad)
            .build();
        assert_eq!(rdesc, [0x05, 0x0d, 0x09, 0x05]);
    }
}
