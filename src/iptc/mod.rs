//! IPTC-IIM data model: records, tag types, values, and descriptor tables.
//!
//! The IIM wire codec itself lives in [`codec`]. This module defines the
//! typed in-memory form: a dataset is one `(record, tag) → value` unit, and
//! a [`TagDescriptorTable`] tells the codec how to decode and validate each
//! known `(record, tag)` pair. The table is an immutable value injected into
//! the codec at construction time, so tests can run against a small
//! synthetic table instead of the full IIM one.

pub mod codec;

use std::collections::BTreeMap;

pub use codec::IptcCodec;

/// The IIM record number an IPTC dataset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum IptcRecord {
    Envelope = 1,
    Application = 2,
    NewsPhoto = 3,
    PreObjectData = 7,
    ObjectData = 8,
    PostObjectData = 9,
    FotoStation = 240,
}

impl IptcRecord {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Envelope),
            2 => Some(Self::Application),
            3 => Some(Self::NewsPhoto),
            7 => Some(Self::PreObjectData),
            8 => Some(Self::ObjectData),
            9 => Some(Self::PostObjectData),
            240 => Some(Self::FotoStation),
            _ => None,
        }
    }
}

/// The content type of an IPTC dataset, as declared by its descriptor.
///
/// `Digits` is a string constrained to the ASCII digit alphabet (dates,
/// reference numbers). Integer types are exact-width big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IptcTagType {
    Text,
    Digits,
    U8,
    U16,
    U32,
    Undefined,
}

/// A decoded IPTC value.
///
/// The list forms are used exactly when the tag's descriptor is repeatable;
/// repeated wire occurrences of the same `(record, tag)` accumulate into the
/// list in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IptcValue {
    Text(String),
    TextList(Vec<String>),
    U8(u8),
    U8List(Vec<u8>),
    U16(u16),
    U16List(Vec<u16>),
    U32(u32),
    U32List(Vec<u32>),
    Blob(Vec<u8>),
    BlobList(Vec<Vec<u8>>),
}

impl IptcValue {
    /// Whether this value's runtime shape matches `(tag_type, repeatable)`.
    pub fn matches(&self, tag_type: IptcTagType, repeatable: bool) -> bool {
        use IptcTagType::*;
        match (self, tag_type, repeatable) {
            (Self::Text(_), Text | Digits, false) => true,
            (Self::TextList(_), Text | Digits, true) => true,
            (Self::U8(_), U8, false) => true,
            (Self::U8List(_), U8, true) => true,
            (Self::U16(_), U16, false) => true,
            (Self::U16List(_), U16, true) => true,
            (Self::U32(_), U32, false) => true,
            (Self::U32List(_), U32, true) => true,
            (Self::Blob(_), Undefined, false) => true,
            (Self::BlobList(_), Undefined, true) => true,
            _ => false,
        }
    }
}

/// Key identifying one dataset slot: the record number plus the tag number.
///
/// `Ord` follows `(record, tag)` ascending, which is also the deterministic
/// order datasets are emitted in on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IptcKey {
    pub record: IptcRecord,
    pub tag: u8,
}

impl IptcKey {
    pub fn new(record: IptcRecord, tag: u8) -> Self {
        Self { record, tag }
    }
}

/// One typed dataset held in the in-memory record map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IptcDataset {
    pub record: IptcRecord,
    pub tag: u8,
    pub tag_type: IptcTagType,
    pub repeatable: bool,
    pub value: IptcValue,
}

/// How to decode and validate one known `(record, tag)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IptcTagDescriptor {
    pub tag_type: IptcTagType,
    pub repeatable: bool,
    pub min_len: usize,
    pub max_len: usize,
    /// Required by the IIM spec on any write; the editor injects these
    /// before serializing a dirty IPTC section.
    pub mandatory: bool,
}

/// The in-memory record map produced by decode and consumed by encode.
pub type IptcRecordMap = BTreeMap<IptcKey, IptcDataset>;

/// Well-known Envelope record (1:x) dataset numbers.
pub mod envelope {
    pub const RECORD_VERSION: u8 = 0;
    pub const DESTINATION: u8 = 5;
    pub const FILE_FORMAT: u8 = 20;
    pub const FILE_FORMAT_VERSION: u8 = 22;
    pub const SERVICE_IDENTIFIER: u8 = 30;
    pub const ENVELOPE_NUMBER: u8 = 40;
    pub const PRODUCT_ID: u8 = 50;
    pub const ENVELOPE_PRIORITY: u8 = 60;
    pub const DATE_SENT: u8 = 70;
    pub const TIME_SENT: u8 = 80;
    pub const CODED_CHARACTER_SET: u8 = 90;
    pub const UNO: u8 = 100;
}

/// Well-known Application record (2:x) dataset numbers.
pub mod application {
    pub const RECORD_VERSION: u8 = 0;
    pub const OBJECT_TYPE_REFERENCE: u8 = 3;
    pub const OBJECT_ATTRIBUTE_REFERENCE: u8 = 4;
    pub const OBJECT_NAME: u8 = 5;
    pub const EDIT_STATUS: u8 = 7;
    pub const URGENCY: u8 = 10;
    pub const CATEGORY: u8 = 15;
    pub const SUPPLEMENTAL_CATEGORIES: u8 = 20;
    pub const FIXTURE_IDENTIFIER: u8 = 22;
    pub const KEYWORDS: u8 = 25;
    pub const CONTENT_LOCATION_CODE: u8 = 26;
    pub const CONTENT_LOCATION_NAME: u8 = 27;
    pub const RELEASE_DATE: u8 = 30;
    pub const RELEASE_TIME: u8 = 35;
    pub const SPECIAL_INSTRUCTIONS: u8 = 40;
    pub const DATE_CREATED: u8 = 55;
    pub const TIME_CREATED: u8 = 60;
    pub const ORIGINATING_PROGRAM: u8 = 65;
    pub const PROGRAM_VERSION: u8 = 70;
    pub const BYLINE: u8 = 80;
    pub const BYLINE_TITLE: u8 = 85;
    pub const CITY: u8 = 90;
    pub const SUBLOCATION: u8 = 92;
    pub const PROVINCE_STATE: u8 = 95;
    pub const COUNTRY_CODE: u8 = 100;
    pub const COUNTRY_NAME: u8 = 101;
    pub const TRANSMISSION_REFERENCE: u8 = 103;
    pub const HEADLINE: u8 = 105;
    pub const CREDIT: u8 = 110;
    pub const SOURCE: u8 = 115;
    pub const COPYRIGHT_NOTICE: u8 = 116;
    pub const CONTACT: u8 = 118;
    pub const CAPTION_ABSTRACT: u8 = 120;
    pub const WRITER_EDITOR: u8 = 122;
}

/// `FileFormat` (1:20) value designating JPEG per the IIM appendix.
pub const FILE_FORMAT_JPEG: u16 = 11;

/// Immutable map from `(record, tag)` to its descriptor.
///
/// Unknown keys are legal: the codec skips such datasets on decode (it does
/// not know how to type them), and `set` operations reject them with
/// `TagNotFound`.
#[derive(Debug, Clone, Default)]
pub struct TagDescriptorTable {
    entries: BTreeMap<IptcKey, IptcTagDescriptor>,
}

impl TagDescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: IptcRecord, tag: u8, descriptor: IptcTagDescriptor) {
        self.entries.insert(IptcKey::new(record, tag), descriptor);
    }

    pub fn get(&self, record: IptcRecord, tag: u8) -> Option<&IptcTagDescriptor> {
        self.entries.get(&IptcKey::new(record, tag))
    }

    /// Iterate over all `(key, descriptor)` entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IptcKey, &IptcTagDescriptor)> {
        self.entries.iter()
    }

    /// The production IIM descriptor table (records 1, 2, 3 and 8).
    ///
    /// Length bounds follow the IIM version 4 specification; integer tags
    /// have `min_len == max_len == width`.
    pub fn iim() -> Self {
        use IptcRecord::*;
        use IptcTagType::*;

        let mut t = Self::new();
        let mut add = |record, tag, tag_type, repeatable, min_len, max_len, mandatory| {
            t.insert(
                record,
                tag,
                IptcTagDescriptor { tag_type, repeatable, min_len, max_len, mandatory },
            );
        };

        // Record 1 — Envelope
        add(Envelope, envelope::RECORD_VERSION, U16, false, 2, 2, true);
        add(Envelope, envelope::DESTINATION, Text, true, 0, 1024, false);
        add(Envelope, envelope::FILE_FORMAT, U16, false, 2, 2, true);
        add(Envelope, envelope::FILE_FORMAT_VERSION, U16, false, 2, 2, false);
        add(Envelope, envelope::SERVICE_IDENTIFIER, Text, false, 0, 10, false);
        add(Envelope, envelope::ENVELOPE_NUMBER, Digits, false, 8, 8, false);
        add(Envelope, envelope::PRODUCT_ID, Text, true, 0, 32, false);
        add(Envelope, envelope::ENVELOPE_PRIORITY, Digits, false, 1, 1, false);
        add(Envelope, envelope::DATE_SENT, Digits, false, 8, 8, false);
        add(Envelope, envelope::TIME_SENT, Text, false, 11, 11, false);
        add(Envelope, envelope::CODED_CHARACTER_SET, Text, false, 0, 32, true);
        add(Envelope, envelope::UNO, Text, false, 14, 80, false);

        // Record 2 — Application
        add(Application, application::RECORD_VERSION, U16, false, 2, 2, true);
        add(Application, application::OBJECT_TYPE_REFERENCE, Text, false, 3, 67, false);
        add(Application, application::OBJECT_ATTRIBUTE_REFERENCE, Text, true, 4, 68, false);
        add(Application, application::OBJECT_NAME, Text, false, 0, 64, false);
        add(Application, application::EDIT_STATUS, Text, false, 0, 64, false);
        add(Application, application::URGENCY, Digits, false, 1, 1, false);
        add(Application, application::CATEGORY, Text, false, 0, 3, false);
        add(Application, application::SUPPLEMENTAL_CATEGORIES, Text, true, 0, 32, false);
        add(Application, application::FIXTURE_IDENTIFIER, Text, false, 0, 32, false);
        add(Application, application::KEYWORDS, Text, true, 0, 64, false);
        add(Application, application::CONTENT_LOCATION_CODE, Text, true, 3, 3, false);
        add(Application, application::CONTENT_LOCATION_NAME, Text, true, 0, 64, false);
        add(Application, application::RELEASE_DATE, Digits, false, 8, 8, false);
        add(Application, application::RELEASE_TIME, Text, false, 11, 11, false);
        add(Application, application::SPECIAL_INSTRUCTIONS, Text, false, 0, 256, false);
        add(Application, application::DATE_CREATED, Digits, false, 8, 8, false);
        add(Application, application::TIME_CREATED, Text, false, 11, 11, false);
        add(Application, application::ORIGINATING_PROGRAM, Text, false, 0, 32, false);
        add(Application, application::PROGRAM_VERSION, Text, false, 0, 10, false);
        add(Application, application::BYLINE, Text, true, 0, 32, false);
        add(Application, application::BYLINE_TITLE, Text, true, 0, 32, false);
        add(Application, application::CITY, Text, false, 0, 32, false);
        add(Application, application::SUBLOCATION, Text, false, 0, 32, false);
        add(Application, application::PROVINCE_STATE, Text, false, 0, 32, false);
        add(Application, application::COUNTRY_CODE, Text, false, 3, 3, false);
        add(Application, application::COUNTRY_NAME, Text, false, 0, 64, false);
        add(Application, application::TRANSMISSION_REFERENCE, Text, false, 0, 32, false);
        add(Application, application::HEADLINE, Text, false, 0, 256, false);
        add(Application, application::CREDIT, Text, false, 0, 32, false);
        add(Application, application::SOURCE, Text, false, 0, 32, false);
        add(Application, application::COPYRIGHT_NOTICE, Text, false, 0, 128, false);
        add(Application, application::CONTACT, Text, true, 0, 128, false);
        add(Application, application::CAPTION_ABSTRACT, Text, false, 0, 2000, false);
        add(Application, application::WRITER_EDITOR, Text, true, 0, 32, false);

        // Record 3 — NewsPhoto (the subset that shows up in practice)
        add(NewsPhoto, 0, U16, false, 2, 2, false);
        add(NewsPhoto, 10, Text, false, 0, 16, false);
        add(NewsPhoto, 20, U16, false, 2, 2, false);
        add(NewsPhoto, 30, U16, false, 2, 2, false);

        // Record 8 — ObjectData
        add(ObjectData, 10, Undefined, true, 0, usize::MAX, false);

        t
    }
}
