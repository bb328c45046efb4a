//! The metadata editor: typed EXIF/IPTC/XMP operations over one JPEG.
//!
//! The editor owns the parsed JPEG segment list plus a typed in-memory view
//! of each metadata section, and tracks per-section dirtiness. Serializing
//! re-encodes only the sections that were edited; clean sections pass
//! through with their original raw bytes.

use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::{Bytes, ImageEXIF};
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::path::Path;

use crate::error::{MetadataError, Result};
use crate::iptc::{
    self, IptcCodec, IptcDataset, IptcKey, IptcRecord, IptcRecordMap, IptcTagType, IptcValue,
    TagDescriptorTable, application, envelope,
};
use crate::psir::{self, PhotoshopResource, RESOURCE_IPTC, RESOURCE_IPTC_DIGEST, ResourceMap};
use crate::xmp::{XMP_SEGMENT_HEADER, XmpDocument};

/// Value of the EXIF `Software` tag stamped on every EXIF rewrite.
pub const SOFTWARE_TAG: &str = "jpegmeta (little_exif)";

const MARKER_APP1: u8 = 0xE1;
const MARKER_APP13: u8 = 0xED;
const MARKER_SOS: u8 = 0xDA;
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// insert_exif_segment expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

/// Per-section lifecycle: `Clean -(Set*)-> Dirty -(bytes())-> Clean`.
///
/// `Drop*` and `copy_metadata` force `Clean` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionState {
    #[default]
    Clean,
    Dirty,
}

impl SectionState {
    pub fn is_dirty(self) -> bool {
        self == Self::Dirty
    }
}

/// Which sections a [`MetadataEditor::copy_metadata`] call should copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopySections {
    pub exif: bool,
    pub iptc: bool,
    pub xmp: bool,
}

impl CopySections {
    pub fn all() -> Self {
        Self { exif: true, iptc: true, xmp: true }
    }
}

/// An in-memory editor over one JPEG's embedded metadata.
///
/// Invariant: the underlying segment list holds at most one EXIF segment,
/// one Photoshop (APP13) segment, and one XMP segment. The editor is
/// exclusively owned by its caller; it holds no background state.
///
/// # Example
///
/// ```rust,no_run
/// use jpegmeta::editor::MetadataEditor;
/// use jpegmeta::iptc::TagDescriptorTable;
///
/// # fn main() -> jpegmeta::Result<()> {
/// let bytes = std::fs::read("photo.jpg")?;
/// let mut editor = MetadataEditor::from_bytes(bytes, TagDescriptorTable::iim())?;
/// editor.set_title("New Title")?;
/// editor.set_keywords(vec!["fog".into(), "coast".into()])?;
/// editor.write_file("photo.jpg".as_ref())?;
/// # Ok(())
/// # }
/// ```
pub struct MetadataEditor {
    jpeg: Jpeg,
    exif: Metadata,
    iptc: IptcRecordMap,
    resources: ResourceMap,
    /// Segment index of the Photoshop block at parse time, if one was found.
    psir_segment: Option<usize>,
    xmp: Option<XmpDocument>,
    codec: IptcCodec,
    exif_state: SectionState,
    iptc_state: SectionState,
    xmp_state: SectionState,
}

impl MetadataEditor {
    /// Parse an existing JPEG byte stream into an editor.
    ///
    /// Absent sections become empty-but-present editors; a present but
    /// malformed section is an error. All sections start clean.
    pub fn from_bytes(bytes: Vec<u8>, table: TagDescriptorTable) -> Result<Self> {
        let exif = load_exif_builder(&bytes);
        let jpeg = Jpeg::from_bytes(Bytes::from(bytes))?;
        let codec = IptcCodec::new(table);

        let (psir_segment, resources) = match psir::locate_in_jpeg(&jpeg) {
            Ok((index, resources)) => (Some(index), resources),
            Err(MetadataError::NotFound) | Err(MetadataError::NoData) => {
                (None, ResourceMap::new())
            }
            Err(err) => return Err(err),
        };

        let iptc = match resources.get(&RESOURCE_IPTC) {
            Some(resource) => codec.decode(&resource.data)?,
            None => IptcRecordMap::new(),
        };

        let xmp = find_xmp_pos(jpeg.segments()).map(|pos| {
            let contents = jpeg.segments()[pos].contents();
            let packet = &contents[XMP_SEGMENT_HEADER.len()..];
            XmpDocument::parse(&String::from_utf8_lossy(packet))
        });

        Ok(Self {
            jpeg,
            exif,
            iptc,
            resources,
            psir_segment,
            xmp,
            codec,
            exif_state: SectionState::Clean,
            iptc_state: SectionState::Clean,
            xmp_state: SectionState::Clean,
        })
    }

    /// Build an editor over an already-parsed segment list with no metadata
    /// view populated. Subsequent `set_*` calls seed dirtiness.
    pub fn from_jpeg(jpeg: Jpeg, table: TagDescriptorTable) -> Self {
        Self {
            jpeg,
            exif: Metadata::new(),
            iptc: IptcRecordMap::new(),
            resources: ResourceMap::new(),
            psir_segment: None,
            xmp: None,
            codec: IptcCodec::new(table),
            exif_state: SectionState::Clean,
            iptc_state: SectionState::Clean,
            xmp_state: SectionState::Clean,
        }
    }

    pub fn iptc(&self) -> &IptcRecordMap {
        &self.iptc
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    /// Segment index of the Photoshop block found at parse time.
    pub fn photoshop_segment(&self) -> Option<usize> {
        self.psir_segment
    }

    pub fn xmp(&self) -> Option<&XmpDocument> {
        self.xmp.as_ref()
    }

    pub fn exif_state(&self) -> SectionState {
        self.exif_state
    }

    pub fn iptc_state(&self) -> SectionState {
        self.iptc_state
    }

    pub fn xmp_state(&self) -> SectionState {
        self.xmp_state
    }

    pub fn is_dirty(&self) -> bool {
        self.exif_state.is_dirty() || self.iptc_state.is_dirty() || self.xmp_state.is_dirty()
    }

    // ------------------------------------------------------------------
    // IPTC
    // ------------------------------------------------------------------

    /// Set one IPTC dataset.
    ///
    /// Fails with `TagNotFound` if the descriptor table has no entry for
    /// `(record, tag)`, and with a value error if the value's shape does not
    /// match the descriptor or a string element breaks the length bounds.
    pub fn set_iptc_tag(&mut self, record: IptcRecord, tag: u8, value: IptcValue) -> Result<()> {
        let descriptor = *self
            .codec
            .table()
            .get(record, tag)
            .ok_or(MetadataError::TagNotFound { record: record as u8, tag })?;

        if !value.matches(descriptor.tag_type, descriptor.repeatable) {
            return Err(MetadataError::value(
                format!("IPTC {}:{tag}", record as u8),
                format!(
                    "value shape does not match ({:?}, repeatable={})",
                    descriptor.tag_type, descriptor.repeatable
                ),
            ));
        }
        check_length_bounds(record, tag, &value, descriptor.min_len, descriptor.max_len)?;

        self.iptc.insert(
            IptcKey::new(record, tag),
            IptcDataset {
                record,
                tag,
                tag_type: descriptor.tag_type,
                repeatable: descriptor.repeatable,
                value,
            },
        );
        self.iptc_state = SectionState::Dirty;
        Ok(())
    }

    /// Set the IPTC `ObjectName` (2:5) — the title field.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_iptc_tag(
            IptcRecord::Application,
            application::OBJECT_NAME,
            IptcValue::Text(title.to_string()),
        )
    }

    /// Set the IPTC `Keywords` (2:25) list.
    pub fn set_keywords(&mut self, keywords: Vec<String>) -> Result<()> {
        self.set_iptc_tag(
            IptcRecord::Application,
            application::KEYWORDS,
            IptcValue::TextList(keywords),
        )
    }

    /// Set the IPTC `Caption/Abstract` (2:120).
    pub fn set_caption(&mut self, caption: &str) -> Result<()> {
        self.set_iptc_tag(
            IptcRecord::Application,
            application::CAPTION_ABSTRACT,
            IptcValue::Text(caption.to_string()),
        )
    }

    /// Set the IPTC `By-line` (2:80) list.
    pub fn set_byline(&mut self, byline: Vec<String>) -> Result<()> {
        self.set_iptc_tag(
            IptcRecord::Application,
            application::BYLINE,
            IptcValue::TextList(byline),
        )
    }

    /// Set the IPTC `Credit` (2:110).
    pub fn set_credit(&mut self, credit: &str) -> Result<()> {
        self.set_iptc_tag(
            IptcRecord::Application,
            application::CREDIT,
            IptcValue::Text(credit.to_string()),
        )
    }

    // ------------------------------------------------------------------
    // EXIF
    // ------------------------------------------------------------------

    /// Set an EXIF tag on the builder directly.
    pub fn set_exif_tag(&mut self, tag: ExifTag) {
        self.exif.set_tag(tag);
        self.exif_state = SectionState::Dirty;
    }

    /// Set an IFD0 string tag by numeric id. The scalar is wrapped into the
    /// builder's fixed-count array form (a NUL-terminated ASCII run).
    pub fn set_ifd_string(&mut self, tag_id: u16, value: &str) -> Result<()> {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        let tag = ExifTag::from_u16_with_data(
            tag_id,
            &ExifTagFormat::STRING,
            &data,
            &Endian::Little,
            &ExifTagGroup::IFD0,
        )
        .ok()
        .ok_or_else(|| MetadataError::Exif(format!("cannot build IFD tag {tag_id:#06x}")))?;
        self.set_exif_tag(tag);
        Ok(())
    }

    /// Set an IFD0 `u16` tag by numeric id (stored as an array of one).
    pub fn set_ifd_u16(&mut self, tag_id: u16, value: u16) -> Result<()> {
        let tag = ExifTag::from_u16_with_data(
            tag_id,
            &ExifTagFormat::INT16U,
            &value.to_le_bytes().to_vec(),
            &Endian::Little,
            &ExifTagGroup::IFD0,
        )
        .ok()
        .ok_or_else(|| MetadataError::Exif(format!("cannot build IFD tag {tag_id:#06x}")))?;
        self.set_exif_tag(tag);
        Ok(())
    }

    // ------------------------------------------------------------------
    // XMP
    // ------------------------------------------------------------------

    pub fn set_xmp_title(&mut self, title: &str) {
        self.xmp_doc().set_title(title);
        self.xmp_state = SectionState::Dirty;
    }

    pub fn set_xmp_description(&mut self, description: &str) {
        self.xmp_doc().set_description(description);
        self.xmp_state = SectionState::Dirty;
    }

    pub fn set_xmp_keywords(&mut self, keywords: &[String]) {
        self.xmp_doc().set_keywords(keywords);
        self.xmp_state = SectionState::Dirty;
    }

    pub fn set_xmp_rating(&mut self, rating: u8) -> Result<()> {
        self.xmp_doc().set_rating(rating)?;
        self.xmp_state = SectionState::Dirty;
        Ok(())
    }

    fn xmp_doc(&mut self) -> &mut XmpDocument {
        self.xmp.get_or_insert_with(XmpDocument::new)
    }

    // ------------------------------------------------------------------
    // Copy / drop
    // ------------------------------------------------------------------

    /// Copy raw metadata segments from another JPEG into this one.
    ///
    /// For each requested section the editor first drops its own section,
    /// then copies the source's raw segment bytes, then eagerly rebuilds the
    /// typed in-memory view from the copied bytes so subsequent edits see
    /// the new content. Copied sections end clean, so an untouched copied
    /// segment survives [`bytes`](Self::bytes) byte-for-byte.
    pub fn copy_metadata(&mut self, source: &[u8], sections: CopySections) -> Result<()> {
        let src = Jpeg::from_bytes(Bytes::copy_from_slice(source))?;

        if sections.exif {
            let orig_pos = find_exif_pos(self.jpeg.segments());
            self.remove_exif_segment();
            if let Some(tiff) = src.exif() {
                self.insert_exif_segment(&tiff, orig_pos);
            }
            self.exif = load_exif_builder(source);
            self.exif_state = SectionState::Clean;
        }

        if sections.iptc {
            self.remove_psir_segment();
            self.iptc = IptcRecordMap::new();
            self.resources = ResourceMap::new();
            if let Some(pos) = find_psir_pos(src.segments()) {
                let contents = src.segments()[pos].contents().clone();
                self.resources = psir::decode(&contents, true)?;
                if let Some(resource) = self.resources.get(&RESOURCE_IPTC) {
                    self.iptc = self.codec.decode(&resource.data)?;
                }
                self.insert_psir_segment(JpegSegment::new_with_contents(MARKER_APP13, contents));
            }
            self.iptc_state = SectionState::Clean;
        }

        if sections.xmp {
            self.remove_xmp_segment();
            self.xmp = None;
            if let Some(pos) = find_xmp_pos(src.segments()) {
                let contents = src.segments()[pos].contents().clone();
                let packet = &contents[XMP_SEGMENT_HEADER.len()..];
                self.xmp = Some(XmpDocument::parse(&String::from_utf8_lossy(packet)));
                self.insert_xmp_segment(JpegSegment::new_with_contents(MARKER_APP1, contents));
            }
            self.xmp_state = SectionState::Clean;
        }

        Ok(())
    }

    /// Remove the EXIF segment and reset the builder. Idempotent.
    pub fn drop_exif(&mut self) {
        self.remove_exif_segment();
        self.exif = Metadata::new();
        self.exif_state = SectionState::Clean;
    }

    /// Remove the Photoshop (IPTC) segment. Idempotent.
    pub fn drop_iptc(&mut self) {
        self.remove_psir_segment();
        self.iptc = IptcRecordMap::new();
        self.resources = ResourceMap::new();
        self.iptc_state = SectionState::Clean;
    }

    /// Remove the XMP segment. Idempotent.
    pub fn drop_xmp(&mut self) {
        self.remove_xmp_segment();
        self.xmp = None;
        self.xmp_state = SectionState::Clean;
    }

    /// Remove all three metadata sections.
    pub fn drop_all(&mut self) {
        self.drop_exif();
        self.drop_iptc();
        self.drop_xmp();
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the JPEG with all pending edits applied.
    ///
    /// Dirty sections are finalized first: EXIF gets the `Software` stamp,
    /// IPTC gets the mandatory IIM tags (and any stale digest resource is
    /// removed), XMP gets `CreatorTool`/`ModifyDate` and a `saved` history
    /// event. Only sections that were dirty are re-encoded; an encoding
    /// failure returns before any dirty flag is cleared, so fixing the
    /// problem and retrying is safe.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        let exif_was_dirty = self.exif_state.is_dirty();
        let iptc_was_dirty = self.iptc_state.is_dirty();
        let xmp_was_dirty = self.xmp_state.is_dirty();

        if exif_was_dirty {
            self.exif.set_tag(ExifTag::Software(SOFTWARE_TAG.to_string()));
        }

        if iptc_was_dirty {
            self.inject_mandatory_iptc_tags();
            // A cached digest of the old IPTC payload must not survive a rewrite.
            self.resources.remove(&RESOURCE_IPTC_DIGEST);
            let payload = self.codec.encode(&self.iptc)?;
            self.resources
                .insert(RESOURCE_IPTC, PhotoshopResource::new(RESOURCE_IPTC, payload));
        }

        if xmp_was_dirty {
            let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
            let doc = self.xmp_doc();
            doc.set_creator_tool(SOFTWARE_TAG);
            doc.set_modify_date(&now);
            doc.add_history_event("saved", SOFTWARE_TAG, &now);
        }

        if iptc_was_dirty {
            if self.resources.is_empty() {
                self.remove_psir_segment();
            } else {
                let block = psir::encode(&self.resources, true)?;
                let segment = JpegSegment::new_with_contents(MARKER_APP13, Bytes::from(block));
                match find_psir_pos(self.jpeg.segments()) {
                    Some(pos) => self.jpeg.segments_mut()[pos] = segment,
                    None => self.insert_psir_segment(segment),
                }
            }
        }

        if exif_was_dirty && !self.exif.data().is_empty() {
            let exif_bytes = self.exif.as_u8_vec(FileExtension::JPEG);
            if exif_bytes.len() > JPEG_EXIF_OVERHEAD {
                let orig_pos = find_exif_pos(self.jpeg.segments());
                let tiff = exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec();
                self.remove_exif_segment();
                self.insert_exif_segment(&tiff, orig_pos);
            }
        }

        if xmp_was_dirty {
            if let Some(doc) = &self.xmp {
                let mut contents =
                    Vec::with_capacity(XMP_SEGMENT_HEADER.len() + doc.as_xml().len());
                contents.extend_from_slice(XMP_SEGMENT_HEADER);
                contents.extend_from_slice(doc.as_xml().as_bytes());
                let segment = JpegSegment::new_with_contents(MARKER_APP1, Bytes::from(contents));
                match find_xmp_pos(self.jpeg.segments()) {
                    Some(pos) => self.jpeg.segments_mut()[pos] = segment,
                    None => self.insert_xmp_segment(segment),
                }
            }
        }

        let out = self.jpeg.clone().encoder().bytes();

        self.exif_state = SectionState::Clean;
        self.iptc_state = SectionState::Clean;
        self.xmp_state = SectionState::Clean;

        Ok(out.to_vec())
    }

    /// Serialize and write to `path`. Any codec error aborts before the
    /// file is touched.
    pub fn write_file(&mut self, path: &Path) -> Result<()> {
        let bytes = self.bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// The mandatory IIM write tags: record versions, file format, and the
    /// coded character set.
    fn inject_mandatory_iptc_tags(&mut self) {
        let mandatory = [
            (IptcRecord::Envelope, envelope::RECORD_VERSION, IptcTagType::U16, IptcValue::U16(4)),
            (IptcRecord::Envelope, envelope::FILE_FORMAT, IptcTagType::U16,
                IptcValue::U16(iptc::FILE_FORMAT_JPEG)),
            (IptcRecord::Envelope, envelope::CODED_CHARACTER_SET, IptcTagType::Text,
                IptcValue::Text("UTF8".to_string())),
            (IptcRecord::Application, application::RECORD_VERSION, IptcTagType::U16,
                IptcValue::U16(4)),
        ];
        for (record, tag, tag_type, value) in mandatory {
            self.iptc.insert(
                IptcKey::new(record, tag),
                IptcDataset { record, tag, tag_type, repeatable: false, value },
            );
        }
    }

    fn insert_psir_segment(&mut self, segment: JpegSegment) {
        let segments = self.jpeg.segments_mut();
        // After EXIF and XMP, but never past the scan data.
        let pos = pre_scan_pos(segments, 4);
        segments.insert(pos, segment);
    }

    fn insert_xmp_segment(&mut self, segment: JpegSegment) {
        let segments = self.jpeg.segments_mut();
        let preferred = find_exif_pos(segments).map(|p| p + 1).unwrap_or(2);
        let pos = pre_scan_pos(segments, preferred);
        segments.insert(pos, segment);
    }

    fn remove_exif_segment(&mut self) {
        if let Some(pos) = find_exif_pos(self.jpeg.segments()) {
            self.jpeg.segments_mut().remove(pos);
        }
    }

    /// Insert an EXIF APP1 segment built from raw TIFF bytes, at its
    /// original position when known (EXIF must precede XMP, and every
    /// metadata segment must precede the scan data).
    fn insert_exif_segment(&mut self, tiff: &[u8], orig_pos: Option<usize>) {
        let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + tiff.len());
        contents.extend_from_slice(EXIF_PREFIX);
        contents.extend_from_slice(tiff);
        let segment = JpegSegment::new_with_contents(MARKER_APP1, Bytes::from(contents));
        let segments = self.jpeg.segments_mut();
        let pos = pre_scan_pos(segments, orig_pos.unwrap_or(1));
        segments.insert(pos, segment);
    }

    fn remove_psir_segment(&mut self) {
        if let Some(pos) = find_psir_pos(self.jpeg.segments()) {
            self.jpeg.segments_mut().remove(pos);
        }
        self.psir_segment = None;
    }

    fn remove_xmp_segment(&mut self) {
        if let Some(pos) = find_xmp_pos(self.jpeg.segments()) {
            self.jpeg.segments_mut().remove(pos);
        }
    }
}

/// Load the EXIF builder from a whole-file byte stream.
///
/// little_exif only reads from paths, so the bytes go through a named temp
/// file. Returns an empty builder if the bytes hold no parseable EXIF
/// (instead of failing the whole open).
fn load_exif_builder(bytes: &[u8]) -> Metadata {
    let Ok(mut temp) = tempfile::Builder::new().suffix(".jpg").tempfile() else {
        log::debug!("could not create a temp file for EXIF loading");
        return Metadata::new();
    };
    if std::io::Write::write_all(&mut temp, bytes).is_err() {
        return Metadata::new();
    }
    let path_owned = temp.path().to_path_buf();

    // Suppress panics from little_exif
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
    std::panic::set_hook(prev_hook);

    match result {
        Ok(Ok(metadata)) => {
            log::debug!("loaded {} existing EXIF tags", metadata.data().len());
            metadata
        }
        Ok(Err(err)) => {
            log::debug!("no parseable EXIF: {err}");
            Metadata::new()
        }
        Err(_) => {
            log::debug!("EXIF parser panicked; starting from an empty builder");
            Metadata::new()
        }
    }
}

/// Check each string/blob element of `value` against the descriptor's
/// length bounds. Integer shapes are fixed-width and skipped.
fn check_length_bounds(
    record: IptcRecord,
    tag: u8,
    value: &IptcValue,
    min_len: usize,
    max_len: usize,
) -> Result<()> {
    let check = |len: usize| -> Result<()> {
        if len < min_len || len > max_len {
            return Err(MetadataError::value(
                format!("IPTC {}:{tag}", record as u8),
                format!("length {len} outside {min_len}..={max_len}"),
            ));
        }
        Ok(())
    };
    match value {
        IptcValue::Text(s) => check(s.len()),
        IptcValue::TextList(list) => list.iter().try_for_each(|s| check(s.len())),
        IptcValue::Blob(b) => check(b.len()),
        IptcValue::BlobList(list) => list.iter().try_for_each(|b| check(b.len())),
        _ => Ok(()),
    }
}

/// Find the EXIF APP1 segment (contents start with `Exif\0\0`).
fn find_exif_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Find the XMP APP1 segment.
fn find_xmp_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(XMP_SEGMENT_HEADER))
}

/// Find the Photoshop APP13 segment.
fn find_psir_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == MARKER_APP13 && s.contents().starts_with(psir::PHOTOSHOP_PREFIX))
}

/// Clamp a preferred insertion index so the segment lands before the first
/// SOS marker (a segment serialized after the scan data is unreachable on
/// reparse).
fn pre_scan_pos(segments: &[JpegSegment], preferred: usize) -> usize {
    let scan = segments
        .iter()
        .position(|s| s.marker() == MARKER_SOS)
        .unwrap_or(segments.len());
    preferred.min(scan)
}
