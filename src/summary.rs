//! Lenient read-side extraction across all three metadata sections.
//!
//! A missing section is never fatal: EXIF fields are tried first, then IPTC,
//! then XMP fills whatever is still empty. Extraction fails only when the
//! file carries none of the three sections.

use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use nom_exif::*;
use std::path::Path;

use crate::error::{MetadataError, Result};
use crate::iptc::{IptcCodec, IptcKey, IptcRecord, IptcValue, TagDescriptorTable, application};
use crate::psir::{self, RESOURCE_IPTC};
use crate::xmp::{XMP_SEGMENT_HEADER, XmpDocument};

// XP* tag IDs (IFD0)
const TAG_XP_TITLE: u16 = 0x9C9B;
const TAG_XP_COMMENT: u16 = 0x9C9C;
const TAG_XP_KEYWORDS: u16 = 0x9C9E;

/// Metadata merged from the EXIF, IPTC, and XMP sections of one JPEG.
#[derive(Debug, Clone, Default)]
pub struct MetadataSummary {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub byline: Vec<String>,
    pub city: Option<String>,
    pub credit: Option<String>,
}

/// Read a merged metadata summary from a JPEG file.
///
/// Returns `NotFound` only when the file has no EXIF, no IPTC, and no XMP
/// section at all.
pub fn read_summary(path: &Path, table: TagDescriptorTable) -> Result<MetadataSummary> {
    let mut summary = MetadataSummary::default();
    let mut sections_found = 0usize;

    if read_exif_fields(path, &mut summary) {
        sections_found += 1;
    }

    let bytes = std::fs::read(path)?;
    let jpeg = Jpeg::from_bytes(Bytes::from(bytes))?;

    if read_iptc_fields(&jpeg, table, &mut summary)? {
        sections_found += 1;
    }
    if read_xmp_fields(&jpeg, &mut summary) {
        sections_found += 1;
    }

    if sections_found == 0 {
        return Err(MetadataError::NotFound);
    }
    Ok(summary)
}

/// Fill EXIF-derived fields. Returns whether an EXIF section was present.
fn read_exif_fields(path: &Path, summary: &mut MetadataSummary) -> bool {
    let mut parser = MediaParser::new();
    let ms = match MediaSource::file_path(path) {
        Ok(ms) => ms,
        Err(_) => return false,
    };
    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("no EXIF data found in {}", path.display());
            return false;
        }
    };
    let exif: Exif = iter.into();

    if let Some(val) = exif.get(ExifTag::ImageDescription) {
        summary.title = entry_to_string(val);
    }
    if summary.title.is_none() {
        if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_XP_TITLE) {
            summary.title = entry_to_string(val);
        }
    }

    if let Some(val) = exif.get(ExifTag::UserComment) {
        summary.description = entry_to_string(val);
    }
    if summary.description.is_none() {
        if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_XP_COMMENT) {
            summary.description = entry_to_string(val);
        }
    }

    if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_XP_KEYWORDS) {
        if let Some(joined) = entry_to_string(val) {
            summary.keywords = joined
                .split(';')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
    }

    true
}

/// Fill IPTC-derived fields. Returns whether a Photoshop block was present.
fn read_iptc_fields(
    jpeg: &Jpeg,
    table: TagDescriptorTable,
    summary: &mut MetadataSummary,
) -> Result<bool> {
    let resources = match psir::locate_in_jpeg(jpeg) {
        Ok((_, resources)) => resources,
        Err(MetadataError::NotFound) | Err(MetadataError::NoData) => return Ok(false),
        Err(err) => return Err(err),
    };
    let Some(resource) = resources.get(&RESOURCE_IPTC) else {
        return Ok(true);
    };
    let map = IptcCodec::new(table).decode(&resource.data)?;

    let text = |tag: u8| -> Option<String> {
        match &map.get(&IptcKey::new(IptcRecord::Application, tag))?.value {
            IptcValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    };
    let list = |tag: u8| -> Vec<String> {
        match map.get(&IptcKey::new(IptcRecord::Application, tag)).map(|d| &d.value) {
            Some(IptcValue::TextList(items)) => items.clone(),
            Some(IptcValue::Text(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    };

    if summary.title.is_none() {
        summary.title = text(application::OBJECT_NAME);
    }
    if summary.description.is_none() {
        summary.description = text(application::CAPTION_ABSTRACT);
    }
    if summary.keywords.is_empty() {
        summary.keywords = list(application::KEYWORDS);
    }
    summary.byline = list(application::BYLINE);
    summary.city = text(application::CITY);
    summary.credit = text(application::CREDIT);

    Ok(true)
}

/// Fill XMP-derived fields. Returns whether an XMP packet was present.
fn read_xmp_fields(jpeg: &Jpeg, summary: &mut MetadataSummary) -> bool {
    let Some(pos) = jpeg
        .segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(XMP_SEGMENT_HEADER))
    else {
        return false;
    };
    let contents = jpeg.segments()[pos].contents();
    let doc = XmpDocument::parse(&String::from_utf8_lossy(&contents[XMP_SEGMENT_HEADER.len()..]));

    if summary.title.is_none() {
        summary.title = doc.title();
    }
    if summary.description.is_none() {
        summary.description = doc.description();
    }
    if summary.keywords.is_empty() {
        summary.keywords = doc.keywords();
    }

    true
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}
