//! End-to-end tests against a synthetic minimal JPEG.

use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::{Bytes, ImageEXIF};
use little_exif::exif_tag::ExifTag;

use jpegmeta::editor::{CopySections, MetadataEditor};
use jpegmeta::iptc::{application, envelope, IptcKey, IptcRecord, IptcValue, TagDescriptorTable};
use jpegmeta::psir::{self, PhotoshopResource, ResourceMap, RESOURCE_IPTC_DIGEST};

const MARKER_APP13: u8 = 0xED;
const MARKER_SOS: u8 = 0xDA;

/// Smallest JPEG the segment parser accepts: SOI, a JFIF APP0, a
/// single-component SOS with a few scan bytes, EOI.
fn minimal_jpeg() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0xFF, 0xD8]);
    out.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn open(bytes: Vec<u8>) -> MetadataEditor {
    MetadataEditor::from_bytes(bytes, TagDescriptorTable::iim()).unwrap()
}

fn app13_contents(bytes: &[u8]) -> Option<Vec<u8>> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).unwrap();
    jpeg.segments()
        .iter()
        .find(|seg| seg.marker() == MARKER_APP13)
        .map(|seg| seg.contents().to_vec())
}

#[test]
fn fresh_editor_is_clean_and_empty() {
    let editor = open(minimal_jpeg());
    assert!(!editor.is_dirty());
    assert!(editor.iptc().is_empty());
    assert!(editor.resources().is_empty());
    assert!(editor.photoshop_segment().is_none());
    assert!(editor.xmp().is_none());
}

#[test]
fn set_title_dirties_only_iptc() {
    let mut editor = open(minimal_jpeg());
    editor.set_title("Morning Fog").unwrap();

    assert!(editor.iptc_state().is_dirty());
    assert!(!editor.exif_state().is_dirty());
    assert!(!editor.xmp_state().is_dirty());

    editor.bytes().unwrap();
    assert!(!editor.is_dirty());
}

#[test]
fn iptc_edit_survives_round_trip() {
    let mut editor = open(minimal_jpeg());
    editor.set_title("Morning Fog").unwrap();
    editor
        .set_keywords(vec!["fog".to_string(), "harbor".to_string()])
        .unwrap();
    let first = editor.bytes().unwrap();

    let reopened = open(first);
    let key = IptcKey::new(IptcRecord::Application, application::OBJECT_NAME);
    assert_eq!(
        reopened.iptc()[&key].value,
        IptcValue::Text("Morning Fog".to_string())
    );
    let key = IptcKey::new(IptcRecord::Application, application::KEYWORDS);
    assert_eq!(
        reopened.iptc()[&key].value,
        IptcValue::TextList(vec!["fog".to_string(), "harbor".to_string()])
    );

    // Overwrite and confirm the second edit replaces the first.
    let mut reopened = reopened;
    reopened.set_title("New Title").unwrap();
    let second = reopened.bytes().unwrap();
    let reopened = open(second);
    let key = IptcKey::new(IptcRecord::Application, application::OBJECT_NAME);
    assert_eq!(
        reopened.iptc()[&key].value,
        IptcValue::Text("New Title".to_string())
    );
}

/// A minimal JPEG carrying a Photoshop block with an IPTC payload
/// (ObjectName only) and a cached digest resource.
fn jpeg_with_iptc_and_digest() -> Vec<u8> {
    let mut iptc_payload = vec![0x1C, 2, application::OBJECT_NAME, 0, 11];
    iptc_payload.extend_from_slice(b"Morning Fog");

    let mut resources = ResourceMap::new();
    resources.insert(0x0404, PhotoshopResource::new(0x0404, iptc_payload));
    resources.insert(
        RESOURCE_IPTC_DIGEST,
        PhotoshopResource::new(RESOURCE_IPTC_DIGEST, vec![0xAB; 16]),
    );
    let block = psir::encode(&resources, true).unwrap();

    let mut jpeg = Jpeg::from_bytes(Bytes::from(minimal_jpeg())).unwrap();
    let segment = JpegSegment::new_with_contents(MARKER_APP13, Bytes::from(block));
    jpeg.segments_mut().insert(1, segment);
    jpeg.encoder().bytes().to_vec()
}

#[test]
fn mandatory_tags_injected_on_write() {
    let mut editor = open(jpeg_with_iptc_and_digest());
    assert!(editor.resources().contains_key(&RESOURCE_IPTC_DIGEST));
    editor.set_title("New Title").unwrap();
    let out = editor.bytes().unwrap();

    let reopened = open(out);
    let iptc = reopened.iptc();
    let get = |record, tag| &iptc[&IptcKey::new(record, tag)].value;

    assert_eq!(
        *get(IptcRecord::Envelope, envelope::RECORD_VERSION),
        IptcValue::U16(4)
    );
    assert_eq!(
        *get(IptcRecord::Envelope, envelope::FILE_FORMAT),
        IptcValue::U16(11)
    );
    assert_eq!(
        *get(IptcRecord::Envelope, envelope::CODED_CHARACTER_SET),
        IptcValue::Text("UTF8".to_string())
    );
    assert_eq!(
        *get(IptcRecord::Application, application::RECORD_VERSION),
        IptcValue::U16(4)
    );
    assert!(!reopened.resources().contains_key(&RESOURCE_IPTC_DIGEST));
    assert_eq!(
        *get(IptcRecord::Application, application::OBJECT_NAME),
        IptcValue::Text("New Title".to_string())
    );
}

#[test]
fn metadata_segments_precede_scan_data() {
    // The bare file has only APP0 and SOS, so naive insertion indices would
    // land every metadata segment inside the scan data.
    let mut editor = open(minimal_jpeg());
    editor.set_title("Morning Fog").unwrap();
    editor.set_xmp_title("Harborside");
    editor.set_exif_tag(ExifTag::ImageDescription("Morning Fog".to_string()));
    let out = editor.bytes().unwrap();

    let jpeg = Jpeg::from_bytes(Bytes::from(out)).unwrap();
    let sos = jpeg
        .segments()
        .iter()
        .position(|s| s.marker() == MARKER_SOS)
        .expect("scan data survives");
    let app13 = jpeg
        .segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP13)
        .expect("Photoshop segment survives reparse");
    assert!(app13 < sos);
    assert!(jpeg.exif().is_some());

    let reopened = open(jpeg.encoder().bytes().to_vec());
    let key = IptcKey::new(IptcRecord::Application, application::OBJECT_NAME);
    assert_eq!(
        reopened.iptc()[&key].value,
        IptcValue::Text("Morning Fog".to_string())
    );
    assert_eq!(
        reopened.xmp().and_then(|doc| doc.title()).as_deref(),
        Some("Harborside")
    );
}

#[test]
fn copy_exif_into_sparse_jpeg() {
    let mut source = open(minimal_jpeg());
    source.set_exif_tag(ExifTag::ImageDescription("Morning Fog".to_string()));
    let source_bytes = source.bytes().unwrap();

    // The destination has no room at the fixed EXIF index; insertion must
    // still land before the scan data.
    let mut dest = open(minimal_jpeg());
    dest.copy_metadata(
        &source_bytes,
        CopySections { exif: true, iptc: false, xmp: false },
    )
    .unwrap();
    let out = dest.bytes().unwrap();

    let jpeg = Jpeg::from_bytes(Bytes::from(out)).unwrap();
    assert!(jpeg.exif().is_some());
}

#[test]
fn rejects_value_with_wrong_shape() {
    let mut editor = open(minimal_jpeg());
    // ObjectName is a non-repeatable text tag; a list must be refused.
    let result = editor.set_iptc_tag(
        IptcRecord::Application,
        application::OBJECT_NAME,
        IptcValue::TextList(vec!["a".to_string(), "b".to_string()]),
    );
    assert!(result.is_err());
    assert!(!editor.is_dirty());
}

#[test]
fn copy_iptc_is_byte_exact() {
    let mut source = open(minimal_jpeg());
    source.set_title("Morning Fog").unwrap();
    source.set_credit("Example Wire").unwrap();
    let source_bytes = source.bytes().unwrap();
    let source_app13 = app13_contents(&source_bytes).expect("source has APP13");

    let mut dest = open(minimal_jpeg());
    dest.copy_metadata(
        &source_bytes,
        CopySections { exif: false, iptc: true, xmp: false },
    )
    .unwrap();
    // Copied sections are not edits, so no mandatory-tag injection runs.
    assert!(!dest.is_dirty());
    let dest_bytes = dest.bytes().unwrap();

    assert_eq!(app13_contents(&dest_bytes), Some(source_app13));

    let reopened = open(dest_bytes);
    let key = IptcKey::new(IptcRecord::Application, application::CREDIT);
    assert_eq!(
        reopened.iptc()[&key].value,
        IptcValue::Text("Example Wire".to_string())
    );
}

#[test]
fn xmp_edit_survives_round_trip() {
    let mut editor = open(minimal_jpeg());
    editor.set_xmp_title("Harborside");
    editor.set_xmp_keywords(&["fog".to_string(), "harbor".to_string()]);
    assert!(editor.xmp_state().is_dirty());
    let out = editor.bytes().unwrap();

    let reopened = open(out);
    let doc = reopened.xmp().expect("XMP packet present");
    assert_eq!(doc.title(), Some("Harborside".to_string()));
    assert_eq!(
        doc.keywords(),
        vec!["fog".to_string(), "harbor".to_string()]
    );
}

#[test]
fn exif_edit_produces_exif_segment() {
    let mut editor = open(minimal_jpeg());
    editor.set_exif_tag(ExifTag::ImageDescription("Morning Fog".to_string()));
    assert!(editor.exif_state().is_dirty());
    let out = editor.bytes().unwrap();

    let jpeg = Jpeg::from_bytes(Bytes::from(out)).unwrap();
    assert!(jpeg.exif().is_some());
}

#[test]
fn drop_iptc_removes_segment_and_is_idempotent() {
    let mut editor = open(minimal_jpeg());
    editor.set_title("Morning Fog").unwrap();
    let written = editor.bytes().unwrap();
    assert!(app13_contents(&written).is_some());

    let mut editor = open(written);
    editor.drop_iptc();
    editor.drop_iptc();
    assert!(!editor.is_dirty());
    let out = editor.bytes().unwrap();

    assert!(app13_contents(&out).is_none());
    let reopened = open(out);
    assert!(reopened.iptc().is_empty());
    assert!(reopened.photoshop_segment().is_none());
}

#[test]
fn drop_all_on_bare_image_is_a_no_op() {
    let mut editor = open(minimal_jpeg());
    editor.drop_all();
    assert!(!editor.is_dirty());
    let out = editor.bytes().unwrap();
    let reopened = open(out);
    assert!(reopened.iptc().is_empty());
    assert!(reopened.xmp().is_none());
}
