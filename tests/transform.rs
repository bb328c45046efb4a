//! Transforms must re-encode pixels without losing metadata sections.

use jpegmeta::editor::MetadataEditor;
use jpegmeta::iptc::{application, IptcKey, IptcRecord, IptcValue, TagDescriptorTable};
use jpegmeta::transform::{self, Rotation};

/// A real decodable JPEG (solid color) produced by the `image` encoder.
fn plain_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 140, 160]));
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90);
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .unwrap();
    out
}

/// The same, carrying an IPTC title and an XMP title.
fn tagged_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut editor =
        MetadataEditor::from_bytes(plain_jpeg(width, height), TagDescriptorTable::iim()).unwrap();
    editor.set_title("Morning Fog").unwrap();
    editor.set_xmp_title("Harborside");
    editor.bytes().unwrap()
}

fn assert_metadata_survived(bytes: Vec<u8>) {
    let editor = MetadataEditor::from_bytes(bytes, TagDescriptorTable::iim()).unwrap();
    let key = IptcKey::new(IptcRecord::Application, application::OBJECT_NAME);
    assert_eq!(
        editor.iptc()[&key].value,
        IptcValue::Text("Morning Fog".to_string())
    );
    assert_eq!(
        editor.xmp().and_then(|doc| doc.title()).as_deref(),
        Some("Harborside")
    );
}

#[test]
fn resize_keeps_iptc_and_xmp() {
    let out = transform::resize(&tagged_jpeg(32, 16), 16, 90).unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (16, 8));
    assert_metadata_survived(out);
}

#[test]
fn crop_keeps_iptc_and_xmp() {
    let out = transform::crop(&tagged_jpeg(32, 32), 4, 4, 16, 16, 90).unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (16, 16));
    assert_metadata_survived(out);
}

#[test]
fn rotate_keeps_iptc_and_xmp() {
    let out = transform::rotate(&tagged_jpeg(32, 16), Rotation::Cw90, 90).unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (16, 32));
    assert_metadata_survived(out);
}

#[test]
fn crop_rejects_an_out_of_bounds_rectangle() {
    assert!(transform::crop(&plain_jpeg(16, 16), 8, 8, 16, 16, 90).is_err());
}
