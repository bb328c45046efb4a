//! Metadata-preserving image transforms.
//!
//! Thin convenience layer: pixels go through the `image` crate, then the
//! EXIF/IPTC/XMP segments are copied over from the original bytes so a
//! resize or crop never silently strips metadata.

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::editor::{CopySections, MetadataEditor};
use crate::error::{MetadataError, Result};
use crate::iptc::TagDescriptorTable;

/// Quarter-turn rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Cw90,
    Cw180,
    Cw270,
}

/// Resize so the longest edge fits `max_dim`, preserving aspect ratio and
/// all metadata sections.
pub fn resize(bytes: &[u8], max_dim: u32, quality: u8) -> Result<Vec<u8>> {
    if max_dim == 0 {
        return Err(MetadataError::value("resize", "max dimension must be non-zero"));
    }
    let img = image::load_from_memory(bytes)?;
    let resized = img.resize(max_dim, max_dim, FilterType::Lanczos3);
    reencode_with_metadata(&resized, bytes, quality)
}

/// Crop to the given pixel rectangle, preserving all metadata sections.
pub fn crop(bytes: &[u8], x: u32, y: u32, width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    if width == 0
        || height == 0
        || x.checked_add(width).is_none_or(|right| right > img.width())
        || y.checked_add(height).is_none_or(|bottom| bottom > img.height())
    {
        return Err(MetadataError::value(
            "crop",
            format!(
                "rectangle {width}x{height}+{x}+{y} outside image {}x{}",
                img.width(),
                img.height()
            ),
        ));
    }
    let cropped = img.crop_imm(x, y, width, height);
    reencode_with_metadata(&cropped, bytes, quality)
}

/// Rotate by a quarter turn, preserving all metadata sections.
pub fn rotate(bytes: &[u8], rotation: Rotation, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let rotated = match rotation {
        Rotation::Cw90 => img.rotate90(),
        Rotation::Cw180 => img.rotate180(),
        Rotation::Cw270 => img.rotate270(),
    };
    reencode_with_metadata(&rotated, bytes, quality)
}

/// Encode the transformed pixels as JPEG and copy the metadata segments
/// over from the original byte stream.
fn reencode_with_metadata(img: &DynamicImage, original: &[u8], quality: u8) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    img.write_with_encoder(encoder)?;

    let mut editor = MetadataEditor::from_bytes(encoded, TagDescriptorTable::iim())?;
    editor.copy_metadata(original, CopySections::all())?;
    editor.bytes()
}
