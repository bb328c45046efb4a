//! # jpegmeta
//!
//! JPEG metadata editor — read, edit, and rewrite the EXIF, IPTC-IIM, and
//! XMP blocks embedded in a JPEG byte stream, plus metadata-preserving
//! resize/crop/rotate convenience transforms.
//!
//! Two binary formats are implemented from scratch: the IPTC IIM dataset
//! stream ([`iptc`]) and the Adobe Photoshop Image Resource Block container
//! that carries it inside a JPEG APP13 segment ([`psir`]). On top of them,
//! [`editor::MetadataEditor`] keeps the three sections consistent, tracks
//! per-section dirtiness, injects the mandatory IIM tags on write, and
//! re-serializes only what changed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jpegmeta::editor::{CopySections, MetadataEditor};
//! use jpegmeta::iptc::TagDescriptorTable;
//!
//! fn main() -> jpegmeta::Result<()> {
//!     let bytes = std::fs::read("photo.jpg")?;
//!     let mut editor = MetadataEditor::from_bytes(bytes, TagDescriptorTable::iim())?;
//!
//!     // Typed edits across the three sections
//!     editor.set_title("Morning Fog")?;
//!     editor.set_keywords(vec!["fog".into(), "coast".into()])?;
//!     editor.set_xmp_rating(4)?;
//!
//!     // Or copy whole sections from another file
//!     let donor = std::fs::read("donor.jpg")?;
//!     editor.copy_metadata(&donor, CopySections { xmp: true, ..Default::default() })?;
//!
//!     editor.write_file("photo.jpg".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Reading
//!
//! ```rust,no_run
//! use jpegmeta::iptc::TagDescriptorTable;
//! use jpegmeta::summary::read_summary;
//! use std::path::Path;
//!
//! fn main() -> jpegmeta::Result<()> {
//!     let summary = read_summary(Path::new("photo.jpg"), TagDescriptorTable::iim())?;
//!     println!("Title: {:?}", summary.title);
//!     println!("Keywords: {:?}", summary.keywords);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`iptc`] — IIM data model, descriptor tables, and the dataset codec
//! - [`psir`] — Photoshop Image Resource Block container codec
//! - [`xmp`] — string-level XMP packet model
//! - [`editor`] — the metadata editor over a parsed JPEG
//! - [`summary`] — lenient merged extraction across all three sections
//! - [`transform`] — metadata-preserving resize/crop/rotate
//! - [`config`] — CLI configuration loading/saving

pub mod config;
pub mod editor;
pub mod error;
pub mod iptc;
pub mod psir;
pub mod summary;
pub mod transform;
pub mod xmp;

pub use error::{MetadataError, Result};
