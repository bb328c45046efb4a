//! Error types shared by the codecs and the editor.

use thiserror::Error;

/// Errors that can occur while decoding, validating, or rewriting
/// JPEG-embedded metadata.
///
/// The variants fall into three groups:
///
/// - **Unrecoverable format errors** — the bytes are not what they claim to
///   be ([`BadMarker`](Self::BadMarker), [`BadSignature`](Self::BadSignature),
///   [`Truncated`](Self::Truncated)) or use a wire form this codec does not
///   implement ([`UnsupportedSize`](Self::UnsupportedSize),
///   [`SizeOverflow`](Self::SizeOverflow)).
/// - **Validation errors** — the bytes parse but the content is wrong for
///   its declared type ([`Value`](Self::Value)), or a caller passed a value
///   whose shape does not match the tag descriptor.
/// - **Recoverable lookups** — a section or tag simply is not there
///   ([`TagNotFound`](Self::TagNotFound), [`NoPrefix`](Self::NoPrefix),
///   [`NoData`](Self::NoData), [`NotFound`](Self::NotFound)); most call
///   sites treat these as "nothing to report".
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("bad IPTC dataset marker at offset {offset}: expected 0x1C, got {found:#04x}")]
    BadMarker { offset: usize, found: u8 },

    #[error("bad image resource signature at offset {offset}: expected \"8BIM\"")]
    BadSignature { offset: usize },

    #[error("truncated data: needed {needed} more bytes, but only {available} remain")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported extended size field: length-of-length {0} (only 4 is supported)")]
    UnsupportedSize(u16),

    #[error("payload of {0} bytes exceeds the maximum encodable dataset size")]
    SizeOverflow(usize),

    #[error("invalid value for {context}: {reason}")]
    Value { context: String, reason: String },

    #[error("nothing to encode: the resource map is empty")]
    NothingToEncode,

    #[error("no descriptor for IPTC tag {record}:{tag}")]
    TagNotFound { record: u8, tag: u8 },

    #[error("buffer does not start with the \"Photoshop 3.0\" prefix")]
    NoPrefix,

    #[error("Photoshop block is present but contains no resources")]
    NoData,

    #[error("no metadata section found")]
    NotFound,

    #[error("EXIF builder error: {0}")]
    Exif(String),

    #[error("JPEG container error: {0}")]
    Jpeg(#[from] img_parts::Error),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Shorthand for a [`Value`](Self::Value) error.
    pub(crate) fn value(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Value {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
