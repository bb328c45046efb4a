//! The Adobe Photoshop Image Resource Block container codec.
//!
//! Inside a JPEG this container lives in one APP13 segment and opens with
//! the literal `"Photoshop 3.0\0"` prefix, followed by resource records:
//!
//! ```text
//! ["8BIM"][id: u16 BE][name len: u8][name][pad to even][size: u32 BE][data][pad to even]
//! ```
//!
//! The name field (length byte + bytes + optional pad) always has even total
//! length, and resource data is padded to even length too. The IPTC-IIM
//! payload is carried as resource `0x0404`.

use std::collections::BTreeMap;

use img_parts::jpeg::Jpeg;

use crate::error::{MetadataError, Result};

/// Prefix that opens the container when it is embedded in a JPEG APP13
/// segment (14 bytes including the trailing NUL).
pub const PHOTOSHOP_PREFIX: &[u8] = b"Photoshop 3.0\0";

/// Fixed signature of every image resource record.
pub const RESOURCE_SIGNATURE: &[u8] = b"8BIM";

/// Resource id of the embedded IPTC-IIM dataset stream.
pub const RESOURCE_IPTC: u16 = 0x0404;

/// Resource id of the cached digest over the IPTC payload. Stale after any
/// IPTC rewrite, so the editor removes it whenever IPTC changes.
pub const RESOURCE_IPTC_DIGEST: u16 = 0x0425;

/// One named binary blob inside an image resource block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoshopResource {
    pub id: u16,
    /// Pascal-string name; empty for almost every resource in the wild.
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl PhotoshopResource {
    pub fn new(id: u16, data: Vec<u8>) -> Self {
        Self { id, name: Vec::new(), data }
    }
}

/// Resource map keyed by resource id. A duplicate id on the wire overwrites
/// the earlier occurrence; no diagnostics are raised.
pub type ResourceMap = BTreeMap<u16, PhotoshopResource>;

/// Decode an image resource block into a resource map.
///
/// With `expect_prefix`, the buffer must open with [`PHOTOSHOP_PREFIX`]
/// (`NoPrefix` otherwise). A block that parses cleanly but holds zero
/// resources reports `NoData` — "present but empty" is distinct from "no
/// block at all", which is the caller's call to make.
pub fn decode(data: &[u8], expect_prefix: bool) -> Result<ResourceMap> {
    let mut pos = 0usize;
    if expect_prefix {
        if !data.starts_with(PHOTOSHOP_PREFIX) {
            return Err(MetadataError::NoPrefix);
        }
        pos = PHOTOSHOP_PREFIX.len();
    }

    let mut resources = ResourceMap::new();
    while pos < data.len() {
        if data.len() - pos < 4 {
            return Err(MetadataError::Truncated { needed: 4, available: data.len() - pos });
        }
        if &data[pos..pos + 4] != RESOURCE_SIGNATURE {
            return Err(MetadataError::BadSignature { offset: pos });
        }
        pos += 4;

        let id = u16::from_be_bytes(read_array(data, &mut pos)?);

        let name_len = read_array::<1>(data, &mut pos)?[0] as usize;
        let name = read_slice(data, &mut pos, name_len)?.to_vec();
        // Length byte + name bytes padded to even total length.
        if (1 + name_len) % 2 != 0 {
            read_slice(data, &mut pos, 1)?;
        }

        let data_len = u32::from_be_bytes(read_array(data, &mut pos)?) as usize;
        let resource_data = read_slice(data, &mut pos, data_len)?.to_vec();
        if data_len % 2 != 0 {
            read_slice(data, &mut pos, 1)?;
        }

        resources.insert(id, PhotoshopResource { id, name, data: resource_data });
    }

    if resources.is_empty() {
        return Err(MetadataError::NoData);
    }
    Ok(resources)
}

/// Encode a resource map back into an image resource block.
///
/// Resources are emitted ascending by id; padding mirrors [`decode`]
/// exactly, so `encode(decode(encode(r)))` is byte-length stable.
pub fn encode(resources: &ResourceMap, add_prefix: bool) -> Result<Vec<u8>> {
    if resources.is_empty() {
        return Err(MetadataError::NothingToEncode);
    }

    let mut out = Vec::new();
    if add_prefix {
        out.extend_from_slice(PHOTOSHOP_PREFIX);
    }
    for resource in resources.values() {
        if resource.name.len() > u8::MAX as usize {
            return Err(MetadataError::value(
                format!("resource {:#06x}", resource.id),
                format!("name of {} bytes exceeds the 255-byte limit", resource.name.len()),
            ));
        }
        let data_len = u32::try_from(resource.data.len())
            .map_err(|_| MetadataError::SizeOverflow(resource.data.len()))?;

        out.extend_from_slice(RESOURCE_SIGNATURE);
        out.extend_from_slice(&resource.id.to_be_bytes());
        out.push(resource.name.len() as u8);
        out.extend_from_slice(&resource.name);
        if (1 + resource.name.len()) % 2 != 0 {
            out.push(0);
        }
        out.extend_from_slice(&data_len.to_be_bytes());
        out.extend_from_slice(&resource.data);
        if resource.data.len() % 2 != 0 {
            out.push(0);
        }
    }
    Ok(out)
}

/// Find the Photoshop block among a JPEG's segments.
///
/// Tries a prefixed [`decode`] on each segment in order. The first segment
/// that decodes is the container. A segment with the right prefix but zero
/// resources stops the scan with `NoData`; no prefixed segment at all is
/// `NotFound`.
pub fn locate_in_jpeg(jpeg: &Jpeg) -> Result<(usize, ResourceMap)> {
    for (index, segment) in jpeg.segments().iter().enumerate() {
        match decode(segment.contents(), true) {
            Ok(resources) => {
                log::debug!(
                    "found Photoshop block in segment {index} ({} resources)",
                    resources.len()
                );
                return Ok((index, resources));
            }
            Err(MetadataError::NoPrefix) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(MetadataError::NotFound)
}

fn read_array<const N: usize>(data: &[u8], pos: &mut usize) -> Result<[u8; N]> {
    let slice = read_slice(data, pos, N)?;
    // read_slice guarantees the length.
    Ok(slice.try_into().unwrap())
}

fn read_slice<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    if data.len() - *pos < len {
        return Err(MetadataError::Truncated { needed: len, available: data.len() - *pos });
    }
    let slice = &data[*pos..*pos + len];
    *pos += len;
    Ok(slice)
}
