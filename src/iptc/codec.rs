//! The IPTC-IIM wire codec.
//!
//! Wire format, repeated until EOF:
//!
//! ```text
//! [0x1C][record: u8][tag: u8][size: u16 BE | (0x8004)(size: u32 BE)][payload]
//! ```
//!
//! The high bit of the 16-bit size field flags the extended form; the low 15
//! bits then give the length of the length field, of which only `4` (a
//! big-endian `u32`) is implemented. Unknown `(record, tag)` pairs are
//! skipped with a warning — lenient toward extensions, strict toward
//! malformed data we do recognize.

use std::collections::BTreeMap;

use crate::error::{MetadataError, Result};

use super::{
    IptcDataset, IptcKey, IptcRecord, IptcRecordMap, IptcTagType, IptcValue, TagDescriptorTable,
};

/// Dataset marker byte that opens every IIM dataset.
const DATASET_MARKER: u8 = 0x1C;

/// Largest payload the short 2-byte size form can carry.
const SHORT_SIZE_MAX: usize = 0x7FFF;

/// The extended size form we emit: high bit set, length-of-length 4.
const EXTENDED_SIZE_FLAG: u16 = 0x8004;

/// Encoder/decoder for the IIM dataset stream.
///
/// The descriptor table is injected at construction and consulted for every
/// dataset on decode; encode works from the type information the datasets
/// already carry.
#[derive(Debug, Clone)]
pub struct IptcCodec {
    table: TagDescriptorTable,
}

impl IptcCodec {
    pub fn new(table: TagDescriptorTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TagDescriptorTable {
        &self.table
    }

    /// Decode an IIM dataset stream into a typed record map.
    ///
    /// Clean EOF after zero or more datasets is success. Repeated wire
    /// occurrences of one key accumulate in encounter order; for a
    /// non-repeatable descriptor the first occurrence is canonical and the
    /// rest are dropped.
    pub fn decode(&self, data: &[u8]) -> Result<IptcRecordMap> {
        let mut pos = 0usize;
        // Scalar elements per key, in encounter order.
        let mut accum: BTreeMap<IptcKey, Vec<IptcValue>> = BTreeMap::new();

        while pos < data.len() {
            if data.len() - pos < 5 {
                return Err(MetadataError::Truncated {
                    needed: 5,
                    available: data.len() - pos,
                });
            }
            if data[pos] != DATASET_MARKER {
                return Err(MetadataError::BadMarker {
                    offset: pos,
                    found: data[pos],
                });
            }
            let record_byte = data[pos + 1];
            let tag = data[pos + 2];
            let size = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
            pos += 5;

            let payload_len = if size & 0x8000 != 0 {
                let length_of_length = size & 0x7FFF;
                if length_of_length != 4 {
                    return Err(MetadataError::UnsupportedSize(length_of_length));
                }
                if data.len() - pos < 4 {
                    return Err(MetadataError::Truncated {
                        needed: 4,
                        available: data.len() - pos,
                    });
                }
                let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
                pos += 4;
                len as usize
            } else {
                size as usize
            };

            if data.len() - pos < payload_len {
                return Err(MetadataError::Truncated {
                    needed: payload_len,
                    available: data.len() - pos,
                });
            }
            let payload = &data[pos..pos + payload_len];
            pos += payload_len;

            let descriptor = IptcRecord::from_u8(record_byte)
                .and_then(|record| self.table.get(record, tag).map(|d| (record, d)));
            let Some((record, descriptor)) = descriptor else {
                log::warn!("skipping unknown IPTC dataset {record_byte}:{tag} ({payload_len} bytes)");
                continue;
            };

            let element = decode_element(descriptor.tag_type, payload, record, tag)?;
            accum.entry(IptcKey::new(record, tag)).or_default().push(element);
        }

        let mut map = IptcRecordMap::new();
        for (key, elements) in accum {
            let Some(descriptor) = self.table.get(key.record, key.tag) else {
                continue;
            };
            let value = if descriptor.repeatable {
                collect_list(elements)
            } else {
                match elements.into_iter().next() {
                    Some(first) => first,
                    None => continue,
                }
            };
            map.insert(
                key,
                IptcDataset {
                    record: key.record,
                    tag: key.tag,
                    tag_type: descriptor.tag_type,
                    repeatable: descriptor.repeatable,
                    value,
                },
            );
        }
        Ok(map)
    }

    /// Encode a record map back into an IIM dataset stream.
    ///
    /// Datasets are emitted ascending by `(record, tag)`; a repeatable entry
    /// yields one independently framed dataset per list element.
    pub fn encode(&self, map: &IptcRecordMap) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for dataset in map.values() {
            for element in element_payloads(dataset)? {
                let element = element?;
                out.push(DATASET_MARKER);
                out.push(dataset.record as u8);
                out.push(dataset.tag);
                if element.len() <= SHORT_SIZE_MAX {
                    out.extend_from_slice(&(element.len() as u16).to_be_bytes());
                } else {
                    let len = u32::try_from(element.len())
                        .map_err(|_| MetadataError::SizeOverflow(element.len()))?;
                    out.extend_from_slice(&EXTENDED_SIZE_FLAG.to_be_bytes());
                    out.extend_from_slice(&len.to_be_bytes());
                }
                out.extend_from_slice(&element);
            }
        }
        Ok(out)
    }
}

/// Decode one payload into its scalar value per the descriptor type.
fn decode_element(
    tag_type: IptcTagType,
    payload: &[u8],
    record: IptcRecord,
    tag: u8,
) -> Result<IptcValue> {
    let context = || format!("IPTC {}:{tag}", record as u8);
    match tag_type {
        IptcTagType::Text => Ok(IptcValue::Text(
            String::from_utf8_lossy(payload).into_owned(),
        )),
        IptcTagType::Digits => {
            if !payload.iter().all(u8::is_ascii_digit) {
                return Err(MetadataError::value(context(), "non-digit content in a digits tag"));
            }
            Ok(IptcValue::Text(String::from_utf8_lossy(payload).into_owned()))
        }
        IptcTagType::U8 => match payload {
            [b] => Ok(IptcValue::U8(*b)),
            _ => Err(MetadataError::value(
                context(),
                format!("expected 1 byte for a u8 tag, got {}", payload.len()),
            )),
        },
        IptcTagType::U16 => match payload {
            [a, b] => Ok(IptcValue::U16(u16::from_be_bytes([*a, *b]))),
            _ => Err(MetadataError::value(
                context(),
                format!("expected 2 bytes for a u16 tag, got {}", payload.len()),
            )),
        },
        IptcTagType::U32 => match payload {
            [a, b, c, d] => Ok(IptcValue::U32(u32::from_be_bytes([*a, *b, *c, *d]))),
            _ => Err(MetadataError::value(
                context(),
                format!("expected 4 bytes for a u32 tag, got {}", payload.len()),
            )),
        },
        IptcTagType::Undefined => Ok(IptcValue::Blob(payload.to_vec())),
    }
}

/// Fold scalar elements into the matching list variant.
fn collect_list(elements: Vec<IptcValue>) -> IptcValue {
    // All elements share a variant: they were decoded by one descriptor.
    match elements.first() {
        Some(IptcValue::Text(_)) => IptcValue::TextList(
            elements
                .into_iter()
                .filter_map(|v| match v {
                    IptcValue::Text(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(IptcValue::U8(_)) => IptcValue::U8List(
            elements
                .into_iter()
                .filter_map(|v| match v {
                    IptcValue::U8(n) => Some(n),
                    _ => None,
                })
                .collect(),
        ),
        Some(IptcValue::U16(_)) => IptcValue::U16List(
            elements
                .into_iter()
                .filter_map(|v| match v {
                    IptcValue::U16(n) => Some(n),
                    _ => None,
                })
                .collect(),
        ),
        Some(IptcValue::U32(_)) => IptcValue::U32List(
            elements
                .into_iter()
                .filter_map(|v| match v {
                    IptcValue::U32(n) => Some(n),
                    _ => None,
                })
                .collect(),
        ),
        Some(IptcValue::Blob(_)) => IptcValue::BlobList(
            elements
                .into_iter()
                .filter_map(|v| match v {
                    IptcValue::Blob(b) => Some(b),
                    _ => None,
                })
                .collect(),
        ),
        _ => IptcValue::BlobList(Vec::new()),
    }
}

/// The wire payload for each element of a dataset, scalar or list.
fn element_payloads(
    dataset: &IptcDataset,
) -> Result<Box<dyn Iterator<Item = Result<Vec<u8>>> + '_>> {
    let context = format!("IPTC {}:{}", dataset.record as u8, dataset.tag);

    fn digits_payload(s: &str, context: &str) -> Result<Vec<u8>> {
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MetadataError::value(context, "non-digit content in a digits tag"));
        }
        Ok(s.as_bytes().to_vec())
    }

    let text_payload = move |s: &str| -> Result<Vec<u8>> {
        match dataset.tag_type {
            IptcTagType::Digits => digits_payload(s, &context),
            _ => Ok(s.as_bytes().to_vec()),
        }
    };

    let iter: Box<dyn Iterator<Item = Result<Vec<u8>>> + '_> = match &dataset.value {
        IptcValue::Text(s) => Box::new(std::iter::once(text_payload(s))),
        IptcValue::TextList(list) => Box::new(list.iter().map(move |s| text_payload(s))),
        IptcValue::U8(n) => Box::new(std::iter::once(Ok(vec![*n]))),
        IptcValue::U8List(list) => Box::new(list.iter().map(|n| Ok(vec![*n]))),
        IptcValue::U16(n) => Box::new(std::iter::once(Ok(n.to_be_bytes().to_vec()))),
        IptcValue::U16List(list) => Box::new(list.iter().map(|n| Ok(n.to_be_bytes().to_vec()))),
        IptcValue::U32(n) => Box::new(std::iter::once(Ok(n.to_be_bytes().to_vec()))),
        IptcValue::U32List(list) => Box::new(list.iter().map(|n| Ok(n.to_be_bytes().to_vec()))),
        IptcValue::Blob(b) => Box::new(std::iter::once(Ok(b.clone()))),
        IptcValue::BlobList(list) => Box::new(list.iter().map(|b| Ok(b.clone()))),
    };
    Ok(iter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptc::{IptcTagDescriptor, application};

    /// A small synthetic table: a title, a repeatable keyword, a version
    /// number, a date, and a raw blob.
    fn test_table() -> TagDescriptorTable {
        use IptcRecord::*;
        use IptcTagType::*;
        let mut t = TagDescriptorTable::new();
        t.insert(Application, 0, IptcTagDescriptor {
            tag_type: U16, repeatable: false, min_len: 2, max_len: 2, mandatory: true,
        });
        t.insert(Application, 5, IptcTagDescriptor {
            tag_type: Text, repeatable: false, min_len: 0, max_len: 64, mandatory: false,
        });
        t.insert(Application, 25, IptcTagDescriptor {
            tag_type: Text, repeatable: true, min_len: 0, max_len: 64, mandatory: false,
        });
        t.insert(Application, 55, IptcTagDescriptor {
            tag_type: Digits, repeatable: false, min_len: 8, max_len: 8, mandatory: false,
        });
        t.insert(ObjectData, 10, IptcTagDescriptor {
            tag_type: Undefined, repeatable: false, min_len: 0, max_len: usize::MAX, mandatory: false,
        });
        t
    }

    fn codec() -> IptcCodec {
        IptcCodec::new(test_table())
    }

    fn dataset(record: IptcRecord, tag: u8, tag_type: IptcTagType, repeatable: bool, value: IptcValue) -> IptcDataset {
        IptcDataset { record, tag, tag_type, repeatable, value }
    }

    fn frame(record: u8, tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0x1C, record, tag];
        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn decodes_empty_stream() {
        assert!(codec().decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn round_trips_a_record_map() {
        let codec = codec();
        let mut map = IptcRecordMap::new();
        map.insert(
            IptcKey::new(IptcRecord::Application, 5),
            dataset(IptcRecord::Application, 5, IptcTagType::Text, false,
                IptcValue::Text("Morning Fog".into())),
        );
        map.insert(
            IptcKey::new(IptcRecord::Application, 25),
            dataset(IptcRecord::Application, 25, IptcTagType::Text, true,
                IptcValue::TextList(vec!["fog".into(), "coast".into(), "dawn".into()])),
        );
        map.insert(
            IptcKey::new(IptcRecord::Application, 0),
            dataset(IptcRecord::Application, 0, IptcTagType::U16, false, IptcValue::U16(4)),
        );

        let wire = codec.encode(&map).unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn emits_datasets_in_ascending_tag_order() {
        let codec = codec();
        let mut map = IptcRecordMap::new();
        map.insert(
            IptcKey::new(IptcRecord::Application, 25),
            dataset(IptcRecord::Application, 25, IptcTagType::Text, true,
                IptcValue::TextList(vec!["zzz".into()])),
        );
        map.insert(
            IptcKey::new(IptcRecord::Application, 0),
            dataset(IptcRecord::Application, 0, IptcTagType::U16, false, IptcValue::U16(4)),
        );

        let wire = codec.encode(&map).unwrap();
        // Tag 0 frames first even though it was inserted second.
        assert_eq!(&wire[..3], &[0x1C, 2, 0]);
    }

    #[test]
    fn repeated_wire_keys_accumulate_in_order() {
        let codec = codec();
        let mut wire = frame(2, 25, b"first");
        wire.extend(frame(2, 25, b"second"));
        let map = codec.decode(&wire).unwrap();
        let value = &map[&IptcKey::new(IptcRecord::Application, 25)].value;
        assert_eq!(value, &IptcValue::TextList(vec!["first".into(), "second".into()]));
    }

    #[test]
    fn non_repeatable_keeps_first_occurrence() {
        let codec = codec();
        let mut wire = frame(2, 5, b"canonical");
        wire.extend(frame(2, 5, b"ignored"));
        let map = codec.decode(&wire).unwrap();
        let value = &map[&IptcKey::new(IptcRecord::Application, 5)].value;
        assert_eq!(value, &IptcValue::Text("canonical".into()));
    }

    #[test]
    fn skips_unknown_tags_without_error() {
        let codec = codec();
        let mut wire = frame(2, 5, b"kept");
        wire.extend(frame(2, 199, b"mystery")); // no descriptor for 2:199
        wire.extend(frame(6, 5, b"bad record")); // 6 is not an IIM record
        let map = codec.decode(&wire).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&IptcKey::new(IptcRecord::Application, 5)));
    }

    #[test]
    fn rejects_bad_marker() {
        let err = codec().decode(&[0x1D, 2, 5, 0, 0]).unwrap_err();
        assert!(matches!(err, MetadataError::BadMarker { offset: 0, found: 0x1D }));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut wire = frame(2, 5, b"full payload");
        wire.truncate(wire.len() - 3);
        let err = codec().decode(&wire).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
    }

    #[test]
    fn short_form_covers_exactly_32767_bytes() {
        let codec = codec();
        let mut map = IptcRecordMap::new();
        map.insert(
            IptcKey::new(IptcRecord::ObjectData, 10),
            dataset(IptcRecord::ObjectData, 10, IptcTagType::Undefined, false,
                IptcValue::Blob(vec![0xAA; 32767])),
        );
        let wire = codec.encode(&map).unwrap();
        // marker + record + tag + 2-byte size
        assert_eq!(wire.len(), 5 + 32767);
        assert_eq!(&wire[3..5], &0x7FFFu16.to_be_bytes());
        assert_eq!(codec.decode(&wire).unwrap(), map);
    }

    #[test]
    fn extended_form_starts_at_32768_bytes() {
        let codec = codec();
        let mut map = IptcRecordMap::new();
        map.insert(
            IptcKey::new(IptcRecord::ObjectData, 10),
            dataset(IptcRecord::ObjectData, 10, IptcTagType::Undefined, false,
                IptcValue::Blob(vec![0xBB; 32768])),
        );
        let wire = codec.encode(&map).unwrap();
        // marker + record + tag + 2-byte flag + 4-byte length
        assert_eq!(wire.len(), 9 + 32768);
        assert_eq!(&wire[3..5], &0x8004u16.to_be_bytes());
        assert_eq!(&wire[5..9], &32768u32.to_be_bytes());
        assert_eq!(codec.decode(&wire).unwrap(), map);
    }

    #[test]
    fn rejects_unsupported_length_of_length() {
        // Length-of-length 8 (0x8008) is not implemented.
        let wire = [0x1C, 2, 5, 0x80, 0x08, 0, 0, 0, 0, 0, 0, 0, 1, 0xFF];
        let err = codec().decode(&wire).unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedSize(8)));
    }

    #[test]
    fn rejects_non_digit_content_for_digits_tags() {
        let wire = frame(2, 55, b"2026-08!");
        let err = codec().decode(&wire).unwrap_err();
        assert!(matches!(err, MetadataError::Value { .. }));

        let mut map = IptcRecordMap::new();
        map.insert(
            IptcKey::new(IptcRecord::Application, 55),
            dataset(IptcRecord::Application, 55, IptcTagType::Digits, false,
                IptcValue::Text("2026x831".into())),
        );
        assert!(matches!(codec().encode(&map), Err(MetadataError::Value { .. })));
    }

    #[test]
    fn rejects_wrong_width_for_integer_tags() {
        let wire = frame(2, 0, &[0x00, 0x04, 0x00]); // 3 bytes for a u16 tag
        let err = codec().decode(&wire).unwrap_err();
        assert!(matches!(err, MetadataError::Value { .. }));
    }

    #[test]
    fn production_table_decodes_object_name() {
        let codec = IptcCodec::new(TagDescriptorTable::iim());
        let wire = frame(2, application::OBJECT_NAME, b"Morning Fog");
        let map = codec.decode(&wire).unwrap();
        let value = &map[&IptcKey::new(IptcRecord::Application, application::OBJECT_NAME)].value;
        assert_eq!(value, &IptcValue::Text("Morning Fog".into()));
    }
}
