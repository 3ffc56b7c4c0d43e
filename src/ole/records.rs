//! Slideshow and OfficeArt record decomposition.
//!
//! The `PowerPoint Document` stream is a flat sequence of records, each with
//! an 8-byte header; records with version `0xF` are containers whose body is
//! itself a record sequence. Decomposition turns the stream into
//! [`RecordEntry`] nodes and reports the records that may carry an embedded
//! container.

use super::consts::{
    EX_OLE_OBJ_STG_COMPRESSED, PROP_METRO_BLOB, PROPERTY_ID_MASK, PROPERTY_IS_COMPLEX,
    RECORD_CONTAINER_VERSION, RECORD_HEADER_SIZE, RT_EX_OLE_OBJ_STG, RT_TERTIARY_OPT, record_name,
};
use crate::common::error::{Error, Result};
use crate::resolver::{Candidate, Detection};
use crate::tree::{Activation, LeafState, SourceType, escape_name};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use serde_json::json;
use std::io::Read;
use tracing::debug;
use zerocopy::{
    FromBytes,
    byteorder::{LittleEndian, U16, U32},
};

/// Upper bound on the pre-allocation for an inflated embedded storage.
const MAX_INFLATE_HINT: usize = 64 * 1024 * 1024;

/// The fixed 8-byte header in front of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Low 4 bits of the first word
    pub version: u8,
    /// High 12 bits of the first word
    pub instance: u16,
    pub rec_type: u16,
    /// Declared body length
    pub length: u32,
}

impl RecordHeader {
    /// Parse a header from the start of `data`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < RECORD_HEADER_SIZE {
            return None;
        }
        let version_instance = U16::<LittleEndian>::read_from_bytes(&data[0..2]).ok()?.get();
        let rec_type = U16::<LittleEndian>::read_from_bytes(&data[2..4]).ok()?.get();
        let length = U32::<LittleEndian>::read_from_bytes(&data[4..8]).ok()?.get();

        Some(Self {
            version: (version_instance & 0x000F) as u8,
            instance: (version_instance >> 4) & 0x0FFF,
            rec_type,
            length,
        })
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.version == RECORD_CONTAINER_VERSION
    }

    /// Registered name, or `Unknown 0xXXXX`.
    pub fn label(&self) -> String {
        match record_name(self.rec_type) {
            Some(name) => name.to_string(),
            None => format!("Unknown 0x{:04X}", self.rec_type),
        }
    }
}

/// One record of a decomposed stream.
#[derive(Debug)]
pub struct RecordEntry {
    header: RecordHeader,
    /// Offset of the header within the decomposed stream
    offset: usize,
    /// Header and body, clamped to what the stream holds
    bytes: Bytes,
    pub(crate) state: LeafState,
}

impl RecordEntry {
    fn new(header: RecordHeader, offset: usize, bytes: Bytes) -> Self {
        Self {
            header,
            offset,
            bytes,
            state: LeafState::default(),
        }
    }

    pub fn name(&self) -> String {
        format!("{} ({} b)", escape_name(&self.header.label()), self.bytes.len())
    }

    #[inline]
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Header and body bytes.
    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    fn body(&self) -> &[u8] {
        &self.bytes[RECORD_HEADER_SIZE.min(self.bytes.len())..]
    }

    pub(crate) fn activate(&self, activation: &mut Activation) {
        let properties = json!({
            "type": format!("0x{:04X}", self.header.rec_type),
            "name": self.header.label(),
            "version": self.header.version,
            "instance": self.header.instance,
            "length": self.header.length,
            "offset": self.offset,
        });
        activation.set_payload(self.bytes.clone(), SourceType::Octet);
        activation.set_file_name(format!("{}.rec", self.name()));
        activation.set_properties(Some(properties.to_string()));
    }

    /// Bytes this record may embed a container in, with how to detect it.
    pub(crate) fn embedded_candidate(&self) -> Result<Option<Candidate>> {
        let header = &self.header;
        match header.rec_type {
            RT_TERTIARY_OPT => Ok(tertiary_metro_blob(header, self.body()).map(|blob| Candidate {
                detection: Detection::TaggedBlob,
                data: self.bytes.slice_ref(blob),
                stem: format!("metro-{}", header.rec_type),
                suffix: ".dat".to_string(),
            })),
            RT_EX_OLE_OBJ_STG => {
                let data = ex_ole_obj_storage(header, self.body())?;
                Ok(Some(Candidate {
                    detection: Detection::Sniff,
                    data: data.unwrap_or_else(|| self.bytes.slice(RECORD_HEADER_SIZE..)),
                    stem: format!("embed-{}", self.offset),
                    suffix: ".dat".to_string(),
                }))
            },
            _ if self.is_placeholder() => Ok(Some(Candidate {
                detection: Detection::SkipHeader(RECORD_HEADER_SIZE),
                data: self.bytes.clone(),
                stem: header.label().replace(' ', "_"),
                suffix: ".zip".to_string(),
            })),
            _ => Ok(None),
        }
    }

    /// An unregistered atom whose body could hold more than a header.
    fn is_placeholder(&self) -> bool {
        record_name(self.header.rec_type).is_none()
            && !self.header.is_container()
            && self.body().len() > RECORD_HEADER_SIZE
    }
}

/// Locate the group-shape metro blob among a tertiary options record's
/// complex property data.
fn tertiary_metro_blob<'a>(header: &RecordHeader, body: &'a [u8]) -> Option<&'a [u8]> {
    let count = header.instance as usize;
    let table_len = count.checked_mul(6)?;
    if table_len > body.len() {
        debug!(count, len = body.len(), "truncated property table");
        return None;
    }

    let mut complex_offset = table_len;
    for i in 0..count {
        let entry = &body[i * 6..i * 6 + 6];
        let id = U16::<LittleEndian>::read_from_bytes(&entry[0..2]).ok()?.get();
        let value = U32::<LittleEndian>::read_from_bytes(&entry[2..6]).ok()?.get() as usize;
        if id & PROPERTY_IS_COMPLEX == 0 {
            continue;
        }

        let end = complex_offset.saturating_add(value).min(body.len());
        if id & PROPERTY_ID_MASK == PROP_METRO_BLOB {
            return (end > complex_offset).then(|| &body[complex_offset..end]);
        }
        complex_offset = end;
    }
    None
}

/// Body of an embedded storage record, inflated when compressed.
///
/// Returns `None` when the body is stored uncompressed.
fn ex_ole_obj_storage(header: &RecordHeader, body: &[u8]) -> Result<Option<Bytes>> {
    if header.instance != EX_OLE_OBJ_STG_COMPRESSED {
        return Ok(None);
    }
    if body.len() < 4 {
        return Err(Error::EmbeddedExtraction(
            "compressed storage shorter than its length prefix".to_string(),
        ));
    }

    let expected = U32::<LittleEndian>::read_from_bytes(&body[0..4])
        .map(|v| v.get() as usize)
        .unwrap_or(0);
    let mut inflated = Vec::with_capacity(expected.min(MAX_INFLATE_HINT));
    ZlibDecoder::new(&body[4..])
        .read_to_end(&mut inflated)
        .map_err(|e| Error::EmbeddedExtraction(format!("inflating embedded storage: {}", e)))?;

    if inflated.len() != expected {
        debug!(expected, actual = inflated.len(), "inflated size differs from declared size");
    }
    Ok(Some(Bytes::from(inflated)))
}

/// Split `data` into records, depth first.
///
/// Each item carries the index of its parent record in the returned list, or
/// `None` for top-level records. Container bodies are descended into at most
/// `max_depth` levels; a record running past its enclosing data is clamped.
pub fn decompose(data: &Bytes, max_depth: usize) -> Vec<(Option<usize>, RecordEntry)> {
    let mut records = Vec::new();
    decompose_into(data, 0, data.len(), None, 0, max_depth, &mut records);
    records
}

fn decompose_into(
    data: &Bytes,
    start: usize,
    end: usize,
    parent: Option<usize>,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<(Option<usize>, RecordEntry)>,
) {
    let mut offset = start;
    while offset + RECORD_HEADER_SIZE <= end {
        let Some(header) = RecordHeader::parse(&data[offset..end]) else {
            break;
        };
        let body_start = offset + RECORD_HEADER_SIZE;
        let body_end = body_start.saturating_add(header.length as usize).min(end);
        if body_end - body_start < header.length as usize {
            debug!(
                offset,
                rec_type = header.rec_type,
                declared = header.length,
                "record truncated"
            );
        }

        let index = out.len();
        out.push((parent, RecordEntry::new(header, offset, data.slice(offset..body_end))));

        if header.is_container() {
            if depth < max_depth {
                decompose_into(data, body_start, body_end, Some(index), depth + 1, max_depth, out);
            } else {
                debug!(offset, depth, "record nesting limit reached");
            }
        }
        offset = body_end;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Serialize one record.
    pub(crate) fn record(version: u8, instance: u16, rec_type: u16, body: &[u8]) -> Vec<u8> {
        let vi = (version as u16 & 0x000F) | (instance << 4);
        let mut out = Vec::with_capacity(8 + body.len());
        out.extend_from_slice(&vi.to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_header_parse() {
        let raw = record(0x0F, 0x123, 0x03E8, &[]);
        let header = RecordHeader::parse(&raw).unwrap();
        assert_eq!(header.version, 0x0F);
        assert_eq!(header.instance, 0x123);
        assert_eq!(header.rec_type, 0x03E8);
        assert_eq!(header.length, 0);
        assert!(header.is_container());
        assert_eq!(header.label(), "Document");
        assert!(RecordHeader::parse(&raw[..7]).is_none());
    }

    #[test]
    fn test_decompose_nested() {
        let atom = record(0, 0, 0x0FA0, b"hi");
        let inner = record(0x0F, 0, 0x0FF0, &atom);
        let mut data = record(0x0F, 0, 0x03E8, &inner);
        data.extend(record(0, 0, 0x0FA0, b"tail"));
        let data = Bytes::from(data);

        let records = decompose(&data, 32);
        let shape: Vec<_> = records
            .iter()
            .map(|(parent, r)| (*parent, r.header().rec_type, r.offset()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (None, 0x03E8, 0),
                (Some(0), 0x0FF0, 8),
                (Some(1), 0x0FA0, 16),
                (None, 0x0FA0, 26),
            ]
        );
        assert_eq!(records[2].1.bytes().as_ref(), &atom[..]);
    }

    #[test]
    fn test_decompose_depth_limit() {
        let atom = record(0, 0, 0x0FA0, b"x");
        let inner = record(0x0F, 0, 0x0FF0, &atom);
        let data = Bytes::from(record(0x0F, 0, 0x03E8, &inner));

        let records = decompose(&data, 1);
        assert_eq!(records.len(), 2);
        assert_eq!(decompose(&data, 0).len(), 1);
    }

    #[test]
    fn test_decompose_truncated() {
        let mut data = record(0, 0, 0x0FA0, b"abcdef");
        data.truncate(10);
        let data = Bytes::from(data);

        let records = decompose(&data, 32);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.bytes().len(), 10);
        assert_eq!(records[0].1.header().length, 6);
    }

    #[test]
    fn test_record_activation() {
        let data = Bytes::from(record(0, 2, 0x0FA0, b"text"));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert_eq!(entry.name(), "TextCharsAtom (12 b)");

        let mut activation = Activation::new();
        entry.activate(&mut activation);
        assert_eq!(activation.payload, data);
        assert_eq!(activation.source_type, SourceType::Octet);
        assert_eq!(activation.file_name, "TextCharsAtom (12 b).rec");
        let props: serde_json::Value =
            serde_json::from_str(activation.properties.as_deref().unwrap()).unwrap();
        assert_eq!(props["type"], "0x0FA0");
        assert_eq!(props["instance"], 2);
    }

    #[test]
    fn test_placeholder_candidate() {
        let data = Bytes::from(record(0, 0, 0x7777, &[0u8; 16]));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert_eq!(entry.name(), "Unknown 0x7777 (24 b)");
        let candidate = entry.embedded_candidate().unwrap().unwrap();
        assert_eq!(candidate.detection, Detection::SkipHeader(8));
        assert_eq!(candidate.suffix, ".zip");

        // Bodies of 8 bytes or less are never candidates
        let data = Bytes::from(record(0, 0, 0x7777, &[0u8; 8]));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert!(entry.embedded_candidate().unwrap().is_none());

        let data = Bytes::from(record(0, 0, 0x0FA0, &[0u8; 32]));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert!(entry.embedded_candidate().unwrap().is_none());
    }

    #[test]
    fn test_metro_blob_candidate() {
        let blob = b"PK\x03\x04metro";
        let mut body = Vec::new();
        // simple property, then a complex one ahead of the blob
        body.extend_from_slice(&0x0080u16.to_le_bytes());
        body.extend_from_slice(&7u32.to_le_bytes());
        body.extend_from_slice(&(0x0105u16 | PROPERTY_IS_COMPLEX).to_le_bytes());
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&(PROP_METRO_BLOB | PROPERTY_IS_COMPLEX).to_le_bytes());
        body.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        body.extend_from_slice(b"abc");
        body.extend_from_slice(blob);

        let data = Bytes::from(record(3, 3, RT_TERTIARY_OPT, &body));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        let candidate = entry.embedded_candidate().unwrap().unwrap();
        assert_eq!(candidate.detection, Detection::TaggedBlob);
        assert_eq!(candidate.data.as_ref(), blob);
        assert_eq!(candidate.stem, format!("metro-{}", RT_TERTIARY_OPT));

        // Without the tagged property there is nothing to load
        let data = Bytes::from(record(3, 1, RT_TERTIARY_OPT, &body[..6]));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert!(entry.embedded_candidate().unwrap().is_none());
    }

    #[test]
    fn test_ex_ole_obj_stg_candidate() {
        let payload = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1 storage bytes";

        let data = Bytes::from(record(0, 0, RT_EX_OLE_OBJ_STG, payload));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        let candidate = entry.embedded_candidate().unwrap().unwrap();
        assert_eq!(candidate.detection, Detection::Sniff);
        assert_eq!(candidate.data.as_ref(), payload);
        assert_eq!(candidate.stem, "embed-0");

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(payload).unwrap();
        let mut body = (payload.len() as u32).to_le_bytes().to_vec();
        body.extend(encoder.finish().unwrap());

        let data = Bytes::from(record(0, 1, RT_EX_OLE_OBJ_STG, &body));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        let candidate = entry.embedded_candidate().unwrap().unwrap();
        assert_eq!(candidate.data.as_ref(), payload);

        let data = Bytes::from(record(0, 1, RT_EX_OLE_OBJ_STG, b"\x10\0\0\0garbage"));
        let (_, entry) = decompose(&data, 32).into_iter().next().unwrap();
        assert!(matches!(
            entry.embedded_candidate(),
            Err(Error::EmbeddedExtraction(_))
        ));
    }
}
