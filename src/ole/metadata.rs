//! Property-set decoding for `SummaryInformation` and
//! `DocumentSummaryInformation` streams ([MS-OLEPS]).

use super::consts::*;
use super::file::OleError;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use serde::Serialize;
use std::collections::HashMap;

/// Standard properties from a SummaryInformation stream.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SummaryProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codepage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_words: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_chars: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creating_application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<u32>,
}

/// Standard properties from a DocumentSummaryInformation stream.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DocumentSummaryProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Property value types
#[derive(Debug, Clone)]
pub enum PropertyValue {
    I2(i16),
    I4(i32),
    UI2(u16),
    UI4(u32),
    Bool(bool),
    /// Code-page string, still encoded
    Lpstr(Vec<u8>),
    Lpwstr(String),
    Filetime(u64),
    Blob(Vec<u8>),
    Empty,
}

/// Decode a SummaryInformation stream.
pub fn parse_summary_information(data: &[u8]) -> Result<SummaryProperties, OleError> {
    let props = parse_property_stream(data)?;
    let codepage = codepage_of(&props);
    let text = |id: u32| props.get(&id).and_then(|v| extract_string(v, codepage));
    let count = |id: u32| match props.get(&id) {
        Some(PropertyValue::I4(v)) => Some(*v as u32),
        Some(PropertyValue::UI4(v)) => Some(*v),
        _ => None,
    };
    let time = |id: u32| match props.get(&id) {
        Some(PropertyValue::Filetime(v)) => filetime_to_datetime(*v),
        _ => None,
    };

    Ok(SummaryProperties {
        codepage,
        title: text(2),
        subject: text(3),
        author: text(4),
        keywords: text(5),
        comments: text(6),
        template: text(7),
        last_saved_by: text(8),
        revision_number: text(9),
        created: time(12),
        last_saved: time(13),
        num_pages: count(14),
        num_words: count(15),
        num_chars: count(16),
        creating_application: text(18),
        security: count(19),
    })
}

/// Decode a DocumentSummaryInformation stream (first section only).
pub fn parse_document_summary_information(
    data: &[u8],
) -> Result<DocumentSummaryProperties, OleError> {
    let props = parse_property_stream(data)?;
    let codepage = codepage_of(&props);
    let text = |id: u32| props.get(&id).and_then(|v| extract_string(v, codepage));

    Ok(DocumentSummaryProperties {
        category: text(2),
        presentation_format: text(3),
        manager: text(14),
        company: text(15),
    })
}

/// Parse a property stream and return properties as a HashMap
///
/// Only the first section is read; its offset sits right after the
/// 28-byte header and the 16-byte FMTID.
fn parse_property_stream(data: &[u8]) -> Result<HashMap<u32, PropertyValue>, OleError> {
    if data.len() < 48 {
        return Err(OleError::InvalidFormat(
            "Property stream too short".to_string(),
        ));
    }

    let mut properties = HashMap::new();

    let section_offset = read_u32(data, 44).unwrap_or(u32::MAX) as usize;
    let num_props = read_u32(data, section_offset.saturating_add(4))
        .ok_or_else(|| OleError::InvalidFormat("Invalid section offset".to_string()))?;

    // Limit properties to prevent DoS
    let num_props = num_props.min(1000);

    for i in 0..num_props as usize {
        let prop_offset = section_offset + 8 + i * 8;
        let (Some(prop_id), Some(value_rel)) =
            (read_u32(data, prop_offset), read_u32(data, prop_offset + 4))
        else {
            break;
        };

        let value_offset = section_offset + value_rel as usize;
        let Some(prop_type) = read_u16(data, value_offset) else {
            continue;
        };

        if let Ok(value) = parse_property_value(data, value_offset + 4, prop_type) {
            properties.insert(prop_id, value);
        }
    }

    Ok(properties)
}

/// Parse a single property value based on its type
fn parse_property_value(
    data: &[u8],
    offset: usize,
    prop_type: u16,
) -> Result<PropertyValue, OleError> {
    let overflow = || OleError::InvalidFormat("Buffer overflow".to_string());

    match prop_type {
        VT_I2 => Ok(PropertyValue::I2(read_u16(data, offset).ok_or_else(overflow)? as i16)),
        VT_I4 | VT_INT | VT_ERROR => {
            Ok(PropertyValue::I4(read_u32(data, offset).ok_or_else(overflow)? as i32))
        },
        VT_UI2 => Ok(PropertyValue::UI2(read_u16(data, offset).ok_or_else(overflow)?)),
        VT_UI4 | VT_UINT => Ok(PropertyValue::UI4(read_u32(data, offset).ok_or_else(overflow)?)),
        VT_LPSTR | VT_BSTR => {
            let len = read_u32(data, offset).ok_or_else(overflow)? as usize;
            let bytes = slice(data, offset + 4, len).ok_or_else(overflow)?;
            Ok(PropertyValue::Lpstr(bytes.to_vec()))
        },
        VT_LPWSTR => {
            let chars = read_u32(data, offset).ok_or_else(overflow)? as usize;
            let bytes = slice(data, offset + 4, chars.saturating_mul(2)).ok_or_else(overflow)?;
            Ok(PropertyValue::Lpwstr(decode_utf16le(bytes)))
        },
        VT_FILETIME => {
            let low = read_u32(data, offset).ok_or_else(overflow)? as u64;
            let high = read_u32(data, offset + 4).ok_or_else(overflow)? as u64;
            Ok(PropertyValue::Filetime(low | (high << 32)))
        },
        VT_BOOL => Ok(PropertyValue::Bool(read_u16(data, offset).ok_or_else(overflow)? != 0)),
        VT_BLOB => {
            let len = read_u32(data, offset).ok_or_else(overflow)? as usize;
            let blob = slice(data, offset + 4, len).ok_or_else(overflow)?;
            Ok(PropertyValue::Blob(blob.to_vec()))
        },
        VT_EMPTY | VT_NULL => Ok(PropertyValue::Empty),
        // Unsupported type
        _ => Ok(PropertyValue::Empty),
    }
}

fn codepage_of(props: &HashMap<u32, PropertyValue>) -> Option<u32> {
    match props.get(&1) {
        Some(PropertyValue::I2(v)) => Some(*v as u16 as u32),
        Some(PropertyValue::UI2(v)) => Some(*v as u32),
        _ => None,
    }
}

/// Extract string from property value
fn extract_string(value: &PropertyValue, codepage: Option<u32>) -> Option<String> {
    let s = match value {
        PropertyValue::Lpstr(bytes) => decode_codepage(bytes, codepage),
        PropertyValue::Lpwstr(s) => s.clone(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Decode a code-page string, falling back to Windows-1252.
fn decode_codepage(bytes: &[u8], codepage: Option<u32>) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let encoding = codepage
        .and_then(codepage_to_encoding)
        .unwrap_or(encoding_rs::WINDOWS_1252);
    if encoding == encoding_rs::UTF_16LE {
        return decode_utf16le(bytes);
    }
    encoding.decode_without_bom_handling(&bytes[..end]).0.into_owned()
}

/// Map Windows codepage identifier to encoding_rs Encoding
fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    match codepage {
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1200 => Some(encoding_rs::UTF_16LE),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        10000 => Some(encoding_rs::MACINTOSH),
        54936 => Some(encoding_rs::GB18030),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Convert a FILETIME (100ns ticks since 1601-01-01) to UTC.
fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    const EPOCH_DIFF_SECS: i64 = 11_644_473_600;
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / 10_000_000) as i64 - EPOCH_DIFF_SECS;
    let nanos = ((filetime % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[inline]
fn slice(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(len)?)
}

#[inline]
fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    slice(data, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    slice(data, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a one-section property set stream from `(id, type, value bytes)`.
    pub(crate) fn property_set(props: &[(u32, u16, Vec<u8>)]) -> Vec<u8> {
        let mut header = vec![0u8; 48];
        header[0..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[24..28].copy_from_slice(&1u32.to_le_bytes());
        header[44..48].copy_from_slice(&48u32.to_le_bytes());

        let table_len = 8 + props.len() * 8;
        let mut table = Vec::new();
        let mut values = Vec::new();
        for (id, vt, value) in props {
            table.extend_from_slice(&id.to_le_bytes());
            table.extend_from_slice(&((table_len + values.len()) as u32).to_le_bytes());
            values.extend_from_slice(&(*vt as u32).to_le_bytes());
            values.extend_from_slice(value);
            while values.len() % 4 != 0 {
                values.push(0);
            }
        }

        let mut section = Vec::new();
        section.extend_from_slice(&((table_len + values.len()) as u32).to_le_bytes());
        section.extend_from_slice(&(props.len() as u32).to_le_bytes());
        section.extend_from_slice(&table);
        section.extend_from_slice(&values);

        header.extend_from_slice(&section);
        header
    }

    pub(crate) fn lpstr(s: &str) -> Vec<u8> {
        let mut out = ((s.len() + 1) as u32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out.push(0);
        out
    }

    #[test]
    fn test_summary_information() {
        let stream = property_set(&[
            (1, VT_I2, 1252u16.to_le_bytes().to_vec()),
            (2, VT_LPSTR, lpstr("Budget")),
            (4, VT_LPSTR, lpstr("Ana")),
            (14, VT_I4, 12u32.to_le_bytes().to_vec()),
            (12, VT_FILETIME, 132_000_000_000_000_000u64.to_le_bytes().to_vec()),
        ]);
        let props = parse_summary_information(&stream).unwrap();
        assert_eq!(props.codepage, Some(1252));
        assert_eq!(props.title.as_deref(), Some("Budget"));
        assert_eq!(props.author.as_deref(), Some("Ana"));
        assert_eq!(props.num_pages, Some(12));
        assert!(props.created.is_some());
        assert_eq!(props.subject, None);
    }

    #[test]
    fn test_document_summary_information() {
        let stream = property_set(&[(15, VT_LPSTR, lpstr("Initech"))]);
        let props = parse_document_summary_information(&stream).unwrap();
        assert_eq!(props.company.as_deref(), Some("Initech"));
    }

    #[test]
    fn test_short_stream_is_error() {
        assert!(parse_summary_information(&[0u8; 20]).is_err());
    }

    #[test]
    fn test_codepage_decoding() {
        assert_eq!(decode_codepage(b"caf\xE9\0junk", Some(1252)), "café");
        assert_eq!(decode_codepage(b"caf\xC3\xA9", Some(65001)), "café");
    }
}
