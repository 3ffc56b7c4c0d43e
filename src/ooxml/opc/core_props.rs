//! OPC core properties (`docProps/core.xml`).
//!
//! The core-properties part follows Dublin Core plus a handful of OPC
//! extensions. Elements are matched by local name, so the prefixes a
//! producer chose do not matter.

use super::error::{OpcError, Result};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use std::io::BufRead;

/// Content type of the core-properties part.
pub const CORE_PROPERTIES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";

/// Decoded core properties; absent elements stay `None` and are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Parse the body of a core-properties part.
pub fn parse_core_properties(xml: &[u8]) -> Result<CoreProperties> {
    let mut reader = Reader::from_reader(xml);

    let mut props = CoreProperties::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name().as_ref().to_vec();
                let slot = match local.as_slice() {
                    b"category" => &mut props.category,
                    b"contentStatus" => &mut props.content_status,
                    b"contentType" => &mut props.content_type,
                    b"creator" => &mut props.creator,
                    b"description" => &mut props.description,
                    b"identifier" => &mut props.identifier,
                    b"keywords" => &mut props.keywords,
                    b"language" => &mut props.language,
                    b"lastModifiedBy" => &mut props.last_modified_by,
                    b"revision" => &mut props.revision,
                    b"subject" => &mut props.subject,
                    b"title" => &mut props.title,
                    b"version" => &mut props.version,
                    b"created" | b"modified" => {
                        let text = read_text_element(&mut reader, &mut buf)?;
                        let stamp = text.as_deref().map(str::trim).and_then(parse_datetime);
                        if local == b"created" {
                            props.created = stamp;
                        } else {
                            props.modified = stamp;
                        }
                        buf.clear();
                        continue;
                    },
                    _ => {
                        buf.clear();
                        continue;
                    },
                };
                *slot = read_text_element(&mut reader, &mut buf)?;
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(OpcError::XmlError(format!(
                    "Core properties parse error: {}",
                    e
                )));
            },
            _ => {},
        }
        buf.clear();
    }

    Ok(props)
}

/// Read the text content of the element just opened.
///
/// Entity and character references arrive as separate events and are
/// resolved in place; surrounding whitespace is kept.
fn read_text_element<B: BufRead>(
    reader: &mut Reader<B>,
    buf: &mut Vec<u8>,
) -> Result<Option<String>> {
    let mut text = String::new();
    buf.clear();

    loop {
        match reader.read_event_into(buf) {
            Ok(Event::Text(e)) => {
                let content = e
                    .decode()
                    .map_err(|e| OpcError::XmlError(format!("Invalid text content: {}", e)))?;
                text.push_str(&content);
            },
            Ok(Event::CData(e)) => {
                let content = std::str::from_utf8(e.as_ref()).map_err(|e| {
                    OpcError::XmlError(format!("Invalid UTF-8 in CDATA: {}", e))
                })?;
                text.push_str(content);
            },
            Ok(Event::GeneralRef(e)) => {
                if let Some(c) = e.resolve_char_ref()? {
                    text.push(c);
                    buf.clear();
                    continue;
                }
                let name = e
                    .decode()
                    .map_err(|e| OpcError::XmlError(format!("Invalid reference: {}", e)))?;
                match quick_xml::escape::resolve_predefined_entity(&name) {
                    Some(resolved) => text.push_str(resolved),
                    None => {
                        return Err(OpcError::XmlError(format!(
                            "Unknown entity reference '&{};'",
                            name
                        )));
                    },
                }
            },
            Ok(Event::End(_)) | Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::XmlError(format!("XML parsing error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Parse a W3CDTF timestamp, assuming UTC when no offset is given.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2023-10-10T14:30:00Z").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 10);
        assert_eq!(dt.day(), 10);

        assert!(parse_datetime("2023-10-10T14:30:00.123456Z").is_some());
        assert!(parse_datetime("2023-10-10T14:30:00").is_some());
        assert!(parse_datetime("last tuesday").is_none());
    }

    #[test]
    fn test_parse_core_properties() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>Test Document</dc:title>
    <dc:subject>Test Subject</dc:subject>
    <dc:creator>Test Author</dc:creator>
    <cp:keywords>test, document</cp:keywords>
    <dc:description>Test Description</dc:description>
    <cp:lastModifiedBy>Test Modifier</cp:lastModifiedBy>
    <cp:revision>5</cp:revision>
    <cp:category>Test Category</cp:category>
    <dc:language>en-US</dc:language>
    <dcterms:created xsi:type="dcterms:W3CDTF">2023-10-10T14:30:00Z</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">2023-10-10T15:30:00Z</dcterms:modified>
</cp:coreProperties>"#;

        let props = parse_core_properties(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("Test Document"));
        assert_eq!(props.subject.as_deref(), Some("Test Subject"));
        assert_eq!(props.creator.as_deref(), Some("Test Author"));
        assert_eq!(props.keywords.as_deref(), Some("test, document"));
        assert_eq!(props.description.as_deref(), Some("Test Description"));
        assert_eq!(props.last_modified_by.as_deref(), Some("Test Modifier"));
        assert_eq!(props.revision.as_deref(), Some("5"));
        assert_eq!(props.category.as_deref(), Some("Test Category"));
        assert_eq!(props.language.as_deref(), Some("en-US"));
        assert!(props.created.is_some());
        assert!(props.modified.is_some());
        assert!(props.version.is_none());
    }

    #[test]
    fn test_serialized_keys() {
        let props = CoreProperties {
            last_modified_by: Some("Bo".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json, serde_json::json!({ "lastModifiedBy": "Bo" }));
    }

    #[test]
    fn test_entity_references_in_text() {
        let xml = br#"<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="urn:dc">
    <dc:title>R&amp;D &lt;Plan&gt;</dc:title>
    <dc:creator>Zo&#235; &#x4E2D;</dc:creator>
    <dc:description>  padded &quot;quote&quot;  </dc:description>
</cp:coreProperties>"#;

        let props = parse_core_properties(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("R&D <Plan>"));
        assert_eq!(props.creator.as_deref(), Some("Zo\u{eb} \u{4e2d}"));
        assert_eq!(props.description.as_deref(), Some("  padded \"quote\"  "));
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let xml = b"<cp:coreProperties><dc:title>a &bogus; b</dc:title></cp:coreProperties>";
        assert!(parse_core_properties(xml).is_err());
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_core_properties(b"<cp:coreProperties><dc:title>x</dc:creator>").is_err());
    }
}
