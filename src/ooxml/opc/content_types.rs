//! The `[Content_Types].xml` manifest.

use super::error::{OpcError, Result};
use super::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and
/// Override elements. Part names and extensions compare ASCII
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeMap {
    /// Maps file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps specific partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse content types from [Content_Types].xml.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match e.local_name().as_ref() {
                        b"Default" => {
                            let (extension, content_type) =
                                Self::pair(e, b"Extension", b"ContentType")?;
                            if let (Some(ext), Some(ct)) = (extension, content_type) {
                                map.add_default(ext, ct);
                            }
                        },
                        b"Override" => {
                            let (partname, content_type) =
                                Self::pair(e, b"PartName", b"ContentType")?;
                            if let (Some(pn), Some(ct)) = (partname, content_type) {
                                map.add_override(pn, ct);
                            }
                        },
                        _ => {},
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Values of the two named attributes of `element`.
    fn pair(
        element: &BytesStart<'_>,
        first: &[u8],
        second: &[u8],
    ) -> Result<(Option<String>, Option<String>)> {
        let mut values = (None, None);
        for attr in element.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if key == first {
                values.0 = Some(attr.unescape_value()?.to_string());
            } else if key == second {
                values.1 = Some(attr.unescape_value()?.to_string());
            }
        }
        Ok(values)
    }

    /// Add a default content type mapping for a file extension.
    pub fn add_default(&mut self, extension: String, content_type: String) {
        self.defaults.insert(extension.to_ascii_lowercase(), content_type);
    }

    /// Add an override content type mapping for a specific partname.
    pub fn add_override(&mut self, partname: String, content_type: String) {
        self.overrides.insert(partname.to_ascii_lowercase(), content_type);
    }

    /// Get the content type for a partname.
    ///
    /// First checks for an override, then falls back to the default
    /// based on file extension.
    pub fn get(&self, pack_uri: &PackURI) -> Option<&str> {
        self.overrides
            .get(&pack_uri.as_str().to_ascii_lowercase())
            .or_else(|| self.defaults.get(&pack_uri.ext().to_ascii_lowercase()))
            .map(String::as_str)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_map() {
        let xml = br#"<?xml version="1.0"?>
            <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Default Extension="xml" ContentType="application/xml"/>
                <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
                <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
            </Types>"#;

        let ct_map = ContentTypeMap::from_xml(xml).unwrap();

        let uri = PackURI::new("/test.xml").unwrap();
        assert_eq!(ct_map.get(&uri), Some("application/xml"));

        let uri = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(
            ct_map.get(&uri),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml")
        );

        let uri = PackURI::new("/Word/Document.XML").unwrap();
        assert!(ct_map.get(&uri).unwrap().ends_with("document.main+xml"));

        let uri = PackURI::new("/media/image1.png").unwrap();
        assert_eq!(ct_map.get(&uri), None);
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(ContentTypeMap::from_xml(b"<Types><Default Extension=xml/></Types>").is_err());
    }
}
