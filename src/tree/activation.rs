//! The value object produced when a node is activated.

use crate::common::properties::merge_json_objects;
use bytes::Bytes;
use std::fmt;

/// What kind of content an activation payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceType {
    /// Nothing to show (folders, storages, bare roots)
    #[default]
    Empty,
    Octet,
    TextXml,
    TextPlain,
    ImageJpeg,
    ImagePng,
}

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

impl SourceType {
    /// Classify a payload by file-name extension, then by leading magic bytes.
    pub fn classify(name: &str, head: &[u8]) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xml" | "rels" | "vml" => return SourceType::TextXml,
            "txt" => return SourceType::TextPlain,
            "png" => return SourceType::ImagePng,
            "jpg" | "jpeg" => return SourceType::ImageJpeg,
            _ => {},
        }

        if head.starts_with(PNG_MAGIC) {
            SourceType::ImagePng
        } else if head.starts_with(JPEG_MAGIC) {
            SourceType::ImageJpeg
        } else {
            SourceType::Octet
        }
    }

    /// MIME-style label.
    pub fn mime(self) -> &'static str {
        match self {
            SourceType::Empty => "application/x-empty",
            SourceType::Octet => "application/octet-stream",
            SourceType::TextXml => "text/xml",
            SourceType::TextPlain => "text/plain",
            SourceType::ImageJpeg => "image/jpeg",
            SourceType::ImagePng => "image/png",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Everything a consumer needs to display one activated node.
///
/// A fresh value is produced for every activation; nothing from a previous
/// activation leaks into the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activation {
    /// Raw bytes of the node (empty for folders and bare roots)
    pub payload: Bytes,
    /// Suggested file name for exporting the payload
    pub file_name: String,
    pub source_type: SourceType,
    /// JSON object string, if the node has metadata
    pub properties: Option<String>,
}

impl Activation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload.
    #[inline]
    pub fn set_payload(&mut self, payload: Bytes, source_type: SourceType) {
        self.payload = payload;
        self.source_type = source_type;
    }

    #[inline]
    pub fn set_file_name<S: Into<String>>(&mut self, name: S) {
        self.file_name = name.into();
    }

    /// Replace the metadata outright.
    #[inline]
    pub fn set_properties(&mut self, properties: Option<String>) {
        self.properties = properties;
    }

    /// Merge a JSON object into the existing metadata; later keys win.
    pub fn merge_properties(&mut self, incoming: Option<&str>) {
        let Some(incoming) = incoming else {
            return;
        };
        self.properties = match self.properties.take() {
            Some(existing) => Some(merge_json_objects(&existing, incoming)),
            None if incoming.trim().is_empty() => None,
            None => Some(incoming.to_string()),
        };
    }
}
