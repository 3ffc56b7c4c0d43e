//! Metadata strings and the pluggable property decoder.
//!
//! Node metadata travels as a JSON object string. Listing metadata produced by
//! the readers and decoded document properties are combined with
//! [`merge_json_objects`]; on a key collision the incoming value wins.

use crate::common::error::{Error, Result};
use crate::ole::metadata::{parse_document_summary_information, parse_summary_information};
use crate::ooxml::opc::core_props::parse_core_properties;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Raw property payloads handed to a [`PropertyDecoder`].
#[derive(Debug, Clone, Copy)]
pub enum PropertySource<'a> {
    /// Body of a `\u{5}SummaryInformation` stream
    SummaryInformation(&'a [u8]),
    /// Body of a `\u{5}DocumentSummaryInformation` stream
    DocumentSummaryInformation(&'a [u8]),
    /// Body of an OPC core-properties part
    CoreProperties(&'a [u8]),
}

/// Turns raw property payloads into a JSON object string.
///
/// `Ok(None)` means the payload carried nothing worth reporting.
pub trait PropertyDecoder: Send + Sync + fmt::Debug {
    fn decode(&self, source: PropertySource<'_>) -> Result<Option<String>>;
}

/// Decoder for the standard OLE property sets and OPC core properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPropertyDecoder;

impl PropertyDecoder for StandardPropertyDecoder {
    fn decode(&self, source: PropertySource<'_>) -> Result<Option<String>> {
        match source {
            PropertySource::SummaryInformation(data) => {
                let props = parse_summary_information(data)
                    .map_err(|e| Error::MetadataDecode(e.to_string()))?;
                to_object_string(&props)
            },
            PropertySource::DocumentSummaryInformation(data) => {
                let props = parse_document_summary_information(data)
                    .map_err(|e| Error::MetadataDecode(e.to_string()))?;
                to_object_string(&props)
            },
            PropertySource::CoreProperties(data) => {
                let props =
                    parse_core_properties(data).map_err(|e| Error::MetadataDecode(e.to_string()))?;
                to_object_string(&props)
            },
        }
    }
}

/// Serialize a property struct, mapping an empty object to `None`.
pub fn to_object_string<T: Serialize>(value: &T) -> Result<Option<String>> {
    match serde_json::to_value(value)? {
        Value::Object(map) if map.is_empty() => Ok(None),
        other => Ok(Some(other.to_string())),
    }
}

/// Merge two JSON object strings key-wise.
///
/// Blank `incoming` leaves `existing` untouched and blank `existing` yields
/// `incoming`. When either side is not a JSON object, `incoming` replaces.
pub fn merge_json_objects(existing: &str, incoming: &str) -> String {
    if incoming.trim().is_empty() {
        return existing.to_string();
    }
    if existing.trim().is_empty() {
        return incoming.to_string();
    }

    let parsed = (
        serde_json::from_str::<Map<String, Value>>(existing),
        serde_json::from_str::<Map<String, Value>>(incoming),
    );
    match parsed {
        (Ok(mut base), Ok(overlay)) => {
            base.extend(overlay);
            Value::Object(base).to_string()
        },
        _ => incoming.to_string(),
    }
}
