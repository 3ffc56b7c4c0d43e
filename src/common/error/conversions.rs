//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from internal
//! error types to the unified Error type.

use super::types::Error;
use crate::ole::OleError;
use crate::ooxml::opc::OpcError;

impl From<OleError> for Error {
    fn from(err: OleError) -> Self {
        match err {
            OleError::Io(e) => Error::Io(e),
            OleError::InvalidFormat(s) => Error::CorruptedFile(s),
            OleError::NotOleFile => Error::Other("Not an OLE file".to_string()),
            OleError::CorruptedFile(s) => Error::CorruptedFile(s),
            OleError::StreamNotFound => Error::ComponentNotFound("Stream not found".to_string()),
        }
    }
}

impl From<OpcError> for Error {
    fn from(err: OpcError) -> Self {
        match err {
            OpcError::IoError(e) => Error::Io(e),
            OpcError::PartNotFound(s) => Error::ComponentNotFound(s),
            OpcError::ZipError(e) => Error::CorruptedFile(format!("ZIP error: {}", e)),
            other => Error::Other(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MetadataDecode(err.to_string())
    }
}
