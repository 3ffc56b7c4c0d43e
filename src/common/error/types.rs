//! Unified error types for Longan.
//!
//! Format-layer errors (`OleError`, `OpcError`) stay local to their modules
//! and are folded into [`Error`] by the conversions in the sibling module.
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Longan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sniffer recognized neither container family
    #[error("Unrecognized format: '{}' is neither an OLE2 compound file nor an OPC package", path.display())]
    UnrecognizedFormat { path: PathBuf },

    /// A container reader failed to open or enumerate its source
    #[error("Error in opening '{}': {reason}", path.display())]
    ContainerOpen { path: PathBuf, reason: String },

    /// Materializing or re-parsing an embedded container failed
    #[error("Embedded extraction failed: {0}")]
    EmbeddedExtraction(String),

    /// Property-set or core-properties decoding failed
    #[error("Metadata decode failed: {0}")]
    MetadataDecode(String),

    /// The owning container handle was closed
    #[error("Container handle is closed")]
    ContainerClosed,

    /// Corrupted or malformed container structure
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// Stream or part not found
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// No node with this index exists in the tree
    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    /// The node does not carry replaceable bytes
    #[error("'{0}' is not an editable stream or part")]
    NotALeaf(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for Longan operations.
pub type Result<T> = std::result::Result<T, Error>;
