/// Constants for the compound-file format and slideshow records
pub mod consts;

/// Main OLE file parsing implementation
mod file;

/// Property-set decoding for the summary information streams
pub mod metadata;

/// Compound files as tree entries
pub mod reader;

/// Slideshow and OfficeArt record decomposition
pub mod records;

// Re-export public types for convenient access
pub use file::{DirectoryEntry, OleError, OleFile};
pub use reader::{OleHandle, OleRootEntry, OleStorageEntry, OleStreamEntry, OleTreeReader};
pub use records::{RecordEntry, RecordHeader};
