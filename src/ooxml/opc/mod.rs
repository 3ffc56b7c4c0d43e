/// Open Packaging Conventions (OPC) packages as inspectable trees.
///
/// This module covers the parts of the OPC specification an inspector needs:
///
/// - Part names and the folders they imply
/// - Content type discovery through `[Content_Types].xml`
/// - Core properties (`docProps/core.xml`)
/// - ZIP-based physical packaging with lazily read parts
pub mod content_types;
pub mod core_props;
pub mod error;
pub mod package;
pub mod packuri;
pub mod reader;

// Re-export commonly used types
pub use content_types::ContentTypeMap;
pub use core_props::{CoreProperties, parse_core_properties};
pub use error::OpcError;
pub use package::{OpcHandle, PartInfo};
pub use packuri::PackURI;
pub use reader::{ContentTypesEntry, OpcFolderEntry, OpcPartEntry, OpcRootEntry, OpcTreeReader};
