//! Longan - an inspector for nested office containers
//!
//! This library opens OLE2 compound files and ZIP-based OPC packages and
//! exposes their internal layout as one navigable tree. Containers embedded
//! in a stream or part (an OLE object inside a package, a package inside a
//! compound file, to any depth) are detected on first activation and
//! expanded in place.
//!
//! # Features
//!
//! - **Format sniffing**: classify bytes as OLE2, OPC package or unknown from
//!   a bounded prefix
//! - **OLE2 reader**: storages and streams in directory order
//! - **OPC reader**: parts under synthesized folders, folders first
//! - **Embedded containers**: materialized once into a scratch file and
//!   spliced onto the node that held them
//! - **Record decomposition**: slideshow and OfficeArt records, including
//!   packages and storages embedded in records
//! - **Metadata**: summary information and core properties as JSON objects
//!
//! # Example
//!
//! ```no_run
//! use longan::{Document, InspectorOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::open("presentation.pptx", InspectorOptions::default())?;
//! let root = doc.root();
//!
//! for &child in doc.children(root).to_vec().iter() {
//!     let activation = doc.activate(child)?;
//!     println!(
//!         "{} ({}, {} bytes)",
//!         doc.display_name(child),
//!         activation.source_type,
//!         activation.payload.len()
//!     );
//! }
//!
//! print!("{}", doc.tree().outline(root));
//! doc.close()?;
//! # Ok(())
//! # }
//! ```

/// Errors, format sniffing, options and property decoding
pub mod common;

/// Arena tree, entry variants and activations
pub mod tree;

/// OLE2 compound files and the records stored in them
pub mod ole;

/// OPC (ZIP) packages
pub mod ooxml;

/// Embedded container detection and splicing
pub mod resolver;

mod document;

pub use common::{
    ContainerFormat, Error, InspectorOptions, PropertyDecoder, PropertySource, Result,
    StandardPropertyDecoder,
};
pub use document::{Document, Session};
pub use tree::{Activation, Entry, EntryTree, NodeId, Resolution, SourceType};
