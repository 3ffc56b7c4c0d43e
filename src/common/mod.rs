//! Shared infrastructure: errors, format detection, options and metadata.

pub mod config;
pub mod detection;
pub mod error;
pub mod properties;

pub use config::InspectorOptions;
pub use detection::ContainerFormat;
pub use error::{Error, Result};
pub use properties::{PropertyDecoder, PropertySource, StandardPropertyDecoder};
