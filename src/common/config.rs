//! Configuration for opening and inspecting containers.
//!
//! Controls where embedded containers are materialized, how much of a
//! payload the format sniffer looks at, and which optional decoders run
//! during activation.

use super::properties::{PropertyDecoder, StandardPropertyDecoder};
use crate::common::detection::utils::{DEFAULT_SNIFF_WINDOW, MIN_SNIFF_LEN};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options shared by every document opened with them.
///
/// # Examples
///
/// ```rust
/// use longan::InspectorOptions;
///
/// // Create with defaults
/// let options = InspectorOptions::default();
///
/// // Or customize
/// let options = InspectorOptions::new()
///     .with_sniff_window(8192)
///     .with_decode_properties(false)
///     .with_max_record_depth(8);
/// ```
#[derive(Debug, Clone)]
pub struct InspectorOptions {
    /// Directory for materialized embedded containers (OS temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    /// Number of leading bytes the sniffer inspects
    pub sniff_window: usize,
    /// Whether root activations decode document properties
    pub decode_properties: bool,
    /// Whether a `PowerPoint Document` stream is split into record nodes
    pub decompose_records: bool,
    /// Bound on record-container recursion
    pub max_record_depth: usize,
    /// Decoder for property sets and core properties
    pub property_decoder: Arc<dyn PropertyDecoder>,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            sniff_window: DEFAULT_SNIFF_WINDOW,
            decode_properties: true,
            decompose_records: true,
            max_record_depth: 32,
            property_decoder: Arc::new(StandardPropertyDecoder),
        }
    }
}

impl InspectorOptions {
    /// Create a new `InspectorOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory embedded containers are materialized into.
    ///
    /// The directory must exist; it is not created on demand.
    #[inline]
    pub fn with_scratch_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the sniff window. Values below 8 are raised to 8.
    #[inline]
    pub fn with_sniff_window(mut self, window: usize) -> Self {
        self.sniff_window = window.max(MIN_SNIFF_LEN);
        self
    }

    /// Set whether root activations decode document properties.
    #[inline]
    pub fn with_decode_properties(mut self, decode: bool) -> Self {
        self.decode_properties = decode;
        self
    }

    /// Set whether slideshow streams are decomposed into records.
    #[inline]
    pub fn with_decompose_records(mut self, decompose: bool) -> Self {
        self.decompose_records = decompose;
        self
    }

    /// Set the maximum nesting depth followed inside record containers.
    #[inline]
    pub fn with_max_record_depth(mut self, depth: usize) -> Self {
        self.max_record_depth = depth;
        self
    }

    /// Replace the property decoder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use longan::{InspectorOptions, StandardPropertyDecoder};
    ///
    /// let options = InspectorOptions::new()
    ///     .with_property_decoder(Arc::new(StandardPropertyDecoder));
    /// ```
    #[inline]
    pub fn with_property_decoder(mut self, decoder: Arc<dyn PropertyDecoder>) -> Self {
        self.property_decoder = decoder;
        self
    }
}
