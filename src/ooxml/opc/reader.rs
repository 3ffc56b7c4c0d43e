//! OPC packages as tree entries.
//!
//! Part names imply a folder hierarchy that the package itself never stores.
//! Folders are synthesized for every path segment and placed before any
//! part, so that under each parent all folders precede all files. The
//! content-types manifest is appended last, directly under the root.

use super::core_props::CORE_PROPERTIES_CONTENT_TYPE;
use super::package::{OpcHandle, SharedOpcHandle};
use super::packuri::{CONTENT_TYPES_MEMBER, PackURI};
use crate::common::InspectorOptions;
use crate::common::detection::ContainerFormat;
use crate::common::error::{Error, Result};
use crate::common::properties::PropertySource;
use crate::tree::{
    Activation, ContainerReader, Entry, EntryTree, Fragment, LeafState, NodeId, SourceType,
    Surrogate, escape_name,
};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn};

/// Display name of every package root.
pub const OPC_ROOT_NAME: &str = "opc";

/// JSON listing of the parts directly under a folder or root.
fn part_listing(tree: &EntryTree, id: NodeId) -> String {
    let mut listing = Map::new();
    for &child in tree.children(id) {
        if let Ok(Entry::OpcPart(part)) = tree.entry(child).map(Entry::origin) {
            listing.insert(
                part.name(),
                json!({ "content_type": part.content_type, "size": part.size }),
            );
        }
    }
    Value::Object(listing).to_string()
}

/// Root of a package.
#[derive(Debug)]
pub struct OpcRootEntry {
    pub(crate) handle: SharedOpcHandle,
    pub(crate) surrogate: Option<Surrogate>,
    pub(crate) scratch: Option<TempPath>,
}

impl OpcRootEntry {
    pub fn name(&self) -> String {
        OPC_ROOT_NAME.to_string()
    }

    pub fn handle(&self) -> &SharedOpcHandle {
        &self.handle
    }

    pub(crate) fn activate(
        &self,
        tree: &EntryTree,
        id: NodeId,
        options: &InspectorOptions,
        activation: &mut Activation,
    ) {
        let listing = part_listing(tree, id);
        match &self.surrogate {
            Some(surrogate) => {
                surrogate.entry().activate(tree, id, options, activation);
                activation.merge_properties(Some(&listing));
            },
            None => {
                activation.set_payload(Bytes::new(), SourceType::Empty);
                activation.set_file_name(self.name());
                activation.set_properties(Some(listing));
            },
        }

        if options.decode_properties {
            activation.merge_properties(self.decoded_properties(options).as_deref());
        }
    }

    fn decoded_properties(&self, options: &InspectorOptions) -> Option<String> {
        let data = match self.handle.lock().core_properties() {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "core properties unavailable");
                return None;
            },
        };
        match options.property_decoder.decode(PropertySource::CoreProperties(&data)) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "core properties decoding failed");
                None
            },
        }
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.handle.lock().close();
        Ok(())
    }
}

/// A folder implied by part names.
#[derive(Debug, Clone)]
pub struct OpcFolderEntry {
    /// Path from the package root, without leading slash
    path: String,
}

impl OpcFolderEntry {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_matches('/').to_string(),
        }
    }

    pub fn name(&self) -> String {
        escape_name(self.path.rsplit('/').next().unwrap_or_default())
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn activate(&self, tree: &EntryTree, id: NodeId, activation: &mut Activation) {
        activation.set_payload(Bytes::new(), SourceType::Empty);
        activation.set_file_name(self.name());
        activation.set_properties(Some(part_listing(tree, id)));
    }
}

/// A part, read through the owning handle on first activation.
#[derive(Debug)]
pub struct OpcPartEntry {
    handle: SharedOpcHandle,
    uri: PackURI,
    content_type: Option<String>,
    size: u64,
    pub(crate) state: LeafState,
}

impl OpcPartEntry {
    pub fn name(&self) -> String {
        escape_name(self.uri.filename())
    }

    #[inline]
    pub fn uri(&self) -> &PackURI {
        &self.uri
    }

    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    fn is_core_properties(&self) -> bool {
        self.content_type.as_deref() == Some(CORE_PROPERTIES_CONTENT_TYPE)
    }

    /// Part bytes, read through the handle at most once until invalidated.
    pub(crate) fn load(&mut self) -> Result<Bytes> {
        if let Some(bytes) = self.state.cached() {
            return Ok(bytes.clone());
        }
        let bytes = self.handle.lock().read_part(&self.uri)?;
        self.state.store(bytes.clone());
        Ok(bytes)
    }

    /// Store replacement bytes in the handle and re-resolve the part through it.
    pub(crate) fn apply_edit(&mut self, bytes: Bytes) -> Result<()> {
        let size = bytes.len() as u64;
        let mut handle = self.handle.lock();
        handle.replace_part(&self.uri, bytes)?;
        self.content_type = handle.content_type(&self.uri).map(str::to_string);
        drop(handle);

        self.size = size;
        self.state.invalidate();
        Ok(())
    }

    pub(crate) fn activate(&self, options: &InspectorOptions, activation: &mut Activation) {
        let payload = self.state.cached().cloned().unwrap_or_default();
        let source_type = if self.is_core_properties() {
            SourceType::TextXml
        } else {
            SourceType::classify(self.uri.filename(), &payload)
        };

        let properties = json!({
            "content_type": self.content_type,
            "size": self.size,
        });
        activation.set_properties(Some(properties.to_string()));

        if self.is_core_properties() && options.decode_properties {
            match options.property_decoder.decode(PropertySource::CoreProperties(&payload)) {
                Ok(decoded) => activation.merge_properties(decoded.as_deref()),
                Err(e) => warn!(part = %self.uri, error = %e, "core properties decoding failed"),
            }
        }

        activation.set_payload(payload, source_type);
        activation.set_file_name(self.name());
    }
}

/// The synthetic `[Content_Types].xml` node.
#[derive(Debug, Clone)]
pub struct ContentTypesEntry {
    data: Bytes,
}

impl ContentTypesEntry {
    pub fn name(&self) -> String {
        CONTENT_TYPES_MEMBER.to_string()
    }

    pub(crate) fn activate(&self, activation: &mut Activation) {
        activation.set_payload(self.data.clone(), SourceType::TextXml);
        activation.set_file_name(self.name());
        activation.set_properties(Some(json!({ "size": self.data.len() }).to_string()));
    }
}

/// Reader for ZIP-based OPC packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpcTreeReader;

impl OpcTreeReader {
    /// Slot of the folder at `path`, creating it and its ancestors as needed.
    fn folder_slot(
        path: &[&str],
        folders: &mut HashMap<String, usize>,
        fragment: &mut Fragment,
    ) -> usize {
        let mut slot = Fragment::ROOT;
        let mut key = String::new();
        for segment in path {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);
            slot = match folders.get(&key) {
                Some(&existing) => existing,
                None => {
                    let created = fragment.push(slot, Entry::OpcFolder(OpcFolderEntry::new(&key)));
                    folders.insert(key.clone(), created);
                    created
                },
            };
        }
        slot
    }
}

impl ContainerReader for OpcTreeReader {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::ZipPackage
    }

    fn read(&self, source: &Path, _options: &InspectorOptions) -> Result<Fragment> {
        let open_error = |reason: String| Error::ContainerOpen {
            path: source.to_path_buf(),
            reason,
        };

        let mut handle = OpcHandle::open(source).map_err(|e| open_error(e.to_string()))?;
        let parts = handle.parts().map_err(|e| open_error(e.to_string()))?;
        let manifest = handle.content_types_xml().clone();
        let typed: Vec<_> = parts
            .into_iter()
            .map(|part| {
                let content_type = handle.content_type(&part.uri).map(str::to_string);
                (part, content_type)
            })
            .collect();

        let shared = Arc::new(Mutex::new(handle));
        let mut fragment = Fragment::new(Entry::OpcRoot(OpcRootEntry {
            handle: Arc::clone(&shared),
            surrogate: None,
            scratch: None,
        }));

        // Folders first, so no parent ever lists a file ahead of a folder.
        let mut folders = HashMap::new();
        let mut files = Vec::with_capacity(typed.len());
        for (part, content_type) in typed {
            let path: Vec<&str> = part.uri.folders().collect();
            let slot = Self::folder_slot(&path, &mut folders, &mut fragment);
            files.push((slot, part, content_type));
        }

        for (slot, part, content_type) in files {
            let entry = OpcPartEntry {
                handle: Arc::clone(&shared),
                uri: part.uri,
                content_type,
                size: part.size,
                state: LeafState::default(),
            };
            fragment.push(slot, Entry::OpcPart(entry));
        }

        fragment.push(
            Fragment::ROOT,
            Entry::ContentTypes(ContentTypesEntry { data: manifest }),
        );

        debug!(source = %source.display(), entries = fragment.len(), "enumerated package");
        Ok(fragment)
    }
}
