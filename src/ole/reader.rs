//! OLE2 compound files as tree entries.
//!
//! A compound file is enumerated once when opened: every storage becomes an
//! [`OleStorageEntry`] and every stream an [`OleStreamEntry`], in directory
//! order, depth first. Stream bytes are read lazily through the shared
//! [`OleHandle`] on first activation.

use super::consts::{DOCUMENT_SUMMARY_INFORMATION, SUMMARY_INFORMATION};
use super::file::{DirectoryEntry, OleError, OleFile};
use crate::common::detection::ContainerFormat;
use crate::common::error::{Error, Result};
use crate::common::properties::PropertySource;
use crate::common::InspectorOptions;
use crate::tree::{
    Activation, ContainerReader, Entry, EntryTree, Fragment, LeafState, NodeId, SourceType,
    Surrogate, escape_name,
};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn};

/// Open compound file shared by every entry enumerated from it.
#[derive(Debug)]
pub struct OleHandle {
    file: Option<OleFile<BufReader<File>>>,
    source: PathBuf,
    /// Replacement bytes keyed by stream SID
    overlay: HashMap<u32, Bytes>,
    reads: usize,
}

pub type SharedOleHandle = Arc<Mutex<OleHandle>>;

impl OleHandle {
    pub fn open(path: &Path) -> std::result::Result<Self, OleError> {
        let reader = BufReader::new(File::open(path)?);
        let file = OleFile::open(reader)?;
        Ok(Self {
            file: Some(file),
            source: path.to_path_buf(),
            overlay: HashMap::new(),
            reads: 0,
        })
    }

    fn file(&self) -> Result<&OleFile<BufReader<File>>> {
        self.file.as_ref().ok_or(Error::ContainerClosed)
    }

    fn file_mut(&mut self) -> Result<&mut OleFile<BufReader<File>>> {
        self.file.as_mut().ok_or(Error::ContainerClosed)
    }

    /// Full contents of a stream, edits applied.
    pub fn read_stream(&mut self, sid: u32) -> Result<Bytes> {
        if let Some(bytes) = self.overlay.get(&sid) {
            self.file()?;
            return Ok(bytes.clone());
        }
        let data = self.file_mut()?.read_stream(sid)?;
        self.reads += 1;
        Ok(Bytes::from(data))
    }

    /// Contents of a stream directly under the root storage, if present.
    pub fn read_root_stream(&mut self, name: &str) -> Result<Option<Bytes>> {
        let sid = self
            .file()?
            .children(0)?
            .into_iter()
            .find(|entry| entry.is_stream() && entry.name == name)
            .map(|entry| entry.sid);
        sid.map(|sid| self.read_stream(sid)).transpose()
    }

    /// Record replacement bytes for a stream.
    pub fn replace_stream(&mut self, sid: u32, bytes: Bytes) -> Result<()> {
        self.file()?;
        self.overlay.insert(sid, bytes);
        Ok(())
    }

    /// Release the underlying file. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        let was_open = self.file.take().is_some();
        if was_open {
            debug!(source = %self.source.display(), "closed compound file");
        }
        was_open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Number of stream reads that went to the file.
    #[inline]
    pub fn read_count(&self) -> usize {
        self.reads
    }
}

/// JSON listing of a storage: its CLSID plus each direct stream child's size.
fn storage_listing(tree: &EntryTree, id: NodeId, clsid: Option<&str>) -> String {
    let mut listing = Map::new();
    listing.insert("storage_clsid".to_string(), json!(clsid));
    for &child in tree.children(id) {
        if let Ok(Entry::OleStream(stream)) = tree.entry(child).map(Entry::origin) {
            listing.insert(stream.name(), json!(format!("Size: {}", stream.size)));
        }
    }
    Value::Object(listing).to_string()
}

fn non_empty(clsid: &str) -> Option<String> {
    (!clsid.is_empty()).then(|| clsid.to_string())
}

/// Root storage of a compound file.
#[derive(Debug)]
pub struct OleRootEntry {
    pub(crate) handle: SharedOleHandle,
    name: String,
    clsid: Option<String>,
    pub(crate) surrogate: Option<Surrogate>,
    pub(crate) scratch: Option<TempPath>,
}

impl OleRootEntry {
    fn new(handle: SharedOleHandle, root: &DirectoryEntry) -> Self {
        Self {
            handle,
            name: root.name.clone(),
            clsid: non_empty(&root.clsid),
            surrogate: None,
            scratch: None,
        }
    }

    pub fn name(&self) -> String {
        escape_name(&self.name)
    }

    pub fn handle(&self) -> &SharedOleHandle {
        &self.handle
    }

    pub(crate) fn activate(
        &self,
        tree: &EntryTree,
        id: NodeId,
        options: &InspectorOptions,
        activation: &mut Activation,
    ) {
        let listing = storage_listing(tree, id, self.clsid.as_deref());
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
            for decoded in self.decoded_properties(options) {
                activation.merge_properties(Some(&decoded));
            }
        }
    }

    /// Decode the standard property-set streams; failures are logged and skipped.
    fn decoded_properties(&self, options: &InspectorOptions) -> Vec<String> {
        let mut handle = self.handle.lock();
        let mut decoded = Vec::new();

        for stream in [SUMMARY_INFORMATION, DOCUMENT_SUMMARY_INFORMATION] {
            let data = match handle.read_root_stream(stream) {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => {
                    debug!(stream = %escape_name(stream), error = %e, "property stream unavailable");
                    continue;
                },
            };
            let source = if stream == SUMMARY_INFORMATION {
                PropertySource::SummaryInformation(&data)
            } else {
                PropertySource::DocumentSummaryInformation(&data)
            };
            match options.property_decoder.decode(source) {
                Ok(Some(json)) => decoded.push(json),
                Ok(None) => {},
                Err(e) => warn!(stream = %escape_name(stream), error = %e, "property decoding failed"),
            }
        }
        decoded
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.handle.lock().close();
        Ok(())
    }
}

/// A storage below the root.
#[derive(Debug)]
pub struct OleStorageEntry {
    name: String,
    clsid: Option<String>,
    sid: u32,
}

impl OleStorageEntry {
    pub fn name(&self) -> String {
        escape_name(&self.name)
    }

    #[inline]
    pub fn sid(&self) -> u32 {
        self.sid
    }

    pub(crate) fn activate(&self, tree: &EntryTree, id: NodeId, activation: &mut Activation) {
        activation.set_payload(Bytes::new(), SourceType::Empty);
        activation.set_file_name(self.name());
        activation.set_properties(Some(storage_listing(tree, id, self.clsid.as_deref())));
    }
}

/// A stream, read through the owning handle on first activation.
#[derive(Debug)]
pub struct OleStreamEntry {
    handle: SharedOleHandle,
    sid: u32,
    name: String,
    pub(crate) size: u64,
    pub(crate) state: LeafState,
}

impl OleStreamEntry {
    pub fn name(&self) -> String {
        escape_name(&self.name)
    }

    /// Unescaped stream name as stored in the directory.
    #[inline]
    pub fn raw_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stream bytes, read through the handle at most once until invalidated.
    pub(crate) fn load(&mut self) -> Result<Bytes> {
        if let Some(bytes) = self.state.cached() {
            return Ok(bytes.clone());
        }
        let bytes = self.handle.lock().read_stream(self.sid)?;
        self.state.store(bytes.clone());
        Ok(bytes)
    }

    /// Store replacement bytes in the handle and forget what was cached.
    pub(crate) fn apply_edit(&mut self, bytes: Bytes) -> Result<()> {
        let size = bytes.len() as u64;
        self.handle.lock().replace_stream(self.sid, bytes)?;
        self.size = size;
        self.state.invalidate();
        Ok(())
    }

    pub(crate) fn activate(&self, activation: &mut Activation) {
        let payload = self.state.cached().cloned().unwrap_or_default();
        let source_type = SourceType::classify(&self.name, &payload);
        activation.set_payload(payload, source_type);
        activation.set_file_name(self.name());
        activation.set_properties(Some(json!({ "size": self.size }).to_string()));
    }
}

/// Reader for OLE2 compound files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OleTreeReader;

impl OleTreeReader {
    fn enumerate(
        file: &OleFile<BufReader<File>>,
        handle: &SharedOleHandle,
        storage_sid: u32,
        slot: usize,
        fragment: &mut Fragment,
        visited: &mut HashSet<u32>,
    ) -> std::result::Result<(), OleError> {
        if !visited.insert(storage_sid) {
            return Err(OleError::CorruptedFile(format!(
                "storage {} reachable twice",
                storage_sid
            )));
        }

        for child in file.children(storage_sid)? {
            if child.is_storage() {
                let storage = OleStorageEntry {
                    name: child.name.clone(),
                    clsid: non_empty(&child.clsid),
                    sid: child.sid,
                };
                let child_slot = fragment.push(slot, Entry::OleStorage(storage));
                Self::enumerate(file, handle, child.sid, child_slot, fragment, visited)?;
            } else if child.is_stream() {
                let stream = OleStreamEntry {
                    handle: Arc::clone(handle),
                    sid: child.sid,
                    name: child.name,
                    size: child.size,
                    state: LeafState::default(),
                };
                fragment.push(slot, Entry::OleStream(stream));
            }
        }
        Ok(())
    }
}

impl ContainerReader for OleTreeReader {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Ole2
    }

    fn read(&self, source: &Path, _options: &InspectorOptions) -> Result<Fragment> {
        let open_error = |reason: String| Error::ContainerOpen {
            path: source.to_path_buf(),
            reason,
        };

        let handle = OleHandle::open(source).map_err(|e| open_error(e.to_string()))?;
        let shared = Arc::new(Mutex::new(handle));

        // On any error below, dropping `shared` and the partial fragment closes the file.
        let fragment = {
            let guard = shared.lock();
            let file = guard.file()?;
            let root = file
                .root()
                .cloned()
                .ok_or_else(|| open_error("missing root storage".to_string()))?;

            let mut fragment = Fragment::new(Entry::OleRoot(OleRootEntry::new(
                Arc::clone(&shared),
                &root,
            )));
            let mut visited = HashSet::new();
            Self::enumerate(file, &shared, root.sid, Fragment::ROOT, &mut fragment, &mut visited)
                .map_err(|e| open_error(e.to_string()))?;
            fragment
        };

        debug!(source = %source.display(), entries = fragment.len(), "enumerated compound file");
        Ok(fragment)
    }
}
