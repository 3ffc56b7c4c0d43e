//! The closed set of entry kinds a tree node can hold.

use super::activation::Activation;
use super::node::{EntryTree, NodeId};
use crate::common::InspectorOptions;
use crate::common::error::Result;
use crate::ole::reader::{OleRootEntry, OleStorageEntry, OleStreamEntry};
use crate::ole::records::RecordEntry;
use crate::ooxml::opc::reader::{ContentTypesEntry, OpcFolderEntry, OpcPartEntry, OpcRootEntry};
use bytes::Bytes;
use std::path::Path;
use tempfile::TempPath;

/// How far embedded-container detection has progressed for a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Never activated, or edited since
    #[default]
    Unresolved,
    /// Activated; not a container
    Opaque,
    /// Activated; its content was spliced in as a container subtree
    Container,
    /// Activated; decomposed into record children
    Records,
}

/// Detection progress and cached bytes of a stream, part or record.
#[derive(Debug, Default, Clone)]
pub struct LeafState {
    resolution: Resolution,
    cache: Option<Bytes>,
}

impl LeafState {
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Bytes read on a previous activation.
    #[inline]
    pub fn cached(&self) -> Option<&Bytes> {
        self.cache.as_ref()
    }

    pub(crate) fn store(&mut self, bytes: Bytes) {
        self.cache = Some(bytes);
    }

    pub(crate) fn resolve(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// Forget cached bytes and detection results.
    pub(crate) fn invalidate(&mut self) {
        self.cache = None;
        self.resolution = Resolution::Unresolved;
    }
}

/// The entry a node held before its content was re-parsed as a container.
///
/// Exactly one level deep: a surrogate never carries a surrogate of its own.
#[derive(Debug)]
pub struct Surrogate(Box<Entry>);

impl Surrogate {
    pub(crate) fn new(mut entry: Entry) -> Self {
        entry.strip_surrogate();
        Surrogate(Box::new(entry))
    }

    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.0
    }

    #[inline]
    pub fn name(&self) -> String {
        self.0.name()
    }
}

/// One node's content.
#[derive(Debug)]
pub enum Entry {
    OleRoot(OleRootEntry),
    OleStorage(OleStorageEntry),
    OleStream(OleStreamEntry),
    OpcRoot(OpcRootEntry),
    OpcFolder(OpcFolderEntry),
    OpcPart(OpcPartEntry),
    /// Synthetic `[Content_Types].xml` node
    ContentTypes(ContentTypesEntry),
    /// Synthetic node produced by record decomposition
    Record(RecordEntry),
}

impl Entry {
    /// Own display name, control characters escaped.
    pub fn name(&self) -> String {
        match self {
            Entry::OleRoot(e) => e.name(),
            Entry::OleStorage(e) => e.name(),
            Entry::OleStream(e) => e.name(),
            Entry::OpcRoot(e) => e.name(),
            Entry::OpcFolder(e) => e.name(),
            Entry::OpcPart(e) => e.name(),
            Entry::ContentTypes(e) => e.name(),
            Entry::Record(e) => e.name(),
        }
    }

    /// Short kind label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::OleRoot(_) => "ole-root",
            Entry::OleStorage(_) => "ole-storage",
            Entry::OleStream(_) => "ole-stream",
            Entry::OpcRoot(_) => "opc-root",
            Entry::OpcFolder(_) => "opc-folder",
            Entry::OpcPart(_) => "opc-part",
            Entry::ContentTypes(_) => "content-types",
            Entry::Record(_) => "record",
        }
    }

    /// Whether this entry is the root of a (possibly embedded) container.
    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(self, Entry::OleRoot(_) | Entry::OpcRoot(_))
    }

    pub fn surrogate(&self) -> Option<&Surrogate> {
        match self {
            Entry::OleRoot(e) => e.surrogate.as_ref(),
            Entry::OpcRoot(e) => e.surrogate.as_ref(),
            _ => None,
        }
    }

    /// The entry this node was created with: the surrogate of a spliced
    /// root, otherwise the entry itself.
    pub fn origin(&self) -> &Entry {
        self.surrogate().map_or(self, Surrogate::entry)
    }

    pub(crate) fn set_surrogate(&mut self, surrogate: Surrogate) {
        match self {
            Entry::OleRoot(e) => e.surrogate = Some(surrogate),
            Entry::OpcRoot(e) => e.surrogate = Some(surrogate),
            _ => {},
        }
    }

    fn strip_surrogate(&mut self) {
        match self {
            Entry::OleRoot(e) => e.surrogate = None,
            Entry::OpcRoot(e) => e.surrogate = None,
            _ => {},
        }
    }

    /// Scratch file a nested root was materialized into.
    pub fn scratch_path(&self) -> Option<&Path> {
        match self {
            Entry::OleRoot(e) => e.scratch.as_deref(),
            Entry::OpcRoot(e) => e.scratch.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_scratch(&mut self, scratch: TempPath) {
        match self {
            Entry::OleRoot(e) => e.scratch = Some(scratch),
            Entry::OpcRoot(e) => e.scratch = Some(scratch),
            _ => {},
        }
    }

    pub fn leaf_state(&self) -> Option<&LeafState> {
        match self {
            Entry::OleStream(e) => Some(&e.state),
            Entry::OpcPart(e) => Some(&e.state),
            Entry::Record(e) => Some(&e.state),
            _ => None,
        }
    }

    pub(crate) fn leaf_state_mut(&mut self) -> Option<&mut LeafState> {
        match self {
            Entry::OleStream(e) => Some(&mut e.state),
            Entry::OpcPart(e) => Some(&mut e.state),
            Entry::Record(e) => Some(&mut e.state),
            _ => None,
        }
    }

    /// Fill `activation` for the node `id` holding this entry.
    ///
    /// Leaves serve the bytes cached by resolution; nothing here mutates the
    /// tree or re-reads a container.
    pub(crate) fn activate(
        &self,
        tree: &EntryTree,
        id: NodeId,
        options: &InspectorOptions,
        activation: &mut Activation,
    ) {
        match self {
            Entry::OleRoot(e) => e.activate(tree, id, options, activation),
            Entry::OleStorage(e) => e.activate(tree, id, activation),
            Entry::OleStream(e) => e.activate(activation),
            Entry::OpcRoot(e) => e.activate(tree, id, options, activation),
            Entry::OpcFolder(e) => e.activate(tree, id, activation),
            Entry::OpcPart(e) => e.activate(options, activation),
            Entry::ContentTypes(e) => e.activate(activation),
            Entry::Record(e) => e.activate(activation),
        }
    }

    /// Release the container handle this entry owns, if any.
    ///
    /// Idempotent; only roots own handles.
    pub fn close(&self) -> Result<()> {
        match self {
            Entry::OleRoot(e) => e.close(),
            Entry::OpcRoot(e) => e.close(),
            _ => Ok(()),
        }
    }
}
