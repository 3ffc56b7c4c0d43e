//! Opened documents and the session that holds the current one.

use crate::common::InspectorOptions;
use crate::common::detection::{ContainerFormat, sniff_path};
use crate::common::error::{Error, Result};
use crate::resolver::{self, reader_for};
use crate::tree::{Activation, ContainerSource, Entry, EntryTree, NodeId};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One opened file and every container discovered inside it.
///
/// Handles are released by [`Document::close`] or when the document is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    format: ContainerFormat,
    tree: EntryTree,
    root: NodeId,
    options: InspectorOptions,
    closed: bool,
}

impl Document {
    /// Sniff `path` and enumerate it with the matching reader.
    ///
    /// # Errors
    ///
    /// `UnrecognizedFormat` when the file is neither a compound file nor an
    /// OPC package; `ContainerOpen` when the matching reader rejects it.
    pub fn open<P: AsRef<Path>>(path: P, options: InspectorOptions) -> Result<Self> {
        let path = path.as_ref();
        let format = sniff_path(path, options.sniff_window)?;
        let reader = reader_for(format).ok_or_else(|| Error::UnrecognizedFormat {
            path: path.to_path_buf(),
        })?;

        let mut tree = EntryTree::new();
        let root = reader.load(
            &mut tree,
            None,
            ContainerSource::Path(path.to_path_buf()),
            &options,
        )?;
        debug!(path = %path.display(), format = %format, nodes = tree.len(), "opened document");

        Ok(Self {
            path: path.to_path_buf(),
            format,
            tree,
            root,
            options,
            closed: false,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the outermost container.
    #[inline]
    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    #[inline]
    pub fn tree(&self) -> &EntryTree {
        &self.tree
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn options(&self) -> &InspectorOptions {
        &self.options
    }

    pub fn entry(&self, node: NodeId) -> Result<&Entry> {
        self.tree.entry(node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.tree.children(node)
    }

    pub fn display_name(&self, node: NodeId) -> String {
        self.tree.display_name(node)
    }

    /// Node reached by following display names from the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.tree.find_path(self.root, path)
    }

    /// Activate `node`.
    ///
    /// The first activation of a stream or part reads its bytes and expands
    /// any embedded container found in them; later activations reuse that
    /// result.
    pub fn activate(&mut self, node: NodeId) -> Result<Activation> {
        resolver::activate(&mut self.tree, node, &self.options)
    }

    /// Replace the bytes behind a stream or part.
    ///
    /// # Errors
    ///
    /// `NotALeaf` for anything other than a stream or part.
    pub fn apply_edit(&mut self, node: NodeId, bytes: Bytes) -> Result<()> {
        resolver::apply_edit(&mut self.tree, node, bytes)
    }

    /// Release every container handle, nested ones included.
    ///
    /// Calling this more than once is harmless.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for index in 0..self.tree.len() {
            let entry = match self.tree.entry(NodeId(index)) {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if let Err(e) = entry.close() {
                warn!(node = index, error = %e, "closing entry failed");
                first_error.get_or_insert(e);
            }
        }
        debug!(path = %self.path.display(), "closed document");
        first_error.map_or(Ok(()), Err)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Holds at most one current document.
///
/// Opening a new file replaces the current document only when the open
/// succeeds; on failure the current document stays as it was.
#[derive(Debug, Default)]
pub struct Session {
    options: InspectorOptions,
    current: Option<Document>,
}

impl Session {
    pub fn new(options: InspectorOptions) -> Self {
        Self {
            options,
            current: None,
        }
    }

    /// Open `path` and make it the current document.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Document> {
        let document = Document::open(path, self.options.clone())?;
        if let Some(mut previous) = self.current.take()
            && let Err(e) = previous.close()
        {
            warn!(path = %previous.path().display(), error = %e, "closing previous document failed");
        }
        Ok(self.current.insert(document))
    }

    #[inline]
    pub fn current(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    #[inline]
    pub fn current_mut(&mut self) -> Option<&mut Document> {
        self.current.as_mut()
    }

    /// Close and drop the current document, if any.
    pub fn close(&mut self) -> Result<()> {
        match self.current.take() {
            Some(mut document) => document.close(),
            None => Ok(()),
        }
    }
}
