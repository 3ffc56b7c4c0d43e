//! Two-phase container loading.
//!
//! A [`ContainerReader`] opens and enumerates its source into a detached
//! [`Fragment`]; any failure surfaces there, before the tree is touched.
//! Attaching the finished fragment only moves entries into the arena.

use super::entry::Entry;
use super::node::{EntryTree, NodeId};
use crate::common::InspectorOptions;
use crate::common::detection::ContainerFormat;
use crate::common::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Where a container is read from.
#[derive(Debug)]
pub enum ContainerSource {
    /// A file the caller owns
    Path(PathBuf),
    /// A materialized scratch file; deleted when the owning root goes away
    Scratch(TempPath),
}

impl ContainerSource {
    pub fn path(&self) -> &Path {
        match self {
            ContainerSource::Path(path) => path,
            ContainerSource::Scratch(path) => path,
        }
    }

    fn into_scratch(self) -> Option<TempPath> {
        match self {
            ContainerSource::Path(_) => None,
            ContainerSource::Scratch(path) => Some(path),
        }
    }
}

/// A container's entries, enumerated but not yet attached to a tree.
#[derive(Debug)]
pub struct Fragment {
    root: Entry,
    /// `(parent slot, entry)`; slot 0 is the root, slot `i + 1` is `nodes[i]`
    nodes: Vec<(usize, Entry)>,
}

impl Fragment {
    /// Slot of the fragment's root.
    pub const ROOT: usize = 0;

    pub fn new(root: Entry) -> Self {
        Self {
            root,
            nodes: Vec::new(),
        }
    }

    /// Append `entry` under the node in `parent` slot, returning its own slot.
    pub fn push(&mut self, parent: usize, entry: Entry) -> usize {
        debug_assert!(parent <= self.nodes.len());
        self.nodes.push((parent, entry));
        self.nodes.len()
    }

    /// Number of entries, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len() + 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Move the fragment into `tree`.
    ///
    /// With `at == None` the fragment becomes a new top-level root. Otherwise
    /// its root replaces the entry at `at` (which becomes the surrogate) and
    /// its children are appended to that node.
    pub(crate) fn attach(
        self,
        tree: &mut EntryTree,
        at: Option<NodeId>,
        scratch: Option<TempPath>,
    ) -> Result<NodeId> {
        let mut root = self.root;
        if let Some(scratch) = scratch {
            root.set_scratch(scratch);
        }

        let root_id = match at {
            None => tree.new_root(root),
            Some(id) => {
                tree.replace_entry(id, root)?;
                id
            },
        };

        let mut ids = Vec::with_capacity(self.nodes.len() + 1);
        ids.push(root_id);
        for (parent, entry) in self.nodes {
            let parent_id = ids.get(parent).copied().unwrap_or(root_id);
            ids.push(tree.push_child(parent_id, entry)?);
        }
        Ok(root_id)
    }
}

/// Builds a [`Fragment`] from one container family.
pub trait ContainerReader: Sync {
    fn format(&self) -> ContainerFormat;

    /// Open `source` and enumerate all of its entries.
    ///
    /// Errors are reported as `ContainerOpen` naming `source`; the handle of a
    /// partially opened container is released before returning.
    fn read(&self, source: &Path, options: &InspectorOptions) -> Result<Fragment>;

    /// Read `source` and attach the result at `at`.
    fn load(
        &self,
        tree: &mut EntryTree,
        at: Option<NodeId>,
        source: ContainerSource,
        options: &InspectorOptions,
    ) -> Result<NodeId> {
        let fragment = self.read(source.path(), options)?;
        fragment.attach(tree, at, source.into_scratch())
    }
}
