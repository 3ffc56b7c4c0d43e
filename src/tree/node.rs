//! Arena-backed entry tree.
//!
//! Nodes are stored in a flat `Vec` and referenced by [`NodeId`]. A node is
//! never removed from the arena; detaching it from its parent's child list is
//! how a subtree is dropped from view.

use super::entry::{Entry, Surrogate};
use crate::common::error::{Error, Result};
use std::fmt;
use std::fmt::Write as _;

/// Index of a node in an [`EntryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct TreeNode {
    entry: Entry,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Ordered tree of entries, possibly spanning several nested containers.
#[derive(Debug, Default)]
pub struct EntryTree {
    nodes: Vec<TreeNode>,
}

impl EntryTree {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated, detached ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node without a parent.
    pub(crate) fn new_root(&mut self, entry: Entry) -> NodeId {
        self.alloc(entry, None)
    }

    /// Append a node as the last child of `parent`.
    pub(crate) fn push_child(&mut self, parent: NodeId, entry: Entry) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(Error::NodeNotFound(parent.0));
        }
        let id = self.alloc(entry, Some(parent));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn alloc(&mut self, entry: Entry, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            entry,
            parent,
            children: Vec::new(),
        });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn entry(&self, id: NodeId) -> Result<&Entry> {
        self.get(id)
            .map(TreeNode::entry)
            .ok_or(Error::NodeNotFound(id.0))
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry> {
        self.nodes
            .get_mut(id.0)
            .map(|node| &mut node.entry)
            .ok_or(Error::NodeNotFound(id.0))
    }

    /// Children of `id` in display order; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(TreeNode::parent)
    }

    /// Install `entry` at `id`, keeping the entry it displaces as its surrogate.
    pub(crate) fn replace_entry(&mut self, id: NodeId, entry: Entry) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(Error::NodeNotFound(id.0))?;
        let previous = std::mem::replace(&mut node.entry, entry);
        node.entry.set_surrogate(Surrogate::new(previous));
        Ok(())
    }

    /// Drop all children of `id` from view.
    pub(crate) fn detach_children(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            for child in std::mem::take(&mut node.children) {
                self.nodes[child.0].parent = None;
            }
        }
    }

    /// Label shown for a node.
    ///
    /// A node without a parent or without a surrogate shows its own name;
    /// otherwise the surrogate's name comes first with the own name in
    /// parentheses, e.g. `oleObject1.bin (Root Entry)`.
    pub fn display_name(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        let own = node.entry.name();
        match (node.parent, node.entry.surrogate()) {
            (Some(_), Some(surrogate)) => format!("{} ({})", surrogate.name(), own),
            _ => own,
        }
    }

    /// Display names from the top of the tree down to `id`, joined by `/`.
    pub fn path(&self, id: NodeId) -> String {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.get(current).is_none() {
                break;
            }
            chain.push(self.display_name(current));
            cursor = self.parent(current);
        }
        chain.reverse();
        chain.join("/")
    }

    /// First child of `id` whose display name or own name equals `name`.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&child| {
            self.display_name(child) == name
                || self.get(child).is_some_and(|node| node.entry.name() == name)
        })
    }

    /// Follow a `/`-separated chain of child names starting at `id`.
    pub fn find_path(&self, id: NodeId, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(id, |current, segment| self.find_child(current, segment))
    }

    /// Pre-order walk of the subtree under `id`, `id` first.
    pub fn iter_depth_first(&self, id: NodeId) -> DepthFirst<'_> {
        let stack = if self.get(id).is_some() { vec![id] } else { Vec::new() };
        DepthFirst { tree: self, stack }
    }

    /// Indented outline of the subtree under `id`, one node per line.
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.outline_into(id, 0, &mut out);
        out
    }

    fn outline_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), self.display_name(id));
        for &child in self.children(id) {
            self.outline_into(child, depth + 1, out);
        }
    }
}

/// Iterator returned by [`EntryTree::iter_depth_first`].
pub struct DepthFirst<'a> {
    tree: &'a EntryTree,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Replace control characters with `\XX` (uppercase hex code point).
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_control() {
            let _ = write!(out, "\\{:02X}", c as u32);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::reader::OpcFolderEntry;

    fn folder(name: &str) -> Entry {
        Entry::OpcFolder(OpcFolderEntry::new(name))
    }

    #[test]
    fn test_escape_name() {
        assert_eq!(escape_name("\u{5}SummaryInformation"), "\\05SummaryInformation");
        assert_eq!(escape_name("\u{1}CompObj"), "\\01CompObj");
        assert_eq!(escape_name("plain"), "plain");
    }

    #[test]
    fn test_push_and_walk() {
        let mut tree = EntryTree::new();
        let root = tree.new_root(folder("root"));
        let a = tree.push_child(root, folder("a")).unwrap();
        let b = tree.push_child(root, folder("b")).unwrap();
        let a1 = tree.push_child(a, folder("a1")).unwrap();

        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(a1), Some(a));
        assert_eq!(tree.path(a1), "root/a/a1");
        assert_eq!(tree.find_path(root, "a/a1"), Some(a1));
        assert_eq!(tree.iter_depth_first(root).collect::<Vec<_>>(), vec![root, a, a1, b]);
        assert_eq!(tree.outline(root), "root\n  a\n    a1\n  b\n");
    }

    #[test]
    fn test_push_to_unknown_parent() {
        let mut tree = EntryTree::new();
        assert!(matches!(
            tree.push_child(NodeId(4), folder("x")),
            Err(Error::NodeNotFound(4))
        ));
    }

    #[test]
    fn test_detach_children() {
        let mut tree = EntryTree::new();
        let root = tree.new_root(folder("root"));
        let child = tree.push_child(root, folder("gone")).unwrap();
        tree.detach_children(root);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(child), None);
    }
}
