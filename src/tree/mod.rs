//! The navigable entry tree.
//!
//! Nodes live in an arena ([`EntryTree`]) and are addressed by [`NodeId`].
//! Each node owns exactly one [`Entry`], the closed set of things an inspected
//! container can contain. Activating a node produces an [`Activation`].

pub mod activation;
pub mod entry;
pub mod fragment;
pub mod node;

pub use activation::{Activation, SourceType};
pub use entry::{Entry, LeafState, Resolution, Surrogate};
pub use fragment::{ContainerReader, ContainerSource, Fragment};
pub use node::{EntryTree, NodeId, TreeNode, escape_name};
