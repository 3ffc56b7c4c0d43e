//! Embedded container detection and splicing.
//!
//! Activating a leaf for the first time reads its bytes and checks whether
//! they hold a complete container. When they do, the bytes are materialized
//! into a scratch file, the matching reader enumerates it, and the result is
//! spliced onto the leaf's own node: the node's entry becomes the nested
//! root and the original entry is kept as its surrogate. A leaf is resolved
//! at most once until it is edited.

use crate::common::InspectorOptions;
use crate::common::detection::{ContainerFormat, sniff_with_window};
use crate::common::error::{Error, Result};
use crate::ole::consts::POWERPOINT_DOCUMENT;
use crate::ole::reader::OleTreeReader;
use crate::ole::records::decompose;
use crate::ooxml::opc::reader::OpcTreeReader;
use crate::tree::{Activation, ContainerReader, ContainerSource, Entry, EntryTree, NodeId, Resolution};
use bytes::Bytes;
use std::io::{self, Write};
use tempfile::TempPath;
use tracing::{debug, warn};

static OLE_READER: OleTreeReader = OleTreeReader;
static OPC_READER: OpcTreeReader = OpcTreeReader;

/// The reader able to enumerate `format`.
pub fn reader_for(format: ContainerFormat) -> Option<&'static dyn ContainerReader> {
    match format {
        ContainerFormat::Ole2 => Some(&OLE_READER),
        ContainerFormat::ZipPackage => Some(&OPC_READER),
        ContainerFormat::Unknown => None,
    }
}

/// How a leaf's bytes are checked for an embedded container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Sniff the bytes as they are; either container format is accepted
    Sniff,
    /// Sniff after skipping a fixed-size header; only packages are accepted
    SkipHeader(usize),
    /// The bytes are known to be a package; no sniffing
    TaggedBlob,
}

impl Detection {
    /// The container format and the bytes holding it, if any.
    pub fn detect(self, data: &Bytes, window: usize) -> Option<(ContainerFormat, Bytes)> {
        match self {
            Detection::Sniff => {
                let format = sniff_with_window(data, window);
                format.is_container().then(|| (format, data.clone()))
            },
            Detection::SkipHeader(skip) => {
                let body = data.slice(skip.min(data.len())..);
                (sniff_with_window(&body, window) == ContainerFormat::ZipPackage)
                    .then_some((ContainerFormat::ZipPackage, body))
            },
            Detection::TaggedBlob => Some((ContainerFormat::ZipPackage, data.clone())),
        }
    }
}

/// Bytes that may hold an embedded container, and how to name their scratch copy.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub detection: Detection,
    pub data: Bytes,
    /// Scratch file prefix, before the `-` separator
    pub stem: String,
    /// Scratch file suffix, including the leading `.` (may be empty)
    pub suffix: String,
}

impl Candidate {
    /// A plainly sniffed candidate named after the entry it came from.
    pub fn named(name: &str, data: Bytes) -> Self {
        let (stem, suffix) = match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], &name[idx..]),
            Some(idx) if idx > 0 => (&name[..idx], ""),
            _ => (name, ""),
        };
        Self {
            detection: Detection::Sniff,
            data,
            stem: stem.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// Write `bytes` into a fresh scratch file named `<stem>-XXXXXX<suffix>`.
///
/// The file is deleted when the returned path is dropped.
pub fn materialize(
    bytes: &[u8],
    stem: &str,
    suffix: &str,
    options: &InspectorOptions,
) -> io::Result<TempPath> {
    let prefix = format!("{}-", sanitize(stem));
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(suffix);

    let mut file = match &options.scratch_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Keep scratch names to characters every filesystem accepts.
fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// What to do with a leaf on its first activation.
enum Plan {
    Decompose(Bytes),
    Check(Option<Candidate>),
}

/// Resolve the leaf at `id`, then produce its activation.
pub(crate) fn activate(
    tree: &mut EntryTree,
    id: NodeId,
    options: &InspectorOptions,
) -> Result<Activation> {
    resolve(tree, id, options)?;

    let mut activation = Activation::new();
    tree.entry(id)?.activate(tree, id, options, &mut activation);
    Ok(activation)
}

/// Run embedded-container detection on an unresolved leaf.
///
/// Non-leaves and already resolved leaves are left alone.
pub(crate) fn resolve(tree: &mut EntryTree, id: NodeId, options: &InspectorOptions) -> Result<()> {
    let entry = tree.entry_mut(id)?;
    match entry.leaf_state() {
        Some(state) if state.resolution() == Resolution::Unresolved => {},
        _ => return Ok(()),
    }

    let plan = match entry {
        Entry::OleStream(stream) => {
            let data = stream.load()?;
            if options.decompose_records && stream.raw_name() == POWERPOINT_DOCUMENT {
                Plan::Decompose(data)
            } else {
                Plan::Check(Some(Candidate::named(stream.raw_name(), data)))
            }
        },
        Entry::OpcPart(part) => {
            let data = part.load()?;
            Plan::Check(Some(Candidate::named(part.uri().filename(), data)))
        },
        Entry::Record(record) => match record.embedded_candidate() {
            Ok(candidate) => Plan::Check(candidate),
            Err(e) => {
                warn!(node = %id, error = %e, "embedded extraction failed");
                Plan::Check(None)
            },
        },
        _ => return Ok(()),
    };

    match plan {
        Plan::Decompose(data) => decompose_records(tree, id, &data, options),
        Plan::Check(Some(candidate)) => splice(tree, id, candidate, options),
        Plan::Check(None) => mark(tree, id, Resolution::Opaque),
    }
}

fn mark(tree: &mut EntryTree, id: NodeId, resolution: Resolution) -> Result<()> {
    if let Some(state) = tree.entry_mut(id)?.leaf_state_mut() {
        state.resolve(resolution);
    }
    Ok(())
}

fn decompose_records(
    tree: &mut EntryTree,
    id: NodeId,
    data: &Bytes,
    options: &InspectorOptions,
) -> Result<()> {
    let records = decompose(data, options.max_record_depth);
    debug!(node = %id, records = records.len(), "decomposed record stream");

    let mut ids = Vec::with_capacity(records.len());
    for (parent, record) in records {
        let parent_id = parent.and_then(|p| ids.get(p).copied()).unwrap_or(id);
        ids.push(tree.push_child(parent_id, Entry::Record(record))?);
    }
    mark(tree, id, Resolution::Records)
}

/// Materialize and load `candidate` onto `id` if it holds a container.
fn splice(
    tree: &mut EntryTree,
    id: NodeId,
    candidate: Candidate,
    options: &InspectorOptions,
) -> Result<()> {
    let Some((format, body)) = candidate.detection.detect(&candidate.data, options.sniff_window)
    else {
        return mark(tree, id, Resolution::Opaque);
    };
    let Some(reader) = reader_for(format) else {
        return mark(tree, id, Resolution::Opaque);
    };

    let scratch = match materialize(&body, &candidate.stem, &candidate.suffix, options) {
        Ok(scratch) => scratch,
        Err(e) => {
            mark(tree, id, Resolution::Opaque)?;
            return Err(Error::Io(e));
        },
    };
    debug!(node = %id, format = %format, scratch = %scratch.display(), "materialized embedded container");

    // The surrogate keeps this state, so it is set before the entry moves.
    mark(tree, id, Resolution::Container)?;
    if let Err(e) = reader.load(tree, Some(id), ContainerSource::Scratch(scratch), options) {
        warn!(node = %id, format = %format, error = %e, "embedded container could not be loaded");
        return mark(tree, id, Resolution::Opaque);
    }
    Ok(())
}

/// Replace the bytes behind the stream or part at `id`.
///
/// The leaf's cache and resolution are reset; record children produced
/// from its previous content are detached.
pub(crate) fn apply_edit(tree: &mut EntryTree, id: NodeId, bytes: Bytes) -> Result<()> {
    let entry = tree.entry_mut(id)?;
    let previous = entry.leaf_state().map(|state| state.resolution());
    match entry {
        Entry::OleStream(stream) => stream.apply_edit(bytes)?,
        Entry::OpcPart(part) => part.apply_edit(bytes)?,
        other => return Err(Error::NotALeaf(other.name())),
    }

    if previous == Some(Resolution::Records) {
        tree.detach_children(id);
    }
    Ok(())
}
