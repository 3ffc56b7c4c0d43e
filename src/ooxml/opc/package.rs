//! Open ZIP package shared by every entry enumerated from it.

use super::content_types::ContentTypeMap;
use super::core_props::CORE_PROPERTIES_CONTENT_TYPE;
use super::error::{OpcError, Result};
use super::packuri::{CONTENT_TYPES_MEMBER, PackURI};
use crate::common::error::Error;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zip::ZipArchive;

/// Upper bound on the buffer reserved up front for one member.
const MAX_READ_HINT: usize = 16 * 1024 * 1024;

/// Initial capacity for a member whose header declares `declared` bytes.
fn read_hint(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_READ_HINT)
}

/// One part as listed in the ZIP central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub uri: PackURI,
    /// Uncompressed size
    pub size: u64,
}

/// An opened OPC package.
///
/// The content-types manifest is read once on open. Part bytes are read on
/// demand; replaced parts are served from an in-memory overlay.
#[derive(Debug)]
pub struct OpcHandle {
    archive: Option<ZipArchive<BufReader<File>>>,
    source: PathBuf,
    content_types: Bytes,
    type_map: ContentTypeMap,
    /// Replacement bytes keyed by member name
    overlay: HashMap<String, Bytes>,
    reads: usize,
}

pub type SharedOpcHandle = Arc<Mutex<OpcHandle>>;

impl OpcHandle {
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;

        let content_types = {
            let mut member = archive
                .by_name(CONTENT_TYPES_MEMBER)
                .map_err(|_| OpcError::PartNotFound(CONTENT_TYPES_MEMBER.to_string()))?;
            let mut data = Vec::with_capacity(read_hint(member.size()));
            member.read_to_end(&mut data)?;
            Bytes::from(data)
        };
        let type_map = ContentTypeMap::from_xml(&content_types)?;

        Ok(Self {
            archive: Some(archive),
            source: path.to_path_buf(),
            content_types,
            type_map,
            overlay: HashMap::new(),
            reads: 0,
        })
    }

    fn archive(&mut self) -> std::result::Result<&mut ZipArchive<BufReader<File>>, Error> {
        self.archive.as_mut().ok_or(Error::ContainerClosed)
    }

    /// Every non-directory member except the manifest, in central-directory order.
    pub fn parts(&mut self) -> std::result::Result<Vec<PartInfo>, Error> {
        let archive = self.archive()?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let member = archive.by_index_raw(i).map_err(OpcError::from)?;
            if member.is_dir() || member.name() == CONTENT_TYPES_MEMBER {
                continue;
            }
            parts.push(PartInfo {
                uri: PackURI::from_membername(member.name()),
                size: member.size(),
            });
        }
        Ok(parts)
    }

    /// Full contents of a part, edits applied.
    pub fn read_part(&mut self, uri: &PackURI) -> std::result::Result<Bytes, Error> {
        if self.archive.is_none() {
            return Err(Error::ContainerClosed);
        }
        let member = uri.membername();
        if let Some(bytes) = self.overlay.get(member) {
            return Ok(bytes.clone());
        }

        let data = {
            let mut file = self
                .archive()?
                .by_name(member)
                .map_err(|_| OpcError::PartNotFound(uri.to_string()))?;
            let mut data = Vec::with_capacity(read_hint(file.size()));
            file.read_to_end(&mut data)?;
            data
        };
        self.reads += 1;
        Ok(Bytes::from(data))
    }

    /// Record replacement bytes for a part.
    pub fn replace_part(&mut self, uri: &PackURI, bytes: Bytes) -> std::result::Result<(), Error> {
        if self.archive.is_none() {
            return Err(Error::ContainerClosed);
        }
        self.overlay.insert(uri.membername().to_string(), bytes);
        Ok(())
    }

    /// The raw `[Content_Types].xml` bytes read on open.
    #[inline]
    pub fn content_types_xml(&self) -> &Bytes {
        &self.content_types
    }

    pub fn content_type(&self, uri: &PackURI) -> Option<&str> {
        self.type_map.get(uri)
    }

    /// Bytes of the core-properties part, if the manifest names one.
    pub fn core_properties(&mut self) -> std::result::Result<Option<Bytes>, Error> {
        let uri = self
            .parts()?
            .into_iter()
            .map(|part| part.uri)
            .find(|uri| self.type_map.get(uri) == Some(CORE_PROPERTIES_CONTENT_TYPE));
        uri.map(|uri| self.read_part(&uri)).transpose()
    }

    /// Release the archive. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        let was_open = self.archive.take().is_some();
        if was_open {
            debug!(source = %self.source.display(), "closed package");
        }
        was_open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.archive.is_none()
    }

    /// Number of part reads that went to the archive.
    #[inline]
    pub fn read_count(&self) -> usize {
        self.reads
    }
}
