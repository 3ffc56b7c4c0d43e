use super::consts::*;
use std::io::{self, Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Number of FAT sector indexes stored in the header itself
const HEADER_DIFAT_ENTRIES: usize = 109;

/// Compound file header (first 512 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    signature: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Directory entry as stored on disk (128 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// UTF-16LE, null-padded
    name: [u8; 64],
    /// Name length in bytes, terminator included
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Read-only view of an OLE2 compound file.
///
/// The header, FAT, MiniFAT and directory are loaded on open; stream contents
/// are read from the underlying reader on request.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    /// 512 or 4096
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    root: Option<DirectoryEntry>,
    /// Indexed by SID; `None` for entries unreachable from the root
    dir_entries: Vec<Option<DirectoryEntry>>,
    /// Loaded on the first small-stream read
    ministream: Option<Vec<u8>>,
}

/// A storage or stream in the directory.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub sid: u32,
    pub name: String,
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    /// Empty when the CLSID is all zeros
    pub clsid: String,
    pub start_sector: u32,
    pub size: u64,
    /// Stored in the mini stream rather than in regular sectors
    pub is_minifat: bool,
}

impl DirectoryEntry {
    /// Whether this entry is a storage (or the root storage).
    #[inline]
    pub fn is_storage(&self) -> bool {
        self.entry_type == STGTY_STORAGE || self.entry_type == STGTY_ROOT
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        self.entry_type == STGTY_STREAM
    }
}

/// Errors raised while parsing a compound file
#[derive(Debug)]
pub enum OleError {
    Io(io::Error),
    InvalidFormat(String),
    NotOleFile,
    CorruptedFile(String),
    StreamNotFound,
}

impl From<io::Error> for OleError {
    fn from(err: io::Error) -> Self {
        OleError::Io(err)
    }
}

impl std::fmt::Display for OleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OleError::Io(e) => write!(f, "IO error: {}", e),
            OleError::InvalidFormat(s) => write!(f, "Invalid format: {}", s),
            OleError::NotOleFile => write!(f, "Not an OLE file"),
            OleError::CorruptedFile(s) => write!(f, "Corrupted file: {}", s),
            OleError::StreamNotFound => write!(f, "Stream not found"),
        }
    }
}

impl std::error::Error for OleError {}

/// Little-endian u32 at `offset`; zero past the end.
#[inline]
fn u32_at(data: &[u8], offset: usize) -> u32 {
    data.get(offset..offset + 4)
        .and_then(|bytes| U32::<LE>::read_from_bytes(bytes).ok())
        .map_or(0, |v| v.get())
}

impl<R: Read + Seek> OleFile<R> {
    /// Parse the header, allocation tables and directory of `reader`.
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut block = [0u8; 512];
        reader.read_exact(&mut block)?;
        let header = RawHeader::read_from_bytes(&block)
            .map_err(|_| OleError::InvalidFormat("Short header".to_string()))?;

        if &header.signature != MAGIC {
            return Err(OleError::NotOleFile);
        }
        if header.byte_order.get() != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }

        let sector_shift = header.sector_shift.get();
        let mini_sector_shift = header.mini_sector_shift.get();
        if !(7..=16).contains(&sector_shift) || mini_sector_shift >= sector_shift {
            return Err(OleError::InvalidFormat("Invalid sector shift".to_string()));
        }
        let sector_size = 1usize << sector_shift;
        match (header.major_version.get(), sector_size) {
            (3, 512) | (4, 4096) => {},
            (3 | 4, _) => {
                return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
            },
            _ => {},
        }

        let mut ole = OleFile {
            reader,
            sector_size,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            fat: Vec::new(),
            minifat: Vec::new(),
            root: None,
            dir_entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header)?;
        ole.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            ole.load_minifat(header.first_minifat_sector.get())?;
        }
        Ok(ole)
    }

    /// Collect the FAT sector list (header DIFAT, then DIFAT sectors) and load them.
    fn load_fat(&mut self, header: &RawHeader) -> Result<(), OleError> {
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|v| v.get())
            .take_while(|&s| s != FREESECT && s != ENDOFCHAIN)
            .collect();

        let per_difat = self.sector_size / 4 - 1;
        let mut difat_sector = header.first_difat_sector.get();
        for _ in 0..header.num_difat_sectors.get() {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let data = self.read_sector(difat_sector)?;
            fat_sectors.extend(
                (0..per_difat)
                    .map(|i| u32_at(&data, i * 4))
                    .take_while(|&s| s != FREESECT && s != ENDOFCHAIN),
            );
            difat_sector = u32_at(&data, per_difat * 4);
        }

        let per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * per_sector);
        for sector in fat_sectors {
            let data = self.read_sector(sector)?;
            self.fat.extend((0..per_sector).map(|i| u32_at(&data, i * 4)));
        }
        Ok(())
    }

    fn load_minifat(&mut self, first_sector: u32) -> Result<(), OleError> {
        let data = self.read_chain(first_sector)?;
        self.minifat = data.chunks_exact(4).map(|c| u32_at(c, 0)).collect();
        Ok(())
    }

    /// Parse every directory entry reachable from the root.
    fn load_directory(&mut self, first_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_chain(first_sector)?;
        let count = dir_data.len() / DIRENTRY_SIZE;
        self.dir_entries = vec![None; count];
        if count == 0 {
            return Ok(());
        }

        let root = self.parse_directory_entry(&dir_data[..DIRENTRY_SIZE], 0)?;
        let first_child = root.sid_child;
        self.dir_entries[0] = Some(root.clone());
        self.root = Some(root);
        self.link_entries(first_child, &dir_data)
    }

    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = (raw.name_len.get() as usize).saturating_sub(2).min(64);
        let name = decode_utf16le(&raw.name[..name_len]);

        // Version 3 files only define the low 32 bits
        let size = if self.sector_size == 512 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            clsid: format_clsid(&raw.clsid),
            start_sector: raw.start_sector.get(),
            size,
            is_minifat: raw.entry_type == STGTY_STREAM && size < self.mini_stream_cutoff as u64,
        })
    }

    /// Parse the entry at `sid` and everything linked from it.
    ///
    /// Each SID is parsed at most once, so cyclic links terminate. The walk
    /// keeps its own stack; sibling chains can be as long as the directory.
    fn link_entries(&mut self, sid: u32, dir_data: &[u8]) -> Result<(), OleError> {
        let mut pending = vec![sid];
        while let Some(sid) = pending.pop() {
            if sid == NOSTREAM {
                continue;
            }
            let index = sid as usize;
            if index >= self.dir_entries.len() {
                return Err(OleError::CorruptedFile(format!(
                    "directory entry {} out of range",
                    sid
                )));
            }
            if self.dir_entries[index].is_some() {
                continue;
            }

            let offset = index * DIRENTRY_SIZE;
            let entry =
                self.parse_directory_entry(&dir_data[offset..offset + DIRENTRY_SIZE], sid)?;
            // Popped left first, then right, then child
            pending.extend([entry.sid_child, entry.sid_right, entry.sid_left]);
            self.dir_entries[index] = Some(entry);
        }
        Ok(())
    }

    fn read_sector(&mut self, sector: u32) -> Result<Vec<u8>, OleError> {
        // Sector 0 starts right after the header
        let position = (sector as u64 + 1) * self.sector_size as u64;
        self.reader.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Concatenate a regular sector chain.
    fn read_chain(&mut self, start: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start;
        let mut budget = self.fat.len();

        while sector != ENDOFCHAIN {
            if budget == 0 {
                return Err(OleError::CorruptedFile("Cyclic FAT chain".to_string()));
            }
            budget -= 1;
            let Some(&next) = self.fat.get(sector as usize) else {
                return Err(OleError::CorruptedFile(format!(
                    "sector {} outside the FAT",
                    sector
                )));
            };
            data.extend_from_slice(&self.read_sector(sector)?);
            sector = next;
        }
        Ok(data)
    }

    /// Concatenate a mini sector chain, truncated to `size`.
    fn read_mini_chain(&mut self, start: u32, size: u64) -> Result<Vec<u8>, OleError> {
        let ministream = match self.ministream.take() {
            Some(data) => data,
            None => {
                let root_start = self
                    .root
                    .as_ref()
                    .map(|root| root.start_sector)
                    .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;
                self.read_chain(root_start)?
            },
        };
        let result = self.collect_mini_chain(&ministream, start, size);
        self.ministream = Some(ministream);
        result
    }

    fn collect_mini_chain(&self, ministream: &[u8], start: u32, size: u64) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start;
        let mut budget = self.minifat.len();

        while sector != ENDOFCHAIN {
            if budget == 0 {
                return Err(OleError::CorruptedFile("Cyclic MiniFAT chain".to_string()));
            }
            budget -= 1;
            let Some(&next) = self.minifat.get(sector as usize) else {
                return Err(OleError::CorruptedFile(format!(
                    "mini sector {} outside the MiniFAT",
                    sector
                )));
            };
            let position = sector as usize * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(chunk);
            sector = next;
        }

        data.truncate(size as usize);
        Ok(data)
    }

    /// The root storage entry.
    pub fn root(&self) -> Option<&DirectoryEntry> {
        self.root.as_ref()
    }

    pub fn entry(&self, sid: u32) -> Option<&DirectoryEntry> {
        self.dir_entries.get(sid as usize).and_then(Option::as_ref)
    }

    /// Direct children of a storage in directory order.
    ///
    /// Directory order is the in-order walk of the storage's red-black tree,
    /// which is how the format itself enumerates a storage.
    pub fn children(&self, sid: u32) -> Result<Vec<DirectoryEntry>, OleError> {
        let storage = self.entry(sid).ok_or(OleError::StreamNotFound)?;
        if !storage.is_storage() {
            return Err(OleError::InvalidFormat(format!("entry {} is not a storage", sid)));
        }

        let mut entries = Vec::new();
        let mut seen = vec![false; self.dir_entries.len()];
        self.walk_siblings(storage.sid_child, &mut entries, &mut seen);
        Ok(entries)
    }

    /// In-order walk of one sibling tree with an explicit stack.
    fn walk_siblings(&self, sid: u32, entries: &mut Vec<DirectoryEntry>, seen: &mut [bool]) {
        let mut spine: Vec<&DirectoryEntry> = Vec::new();
        let mut next = sid;
        loop {
            while let Some(entry) = self.visit(next, seen) {
                spine.push(entry);
                next = entry.sid_left;
            }
            let Some(entry) = spine.pop() else {
                break;
            };
            entries.push(entry.clone());
            next = entry.sid_right;
        }
    }

    /// Mark `sid` seen and return its entry, unless it is absent or already visited.
    fn visit(&self, sid: u32, seen: &mut [bool]) -> Option<&DirectoryEntry> {
        let index = sid as usize;
        if sid == NOSTREAM || index >= seen.len() || seen[index] {
            return None;
        }
        seen[index] = true;
        self.dir_entries[index].as_ref()
    }

    /// Full contents of the stream with the given SID.
    pub fn read_stream(&mut self, sid: u32) -> Result<Vec<u8>, OleError> {
        let entry = self.entry(sid).cloned().ok_or(OleError::StreamNotFound)?;
        if !entry.is_stream() {
            return Err(OleError::InvalidFormat(format!("entry {} is not a stream", sid)));
        }

        if entry.is_minifat {
            self.read_mini_chain(entry.start_sector, entry.size)
        } else {
            let mut data = self.read_chain(entry.start_sector)?;
            data.truncate(entry.size as usize);
            Ok(data)
        }
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units).trim_end_matches('\0').to_string()
}

/// `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, or empty for the null CLSID.
fn format_clsid(bytes: &[u8; 16]) -> String {
    if bytes.iter().all(|&b| b == 0) {
        return String::new();
    }
    let data1 = u32_at(bytes, 0);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    let tail: String = bytes[10..].iter().map(|b| format!("{:02X}", b)).collect();
    format!(
        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{}",
        data1, data2, data3, bytes[8], bytes[9], tail
    )
}
