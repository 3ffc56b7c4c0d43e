//! Prefix-window format sniffing.
//!
//! The classification is a pure function of `bytes[..window]`; two inputs
//! sharing that prefix always classify the same way.

use super::types::ContainerFormat;
use super::utils::{
    CONTENT_TYPES_MARKER, DEFAULT_SNIFF_WINDOW, MIN_SNIFF_LEN, OLE2_SIGNATURE, ZIP_SIGNATURE,
    find_in_buffer,
};
use crate::common::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Classify a byte buffer using the default window.
#[inline]
pub fn sniff(bytes: &[u8]) -> ContainerFormat {
    sniff_with_window(bytes, DEFAULT_SNIFF_WINDOW)
}

/// Classify a byte buffer, looking at no more than `window` leading bytes.
///
/// Windows smaller than the 8-byte OLE2 signature are widened to it.
pub fn sniff_with_window(bytes: &[u8], window: usize) -> ContainerFormat {
    let window = window.max(MIN_SNIFF_LEN);
    let head = &bytes[..bytes.len().min(window)];

    if head.len() < MIN_SNIFF_LEN {
        return ContainerFormat::Unknown;
    }

    if head.starts_with(OLE2_SIGNATURE) {
        return ContainerFormat::Ole2;
    }

    if head.starts_with(ZIP_SIGNATURE) && find_in_buffer(head, CONTENT_TYPES_MARKER) {
        return ContainerFormat::ZipPackage;
    }

    ContainerFormat::Unknown
}

/// Classify a stream by reading at most `window` bytes from it.
///
/// The reader is left positioned after the bytes consumed; callers that need
/// the content again must reopen or rewind it themselves.
pub fn sniff_reader<R: Read>(reader: &mut R, window: usize) -> Result<ContainerFormat> {
    let window = window.max(MIN_SNIFF_LEN);
    let mut head = Vec::with_capacity(window);
    reader.take(window as u64).read_to_end(&mut head)?;
    Ok(sniff_with_window(&head, window))
}

/// Classify a file on disk, reading at most `window` leading bytes.
pub fn sniff_path<P: AsRef<Path>>(path: P, window: usize) -> Result<ContainerFormat> {
    let mut file = File::open(path)?;
    sniff_reader(&mut file, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn opc_prefix() -> Vec<u8> {
        let mut bytes = ZIP_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 26]);
        bytes.extend_from_slice(CONTENT_TYPES_MARKER);
        bytes
    }

    #[test]
    fn test_ole2_signature() {
        let mut bytes = OLE2_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(sniff(&bytes), ContainerFormat::Ole2);
    }

    #[test]
    fn test_short_input_is_unknown() {
        assert_eq!(sniff(&OLE2_SIGNATURE[..7]), ContainerFormat::Unknown);
        assert_eq!(sniff(b""), ContainerFormat::Unknown);
    }

    #[test]
    fn test_zip_needs_content_types_marker() {
        let mut plain_zip = ZIP_SIGNATURE.to_vec();
        plain_zip.extend_from_slice(b"\0\0\0\0word/document.xml");
        assert_eq!(sniff(&plain_zip), ContainerFormat::Unknown);
        assert_eq!(sniff(&opc_prefix()), ContainerFormat::ZipPackage);
    }

    #[test]
    fn test_marker_outside_window_is_ignored() {
        let mut bytes = ZIP_SIGNATURE.to_vec();
        bytes.resize(64, 0);
        bytes.extend_from_slice(CONTENT_TYPES_MARKER);
        assert_eq!(sniff_with_window(&bytes, 64), ContainerFormat::Unknown);
        assert_eq!(sniff_with_window(&bytes, 128), ContainerFormat::ZipPackage);
    }

    #[test]
    fn test_sniff_reader_reads_only_window() {
        let mut bytes = opc_prefix();
        bytes.extend_from_slice(&[0xAA; 10_000]);
        let mut cursor = Cursor::new(bytes);
        let format = sniff_reader(&mut cursor, 4096).unwrap();
        assert_eq!(format, ContainerFormat::ZipPackage);
        assert_eq!(cursor.position(), 4096);
    }

    proptest! {
        #[test]
        fn prefix_decides_classification(
            head in prop::collection::vec(any::<u8>(), 0..96),
            tail_a in prop::collection::vec(any::<u8>(), 0..64),
            tail_b in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let window = 64;
            let mut a = head.clone();
            a.extend_from_slice(&tail_a);
            let mut b = head.clone();
            b.extend_from_slice(&tail_b);
            if head.len() >= window {
                prop_assert_eq!(sniff_with_window(&a, window), sniff_with_window(&b, window));
            }
        }

        #[test]
        fn ole_signature_always_wins(tail in prop::collection::vec(any::<u8>(), 0..256)) {
            let mut bytes = OLE2_SIGNATURE.to_vec();
            bytes.extend_from_slice(&tail);
            prop_assert_eq!(sniff(&bytes), ContainerFormat::Ole2);
        }
    }
}
