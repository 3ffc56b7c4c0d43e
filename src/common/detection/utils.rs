//! Utility functions and constants for container detection.

use memchr::memmem;

// Magic number signatures
pub const OLE2_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
pub const ZIP_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x03, 0x04];

/// Member name whose presence marks a ZIP archive as an OPC package.
pub const CONTENT_TYPES_MARKER: &[u8] = b"[Content_Types].xml";

/// Default number of prefix bytes the sniffer inspects.
pub const DEFAULT_SNIFF_WINDOW: usize = 4096;

/// Below this many bytes nothing is recognized.
pub const MIN_SNIFF_LEN: usize = 8;

/// Find a pattern in a buffer using SIMD-accelerated search.
#[inline]
pub fn find_in_buffer(buffer: &[u8], pattern: &[u8]) -> bool {
    memmem::find(buffer, pattern).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_buffer() {
        assert!(find_in_buffer(b"xx[Content_Types].xmlyy", CONTENT_TYPES_MARKER));
        assert!(!find_in_buffer(b"[Content_Types]", CONTENT_TYPES_MARKER));
        assert!(!find_in_buffer(b"", CONTENT_TYPES_MARKER));
    }
}
