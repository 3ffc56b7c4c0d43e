//! Container format enumeration.

use std::fmt;

/// Container families the sniffer can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// OLE2 compound file (legacy .doc, .xls, .ppt, embedded objects)
    Ole2,
    /// ZIP archive carrying a `[Content_Types].xml` member (OPC package)
    ZipPackage,
    /// Anything else, including plain ZIP archives
    Unknown,
}

impl ContainerFormat {
    /// Whether a reader exists for this format.
    #[inline]
    pub fn is_container(self) -> bool {
        !matches!(self, ContainerFormat::Unknown)
    }

    /// Short label used in log events.
    pub fn label(self) -> &'static str {
        match self {
            ContainerFormat::Ole2 => "ole2",
            ContainerFormat::ZipPackage => "opc",
            ContainerFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
