/// Errors raised while opening or reading an OPC package
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Malformed package XML: {0}")]
    XmlError(String),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Quick-XML error: {0}")]
    QuickXmlError(#[from] quick_xml::Error),
}

impl From<quick_xml::events::attributes::AttrError> for OpcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OpcError::XmlError(format!("bad attribute: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
