//! Container format detection.
//!
//! Detection is based on file signatures (magic numbers) within a bounded
//! prefix window; nothing past the window is ever read. Only the two container
//! families the inspector can expand are recognized.

// Submodule declarations
pub mod sniff;
pub mod types;
pub mod utils;

// Re-exports
pub use sniff::{sniff, sniff_path, sniff_reader, sniff_with_window};
pub use types::ContainerFormat;
