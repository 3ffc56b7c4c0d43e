//! Office Open XML packaging.
//!
//! Only the Open Packaging Conventions layer (`opc`) is needed to inspect a
//! package: part enumeration, content types and core properties. No
//! format-specific (docx, xlsx, pptx) semantics are applied to part bodies.

pub mod opc;
