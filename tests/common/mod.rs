//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use longan::InspectorOptions;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::{SimpleFileOptions, ZipWriter};

pub const CORE_PROPERTIES_TYPE: &str = "application/vnd.openxmlformats-package.core-properties+xml";

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="bin" ContentType="application/vnd.openxmlformats-officedocument.oleObject"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

pub const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Quarterly Review</dc:title>
  <dc:creator>Ana</dc:creator>
  <dcterms:created>2024-03-01T09:00:00Z</dcterms:created>
</cp:coreProperties>"#;

/// Compound file with the given storages and `(path, bytes)` streams.
pub fn ole_bytes(storages: &[&str], streams: &[(&str, &[u8])]) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    for storage in storages {
        comp.create_storage_all(storage).unwrap();
    }
    for (path, data) in streams {
        comp.create_stream(path).unwrap().write_all(data).unwrap();
    }
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

/// OPC package with `[Content_Types].xml` as its first member.
pub fn opc_bytes(parts: &[(&str, &[u8])]) -> Vec<u8> {
    opc_bytes_with_manifest(CONTENT_TYPES, parts)
}

pub fn opc_bytes_with_manifest(manifest: &str, parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    for (name, data) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Plain ZIP without a content-types manifest.
pub fn plain_zip_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"not a package").unwrap();
    zip.finish().unwrap().into_inner()
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Options materializing into `scratch`.
pub fn options(scratch: &Path) -> InspectorOptions {
    InspectorOptions::new().with_scratch_dir(scratch)
}

/// Number of files currently in `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// One-section property set stream from `(id, type, value bytes)`.
pub fn property_set(props: &[(u32, u16, Vec<u8>)]) -> Vec<u8> {
    let mut header = vec![0u8; 48];
    header[0..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
    header[24..28].copy_from_slice(&1u32.to_le_bytes());
    header[44..48].copy_from_slice(&48u32.to_le_bytes());

    let table_len = 8 + props.len() * 8;
    let mut table = Vec::new();
    let mut values = Vec::new();
    for (id, vt, value) in props {
        table.extend_from_slice(&id.to_le_bytes());
        table.extend_from_slice(&((table_len + values.len()) as u32).to_le_bytes());
        values.extend_from_slice(&(*vt as u32).to_le_bytes());
        values.extend_from_slice(value);
        while values.len() % 4 != 0 {
            values.push(0);
        }
    }

    header.extend_from_slice(&((table_len + values.len()) as u32).to_le_bytes());
    header.extend_from_slice(&(props.len() as u32).to_le_bytes());
    header.extend_from_slice(&table);
    header.extend_from_slice(&values);
    header
}

pub fn lpstr(s: &str) -> Vec<u8> {
    let mut out = ((s.len() + 1) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// One slideshow record.
pub fn record(version: u8, instance: u16, rec_type: u16, body: &[u8]) -> Vec<u8> {
    let vi = (version as u16 & 0x000F) | (instance << 4);
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&vi.to_le_bytes());
    out.extend_from_slice(&rec_type.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

pub fn json(properties: &Option<String>) -> serde_json::Value {
    serde_json::from_str(properties.as_deref().unwrap()).unwrap()
}
