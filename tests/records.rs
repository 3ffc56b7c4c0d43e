mod common;

use common::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use longan::{Document, Entry, Resolution, SourceType};
use std::io::Write;

const DOCUMENT: u16 = 1000;
const TEXT_CHARS_ATOM: u16 = 4000;
const EX_OLE_OBJ_STG: u16 = 0x1011;
const TERTIARY_OPT: u16 = 0xF122;
const METRO_BLOB: u16 = 0x03A9 | 0x8000;
const UNREGISTERED: u16 = 0x7777;

fn compressed_storage(storage: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(storage).unwrap();
    let mut body = (storage.len() as u32).to_le_bytes().to_vec();
    body.extend(encoder.finish().unwrap());
    body
}

fn tertiary_opt(blob: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&METRO_BLOB.to_le_bytes());
    body.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    body.extend_from_slice(blob);
    record(3, 1, TERTIARY_OPT, &body)
}

fn slideshow() -> Vec<u8> {
    let package = opc_bytes(&[("slide.xml", b"<slide/>")]);
    let metro = opc_bytes(&[("drawing.xml", b"<drawing/>")]);
    let storage = ole_bytes(&[], &[("/CONTENTS", b"embedded")]);

    let mut inner = record(0, 0, TEXT_CHARS_ATOM, b"h\0i\0");
    inner.extend(tertiary_opt(&metro));

    let mut stream = record(0x0F, 0, DOCUMENT, &inner);
    stream.extend(record(0, 0, UNREGISTERED, &package));
    stream.extend(record(0, 1, EX_OLE_OBJ_STG, &compressed_storage(&storage)));
    ole_bytes(&[], &[("/PowerPoint Document", &stream), ("/Current User", b"user")])
}

fn open(dir: &std::path::Path, scratch: &std::path::Path) -> Document {
    let path = write_file(dir, "deck.ppt", &slideshow());
    Document::open(&path, options(scratch)).unwrap()
}

fn child_names(doc: &Document, node: longan::NodeId) -> Vec<String> {
    doc.children(node).iter().map(|&c| doc.display_name(c)).collect()
}

#[test]
fn stream_decomposes_into_records() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut doc = open(dir.path(), scratch.path());

    let stream = doc.find("PowerPoint Document").unwrap();
    let activation = doc.activate(stream).unwrap();
    assert_eq!(activation.source_type, SourceType::Octet);
    assert_eq!(
        doc.entry(stream).unwrap().leaf_state().unwrap().resolution(),
        Resolution::Records
    );

    let names = child_names(&doc, stream);
    assert_eq!(names.len(), 3);
    assert!(names[0].starts_with("Document ("));
    assert!(names[1].starts_with("Unknown 0x7777 ("));
    assert!(names[2].starts_with("ExOleObjStg ("));

    let document = doc.children(stream)[0];
    let inner = child_names(&doc, document);
    assert_eq!(inner[0], "TextCharsAtom (12 b)");
    assert!(inner[1].starts_with("EscherTertiaryOpt ("));

    let atom = doc.children(document)[0];
    let activation = doc.activate(atom).unwrap();
    assert_eq!(activation.file_name, "TextCharsAtom (12 b).rec");
    assert_eq!(activation.payload.len(), 12);
    assert_eq!(json(&activation.properties)["offset"], 8);

    // Decomposition happens once
    doc.activate(stream).unwrap();
    assert_eq!(doc.children(stream).len(), 3);
    assert_eq!(file_count(scratch.path()), 0);
}

#[test]
fn placeholder_record_holds_package() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut doc = open(dir.path(), scratch.path());
    let stream = doc.find("PowerPoint Document").unwrap();
    doc.activate(stream).unwrap();

    let placeholder = doc.children(stream)[1];
    let activation = doc.activate(placeholder).unwrap();
    assert!(doc.display_name(placeholder).ends_with(" b) (opc)"));
    assert!(activation.file_name.starts_with("Unknown 0x7777 ("));
    assert!(activation.file_name.ends_with(".rec"));
    assert_eq!(child_names(&doc, placeholder), vec!["slide.xml", "[Content_Types].xml"]);

    let name = doc
        .entry(placeholder)
        .unwrap()
        .scratch_path()
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();
    assert!(name.starts_with("Unknown_0x7777-") && name.ends_with(".zip"), "{name}");
}

#[test]
fn compressed_storage_record_holds_compound_file() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut doc = open(dir.path(), scratch.path());
    let stream = doc.find("PowerPoint Document").unwrap();
    doc.activate(stream).unwrap();

    let storage = doc.children(stream)[2];
    doc.activate(storage).unwrap();
    assert!(matches!(doc.entry(storage).unwrap(), Entry::OleRoot(_)));
    assert!(doc.display_name(storage).ends_with(" b) (Root Entry)"));

    let contents = doc.children(storage)[0];
    assert_eq!(doc.display_name(contents), "CONTENTS");
    assert_eq!(doc.activate(contents).unwrap().payload.as_ref(), b"embedded");
}

#[test]
fn tagged_metro_blob_holds_package() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut doc = open(dir.path(), scratch.path());
    let stream = doc.find("PowerPoint Document").unwrap();
    doc.activate(stream).unwrap();

    let document = doc.children(stream)[0];
    let opt = doc.children(document)[1];
    doc.activate(opt).unwrap();
    assert!(doc.display_name(opt).starts_with("EscherTertiaryOpt ("));
    assert!(doc.display_name(opt).ends_with(" (opc)"));
    assert_eq!(child_names(&doc, opt), vec!["drawing.xml", "[Content_Types].xml"]);
}

#[test]
fn decomposition_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "deck.ppt", &slideshow());
    let mut doc =
        Document::open(&path, options(scratch.path()).with_decompose_records(false)).unwrap();

    let stream = doc.find("PowerPoint Document").unwrap();
    doc.activate(stream).unwrap();
    assert!(doc.children(stream).is_empty());
    assert_eq!(
        doc.entry(stream).unwrap().leaf_state().unwrap().resolution(),
        Resolution::Opaque
    );
}

#[test]
fn editing_stream_drops_records() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut doc = open(dir.path(), scratch.path());
    let stream = doc.find("PowerPoint Document").unwrap();
    doc.activate(stream).unwrap();
    assert_eq!(doc.children(stream).len(), 3);

    let replacement = record(0, 0, TEXT_CHARS_ATOM, b"x\0");
    doc.apply_edit(stream, bytes::Bytes::from(replacement.clone())).unwrap();
    assert!(doc.children(stream).is_empty());

    let activation = doc.activate(stream).unwrap();
    assert_eq!(activation.payload.as_ref(), &replacement[..]);
    assert_eq!(child_names(&doc, stream), vec!["TextCharsAtom (10 b)"]);
}
