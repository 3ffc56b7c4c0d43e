use phf::phf_map;

/// Magic bytes that should be at the beginning of every OLE file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Minimal size of an empty OLE file with 512-byte sectors (1536 bytes)
pub const MINIMAL_OLEFILE_SIZE: usize = 1536;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

// Sector IDs (from AAF specifications)
/// End of a virtual stream chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE; // -2
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF; // -1

// Directory Entry IDs (from AAF specifications)
/// Unallocated directory entry
pub const NOSTREAM: u32 = 0xFFFFFFFF; // -1

// Object types in storage (from AAF specifications)
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

// Property types
pub const VT_EMPTY: u16 = 0;
pub const VT_NULL: u16 = 1;
pub const VT_I2: u16 = 2;
pub const VT_I4: u16 = 3;
pub const VT_BSTR: u16 = 8;
pub const VT_ERROR: u16 = 10;
pub const VT_BOOL: u16 = 11;
pub const VT_UI2: u16 = 18;
pub const VT_UI4: u16 = 19;
pub const VT_INT: u16 = 22;
pub const VT_UINT: u16 = 23;
pub const VT_LPSTR: u16 = 30;
pub const VT_LPWSTR: u16 = 31;
pub const VT_FILETIME: u16 = 64;
pub const VT_BLOB: u16 = 65;

/// Well-known property-set stream names
pub const SUMMARY_INFORMATION: &str = "\u{0005}SummaryInformation";
pub const DOCUMENT_SUMMARY_INFORMATION: &str = "\u{0005}DocumentSummaryInformation";

// PowerPoint Binary File Format (MS-PPT) and OfficeArt (MS-ODRAW) constants

/// Name of the stream holding the slideshow record tree
pub const POWERPOINT_DOCUMENT: &str = "PowerPoint Document";

/// Size of a record header (ver/instance, type, length)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Version nibble marking a container record
pub const RECORD_CONTAINER_VERSION: u8 = 0x0F;

/// Embedded OLE storage atom (`ExOleObjStg`)
pub const RT_EX_OLE_OBJ_STG: u16 = 0x1011;

/// Instance value of a zlib-compressed `ExOleObjStg`
pub const EX_OLE_OBJ_STG_COMPRESSED: u16 = 0x0001;

/// OfficeArt tertiary property table (`OfficeArtTertiaryFOPT`)
pub const RT_TERTIARY_OPT: u16 = 0xF122;

/// Group-shape property holding a serialized DrawingML package
pub const PROP_METRO_BLOB: u16 = 0x03A9;

/// Property id bits of an OfficeArt property operand
pub const PROPERTY_ID_MASK: u16 = 0x3FFF;

/// Flag marking an OfficeArt property whose data follows the fixed table
pub const PROPERTY_IS_COMPLEX: u16 = 0x8000;

/// Display names of the slideshow and OfficeArt records the decomposer knows.
///
/// Record types outside this table are treated as placeholders whose bodies
/// may carry an embedded package.
pub static RECORD_NAMES: phf::Map<u16, &'static str> = phf_map! {
    1000u16 => "Document",
    1001u16 => "DocumentAtom",
    1002u16 => "EndDocument",
    1006u16 => "Slide",
    1007u16 => "SlideAtom",
    1008u16 => "Notes",
    1009u16 => "NotesAtom",
    1010u16 => "Environment",
    1011u16 => "SlidePersistAtom",
    1016u16 => "MainMaster",
    1017u16 => "SSSlideInfoAtom",
    1023u16 => "VBAInfo",
    1024u16 => "VBAInfoAtom",
    1033u16 => "ExObjList",
    1034u16 => "ExObjListAtom",
    1035u16 => "PPDrawingGroup",
    1036u16 => "PPDrawing",
    2000u16 => "BuildList",
    2001u16 => "BuildAtom",
    2020u16 => "SoundCollection",
    2021u16 => "SoundCollectionAtom",
    2022u16 => "Sound",
    2023u16 => "SoundData",
    3011u16 => "OEPlaceholderAtom",
    3999u16 => "TextHeaderAtom",
    4000u16 => "TextCharsAtom",
    4001u16 => "StyleTextPropAtom",
    4002u16 => "MasterTextPropAtom",
    4003u16 => "TxMasterStyleAtom",
    4004u16 => "TxCFStyleAtom",
    4005u16 => "TxPFStyleAtom",
    4006u16 => "TextRulerAtom",
    4008u16 => "TextBytesAtom",
    4010u16 => "TextSpecInfoAtom",
    4023u16 => "FontEntityAtom",
    4026u16 => "CString",
    4057u16 => "HeadersFooters",
    4058u16 => "HeadersFootersAtom",
    4080u16 => "SlideListWithText",
    4081u16 => "AnimationInfoAtom",
    4082u16 => "InteractiveInfo",
    4083u16 => "InteractiveInfoAtom",
    4085u16 => "UserEditAtom",
    4086u16 => "CurrentUserAtom",
    4087u16 => "DateTimeMCAtom",
    4112u16 => "TimeBehavior",
    4113u16 => "ExOleObjStg",
    4114u16 => "TimeNode",
    4115u16 => "TimePropertyList",
    4116u16 => "AnimationInfo",
    6001u16 => "PersistPtrHolder",
    6002u16 => "PersistPtrIncrementalBlock",
    12000u16 => "Comment2000",
    12001u16 => "Comment2000Atom",
    0xF000u16 => "EscherDggContainer",
    0xF001u16 => "EscherBStoreContainer",
    0xF002u16 => "EscherDgContainer",
    0xF003u16 => "EscherSpgrContainer",
    0xF004u16 => "EscherSpContainer",
    0xF006u16 => "EscherDgg",
    0xF007u16 => "EscherBSE",
    0xF008u16 => "EscherDg",
    0xF009u16 => "EscherSpgr",
    0xF00Au16 => "EscherSp",
    0xF00Bu16 => "EscherOpt",
    0xF00Du16 => "EscherClientTextbox",
    0xF00Fu16 => "EscherChildAnchor",
    0xF010u16 => "EscherClientAnchor",
    0xF011u16 => "EscherClientData",
    0xF118u16 => "EscherSplitMenuColors",
    0xF11Eu16 => "EscherColorMRU",
    0xF122u16 => "EscherTertiaryOpt",
};

/// Display name for a record type, if known.
#[inline]
pub fn record_name(rec_type: u16) -> Option<&'static str> {
    RECORD_NAMES.get(&rec_type).copied()
}
