//! String tables: URI / prefix / local-name / value partitions with
//! compact-ID assignment (spec.md §4.2).
//!
//! Grounded on `include/exi/Basic/StringTables.hpp`'s `exi::decode::StringTable`
//! (full implementation) and `exi::encode::StringTable` (a stub in the
//! original, completed here per spec.md's "encoder mirrors decode").

pub mod decode;
pub mod encode;

pub use decode::StringTable as DecodeStringTable;
pub use encode::StringTable as EncodeStringTable;

use crate::compact_id::CompactId;

/// A single (string, compact ID) result, mirroring exiCPP's `IDPair`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPair {
    pub value: String,
    pub id: CompactId,
}

/// A value insertion result carrying both the global and local compact IDs,
/// mirroring exiCPP's `IDTriple`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTriple {
    pub value: String,
    pub global_id: CompactId,
    pub local_id: CompactId,
}

/// One entry in the local-name partition of a URI: the name itself plus the
/// per-QName local-value partition (exiCPP's `LocalName`, `StringTables.hpp`
/// lines 73-90).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalNameEntry {
    pub name: String,
    pub local_values: Vec<String>,
}

impl LocalNameEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_values: Vec::new(),
        }
    }

    /// Minimum bits required to address the current local-value partition
    /// with a hit-or-miss code (exiCPP's `LocalName::bits`).
    pub fn value_bits(&self) -> u32 {
        crate::compact_id::compact_id_log2(self.local_values.len() as u64 + 1)
    }
}

/// One entry in the URI partition: the URI string, its prefix subpartition,
/// and its local-name subpartition (exiCPP's `URIInfo` plus the associated
/// `PrefixMap`/`LNMap` slots, flattened into one owned struct since this
/// crate indexes by `Vec` position rather than a `PagedVec` of pointers).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UriEntry {
    pub name: String,
    pub prefixes: Vec<String>,
    pub local_names: Vec<LocalNameEntry>,
}

impl UriEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefixes: Vec::new(),
            local_names: Vec::new(),
        }
    }
}

/// The XML namespace URI, always seeded as compact ID 1 (spec.md §4.2
/// seeding table).
pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// The XML Schema instance namespace, seeded as compact ID 2 when
/// schema-informed.
pub const XSI_NS_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// The XML Schema namespace, seeded as compact ID 3 when schema-informed.
pub const XSD_NS_URI: &str = "http://www.w3.org/2001/XMLSchema";

/// Builds the partitions every fresh table seeds before any document content
/// is read (spec.md §4.2 "Seeding"), shared by the decode and encode tables.
/// Grounded on `createInitialEntries(bool UsesSchema)`.
pub(crate) fn seed_uris(uses_schema: bool) -> Vec<UriEntry> {
    let mut uris = Vec::with_capacity(if uses_schema { 4 } else { 2 });

    let mut empty = UriEntry::new("");
    empty.prefixes.push(String::new());
    uris.push(empty);

    let mut xml = UriEntry::new(XML_NS_URI);
    xml.prefixes.push("xml".to_string());
    for name in ["base", "id", "lang", "space"] {
        xml.local_names.push(LocalNameEntry::new(name));
    }
    uris.push(xml);

    if uses_schema {
        let mut xsi = UriEntry::new(XSI_NS_URI);
        xsi.prefixes.push("xsi".to_string());
        for name in ["nil", "type"] {
            xsi.local_names.push(LocalNameEntry::new(name));
        }
        uris.push(xsi);

        let mut xsd = UriEntry::new(XSD_NS_URI);
        xsd.prefixes.push("xsd".to_string());
        uris.push(xsd);
    }

    uris
}
