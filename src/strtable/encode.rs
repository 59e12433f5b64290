//! The encode-side string table: the dual of [`super::decode::StringTable`].
//! Instead of inserting unconditionally on read, it looks up whether a
//! string is already known to decide hit vs. miss, then inserts on miss.
//!
//! exiCPP leaves this unimplemented (`exi::encode::StringTable`,
//! `StringTables.hpp` lines 424-436, marked "TODO: Finish design..." in the
//! original) beyond an allocator and a `UniqueStringSaver`; this module
//! completes it per spec.md's requirement that the encoder mirror the
//! decoder's partitions and log-width math exactly, using `HashMap` lookups
//! in place of the teacher's bump-allocated `UniqueStringSaver` interning.

use std::collections::HashMap;

use crate::compact_id::{compact_id_log2, next_compact_id, CompactId};
use crate::error::{ExiError, ExiResult};
use crate::options::ExiOptions;
use crate::strtable::{seed_uris, IdTriple, LocalNameEntry, UriEntry};

#[derive(Debug, Clone, Default)]
struct LocalNameIndex {
    /// local name -> local-name ID within this URI.
    by_name: HashMap<String, CompactId>,
    /// Per local-name ID, the reverse index of its own local-value
    /// partition (`value -> value ID`); each QName gets an independent map.
    value_maps: Vec<HashMap<String, CompactId>>,
}

/// Owns every partition an encoder consults while writing a document body.
/// Each partition keeps a reverse (`String -> CompactId`) index alongside
/// the decode table's plain `Vec` storage, so a hit/miss decision is a single
/// hash lookup rather than a linear scan.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    uris: Vec<UriEntry>,
    uri_index: HashMap<String, CompactId>,
    /// `uri -> prefix -> prefix_id`.
    prefix_index: Vec<HashMap<String, CompactId>>,
    /// `uri -> local name indices`.
    local_index: Vec<LocalNameIndex>,
    global_values: Vec<String>,
    global_index: HashMap<String, CompactId>,
    value_max_length: Option<u64>,
    value_partition_capacity: Option<u64>,
}

/// Whether a lookup found an existing compact ID or had to create one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit(CompactId),
    Miss(CompactId),
}

impl StringTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new_for_options(opts: &ExiOptions) -> Self {
        let uris = seed_uris(!opts.schema_id.is_builtin());
        let mut t = Self {
            uri_index: HashMap::new(),
            prefix_index: vec![HashMap::new(); uris.len()],
            local_index: vec![LocalNameIndex::default(); uris.len()],
            uris: Vec::new(),
            global_values: Vec::new(),
            global_index: HashMap::new(),
            value_max_length: opts.value_max_length,
            value_partition_capacity: opts.value_partition_capacity,
        };
        for uri in uris {
            let uidx = t.uris.len();
            for (i, p) in uri.prefixes.iter().enumerate() {
                t.prefix_index[uidx].insert(p.clone(), i as CompactId);
            }
            for (i, ln) in uri.local_names.iter().enumerate() {
                t.local_index[uidx].by_name.insert(ln.name.clone(), i as CompactId);
                t.local_index[uidx].value_maps.push(HashMap::new());
            }
            t.uri_index.insert(uri.name.clone(), uidx as CompactId);
            t.uris.push(uri);
        }
        t
    }

    /// Looks up `uri`, inserting it (with an empty prefix/local-name
    /// partition) on miss.
    pub fn lookup_uri(&mut self, uri: &str) -> ExiResult<Lookup> {
        if let Some(&id) = self.uri_index.get(uri) {
            return Ok(Lookup::Hit(id));
        }
        let id = next_compact_id(self.uris.len())?;
        self.uris.push(UriEntry::new(uri));
        self.prefix_index.push(HashMap::new());
        self.local_index.push(LocalNameIndex::default());
        self.uri_index.insert(uri.to_string(), id);
        Ok(Lookup::Miss(id))
    }

    /// Looks up `prefix` within `uri`'s prefix partition, inserting on miss.
    pub fn lookup_prefix(&mut self, uri: CompactId, prefix: &str) -> ExiResult<Lookup> {
        self.check_uri(uri)?;
        let idx = uri as usize;
        if let Some(&id) = self.prefix_index[idx].get(prefix) {
            return Ok(Lookup::Hit(id));
        }
        let id = next_compact_id(self.uris[idx].prefixes.len())?;
        self.uris[idx].prefixes.push(prefix.to_string());
        self.prefix_index[idx].insert(prefix.to_string(), id);
        Ok(Lookup::Miss(id))
    }

    /// Looks up `name` within `uri`'s local-name partition, inserting on
    /// miss.
    pub fn lookup_local_name(&mut self, uri: CompactId, name: &str) -> ExiResult<Lookup> {
        self.check_uri(uri)?;
        let idx = uri as usize;
        if let Some(&id) = self.local_index[idx].by_name.get(name) {
            return Ok(Lookup::Hit(id));
        }
        let id = next_compact_id(self.uris[idx].local_names.len())?;
        self.uris[idx].local_names.push(LocalNameEntry::new(name));
        self.local_index[idx].by_name.insert(name.to_string(), id);
        self.local_index[idx].value_maps.push(HashMap::new());
        Ok(Lookup::Miss(id))
    }

    /// Looks up `value` against the local partition for `(uri, local_id)`
    /// first, then the global partition, inserting into both on miss —
    /// mirroring the decode table's `add_value` coupling.
    pub fn lookup_value(
        &mut self,
        uri: CompactId,
        local_id: CompactId,
        value: &str,
    ) -> ExiResult<ValueLookup> {
        self.check_local_name(uri, local_id)?;
        let lidx = uri as usize;
        let lnidx = local_id as usize;

        if let Some(&id) = self.local_index[lidx].value_maps[lnidx].get(value) {
            return Ok(ValueLookup::LocalHit(id));
        }
        if let Some(&id) = self.global_index.get(value) {
            return Ok(ValueLookup::GlobalHit(id));
        }

        let too_long = self
            .value_max_length
            .is_some_and(|max| (value.chars().count() as u64) > max);
        let at_capacity = self
            .value_partition_capacity
            .is_some_and(|cap| (self.global_values.len() as u64) >= cap);

        if too_long || at_capacity {
            log::trace!("value exceeds table limits, not cached: {value:?}");
            return Ok(ValueLookup::Miss(IdTriple {
                value: value.to_string(),
                global_id: next_compact_id(self.global_values.len())?,
                local_id: next_compact_id(
                    self.uris[lidx].local_names[local_id as usize]
                        .local_values
                        .len(),
                )?,
            }));
        }

        let global_id = next_compact_id(self.global_values.len())?;
        self.global_values.push(value.to_string());
        self.global_index.insert(value.to_string(), global_id);

        let entry = &mut self.uris[lidx].local_names[lnidx];
        let local_id_out = next_compact_id(entry.local_values.len())?;
        entry.local_values.push(value.to_string());
        self.local_index[lidx].value_maps[lnidx].insert(value.to_string(), local_id_out);

        Ok(ValueLookup::Miss(IdTriple {
            value: value.to_string(),
            global_id,
            local_id: local_id_out,
        }))
    }

    pub fn get_uri_log(&self) -> u32 {
        compact_id_log2(self.uris.len() as u64 + 1)
    }

    pub fn get_prefix_log_qualified(&self, uri: CompactId) -> ExiResult<u32> {
        self.check_uri(uri)?;
        let count = self.uris[uri as usize].prefixes.len() as u64;
        if count == 0 {
            return Ok(0);
        }
        Ok(compact_id_log2(count - 1))
    }

    pub fn get_prefix_log(&self, uri: CompactId) -> ExiResult<u32> {
        self.check_uri(uri)?;
        Ok(compact_id_log2(self.uris[uri as usize].prefixes.len() as u64))
    }

    pub fn get_local_name_log(&self, uri: CompactId) -> ExiResult<u32> {
        self.check_uri(uri)?;
        Ok(compact_id_log2(self.uris[uri as usize].local_names.len() as u64))
    }

    pub fn get_global_value_log(&self) -> u32 {
        compact_id_log2(self.global_values.len() as u64)
    }

    pub fn get_local_value_log(&self, uri: CompactId, local_id: CompactId) -> ExiResult<u32> {
        self.check_local_name(uri, local_id)?;
        Ok(compact_id_log2(
            self.uris[uri as usize].local_names[local_id as usize]
                .local_values
                .len() as u64,
        ))
    }

    /// `true` if `uri`'s prefix partition is non-empty — encode-side twin of
    /// the decode table's `has_prefix`, used to decide whether a qualified
    /// prefix field is written at all (spec.md §4.4 `decodePfxQ`).
    pub fn has_prefix(&self, uri: CompactId) -> ExiResult<bool> {
        self.check_uri(uri)?;
        Ok(!self.uris[uri as usize].prefixes.is_empty())
    }

    /// Finds `prefix`'s existing compact ID within `uri`'s prefix partition,
    /// without inserting on miss — the qualified-prefix field is a direct
    /// compact ID once a binding exists (via a prior NS event), never a
    /// fresh insertion point (`decodePfxQ`, `BodyDecoder.cpp` lines 540-561).
    pub fn find_prefix_index(&self, uri: CompactId, prefix: &str) -> ExiResult<Option<CompactId>> {
        self.check_uri(uri)?;
        Ok(self.prefix_index[uri as usize].get(prefix).copied())
    }

    fn check_uri(&self, uri: CompactId) -> ExiResult<()> {
        if (uri as usize) < self.uris.len() {
            Ok(())
        } else {
            Err(ExiError::InvalidExiInput("URI ID out of range"))
        }
    }

    fn check_local_name(&self, uri: CompactId, local_id: CompactId) -> ExiResult<()> {
        self.check_uri(uri)?;
        if (local_id as usize) < self.uris[uri as usize].local_names.len() {
            Ok(())
        } else {
            Err(ExiError::InvalidExiInput("local name ID out of range"))
        }
    }
}

/// The three-way outcome of [`StringTable::lookup_value`], mirroring the
/// decoder's local-hit / global-hit / miss value encoding (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueLookup {
    LocalHit(CompactId),
    GlobalHit(CompactId),
    Miss(IdTriple),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_lookup_hits_on_second_call() {
        let mut t = StringTable::empty();
        assert_eq!(t.lookup_uri("http://a").unwrap(), Lookup::Miss(0));
        assert_eq!(t.lookup_uri("http://a").unwrap(), Lookup::Hit(0));
        assert_eq!(t.lookup_uri("http://b").unwrap(), Lookup::Miss(1));
    }

    #[test]
    fn seeded_table_hits_xml_namespace() {
        let t = StringTable::new_for_options(&ExiOptions::default());
        assert!(t.uri_index.contains_key(crate::strtable::XML_NS_URI));
    }

    #[test]
    fn value_lookup_progresses_local_then_global_then_miss() {
        let mut t = StringTable::empty();
        t.lookup_uri("http://a").unwrap();
        t.lookup_local_name(0, "foo").unwrap();

        match t.lookup_value(0, 0, "hello").unwrap() {
            ValueLookup::Miss(triple) => {
                assert_eq!(triple.global_id, 0);
                assert_eq!(triple.local_id, 0);
            }
            other => panic!("expected Miss, got {other:?}"),
        }

        assert_eq!(
            t.lookup_value(0, 0, "hello").unwrap(),
            ValueLookup::LocalHit(0)
        );
    }

    #[test]
    fn value_lookup_finds_global_hit_from_other_qname() {
        let mut t = StringTable::empty();
        t.lookup_uri("http://a").unwrap();
        t.lookup_local_name(0, "foo").unwrap();
        t.lookup_local_name(0, "bar").unwrap();

        t.lookup_value(0, 0, "shared").unwrap();
        match t.lookup_value(0, 1, "shared").unwrap() {
            ValueLookup::GlobalHit(0) => {}
            other => panic!("expected GlobalHit(0), got {other:?}"),
        }
    }
}
