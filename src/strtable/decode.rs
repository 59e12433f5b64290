//! The decode-side string table: grows by interning whatever the stream
//! hands it on a miss (spec.md §4.2). Grounded directly on
//! `exi::decode::StringTable`, `include/exi/Basic/StringTables.hpp`.

use crate::compact_id::{compact_id_log2, next_compact_id, CompactId};
use crate::error::{ExiError, ExiResult};
use crate::options::ExiOptions;
use crate::strtable::{seed_uris, IdPair, IdTriple, LocalNameEntry, UriEntry};

/// Owns every partition a decoder consults while reading a document body.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    uris: Vec<UriEntry>,
    global_values: Vec<String>,
    value_max_length: Option<u64>,
    value_partition_capacity: Option<u64>,
}

impl StringTable {
    /// A table with no seeded entries at all (mainly useful for unit tests
    /// exercising the partition mechanics in isolation).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table seeded per `opts` (spec.md §4.2 "Seeding"), grounded on
    /// `StringTable::StringTable(const ExiOptions&)` / `setup`.
    pub fn new_for_options(opts: &ExiOptions) -> Self {
        Self {
            uris: seed_uris(!opts.schema_id.is_builtin()),
            global_values: Vec::new(),
            value_max_length: opts.value_max_length,
            value_partition_capacity: opts.value_partition_capacity,
        }
    }

    ////////////////////////////////////////////////////////////////////
    // Setters

    /// Creates a new URI entry, optionally seeding its first prefix
    /// (exiCPP's `addURI`).
    pub fn add_uri(&mut self, uri: impl Into<String>, prefix: Option<&str>) -> ExiResult<IdPair> {
        let id = next_compact_id(self.uris.len())?;
        let mut entry = UriEntry::new(uri);
        if let Some(p) = prefix {
            entry.prefixes.push(p.to_string());
        }
        let value = entry.name.clone();
        self.uris.push(entry);
        Ok(IdPair { value, id })
    }

    /// Associates a new prefix with an existing URI (exiCPP's `addPrefix`).
    pub fn add_prefix(&mut self, uri: CompactId, prefix: impl Into<String>) -> ExiResult<IdPair> {
        let entry = self.uri_mut(uri)?;
        let id = next_compact_id(entry.prefixes.len())?;
        let prefix = prefix.into();
        entry.prefixes.push(prefix.clone());
        Ok(IdPair { value: prefix, id })
    }

    /// Associates a new local name with an existing URI (exiCPP's
    /// `addLocalName`).
    pub fn add_local_name(&mut self, uri: CompactId, name: impl Into<String>) -> ExiResult<IdPair> {
        let entry = self.uri_mut(uri)?;
        let id = next_compact_id(entry.local_names.len())?;
        let name = name.into();
        entry.local_names.push(LocalNameEntry::new(name.clone()));
        Ok(IdPair { value: name, id })
    }

    /// Adds a value to the global partition only, with no local association
    /// (exiCPP's standalone `addGlobalValue`; the body decoder always uses
    /// [`Self::add_value`] instead, which updates both partitions).
    pub fn add_global_value(&mut self, value: impl Into<String>) -> ExiResult<IdPair> {
        let id = next_compact_id(self.global_values.len())?;
        let value = value.into();
        self.global_values.push(value.clone());
        Ok(IdPair { value, id })
    }

    /// Associates a new local value with a (URI, LocalID), also interning it
    /// globally — exiCPP's `addLocalValue` always touches both partitions
    /// in one call, so this crate keeps that coupling rather than splitting
    /// it into two independently-callable inserts.
    pub fn add_local_value(
        &mut self,
        uri: CompactId,
        local_id: CompactId,
        value: impl Into<String>,
    ) -> ExiResult<IdPair> {
        let triple = self.add_value(uri, local_id, value)?;
        Ok(IdPair {
            value: triple.value,
            id: triple.local_id,
        })
    }

    /// Creates a new global value AND associates it as a local value for
    /// `(uri, local_id)` (exiCPP's `addValue`). Respects
    /// `valueMaxLength`/`valuePartitionCapacity`: an over-length or
    /// over-capacity value is still reported back to the caller but is not
    /// cached for future hits (spec.md §4.2 "Failure semantics").
    pub fn add_value(
        &mut self,
        uri: CompactId,
        local_id: CompactId,
        value: impl Into<String>,
    ) -> ExiResult<IdTriple> {
        let value = value.into();

        let too_long = self
            .value_max_length
            .is_some_and(|max| (value.chars().count() as u64) > max);
        let at_capacity = self
            .value_partition_capacity
            .is_some_and(|cap| (self.global_values.len() as u64) >= cap);

        if too_long || at_capacity {
            log::trace!("value exceeds table limits, not cached: {value:?}");
            return Ok(IdTriple {
                global_id: next_compact_id(self.global_values.len())?,
                local_id: next_compact_id(self.local_name_mut(uri, local_id)?.local_values.len())?,
                value,
            });
        }

        let global_id = next_compact_id(self.global_values.len())?;
        self.global_values.push(value.clone());

        let entry = self.local_name_mut(uri, local_id)?;
        let local_id_out = next_compact_id(entry.local_values.len())?;
        entry.local_values.push(value.clone());

        Ok(IdTriple {
            value,
            global_id,
            local_id: local_id_out,
        })
    }

    ////////////////////////////////////////////////////////////////////
    // Validators

    pub fn has_uri(&self, uri: CompactId) -> bool {
        (uri as usize) < self.uris.len()
    }

    pub fn has_prefix(&self, uri: CompactId) -> bool {
        self.uris
            .get(uri as usize)
            .is_some_and(|e| !e.prefixes.is_empty())
    }

    ////////////////////////////////////////////////////////////////////
    // Getters

    pub fn get_uri(&self, uri: CompactId) -> ExiResult<&str> {
        Ok(&self.uri(uri)?.name)
    }

    pub fn get_prefix(&self, uri: CompactId, prefix_id: CompactId) -> ExiResult<&str> {
        let entry = self.uri(uri)?;
        entry
            .prefixes
            .get(prefix_id as usize)
            .map(String::as_str)
            .ok_or(ExiError::InvalidExiInput("prefix ID out of range"))
    }

    pub fn get_local_name(&self, uri: CompactId, local_id: CompactId) -> ExiResult<&str> {
        Ok(&self.local_name(uri, local_id)?.name)
    }

    pub fn get_qname(&self, uri: CompactId, local_id: CompactId) -> ExiResult<(&str, &str)> {
        let entry = self.uri(uri)?;
        let name = entry
            .local_names
            .get(local_id as usize)
            .ok_or(ExiError::InvalidExiInput("local name ID out of range"))?;
        Ok((&entry.name, &name.name))
    }

    pub fn get_global_value(&self, global_id: CompactId) -> ExiResult<&str> {
        self.global_values
            .get(global_id as usize)
            .map(String::as_str)
            .ok_or(ExiError::InvalidExiInput("global value ID out of range"))
    }

    pub fn get_local_value(
        &self,
        uri: CompactId,
        local_id: CompactId,
        value_id: CompactId,
    ) -> ExiResult<&str> {
        let entry = self.local_name(uri, local_id)?;
        entry
            .local_values
            .get(value_id as usize)
            .map(String::as_str)
            .ok_or(ExiError::InvalidExiInput("local value ID out of range"))
    }

    ////////////////////////////////////////////////////////////////////
    // Log getters (spec.md §4.2 table; exiCPP's `get*Log` methods)

    pub fn get_uri_log(&self) -> u32 {
        compact_id_log2(self.uris.len() as u64 + 1)
    }

    /// Bit width for the *qualified* prefix field (direct compact ID, no
    /// hit/miss wrapper) — exiCPP's `getPrefixLogQ`.
    pub fn get_prefix_log_qualified(&self, uri: CompactId) -> ExiResult<u32> {
        let count = self.uri(uri)?.prefixes.len() as u64;
        if count == 0 {
            return Ok(0);
        }
        Ok(compact_id_log2(count - 1))
    }

    /// Bit width for the NS-event prefix field's hit/miss code — exiCPP's
    /// `getPrefixLog`.
    pub fn get_prefix_log(&self, uri: CompactId) -> ExiResult<u32> {
        Ok(compact_id_log2(self.uri(uri)?.prefixes.len() as u64))
    }

    pub fn get_local_name_log(&self, uri: CompactId) -> ExiResult<u32> {
        Ok(compact_id_log2(self.uri(uri)?.local_names.len() as u64))
    }

    /// Direct (not hit-or-miss) compact ID width for the global-value-hit
    /// branch of value decoding — exiCPP's `getGlobalValueLog` /
    /// `GValueCount.bits()`, a plain (non `+1`) counter.
    pub fn get_global_value_log(&self) -> u32 {
        compact_id_log2(self.global_values.len() as u64)
    }

    pub fn get_local_value_log(&self, uri: CompactId, local_id: CompactId) -> ExiResult<u32> {
        Ok(compact_id_log2(
            self.local_name(uri, local_id)?.local_values.len() as u64,
        ))
    }

    ////////////////////////////////////////////////////////////////////

    fn uri(&self, uri: CompactId) -> ExiResult<&UriEntry> {
        self.uris
            .get(uri as usize)
            .ok_or(ExiError::InvalidExiInput("URI ID out of range"))
    }

    fn uri_mut(&mut self, uri: CompactId) -> ExiResult<&mut UriEntry> {
        self.uris
            .get_mut(uri as usize)
            .ok_or(ExiError::InvalidExiInput("URI ID out of range"))
    }

    fn local_name(&self, uri: CompactId, local_id: CompactId) -> ExiResult<&LocalNameEntry> {
        self.uri(uri)?
            .local_names
            .get(local_id as usize)
            .ok_or(ExiError::InvalidExiInput("local name ID out of range"))
    }

    fn local_name_mut(
        &mut self,
        uri: CompactId,
        local_id: CompactId,
    ) -> ExiResult<&mut LocalNameEntry> {
        self.uri_mut(uri)?
            .local_names
            .get_mut(local_id as usize)
            .ok_or(ExiError::InvalidExiInput("local name ID out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemaless_table_seeds_two_uris() {
        let t = StringTable::new_for_options(&ExiOptions::default());
        assert!(t.has_uri(0));
        assert!(t.has_uri(1));
        assert!(!t.has_uri(2));
        assert_eq!(t.get_uri(1).unwrap(), crate::strtable::XML_NS_URI);
    }

    #[test]
    fn add_uri_returns_preinsertion_length_as_id() {
        let mut t = StringTable::empty();
        let p1 = t.add_uri("http://a", None).unwrap();
        let p2 = t.add_uri("http://b", Some("b")).unwrap();
        assert_eq!(p1.id, 0);
        assert_eq!(p2.id, 1);
        assert_eq!(p2.value, "http://b");
    }

    #[test]
    fn add_value_updates_both_global_and_local_partitions() {
        let mut t = StringTable::empty();
        t.add_uri("http://a", None).unwrap();
        t.add_local_name(0, "foo").unwrap();

        let triple = t.add_value(0, 0, "hello").unwrap();
        assert_eq!(triple.global_id, 0);
        assert_eq!(triple.local_id, 0);
        assert_eq!(t.get_global_value(0).unwrap(), "hello");
        assert_eq!(t.get_local_value(0, 0, 0).unwrap(), "hello");

        let triple2 = t.add_value(0, 0, "world").unwrap();
        assert_eq!(triple2.global_id, 1);
        assert_eq!(triple2.local_id, 1);
    }

    #[test]
    fn value_over_max_length_is_not_cached() {
        let mut t = StringTable::empty();
        t.value_max_length = Some(2);
        t.add_uri("http://a", None).unwrap();
        t.add_local_name(0, "foo").unwrap();

        let triple = t.add_value(0, 0, "too long").unwrap();
        assert_eq!(triple.value, "too long");
        assert_eq!(t.get_global_value_log(), compact_id_log2(0));
        assert!(t.get_global_value(0).is_err());
    }

    #[test]
    fn log_widths_follow_cardinality_plus_one_for_hit_or_miss() {
        let mut t = StringTable::empty();
        assert_eq!(t.get_uri_log(), compact_id_log2(1));
        t.add_uri("http://a", None).unwrap();
        assert_eq!(t.get_uri_log(), compact_id_log2(2));
    }

    #[test]
    fn qualified_prefix_log_is_zero_for_empty_partition() {
        let mut t = StringTable::empty();
        t.add_uri("http://a", None).unwrap();
        assert_eq!(t.get_prefix_log_qualified(0).unwrap(), 0);
    }
}
