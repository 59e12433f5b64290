//! `Encoder`: the mirror image of [`super::Decoder`], implementing
//! [`DocumentBuilder`] (spec.md §4.4 "Encode sequence (symmetric)").
//!
//! exiCPP does not ship a body encoder in the retrieved sources — only
//! `HeaderEncoder.cpp` for the header. Every payload-encoding free function
//! below is the inverse of `BodyDecoder.cpp`'s matching `decode*` function,
//! derived by running its hit/miss convention backwards: look up (possibly
//! inserting) in the string table first, then write the code the decoder
//! would need to read to reach that same table state.

use crate::codec::builder::DocumentBuilder;
use crate::compact_id::CompactId;
use crate::error::{ExiError, ExiResult};
use crate::grammar::{BuiltinGrammar, EventTerm, EventUid};
use crate::header::ExiHeader;
use crate::options::{ExiOptions, PreserveSet};
use crate::qname::QName;
use crate::stream::StreamWriter;
use crate::strtable::encode::{Lookup, StringTable, ValueLookup};

/// Owns the lifecycle of a single encode session: a writer, a string table,
/// and a grammar, plus the open-element stack `CH` needs to resolve which
/// QName a characters event's value partition belongs to (spec.md §4.4,
/// mirroring [`crate::codec::Decoder`]'s own `element_stack`).
pub struct Encoder {
    opts: ExiOptions,
    writer: StreamWriter,
    table: StringTable,
    grammar: BuiltinGrammar,
    element_stack: Vec<(CompactId, CompactId)>,
}

impl Encoder {
    /// A body-only encoder: options travel out-of-band, matching
    /// [`crate::codec::Decoder::from_body`].
    pub fn new(opts: ExiOptions) -> ExiResult<Self> {
        opts.validate()?;
        if !opts.schema_id.is_builtin() {
            return Err(ExiError::Unimplemented("schema-informed grammars"));
        }
        Ok(Self {
            table: StringTable::new_for_options(&opts),
            writer: StreamWriter::new(opts.align),
            grammar: BuiltinGrammar::new(),
            element_stack: Vec::new(),
            opts,
        })
    }

    /// An encoder that first writes an EXI header (cookie optional, options
    /// out-of-band) into the same writer the body will share, so there is
    /// no padding gap between header and body under bit-packed alignment
    /// (spec.md §4.4 "Header"; mirrors [`ExiHeader::encode_with`]'s own
    /// doc comment about why `Decoder`/`Encoder` share one writer).
    pub fn with_header(opts: ExiOptions, has_cookie: bool) -> ExiResult<Self> {
        let header = ExiHeader::new(opts.clone()).with_cookie(has_cookie);
        let mut writer = StreamWriter::new(opts.align);
        header.encode_with(&mut writer)?;
        Ok(Self {
            table: StringTable::new_for_options(&opts),
            writer,
            grammar: BuiltinGrammar::new(),
            element_stack: Vec::new(),
            opts,
        })
    }

    /// Consumes the encoder, returning the finished byte stream.
    pub fn finish(self) -> ExiResult<Vec<u8>> {
        self.writer.into_bytes()
    }

    /// Current bit position of the underlying writer, for diagnostics.
    pub fn bit_pos(&self) -> u64 {
        self.writer.bit_pos()
    }

    fn encode_term(&mut self, term: EventTerm) -> ExiResult<()> {
        self.grammar.encode(&self.opts, &mut self.writer, EventUid(term))
    }
}

impl DocumentBuilder for Encoder {
    fn end_document(&mut self) -> ExiResult<()> {
        log::trace!("ED");
        self.encode_term(EventTerm::Ed)
    }

    fn start_element(&mut self, qname: &QName) -> ExiResult<()> {
        self.encode_term(EventTerm::Se)?;
        let uri = encode_uri(&mut self.writer, &mut self.table, &qname.uri)?;
        let name = encode_local_name(&mut self.writer, &mut self.table, uri, &qname.local_name)?;
        encode_prefix_qualified(
            &mut self.writer,
            &self.table,
            &self.opts,
            uri,
            qname.prefix.as_deref(),
        )?;
        log::trace!("SE {qname}");
        self.element_stack.push((uri, name));
        Ok(())
    }

    fn end_element(&mut self) -> ExiResult<()> {
        self.encode_term(EventTerm::Ee)?;
        self.element_stack.pop();
        log::trace!("EE");
        Ok(())
    }

    fn attribute(&mut self, qname: &QName, value: &str) -> ExiResult<()> {
        self.encode_term(EventTerm::At)?;
        let uri = encode_uri(&mut self.writer, &mut self.table, &qname.uri)?;
        let name = encode_local_name(&mut self.writer, &mut self.table, uri, &qname.local_name)?;
        encode_prefix_qualified(
            &mut self.writer,
            &self.table,
            &self.opts,
            uri,
            qname.prefix.as_deref(),
        )?;
        encode_value(&mut self.writer, &mut self.table, uri, name, value)?;
        log::trace!("AT {qname} = {value:?}");
        Ok(())
    }

    fn namespace_declaration(&mut self, uri: &str, prefix: &str, is_local: bool) -> ExiResult<()> {
        if !is_local {
            return Err(ExiError::Unimplemented("non-local namespace declarations"));
        }
        self.encode_term(EventTerm::Ns)?;
        let uri_id = encode_uri(&mut self.writer, &mut self.table, uri)?;
        encode_prefix_ns(&mut self.writer, &mut self.table, uri_id, prefix)?;
        self.writer.write_bit(is_local)?;
        log::trace!("NS {prefix}={uri}");
        Ok(())
    }

    fn characters(&mut self, text: &str) -> ExiResult<()> {
        let &(uri, local) = self
            .element_stack
            .last()
            .ok_or(ExiError::InvalidConfig("characters outside any open element"))?;
        self.encode_term(EventTerm::Ch)?;
        encode_value(&mut self.writer, &mut self.table, uri, local, text)?;
        log::trace!("CH {text:?}");
        Ok(())
    }

    fn comment(&mut self, text: &str) -> ExiResult<()> {
        self.encode_term(EventTerm::Cm)?;
        self.writer.encode_string(text)
    }

    fn processing_instruction(&mut self, target: &str, text: &str) -> ExiResult<()> {
        self.encode_term(EventTerm::Pi)?;
        self.writer.encode_string(target)?;
        self.writer.encode_string(text)
    }

    fn doctype(&mut self, name: &str, pubid: &str, sysid: &str, text: &str) -> ExiResult<()> {
        self.encode_term(EventTerm::Dt)?;
        self.writer.encode_string(name)?;
        self.writer.encode_string(pubid)?;
        self.writer.encode_string(sysid)?;
        self.writer.encode_string(text)
    }

    fn entity_reference(&mut self, name: &str) -> ExiResult<()> {
        self.encode_term(EventTerm::Er)?;
        self.writer.encode_string(name)
    }
}

/// Inverse of the decoder's `decode_uri`: `0` = miss (write then intern the
/// string), nonzero = hit (`id + 1`).
fn encode_uri(writer: &mut StreamWriter, table: &mut StringTable, uri: &str) -> ExiResult<CompactId> {
    let nbits = table.get_uri_log();
    match table.lookup_uri(uri)? {
        Lookup::Hit(id) => {
            writer.write_bits(id as u64 + 1, nbits)?;
            Ok(id)
        }
        Lookup::Miss(id) => {
            writer.write_bits(0, nbits)?;
            writer.encode_string(uri)?;
            Ok(id)
        }
    }
}

/// Inverse of `decode_name`: a UInt, `0` = hit (then a direct compact ID),
/// nonzero = miss (`len + 1`, then the string body).
fn encode_local_name(
    writer: &mut StreamWriter,
    table: &mut StringTable,
    uri: CompactId,
    name: &str,
) -> ExiResult<CompactId> {
    match table.lookup_local_name(uri, name)? {
        Lookup::Hit(id) => {
            writer.write_uint(0)?;
            let nbits = table.get_local_name_log(uri)?;
            writer.write_bits(id as u64, nbits)?;
            Ok(id)
        }
        Lookup::Miss(id) => {
            writer.write_uint(name.chars().count() as u64 + 1)?;
            writer.write_string_body(name)?;
            Ok(id)
        }
    }
}

/// Inverse of `decode_prefix_qualified`: writes nothing unless prefixes are
/// preserved and the URI already has a nonempty prefix partition, in which
/// case it writes the existing compact ID for `prefix` directly (no
/// hit/miss wrapper — this field never creates a new binding, an `NS` event
/// must have created it first).
fn encode_prefix_qualified(
    writer: &mut StreamWriter,
    table: &StringTable,
    opts: &ExiOptions,
    uri: CompactId,
    prefix: Option<&str>,
) -> ExiResult<()> {
    if !opts.preserve.contains(PreserveSet::PREFIXES) {
        return Ok(());
    }
    if !table.has_prefix(uri)? {
        return Ok(());
    }
    let nbits = table.get_prefix_log_qualified(uri)?;
    if nbits == 0 {
        return Ok(());
    }
    let prefix = prefix.unwrap_or("");
    let id = table
        .find_prefix_index(uri, prefix)?
        .ok_or(ExiError::InvalidExiInput("prefix has no existing NS binding"))?;
    writer.write_bits(id as u64, nbits)
}

/// Inverse of `decode_prefix_ns`: `0` = miss (write then intern the
/// string), nonzero = hit (`id + 1`) — a different hit/miss convention from
/// the qualified-prefix field above.
fn encode_prefix_ns(
    writer: &mut StreamWriter,
    table: &mut StringTable,
    uri: CompactId,
    prefix: &str,
) -> ExiResult<CompactId> {
    let nbits = table.get_prefix_log(uri)?;
    match table.lookup_prefix(uri, prefix)? {
        Lookup::Hit(id) => {
            writer.write_bits(id as u64 + 1, nbits)?;
            Ok(id)
        }
        Lookup::Miss(id) => {
            writer.write_bits(0, nbits)?;
            writer.encode_string(prefix)?;
            Ok(id)
        }
    }
}

/// Inverse of `decode_value`: a UInt, `0` = local-value hit, `1` =
/// global-value hit, `>= 2` = miss (`len + 2`, then the string body).
fn encode_value(
    writer: &mut StreamWriter,
    table: &mut StringTable,
    uri: CompactId,
    local_id: CompactId,
    value: &str,
) -> ExiResult<()> {
    match table.lookup_value(uri, local_id, value)? {
        ValueLookup::LocalHit(id) => {
            writer.write_uint(0)?;
            let nbits = table.get_local_value_log(uri, local_id)?;
            writer.write_bits(id as u64, nbits)
        }
        ValueLookup::GlobalHit(id) => {
            writer.write_uint(1)?;
            let nbits = table.get_global_value_log();
            writer.write_bits(id as u64, nbits)
        }
        ValueLookup::Miss(triple) => {
            writer.write_uint(triple.value.chars().count() as u64 + 2)?;
            writer.write_string_body(&triple.value)
        }
    }
}
