//! `Decoder`: owns a stream, a string table, and a grammar, and drives the
//! decode loop that calls back into a [`super::Serializer`] (spec.md §4.4).
//!
//! Grounded on exiCPP's `ExiDecoder`
//! (`include/exi/Decode/BodyDecoder.hpp`, `lib/exi/Decode/BodyDecoder.cpp`):
//! the `setOptions`/`setReader`/`init`/`decodeBody`/`decodeEvent` method
//! sequence, the hot/cold `decodeEvent`/`dispatchUncommonEvent` split, and
//! the exact hit/miss sentinel conventions of `decodeURI`/`decodeName`/
//! `decodePfxQ`/`decodePfx`/`decodeValue` are all transcribed from that file.

use crate::codec::serializer::Serializer;
use crate::codec::Control;
use crate::compact_id::CompactId;
use crate::error::{ExiError, ExiResult};
use crate::header::ExiHeader;
use crate::options::{ExiOptions, PreserveSet, SchemaId};
use crate::qname::QName;
use crate::stream::{Stream, UnifiedBuffer};
use crate::strtable::decode::StringTable;
use crate::grammar::{BuiltinGrammar, EventTerm};

#[derive(Debug, Clone, Copy, Default)]
struct DecoderFlags {
    did_header: bool,
    did_init: bool,
    set_reader: bool,
}

/// Which partition a resolved value lives in (spec.md §4.2 "A value-carrying
/// event additionally carries a value-ID resolved either against the global
/// or local partition").
enum ValueRef {
    Local(CompactId),
    Global(CompactId),
}

/// Owns the lifecycle of a single decode session (spec.md §4.4 "Decoder
/// driver"). Mirrors exiCPP's `ExiDecoder` member layout: header, options,
/// string table, grammar, and a small flag set tracking how far through
/// `setOptions`/`setReader`/`init` the session has progressed.
pub struct Decoder<'a> {
    header: ExiHeader,
    opts: Option<ExiOptions>,
    stream: Option<Stream<'a>>,
    table: StringTable,
    grammar: BuiltinGrammar,
    /// `(URI, LocalName)` of each currently-open element, pushed on `SE`
    /// and popped on `EE`. `CH`'s value partition is keyed by the
    /// enclosing element's QName (EXI 1.0 §7.1.7), not by a QName decoded
    /// as part of the `CH` event itself — there isn't one.
    element_stack: Vec<(CompactId, CompactId)>,
    flags: DecoderFlags,
}

impl<'a> Decoder<'a> {
    /// An empty decoder with no options or reader yet — build one up via
    /// [`Self::set_options`]/[`Self::set_reader`], or use
    /// [`Self::from_header`]/[`Self::from_body`] for the common cases.
    pub fn new() -> Self {
        Self {
            header: ExiHeader {
                has_cookie: false,
                has_options: false,
                version: crate::header::CURRENT_EXI_VERSION,
                opts: None,
            },
            opts: None,
            stream: None,
            table: StringTable::empty(),
            grammar: BuiltinGrammar::new(),
            element_stack: Vec::new(),
            flags: DecoderFlags::default(),
        }
    }

    /// Supplies options out-of-band (spec.md §4.4 step 1, exiCPP's
    /// `setOptions`). Rejects a schema other than the built-in one
    /// (spec.md §9 Open Questions: schema-informed grammars are an
    /// explicit `Unimplemented` seam).
    pub fn set_options(&mut self, opts: ExiOptions) -> ExiResult<()> {
        opts.validate()?;
        if !matches!(opts.schema_id, SchemaId::None) {
            return Err(ExiError::Unimplemented("schema-informed grammars"));
        }
        self.table = StringTable::new_for_options(&opts);
        self.header.opts = Some(opts.clone());
        self.opts = Some(opts);
        self.flags.did_header = true;
        Ok(())
    }

    /// Binds the body stream (spec.md §4.4 step 2, exiCPP's `setReader`).
    /// Requires options to already be set, so the alignment is known.
    pub fn set_reader(&mut self, buffer: UnifiedBuffer<'a>) -> ExiResult<()> {
        let opts = self
            .opts
            .as_ref()
            .ok_or(ExiError::InvalidConfig("options must be set before the reader"))?;
        self.stream = Some(Stream::new(buffer, opts.align));
        self.flags.set_reader = true;
        Ok(())
    }

    /// Finalizes setup (spec.md §4.4 step 3, exiCPP's `init`). Idempotent.
    pub fn init(&mut self) -> ExiResult<()> {
        if self.flags.did_init {
            return Ok(());
        }
        if self.opts.is_none() || self.stream.is_none() {
            log::error!("options or reader are not initialized");
            return Err(ExiError::InvalidConfig(
                "decoder requires both options and a reader before init",
            ));
        }
        self.flags.did_init = true;
        log::trace!("decoder initialized");
        Ok(())
    }

    /// Parses an EXI header from `data` and prepares the body reader that
    /// follows it. In-stream options documents are `Unimplemented` (spec.md
    /// §9), so `ExiHeader::decode` never carries options itself — `opts`
    /// must still be supplied out-of-band, the common case for a stream
    /// whose cookie/distinguishing bits are self-describing but whose
    /// option semantics are agreed out of band (spec.md §4.4 step 1).
    pub fn from_header(data: &'a [u8], opts: ExiOptions) -> ExiResult<Self> {
        let (header, body) = ExiHeader::decode(data)?;
        let mut d = Self::new();
        d.header = header;
        d.set_options(opts)?;
        d.set_reader(body)?;
        d.init()?;
        Ok(d)
    }

    /// Builds a decoder directly over a body buffer, with options supplied
    /// out-of-band (spec.md §4.4 step 1 "accept options out-of-band").
    pub fn from_body(body: UnifiedBuffer<'a>, opts: ExiOptions) -> ExiResult<Self> {
        let mut d = Self::new();
        d.set_options(opts)?;
        d.set_reader(body)?;
        d.init()?;
        Ok(d)
    }

    fn stream_mut(&mut self) -> ExiResult<&mut Stream<'a>> {
        self.stream
            .as_mut()
            .ok_or(ExiError::InvalidConfig("reader not set"))
    }

    fn opts(&self) -> ExiResult<&ExiOptions> {
        self.opts
            .as_ref()
            .ok_or(ExiError::InvalidConfig("options not set"))
    }

    /// Current bit position of the underlying stream, for diagnostics.
    pub fn bit_pos(&self) -> u64 {
        self.stream.as_ref().map(|s| s.bit_pos()).unwrap_or(0)
    }

    /// Runs the decode loop to completion (spec.md §4.4 "Decode sequence"):
    /// `SD` is emitted unconditionally before the loop starts (it is the
    /// sole choice of the EXI `Document` production and so costs zero
    /// bits; see [`crate::grammar::builtin`] for why this crate's grammar
    /// never enumerates it as a term to decode), then events are read and
    /// dispatched until `ED`.
    pub fn decode_document<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        self.init()?;
        s.sd()?;
        loop {
            if !self.stream_mut()?.has_data() {
                break;
            }
            match self.decode_event(s) {
                Ok(Control::Continue) => continue,
                Ok(Control::Done) => break,
                Err(e) => {
                    log::error!("decode failed at bit {}: {e}", self.bit_pos());
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Decodes exactly one event and dispatches it (spec.md §4.4 "Event
    /// dispatch contract"). Crate-internal: its `Control` return value is the
    /// decode loop's own continue/stop signal, never meant to reach a
    /// [`Serializer`] implementation or a crate consumer.
    #[inline]
    pub(crate) fn decode_event<S: Serializer>(&mut self, s: &mut S) -> ExiResult<Control> {
        let opts = self.opts()?.clone();
        let event = {
            let stream = self.stream_mut()?;
            self.grammar.decode(&opts, stream)?
        };
        match event.term() {
            EventTerm::Se | EventTerm::SeUri | EventTerm::SeQName => {
                self.handle_se(s, &opts)?;
                Ok(Control::Continue)
            }
            EventTerm::Ee => {
                self.handle_ee(s)?;
                Ok(Control::Continue)
            }
            EventTerm::At | EventTerm::AtUri | EventTerm::AtQName => {
                self.handle_at(s, &opts)?;
                Ok(Control::Continue)
            }
            EventTerm::Ns => {
                self.handle_ns(s)?;
                Ok(Control::Continue)
            }
            EventTerm::Ch | EventTerm::ChExtern => {
                self.handle_ch(s)?;
                Ok(Control::Continue)
            }
            other => self.dispatch_uncommon_event(s, other),
        }
    }

    /// The cold path: `SD` (unreachable here, handled by
    /// [`Self::decode_document`] directly), `ED`, `CM`, `PI`, `DT`, `ER`,
    /// `SC` (spec.md §4.4, exiCPP's `dispatchUncommonEvent`,
    /// `BodyDecoder.cpp` lines 212-236).
    #[cold]
    fn dispatch_uncommon_event<S: Serializer>(
        &mut self,
        s: &mut S,
        term: EventTerm,
    ) -> ExiResult<Control> {
        match term {
            EventTerm::Ed => {
                s.ed()?;
                Ok(Control::Done)
            }
            EventTerm::Cm => {
                self.handle_cm(s)?;
                Ok(Control::Continue)
            }
            EventTerm::Pi => {
                self.handle_pi(s)?;
                Ok(Control::Continue)
            }
            EventTerm::Dt => {
                self.handle_dt(s)?;
                Ok(Control::Continue)
            }
            EventTerm::Er => {
                self.handle_er(s)?;
                Ok(Control::Continue)
            }
            EventTerm::Sc => Err(ExiError::Unimplemented("self-contained fragments")),
            EventTerm::Sd | EventTerm::Void => Err(ExiError::UnexpectedError(
                "term not reachable from grammar dispatch",
            )),
        }
    }

    fn handle_se<S: Serializer>(&mut self, s: &mut S, opts: &ExiOptions) -> ExiResult<()> {
        let uri = decode_uri(self.stream.as_mut().unwrap(), &mut self.table)?;
        let name = decode_name(self.stream.as_mut().unwrap(), &mut self.table, uri)?;
        let prefix = decode_prefix_qualified(self.stream.as_mut().unwrap(), &self.table, opts, uri)?;
        let qname = self.get_qname(uri, name, prefix)?;
        self.element_stack.push((uri, name));
        log::trace!("SE {qname}");
        s.se(qname)
    }

    fn handle_ee<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        self.element_stack.pop();
        log::trace!("EE");
        s.ee(None)
    }

    fn handle_at<S: Serializer>(&mut self, s: &mut S, opts: &ExiOptions) -> ExiResult<()> {
        let uri = decode_uri(self.stream.as_mut().unwrap(), &mut self.table)?;
        let name = decode_name(self.stream.as_mut().unwrap(), &mut self.table, uri)?;
        let prefix = decode_prefix_qualified(self.stream.as_mut().unwrap(), &self.table, opts, uri)?;
        let vref = decode_value(self.stream.as_mut().unwrap(), &mut self.table, uri, name)?;
        let qname = self.get_qname(uri, name, prefix)?;
        let value = match vref {
            ValueRef::Local(id) => self.table.get_local_value(uri, name, id)?,
            ValueRef::Global(id) => self.table.get_global_value(id)?,
        };
        log::trace!("AT {qname} = {value:?}");
        s.at(qname, value)
    }

    fn handle_ns<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let stream = self.stream.as_mut().unwrap();
        let uri = decode_uri(stream, &mut self.table)?;
        let prefix_id = decode_prefix_ns(self.stream.as_mut().unwrap(), &mut self.table, uri)?;
        let is_local = self.stream.as_mut().unwrap().read_bit()?;
        if !is_local {
            log::error!("non-local NS declaration is unimplemented");
            return Err(ExiError::Unimplemented("non-local namespace declarations"));
        }
        let uri_s = self.table.get_uri(uri)?.to_string();
        let prefix_s = self.table.get_prefix(uri, prefix_id)?.to_string();
        log::trace!("NS {prefix_s}={uri_s}");
        s.ns(&uri_s, &prefix_s, is_local)
    }

    fn handle_ch<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let &(uri, local) = self
            .element_stack
            .last()
            .ok_or(ExiError::InvalidExiInput("CH event outside any open element"))?;
        let vref = decode_value(self.stream.as_mut().unwrap(), &mut self.table, uri, local)?;
        let value = match vref {
            ValueRef::Local(id) => self.table.get_local_value(uri, local, id)?,
            ValueRef::Global(id) => self.table.get_global_value(id)?,
        };
        log::trace!("CH {value:?}");
        s.ch(value)
    }

    fn handle_cm<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let mut text = String::new();
        self.stream.as_mut().unwrap().decode_string(&mut text)?;
        s.cm(&text)
    }

    fn handle_pi<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let stream = self.stream.as_mut().unwrap();
        let mut target = String::new();
        stream.decode_string(&mut target)?;
        let mut text = String::new();
        stream.decode_string(&mut text)?;
        s.pi(&target, &text)
    }

    fn handle_dt<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let stream = self.stream.as_mut().unwrap();
        let mut name = String::new();
        stream.decode_string(&mut name)?;
        let mut pubid = String::new();
        stream.decode_string(&mut pubid)?;
        let mut sysid = String::new();
        stream.decode_string(&mut sysid)?;
        let mut text = String::new();
        stream.decode_string(&mut text)?;
        s.dt(&name, &pubid, &sysid, &text)
    }

    fn handle_er<S: Serializer>(&mut self, s: &mut S) -> ExiResult<()> {
        let mut name = String::new();
        self.stream.as_mut().unwrap().decode_string(&mut name)?;
        s.er(&name)
    }

    fn get_qname(
        &self,
        uri: CompactId,
        local: CompactId,
        prefix: Option<CompactId>,
    ) -> ExiResult<QName> {
        let (uri_s, name_s) = self.table.get_qname(uri, local)?;
        let mut q = QName::new(uri_s.to_string(), name_s.to_string());
        if let Some(pid) = prefix {
            let p = self.table.get_prefix(uri, pid)?;
            q = q.with_prefix(p.to_string());
        }
        Ok(q)
    }
}

impl<'a> Default for Decoder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// exiCPP's `decodeURI` (`BodyDecoder.cpp` lines 482-508): `0` = miss, read
/// and intern a string; nonzero = hit, `id - 1`.
fn decode_uri(stream: &mut Stream, table: &mut StringTable) -> ExiResult<CompactId> {
    let nbits = table.get_uri_log();
    let code = stream.read_bits(nbits)?;
    if code == 0 {
        let mut text = String::new();
        stream.decode_string(&mut text)?;
        let pair = table.add_uri(text, None)?;
        Ok(pair.id)
    } else {
        Ok(code as CompactId - 1)
    }
}

/// exiCPP's `decodeName` (`BodyDecoder.cpp` lines 510-538): a UInt, `0` =
/// hit (then read `getLocalNameLog` bits), nonzero = miss (`id - 1` is the
/// string length).
fn decode_name(stream: &mut Stream, table: &mut StringTable, uri: CompactId) -> ExiResult<CompactId> {
    let ln = stream.read_uint()?;
    if ln == 0 {
        let nbits = table.get_local_name_log(uri)?;
        Ok(stream.read_bits(nbits)? as CompactId)
    } else {
        let len = ln - 1;
        let mut text = String::new();
        stream.read_string_of_len(len, &mut text)?;
        let pair = table.add_local_name(uri, text)?;
        Ok(pair.id)
    }
}

/// exiCPP's `decodePfxQ` (`BodyDecoder.cpp` lines 540-561): a direct compact
/// ID, no hit/miss wrapper, only read at all when the URI already has a
/// nonempty prefix partition and `Preserve.Prefixes` is set.
fn decode_prefix_qualified(
    stream: &mut Stream,
    table: &StringTable,
    opts: &ExiOptions,
    uri: CompactId,
) -> ExiResult<Option<CompactId>> {
    if !opts.preserve.contains(PreserveSet::PREFIXES) {
        return Ok(None);
    }
    if !table.has_prefix(uri) {
        return Ok(None);
    }
    let nbits = table.get_prefix_log_qualified(uri)?;
    if nbits == 0 {
        return Ok(Some(0));
    }
    Ok(Some(stream.read_bits(nbits)? as CompactId))
}

/// exiCPP's `decodePfx` (`BodyDecoder.cpp` lines 563-590): the NS event's
/// prefix field, a *different* hit/miss convention than the qualified field
/// above — `0` = miss, nonzero = hit (`id - 1`).
fn decode_prefix_ns(stream: &mut Stream, table: &mut StringTable, uri: CompactId) -> ExiResult<CompactId> {
    let nbits = table.get_prefix_log(uri)?;
    let code = stream.read_bits(nbits)?;
    if code == 0 {
        let mut text = String::new();
        stream.decode_string(&mut text)?;
        let pair = table.add_prefix(uri, text)?;
        Ok(pair.id)
    } else {
        Ok(code as CompactId - 1)
    }
}

/// exiCPP's `decodeValue` (`BodyDecoder.cpp` lines 592-645): a UInt, `0` =
/// local-value hit, `1` = global-value hit, `>= 2` = miss (`id - 2` is the
/// string length). Newly created values are always reported back as local
/// ("Newly created values are always returned as locals", line 641-642).
fn decode_value(
    stream: &mut Stream,
    table: &mut StringTable,
    uri: CompactId,
    local_id: CompactId,
) -> ExiResult<ValueRef> {
    let code = stream.read_uint()?;
    if code == 0 {
        let nbits = table.get_local_value_log(uri, local_id)?;
        Ok(ValueRef::Local(stream.read_bits(nbits)? as CompactId))
    } else if code == 1 {
        let nbits = table.get_global_value_log();
        Ok(ValueRef::Global(stream.read_bits(nbits)? as CompactId))
    } else {
        let len = code - 2;
        let mut text = String::new();
        stream.read_string_of_len(len, &mut text)?;
        let triple = table.add_value(uri, local_id, text)?;
        Ok(ValueRef::Local(triple.local_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;
    use crate::codec::builder::DocumentBuilder;

    struct Collector {
        events: Vec<String>,
    }

    impl Serializer for Collector {
        fn se(&mut self, qname: QName) -> ExiResult<()> {
            self.events.push(format!("SE({qname})"));
            Ok(())
        }
        fn ee(&mut self, qname: Option<QName>) -> ExiResult<()> {
            let _ = qname;
            self.events.push("EE".into());
            Ok(())
        }
        fn at(&mut self, qname: QName, value: &str) -> ExiResult<()> {
            self.events.push(format!("AT({qname}={value})"));
            Ok(())
        }
        fn ch(&mut self, value: &str) -> ExiResult<()> {
            self.events.push(format!("CH({value})"));
            Ok(())
        }
        fn sd(&mut self) -> ExiResult<()> {
            self.events.push("SD".into());
            Ok(())
        }
        fn ed(&mut self) -> ExiResult<()> {
            self.events.push("ED".into());
            Ok(())
        }
    }

    #[test]
    fn minimal_document_round_trips() {
        let opts = ExiOptions::default();
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("", "root")).unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE(root)", "EE", "ED"]
        );
    }

    #[test]
    fn attribute_with_new_value_round_trips() {
        let opts = ExiOptions::default();
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("", "root")).unwrap();
        enc.attribute(&QName::new("", "a"), "v").unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE(root)", "AT(a=v)", "EE", "ED"]
        );
    }

    #[test]
    fn repeated_attribute_value_is_a_local_hit() {
        let opts = ExiOptions::default();
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("", "root")).unwrap();
        enc.attribute(&QName::new("", "a"), "v").unwrap();
        enc.attribute(&QName::new("", "b"), "v").unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE(root)", "AT(a=v)", "AT(b=v)", "EE", "ED"]
        );
    }

    #[test]
    fn nested_elements_with_character_content_round_trip() {
        let opts = ExiOptions::default();
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("", "root")).unwrap();
        enc.start_element(&QName::new("", "child")).unwrap();
        enc.characters("hello").unwrap();
        enc.end_element().unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE(root)", "SE(child)", "CH(hello)", "EE", "EE", "ED"]
        );
    }

    #[test]
    fn unicode_characters_round_trip() {
        let opts = ExiOptions::default();
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("", "root")).unwrap();
        enc.characters("\u{3b1}").unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE(root)", "CH(\u{3b1})", "EE", "ED"]
        );
    }

    #[test]
    fn byte_packed_alignment_round_trips() {
        let opts = ExiOptions {
            align: crate::options::AlignMode::BytePacked,
            ..Default::default()
        };
        let mut enc = Encoder::new(opts.clone()).unwrap();
        enc.start_document().unwrap();
        enc.start_element(&QName::new("http://x", "root")).unwrap();
        enc.attribute(&QName::new("", "a"), "1").unwrap();
        enc.end_element().unwrap();
        enc.end_document().unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::from_body(UnifiedBuffer::new(&bytes), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        dec.decode_document(&mut collector).unwrap();
        assert_eq!(
            collector.events,
            vec!["SD", "SE({http://x}root)", "AT(a=1)", "EE", "ED"]
        );
    }

    #[test]
    fn decoding_past_capacity_fails_with_oob() {
        let opts = ExiOptions::default();
        let mut dec = Decoder::from_body(UnifiedBuffer::new(&[]), opts).unwrap();
        let mut collector = Collector { events: Vec::new() };
        assert!(dec.decode_document(&mut collector).is_ok());
        assert_eq!(collector.events, vec!["SD"]);
    }
}
