//! The built-in (schemaless) grammar: `Document`/`DocEnd` productions at
//! depth zero, `StartTagContent`/`ElementContent` productions per open
//! element (spec.md §4.3 "Built-in grammar").
//!
//! Grounded on EXI 1.0 §8.4's built-in grammar tables, transcribed as a
//! small tiered-choice tree per production rather than a flat lookup table,
//! so that disabling a term (via `PreserveSet`/`strict`) shrinks both the
//! term list *and* the bit width of the choice that contains it — exactly
//! spec.md §4.3's "inclusion gated by the preserve set and strict flag".
//!
//! **Simplification versus exiCPP / EXI 1.0, recorded in DESIGN.md:**
//! EXI's built-in element grammar *learns*: each `AT`/`SE`/`CH` seen in an
//! element adds a new production that gives that same event a shorter code
//! on a later occurrence in the same element. This crate always uses the
//! untrained production (the first row of each table below) for every
//! element, every time. Round-trip purity against this crate's own encoder
//! is unaffected (§8 invariant 1) since both sides share the same
//! untrained grammar; only bit-for-bit equality with a learning EXI
//! processor after a *repeated* sibling event would differ. Schema-informed
//! grammars (which also learn) are already an explicit `Unimplemented` seam
//! per spec.md §9, so this crate treats built-in grammar learning the same
//! way: a documented, deliberate gap rather than a silent bug.

use crate::compact_id::compact_id_log2;
use crate::error::{ExiError, ExiResult};
use crate::grammar::event::{EventTerm, EventUid};
use crate::options::{ExiOptions, PreserveSet};
use crate::stream::{Stream, StreamWriter};

/// One node of a tiered event-code choice: either a concrete term, or a
/// nested group that consumes additional bits to resolve further.
enum Node {
    Term(EventTerm),
    Group(Vec<Node>),
}

fn decode_choice(stream: &mut Stream, list: &[Node]) -> ExiResult<EventTerm> {
    let width = compact_id_log2(list.len() as u64);
    let idx = stream.read_bits(width)? as usize;
    match list
        .get(idx)
        .ok_or(ExiError::InvalidExiInput("event code index out of range"))?
    {
        Node::Term(t) => Ok(*t),
        Node::Group(sub) => decode_choice(stream, sub),
    }
}

fn contains_term(list: &[Node], target: EventTerm) -> bool {
    list.iter().any(|n| match n {
        Node::Term(t) => *t == target,
        Node::Group(sub) => contains_term(sub, target),
    })
}

fn encode_choice(writer: &mut StreamWriter, list: &[Node], target: EventTerm) -> ExiResult<()> {
    let width = compact_id_log2(list.len() as u64);
    for (i, node) in list.iter().enumerate() {
        let matches = match node {
            Node::Term(t) => *t == target,
            Node::Group(sub) => contains_term(sub, target),
        };
        if !matches {
            continue;
        }
        writer.write_bits(i as u64, width)?;
        if let Node::Group(sub) = node {
            return encode_choice(writer, sub, target);
        }
        return Ok(());
    }
    Err(ExiError::Mismatch("term not admissible in current production"))
}

/// EXI 1.0 §8.4.2 `StartTagContent`, untrained.
fn start_tag_content(opts: &ExiOptions) -> Vec<Node> {
    let mut top = vec![Node::Term(EventTerm::Ee), Node::Term(EventTerm::At)];
    if opts.preserve.contains(PreserveSet::PREFIXES) {
        top.push(Node::Term(EventTerm::Ns));
    }
    if opts.self_contained {
        top.push(Node::Term(EventTerm::Sc));
    }
    top.push(Node::Group(content_tail(opts)));
    top
}

/// EXI 1.0 §8.4.2 `ElementContent`, untrained.
fn element_content(opts: &ExiOptions) -> Vec<Node> {
    let mut top = vec![Node::Term(EventTerm::Ee)];
    top.extend(content_tail(opts));
    top
}

/// The `SE(*) / CH / ER / [CM / PI]` tail shared by `StartTagContent` (as a
/// nested group) and `ElementContent` (spliced directly into the top level).
fn content_tail(opts: &ExiOptions) -> Vec<Node> {
    let mut tail = vec![Node::Term(EventTerm::Se), Node::Term(EventTerm::Ch)];
    if opts.preserve.contains(PreserveSet::DTDS) {
        tail.push(Node::Term(EventTerm::Er));
    }
    let misc = misc_group(opts);
    if !misc.is_empty() {
        tail.push(Node::Group(misc));
    }
    tail
}

/// EXI 1.0 §8.4.1 `DocContent`, untrained.
fn doc_content(opts: &ExiOptions) -> Vec<Node> {
    let mut top = vec![Node::Term(EventTerm::Se)];
    if opts.preserve.contains(PreserveSet::DTDS) {
        top.push(Node::Term(EventTerm::Dt));
    }
    let misc = misc_group(opts);
    if !misc.is_empty() {
        top.push(Node::Group(misc));
    }
    top
}

/// EXI 1.0 §8.4.1 `DocEnd`, untrained.
fn doc_end(opts: &ExiOptions) -> Vec<Node> {
    let mut top = vec![Node::Term(EventTerm::Ed)];
    top.extend(misc_group(opts));
    top
}

fn misc_group(opts: &ExiOptions) -> Vec<Node> {
    let mut misc = Vec::new();
    if opts.preserve.contains(PreserveSet::COMMENTS) {
        misc.push(Node::Term(EventTerm::Cm));
    }
    if opts.preserve.contains(PreserveSet::PIS) {
        misc.push(Node::Term(EventTerm::Pi));
    }
    misc
}

/// Where we are within the document, at depth zero (no element open yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocStage {
    BeforeRoot,
    AfterRoot,
}

/// Where we are within a single open element (spec.md §3 "Grammar stack").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementStage {
    StartTag,
    Content,
}

/// The built-in (schemaless) grammar: a document-level stage plus a stack of
/// element-level stages, one per open element (spec.md §4.3, §3
/// "Grammar stack: one entry per open element; push on SE, pop on EE").
pub struct BuiltinGrammar {
    doc_stage: DocStage,
    stack: Vec<ElementStage>,
}

impl BuiltinGrammar {
    pub fn new() -> Self {
        Self {
            doc_stage: DocStage::BeforeRoot,
            stack: Vec::new(),
        }
    }

    /// Current nesting depth (number of open elements).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Reads the next event code from `stream` and returns the term it
    /// selects, advancing internal state (push on `Se`, pop on `Ee`,
    /// start-tag -> content transition on any non-`At`/`Ns` event).
    pub fn decode(&mut self, opts: &ExiOptions, stream: &mut Stream) -> ExiResult<EventUid> {
        let production = self.current_production(opts);
        let term = decode_choice(stream, &production)?;
        self.advance(term);
        Ok(EventUid(term))
    }

    /// Writes the event code for `ev` into `writer`, advancing state the
    /// same way [`Self::decode`] does.
    pub fn encode(
        &mut self,
        opts: &ExiOptions,
        writer: &mut StreamWriter,
        ev: EventUid,
    ) -> ExiResult<()> {
        let production = self.current_production(opts);
        encode_choice(writer, &production, ev.term())?;
        self.advance(ev.term());
        Ok(())
    }

    fn current_production(&self, opts: &ExiOptions) -> Vec<Node> {
        match self.stack.last() {
            None => match self.doc_stage {
                DocStage::BeforeRoot => doc_content(opts),
                DocStage::AfterRoot => doc_end(opts),
            },
            Some(ElementStage::StartTag) => start_tag_content(opts),
            Some(ElementStage::Content) => element_content(opts),
        }
    }

    fn advance(&mut self, term: EventTerm) {
        match term {
            EventTerm::Se | EventTerm::SeUri | EventTerm::SeQName => {
                if self.stack.is_empty() {
                    self.doc_stage = DocStage::AfterRoot;
                } else if let Some(top) = self.stack.last_mut() {
                    *top = ElementStage::Content;
                }
                self.stack.push(ElementStage::StartTag);
            }
            EventTerm::Ee => {
                self.stack.pop();
            }
            EventTerm::At | EventTerm::AtUri | EventTerm::AtQName | EventTerm::Ns => {
                // Stays in StartTag.
            }
            _ => {
                if let Some(top) = self.stack.last_mut() {
                    *top = ElementStage::Content;
                }
            }
        }
    }
}

impl Default for BuiltinGrammar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AlignMode;
    use crate::stream::UnifiedBuffer;

    fn roundtrip(opts: &ExiOptions, terms: &[EventTerm]) {
        let mut enc = BuiltinGrammar::new();
        let mut writer = StreamWriter::new(AlignMode::BitPacked);
        for &t in terms {
            enc.encode(opts, &mut writer, EventUid(t)).unwrap();
        }
        let bytes = writer.into_bytes().unwrap();

        let mut dec = BuiltinGrammar::new();
        let mut stream = Stream::new(UnifiedBuffer::new(&bytes), AlignMode::BitPacked);
        for &expected in terms {
            let got = dec.decode(opts, &mut stream).unwrap();
            assert_eq!(got.term(), expected);
        }
    }

    #[test]
    fn minimal_document_round_trips() {
        let opts = ExiOptions::default();
        roundtrip(&opts, &[EventTerm::Se, EventTerm::Ee, EventTerm::Ed]);
    }

    #[test]
    fn attribute_then_content_round_trips() {
        let opts = ExiOptions::default();
        roundtrip(
            &opts,
            &[
                EventTerm::Se,
                EventTerm::At,
                EventTerm::Ch,
                EventTerm::Ee,
                EventTerm::Ed,
            ],
        );
    }

    #[test]
    fn nested_elements_round_trip() {
        let opts = ExiOptions::default();
        roundtrip(
            &opts,
            &[
                EventTerm::Se,
                EventTerm::Se,
                EventTerm::Ee,
                EventTerm::Se,
                EventTerm::Ee,
                EventTerm::Ee,
                EventTerm::Ed,
            ],
        );
    }

    #[test]
    fn preserved_comment_and_pi_round_trip() {
        let opts = ExiOptions {
            preserve: PreserveSet::COMMENTS | PreserveSet::PIS,
            ..Default::default()
        };
        roundtrip(
            &opts,
            &[
                EventTerm::Cm,
                EventTerm::Se,
                EventTerm::Cm,
                EventTerm::Ee,
                EventTerm::Pi,
                EventTerm::Ed,
            ],
        );
    }

    #[test]
    fn strict_mode_has_no_ns_cm_pi_dt_er_terms() {
        let opts = ExiOptions {
            strict: true,
            ..Default::default()
        };
        let production = start_tag_content(&opts);
        assert!(!contains_term(&production, EventTerm::Ns));
        assert!(!contains_term(&production, EventTerm::Cm));
        assert!(!contains_term(&production, EventTerm::Pi));
        assert!(!contains_term(&production, EventTerm::Er));
    }

    #[test]
    fn grammar_stack_tracks_depth() {
        let opts = ExiOptions::default();
        let mut g = BuiltinGrammar::new();
        let mut writer = StreamWriter::new(AlignMode::BitPacked);
        g.encode(&opts, &mut writer, EventUid(EventTerm::Se)).unwrap();
        assert_eq!(g.depth(), 1);
        g.encode(&opts, &mut writer, EventUid(EventTerm::Se)).unwrap();
        assert_eq!(g.depth(), 2);
        g.encode(&opts, &mut writer, EventUid(EventTerm::Ee)).unwrap();
        assert_eq!(g.depth(), 1);
    }
}
