//! Whole-document round-trip tests (spec.md §8 scenarios), exercising
//! `Decoder`/`Encoder` end-to-end through the public API rather than any
//! one module in isolation. Mirrors the teacher's black-box `tests/`
//! style (`tests/test_read_webgraph.rs`): no internals are reached into.

use anyhow::Result;
use exi::prelude::*;

/// Collects every event into a flat, human-readable log so a whole document
/// can be asserted against in one line.
#[derive(Default)]
struct EventLog {
    lines: Vec<String>,
}

impl Serializer for EventLog {
    fn sd(&mut self) -> ExiResult<()> {
        self.lines.push("SD".to_string());
        Ok(())
    }

    fn ed(&mut self) -> ExiResult<()> {
        self.lines.push("ED".to_string());
        Ok(())
    }

    fn se(&mut self, qname: QName) -> ExiResult<()> {
        self.lines.push(format!("SE {qname}"));
        Ok(())
    }

    fn ee(&mut self, _qname: Option<QName>) -> ExiResult<()> {
        self.lines.push("EE".to_string());
        Ok(())
    }

    fn at(&mut self, qname: QName, value: &str) -> ExiResult<()> {
        self.lines.push(format!("AT {qname}={value}"));
        Ok(())
    }

    fn ns(&mut self, uri: &str, prefix: &str, is_local: bool) -> ExiResult<()> {
        self.lines.push(format!("NS {prefix}={uri} local={is_local}"));
        Ok(())
    }

    fn ch(&mut self, value: &str) -> ExiResult<()> {
        self.lines.push(format!("CH {value}"));
        Ok(())
    }

    fn cm(&mut self, text: &str) -> ExiResult<()> {
        self.lines.push(format!("CM {text}"));
        Ok(())
    }

    fn pi(&mut self, target: &str, text: &str) -> ExiResult<()> {
        self.lines.push(format!("PI {target} {text}"));
        Ok(())
    }
}

fn round_trip(opts: ExiOptions, build: impl FnOnce(&mut Encoder) -> ExiResult<()>) -> Result<Vec<String>> {
    let mut enc = Encoder::with_header(opts.clone(), true)?;
    enc.start_document()?;
    build(&mut enc)?;
    enc.end_document()?;
    let bytes = enc.finish()?;

    let (header, body) = ExiHeader::decode(&bytes)?;
    assert!(header.has_cookie);
    let mut dec = Decoder::from_body(body, opts)?;
    let mut log = EventLog::default();
    dec.decode_document(&mut log)?;
    Ok(log.lines)
}

#[test]
fn minimum_document() -> Result<()> {
    let lines = round_trip(ExiOptions::default(), |enc| {
        enc.start_element(&QName::new("", "root"))?;
        enc.end_element()
    })?;
    assert_eq!(lines, vec!["SD", "SE root", "EE", "ED"]);
    Ok(())
}

#[test]
fn attribute_with_new_value() -> Result<()> {
    let lines = round_trip(ExiOptions::default(), |enc| {
        enc.start_element(&QName::new("", "root"))?;
        enc.attribute(&QName::new("", "id"), "42")?;
        enc.end_element()
    })?;
    assert_eq!(lines, vec!["SD", "SE root", "AT id=42", "EE", "ED"]);
    Ok(())
}

#[test]
fn value_hit_path_reuses_a_global_value_across_qnames() -> Result<()> {
    let lines = round_trip(ExiOptions::default(), |enc| {
        enc.start_element(&QName::new("", "root"))?;
        enc.attribute(&QName::new("", "a"), "shared")?;
        enc.start_element(&QName::new("", "child"))?;
        enc.attribute(&QName::new("", "b"), "shared")?;
        enc.end_element()?;
        enc.end_element()
    })?;
    assert_eq!(
        lines,
        vec![
            "SD",
            "SE root",
            "AT a=shared",
            "SE child",
            "AT b=shared",
            "EE",
            "EE",
            "ED",
        ]
    );
    Ok(())
}

#[test]
fn prefix_preserving_namespace_declaration() -> Result<()> {
    let opts = ExiOptions {
        preserve: PreserveSet::PREFIXES,
        ..Default::default()
    };
    let lines = round_trip(opts, |enc| {
        enc.start_element(&QName::new("http://example.com/ns", "root"))?;
        enc.namespace_declaration("http://example.com/ns", "ex", true)?;
        enc.end_element()
    })?;
    assert_eq!(
        lines,
        vec!["SD", "SE {http://example.com/ns}root", "NS ex=http://example.com/ns local=true", "EE", "ED"]
    );
    Ok(())
}

#[test]
fn unicode_characters_round_trip_through_the_rune_codec() -> Result<()> {
    let lines = round_trip(ExiOptions::default(), |enc| {
        enc.start_element(&QName::new("", "root"))?;
        enc.characters("caf\u{e9} \u{4f60}\u{597d} \u{1f600}")?;
        enc.end_element()
    })?;
    assert_eq!(
        lines,
        vec!["SD", "SE root", "CH caf\u{e9} \u{4f60}\u{597d} \u{1f600}", "EE", "ED"]
    );
    Ok(())
}

#[test]
fn comments_and_processing_instructions_round_trip_when_preserved() -> Result<()> {
    let opts = ExiOptions {
        preserve: PreserveSet::COMMENTS | PreserveSet::PIS,
        ..Default::default()
    };
    let lines = round_trip(opts, |enc| {
        enc.comment(" top level ")?;
        enc.start_element(&QName::new("", "root"))?;
        enc.processing_instruction("target", "data")?;
        enc.end_element()
    })?;
    assert_eq!(
        lines,
        vec!["SD", "CM  top level ", "SE root", "PI target data", "EE", "ED"]
    );
    Ok(())
}

#[test]
fn byte_packed_alignment_round_trips_a_nontrivial_document() -> Result<()> {
    let opts = ExiOptions {
        align: AlignMode::BytePacked,
        ..Default::default()
    };
    let lines = round_trip(opts, |enc| {
        enc.start_element(&QName::new("http://a", "root"))?;
        enc.attribute(&QName::new("", "x"), "1")?;
        enc.start_element(&QName::new("http://a", "child"))?;
        enc.characters("text")?;
        enc.end_element()?;
        enc.end_element()
    })?;
    assert_eq!(
        lines,
        vec![
            "SD",
            "SE {http://a}root",
            "AT x=1",
            "SE {http://a}child",
            "CH text",
            "EE",
            "EE",
            "ED",
        ]
    );
    Ok(())
}

#[test]
fn schema_informed_grammar_is_rejected_up_front() {
    let opts = ExiOptions {
        schema_id: SchemaId::Named("urn:example".to_string()),
        ..Default::default()
    };
    assert!(matches!(Encoder::new(opts), Err(ExiError::Unimplemented(_))));
}

#[test]
fn strict_mode_forbids_preserve_bits_at_validation_time() {
    let opts = ExiOptions {
        strict: true,
        preserve: PreserveSet::COMMENTS,
        ..Default::default()
    };
    assert!(opts.validate().is_err());
}
