//! `ExiOptions`, `AlignMode`, and `PreserveSet` (spec.md §3), plus the
//! validation rules from spec.md §4.4, grounded on exiCPP's
//! `ValidateOptions`/`DoPreliminaryOptionsCheck` (`lib/exi/Encode/HeaderEncoder.cpp`).

use bitflags::bitflags;

use crate::error::{ExiError, ExiResult};

/// Stream alignment / chunking policy (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlignMode {
    /// Default: every value packed to its minimal bit width.
    #[default]
    BitPacked,
    /// Every value padded out to a byte boundary.
    BytePacked,
    /// Byte-aligned, chunked for later compression.
    PreCompression,
    /// Block-chunked and deflate-compressed (requires `PreCompression` chunking).
    Compression,
}

bitflags! {
    /// Independent preservation bits (spec.md §3). Mirrors exiCPP's
    /// `PreserveKind`/`make_preserve_builder` bitmask (`HeaderEncoder.cpp`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PreserveSet: u8 {
        const COMMENTS       = 0b0000_0001;
        const PIS            = 0b0000_0010;
        const DTDS           = 0b0000_0100;
        const PREFIXES       = 0b0000_1000;
        const LEXICAL_VALUES = 0b0001_0000;
    }
}

impl PreserveSet {
    /// `true` if any bit outside of the empty set is present — used by
    /// strict-mode validation (spec.md §4.4: "If Strict: Preserve ⊆ {}").
    pub fn is_empty_set(self) -> bool {
        self.is_empty()
    }
}

/// An already-resolved schema identity. Schema ingestion (parsing XSD) is out
/// of scope (spec.md §1); this crate only distinguishes "no schema"
/// (schemaless/built-in grammar) from "some schema" (currently `Unimplemented`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemaId {
    /// No schema: the built-in (schemaless) grammar is used.
    #[default]
    None,
    /// A named, already-resolved schema. Schema-informed grammars are not
    /// implemented yet (spec.md §9 Open Questions).
    Named(String),
}

impl SchemaId {
    pub fn is_builtin(&self) -> bool {
        matches!(self, SchemaId::None)
    }
}

/// EXI processing options (spec.md §3 `ExiOptions`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExiOptions {
    pub align: AlignMode,
    pub compression: bool,
    pub strict: bool,
    pub self_contained: bool,
    pub preserve: PreserveSet,
    pub block_size: u32,
    pub value_max_length: Option<u64>,
    pub value_partition_capacity: Option<u64>,
    pub schema_id: SchemaId,
    /// Datatype representation map: currently only tracked as a presence bit
    /// for validation (spec.md §4.4); the remapping itself is `Unimplemented`.
    pub has_datatype_representation_map: bool,
}

impl Default for ExiOptions {
    fn default() -> Self {
        Self {
            align: AlignMode::BitPacked,
            compression: false,
            strict: false,
            self_contained: false,
            preserve: PreserveSet::empty(),
            block_size: 1_000_000,
            value_max_length: None,
            value_partition_capacity: None,
            schema_id: SchemaId::None,
            has_datatype_representation_map: false,
        }
    }
}

impl ExiOptions {
    /// Validates the invariant table of spec.md §4.4, returning the paired
    /// error for the first violation found. Grounded verbatim on exiCPP's
    /// `ValidateOptions` (`HeaderEncoder.cpp` lines 51-120).
    pub fn validate(&self) -> ExiResult<()> {
        if self.compression && self.align != AlignMode::PreCompression {
            log::error!("invalid alignment for compression, must be chunked");
            return Err(ExiError::HeaderAlign(self.align, true));
        }

        if self.self_contained && self.align != AlignMode::PreCompression {
            log::error!("self-contained cannot be used with chunking");
            return Err(ExiError::Mismatch(
                "selfContained requires Align == PreCompression",
            ));
        }

        if self.strict {
            if !self.preserve.is_empty_set() {
                log::error!("invalid preserve options for strict mode");
                return Err(ExiError::Mismatch(
                    "strict mode requires Preserve to be the empty set",
                ));
            }
            if self.self_contained {
                log::error!("self-contained cannot be used in strict mode");
                return Err(ExiError::Mismatch(
                    "strict mode forbids selfContained",
                ));
            }
        }

        if self.has_datatype_representation_map {
            if self.preserve.contains(PreserveSet::LEXICAL_VALUES) {
                log::error!(
                    "lexical value preservation cannot be used with datatype remapping"
                );
                return Err(ExiError::Mismatch(
                    "datatypeRepresentationMap forbids Preserve.LexicalValues",
                ));
            }
            if self.schema_id.is_builtin() {
                log::error!("datatype remapping cannot be done in schemaless mode");
                return Err(ExiError::Mismatch(
                    "datatypeRepresentationMap requires a schema",
                ));
            }
        }

        Ok(())
    }

    /// `true` if the body stream is bit-packed rather than byte-aligned.
    pub fn is_bit_packed(&self) -> bool {
        matches!(self.align, AlignMode::BitPacked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ExiOptions::default().validate().is_ok());
    }

    #[test]
    fn compression_requires_precompression_alignment() {
        let opts = ExiOptions {
            compression: true,
            align: AlignMode::BitPacked,
            ..Default::default()
        };
        assert_eq!(
            opts.validate(),
            Err(ExiError::HeaderAlign(AlignMode::BitPacked, true))
        );
    }

    #[test]
    fn self_contained_requires_precompression() {
        let opts = ExiOptions {
            self_contained: true,
            align: AlignMode::BitPacked,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn strict_forbids_preserve_bits() {
        let opts = ExiOptions {
            strict: true,
            preserve: PreserveSet::COMMENTS,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn strict_forbids_self_contained() {
        let opts = ExiOptions {
            strict: true,
            self_contained: true,
            align: AlignMode::PreCompression,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn datatype_map_requires_schema_and_forbids_lexical_values() {
        let mut opts = ExiOptions {
            has_datatype_representation_map: true,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        opts.schema_id = SchemaId::Named("foo".into());
        assert!(opts.validate().is_ok());

        opts.preserve = PreserveSet::LEXICAL_VALUES;
        assert!(opts.validate().is_err());
    }
}
