//! The grammar / schema machine (spec.md §4.3): drives event-term selection
//! against a grammar, independent of whether the codec is decoding or
//! encoding.
//!
//! Grounded on exiCPP's `Schema` interface (`CurrentSchema->decode(this)` /
//! implied `encode`, `BodyDecoder.cpp` line 189) with `BuiltinGrammar`
//! (`builtin` submodule) as the sole concrete implementation — schema-informed
//! grammars are an explicit `ExiError::Unimplemented` seam per spec.md §9.

mod builtin;
mod event;

pub use builtin::BuiltinGrammar;
pub use event::{EventTerm, EventUid};
