//! The `DocumentBuilder` trait consumed during encode (spec.md §6
//! "Document-builder interface", the dual of [`crate::codec::Serializer`]).
//!
//! exiCPP does not ship a body encoder in the retrieved sources (only the
//! header encoder, `HeaderEncoder.cpp`); this trait and [`crate::codec::Encoder`]
//! are derived here by running the decoder's QName/value resolution
//! conventions (`BodyDecoder.cpp`) in reverse, per spec.md §4.4 "Encode
//! sequence (symmetric)".

use crate::error::ExiResult;
use crate::qname::QName;

/// Implemented by [`crate::codec::Encoder`]; a host document walker calls one
/// method per event it wants to emit, in the same call order it wants those
/// events to appear in the decoded stream (spec.md §5 "Ordering").
pub trait DocumentBuilder {
    fn start_document(&mut self) -> ExiResult<()> {
        Ok(())
    }

    fn end_document(&mut self) -> ExiResult<()>;

    fn start_element(&mut self, qname: &QName) -> ExiResult<()>;

    fn end_element(&mut self) -> ExiResult<()>;

    fn attribute(&mut self, qname: &QName, value: &str) -> ExiResult<()>;

    /// `is_local` must currently be `true` (spec.md §9 Open Questions leaves
    /// non-local namespace declarations unimplemented, mirroring exiCPP's
    /// `decodeNS`'s own "NONLOCAL" stub, `BodyDecoder.cpp` lines 471-476).
    fn namespace_declaration(&mut self, uri: &str, prefix: &str, is_local: bool)
        -> ExiResult<()>;

    fn characters(&mut self, text: &str) -> ExiResult<()>;

    fn comment(&mut self, text: &str) -> ExiResult<()>;

    fn processing_instruction(&mut self, target: &str, text: &str) -> ExiResult<()>;

    fn doctype(&mut self, name: &str, pubid: &str, sysid: &str, text: &str) -> ExiResult<()>;

    fn entity_reference(&mut self, name: &str) -> ExiResult<()>;
}
