//! The single error type returned by every fallible operation in this crate.
//!
//! Grounded on `exi::ExiError`/`ErrorCode` (original_source:
//! `include/core/Support/ErrorHandle.hpp`-style usage, `lib/exi/Encode/HeaderEncoder.cpp`,
//! `lib/exi/Decode/BodyDecoder.cpp`), collapsed into one `thiserror` enum the way
//! `pmikstacki-bsharp` pairs `thiserror` (typed library errors) with `anyhow`
//! (ambient test/CLI context).

use crate::options::AlignMode;

/// Result alias used throughout the crate.
pub type ExiResult<T> = Result<T, ExiError>;

/// The unified error surface for the EXI body codec (spec.md §7).
///
/// `ExiError::Done` does not exist here on purpose: exiCPP reuses its error
/// channel for the decode loop's "end of document" sentinel, but that sentinel
/// is never supposed to reach a caller. This crate instead models it as
/// [`crate::codec::Control::Done`], an internal-only value, keeping `ExiError`
/// a pure failure type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExiError {
    /// A read ran past the end of the input stream.
    #[error("read past end of stream")]
    Oob,
    /// A write ran past the end of a fixed-capacity output stream.
    #[error("write past end of stream")]
    Full,

    /// Structural problem with the header (e.g. missing options).
    #[error("invalid EXI header: {0}")]
    Header(&'static str),
    /// The `"$EXI"` cookie was requested but not found.
    #[error("missing or malformed EXI cookie")]
    HeaderSig,
    /// The 2-bit distinguishing bits after the cookie were not `10`.
    #[error("malformed EXI distinguishing bits")]
    HeaderBits,
    /// Preview-version flag was set, or the version is zero/unsupported.
    #[error("unsupported EXI version: {0}")]
    HeaderVer(u16),
    /// `Align` is incompatible with `Compression`.
    #[error("alignment {0:?} incompatible with compression={1}")]
    HeaderAlign(AlignMode, bool),
    /// `Strict` combined with a disallowed preserve/self-contained setting.
    #[error("strict mode incompatible with current preserve/self-contained settings")]
    HeaderStrict,
    /// `SelfContained` combined with a non-PreCompression alignment.
    #[error("selfContained requires PreCompression alignment")]
    HeaderSelfContained,
    /// Options were required out-of-band but never supplied.
    #[error("options required out-of-band but not supplied")]
    HeaderOutOfBand,

    /// A general content-level mismatch against the active options/grammar.
    #[error("content mismatch: {0}")]
    Mismatch(&'static str),
    /// Malformed EXI body content (bad UInt, bad compact ID, etc).
    #[error("invalid EXI input: {0}")]
    InvalidExiInput(&'static str),
    /// Encoding an XSD schema without prefixes preserved.
    #[error("XML Schema documents must be encoded with prefixes preserved")]
    NoPrefixesPreservedXmlSchema,

    /// Caller-supplied configuration is invalid or incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// An allocation-like capacity limit was exceeded.
    #[error("invalid memory allocation")]
    InvalidMemoryAlloc,
    /// A feature this crate deliberately leaves unimplemented (schema-informed
    /// grammars, options-document encoding, self-contained fragments, ...).
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
    /// Scaffolding for a feature that isn't wired up yet.
    #[error("TODO: {0}")]
    Todo(&'static str),
    /// Catch-all for states that should be unreachable.
    #[error("unexpected error: {0}")]
    UnexpectedError(&'static str),
}
