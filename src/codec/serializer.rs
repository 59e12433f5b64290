//! The `Serializer` trait consumed during decode (spec.md §6 "Serializer
//! interface", §4.4 "Event dispatch contract").
//!
//! Grounded on exiCPP's `Serializer` (`include/exi/Decode/Serializer.hpp`,
//! called throughout `BodyDecoder.cpp`'s `handleSE`/`handleEE`/`handleAT`/
//! `handleNS`/`handleCH`/`handleCM`/`handlePI`/`handleDT`/`handleER`).

use crate::error::ExiResult;
use crate::qname::QName;

/// Implemented by the host's document-tree builder; [`crate::codec::Decoder`]
/// calls one method per decoded event (spec.md §4.4 "Event dispatch
/// contract"). Any non-`Ok` return aborts the decode loop with that error
/// (spec.md §6).
///
/// Strings passed in (`&str` borrows into the decoder's string tables) are
/// valid only until the next call unless [`Serializer::needs_persistence`]
/// returns `true`, in which case the decoder copies them before calling back
/// (spec.md §3 "Ownership").
pub trait Serializer {
    fn sd(&mut self) -> ExiResult<()> {
        Ok(())
    }

    fn ed(&mut self) -> ExiResult<()> {
        Ok(())
    }

    fn se(&mut self, qname: QName) -> ExiResult<()>;

    /// `qname` is `None` for an untyped built-in `EE` (the common case);
    /// schema-informed grammars may supply the closing name (spec.md §3
    /// "Event term").
    fn ee(&mut self, qname: Option<QName>) -> ExiResult<()>;

    fn at(&mut self, qname: QName, value: &str) -> ExiResult<()>;

    fn ns(&mut self, uri: &str, prefix: &str, is_local: bool) -> ExiResult<()> {
        let _ = (uri, prefix, is_local);
        Ok(())
    }

    fn ch(&mut self, value: &str) -> ExiResult<()>;

    fn cm(&mut self, text: &str) -> ExiResult<()> {
        let _ = text;
        Ok(())
    }

    fn pi(&mut self, target: &str, text: &str) -> ExiResult<()> {
        let _ = (target, text);
        Ok(())
    }

    fn dt(&mut self, name: &str, pubid: &str, sysid: &str, text: &str) -> ExiResult<()> {
        let _ = (name, pubid, sysid, text);
        Ok(())
    }

    fn er(&mut self, name: &str) -> ExiResult<()> {
        let _ = name;
        Ok(())
    }

    /// `true` if the implementation needs to retain strings past the call
    /// that delivered them, forcing the decoder to copy into its session
    /// arena first (spec.md §3 "Ownership", §4.4 "Event dispatch contract").
    /// Defaults to `false`: most tree builders copy eagerly into owned
    /// `String`s anyway, so the common case costs nothing extra.
    fn needs_persistence(&self) -> bool {
        false
    }
}
