//! `EventTerm`, `EventCode`, and `EventUid` (spec.md §3 "Event term", §4.3).
//!
//! Grounded on exiCPP's `EventTerm` enum and `EventUID` (referenced throughout
//! `lib/exi/Decode/BodyDecoder.cpp`'s `decodeEvent`/`dispatchUncommonEvent`
//! switch, §191-236 above).

/// The closed set of EXI event terms (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTerm {
    Sd,
    Ed,
    Se,
    SeUri,
    SeQName,
    Ee,
    At,
    AtUri,
    AtQName,
    Ns,
    Ch,
    ChExtern,
    Cm,
    Pi,
    Dt,
    Er,
    Sc,
    Void,
}

/// The term the grammar selected for the current position, returned by
/// [`crate::grammar::Grammar::decode`] and consumed by
/// [`crate::grammar::Grammar::encode`].
///
/// A thin wrapper around [`EventTerm`] rather than a bare enum value: exiCPP's
/// `EventUID` additionally threads QName/value identity through the grammar
/// layer, but in this crate that resolution happens one level up, in
/// [`crate::codec::Decoder`]/[`crate::codec::Encoder`] (see spec.md §4.3
/// "Event-term dispatch"). Kept as a distinct type so call sites read as
/// "the grammar produced this event" rather than a plain term comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventUid(pub EventTerm);

impl EventUid {
    pub fn term(self) -> EventTerm {
        self.0
    }
}

impl From<EventTerm> for EventUid {
    fn from(term: EventTerm) -> Self {
        EventUid(term)
    }
}
