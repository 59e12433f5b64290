#![doc = include_str!("../README.md")]
// No warnings
//#![deny(warnings)]
// for now we don't need any new feature but we might remove this in the future
#![deny(unstable_features)]
// no dead code
//#![deny(dead_code)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
//#![deny(unused_results)]

// the code must be documented and everything should have a debug print implementation
#![deny(unused_doc_comments)]
//#![deny(missing_docs)]
//#![deny(clippy::missing_docs_in_private_items)]
//#![deny(clippy::missing_errors_doc)]
//#![deny(clippy::missing_panics_doc)]
//#![deny(clippy::missing_safety_doc)]
//#![deny(clippy::missing_doc_code_examples)]
//#![deny(clippy::missing_crate_level_docs)]
//#![deny(missing_debug_implementations)]

pub mod codec;
pub mod compact_id;
pub mod error;
pub mod grammar;
pub mod header;
pub mod options;
pub mod qname;
pub mod stream;
pub mod strtable;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::codec::{Decoder, DocumentBuilder, Encoder, Serializer};
    pub use crate::compact_id::CompactId;
    pub use crate::error::{ExiError, ExiResult};
    pub use crate::grammar::{BuiltinGrammar, EventTerm, EventUid};
    pub use crate::header::ExiHeader;
    pub use crate::options::{AlignMode, ExiOptions, PreserveSet, SchemaId};
    pub use crate::qname::QName;
    pub use crate::stream::{ExiReader, ExiWriter, Stream, StreamWriter, UnifiedBuffer};
}
