//! Unicode scalar ("rune") encode/decode for EXI strings (spec.md §4.1,
//! GLOSSARY "Rune"). Grounded on exiCPP's `RuneEncoder::Encode`
//! (`include/exi/Basic/Runes.hpp`, referenced from `OrderedReader.hpp`'s
//! `readString`), simplified here to go straight through `char`/`String`
//! since this crate has no arena-backed `SmallVec<char>` buffer to fill.

use crate::error::{ExiError, ExiResult};

/// Appends the UTF-8 encoding of the scalar value `scalar` (an EXI UInt in
/// `[0, 2^21)`) to `out`.
pub fn decode_rune(scalar: u64, out: &mut String) -> ExiResult<()> {
    let scalar = u32::try_from(scalar)
        .map_err(|_| ExiError::InvalidExiInput("rune scalar out of range"))?;
    let ch = char::from_u32(scalar)
        .ok_or(ExiError::InvalidExiInput("rune is not a valid Unicode scalar value"))?;
    out.push(ch);
    Ok(())
}

/// Returns the scalar value (as a `u64`, ready for `write_uint`) of `ch`.
pub fn encode_rune_utf8(ch: char) -> u64 {
    ch as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_and_bmp() {
        let mut out = String::new();
        decode_rune(encode_rune_utf8('a'), &mut out).unwrap();
        decode_rune(encode_rune_utf8('α'), &mut out).unwrap();
        assert_eq!(out, "aα");
    }

    #[test]
    fn alpha_scalar_is_0x3b1() {
        // spec.md §8 scenario 5: CH "α" (U+03B1) encodes as UInt 0x3B1.
        assert_eq!(encode_rune_utf8('α'), 0x3B1);
    }

    #[test]
    fn rejects_surrogate_scalars() {
        let mut out = String::new();
        assert!(decode_rune(0xD800, &mut out).is_err());
    }
}
