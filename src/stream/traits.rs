//! Shared primitives for all four stream flavors (spec.md §4.1 "Contract").

use crate::error::ExiResult;
use crate::stream::{decode_rune, encode_rune_utf8};

/// Operations common to [`super::BitReader`] and [`super::ByteReader`].
pub trait ExiReader {
    /// `true` while more data remains to be read.
    fn has_data(&self) -> bool;
    /// Current position, in bits, from the start of the buffer.
    fn bit_pos(&self) -> u64;
    /// Discards any cached bits up to the next byte boundary. Idempotent:
    /// a no-op when already byte-aligned (spec.md §8 "align() is idempotent").
    fn align(&mut self);

    fn read_bit(&mut self) -> ExiResult<bool>;
    /// Reads `n` bits (`n` in `0..=64`) into the low bits of the result.
    fn read_bits(&mut self, n: u32) -> ExiResult<u64>;
    fn read_byte(&mut self) -> ExiResult<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// EXI UInt: 7 bits per octet, little-endian group order, continuation
    /// bit = MSB of each octet, at most 8 groups (spec.md §4.1 "UInt encoding").
    fn read_uint(&mut self) -> ExiResult<u64>;

    /// Reads a length-prefixed (UInt) Unicode string, appending its UTF-8
    /// bytes to `out` (spec.md §4.1 "String encoding").
    fn decode_string(&mut self, out: &mut String) -> ExiResult<()> {
        let len = self.read_uint()?;
        self.read_string_of_len(len, out)
    }

    /// Reads exactly `len` runes (the length already known from a
    /// previously-decoded hit/miss UInt; grounded on exiCPP's
    /// `readString(u64 Size, ...)` overload, `OrderedReader.hpp`).
    fn read_string_of_len(&mut self, len: u64, out: &mut String) -> ExiResult<()> {
        out.clear();
        for _ in 0..len {
            let scalar = self.read_uint()?;
            decode_rune(scalar, out)?;
        }
        Ok(())
    }
}

/// Operations common to [`super::BitWriter`] and [`super::ByteWriter`].
pub trait ExiWriter {
    fn bit_pos(&self) -> u64;
    fn align(&mut self);

    fn write_bit(&mut self, v: bool) -> ExiResult<()>;
    fn write_bits(&mut self, v: u64, n: u32) -> ExiResult<()>;
    fn write_byte(&mut self, v: u8) -> ExiResult<()> {
        self.write_bits(v as u64, 8)
    }

    fn write_uint(&mut self, v: u64) -> ExiResult<()>;

    /// Writes a length-prefixed (UInt) Unicode string.
    fn encode_string(&mut self, s: &str) -> ExiResult<()> {
        let len = s.chars().count() as u64;
        self.write_uint(len)?;
        self.write_string_body(s)
    }

    /// Writes just the rune sequence, no length prefix (used when the length
    /// was already written as part of a hit/miss code).
    fn write_string_body(&mut self, s: &str) -> ExiResult<()> {
        for ch in s.chars() {
            self.write_uint(encode_rune_utf8(ch))?;
        }
        Ok(())
    }
}
