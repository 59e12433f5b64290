//! The byte-packed reader (spec.md §4.1, align modes `BytePacked` /
//! `PreCompression`). Per spec.md's design notes, byte-packed alignment is
//! realized here as the bit-packed reader with an automatic byte-align after
//! every primitive read, rather than exiCPP's separate `ByteReader` fast path
//! (`original_source/include/exi/Stream/OrderedReader.hpp`'s `ByteReader`,
//! which indexes the buffer directly instead of caching a bit window) — a
//! deliberate simplification recorded in DESIGN.md.

use crate::error::ExiResult;
use crate::stream::bit_reader::BitReader;
use crate::stream::traits::ExiReader;
use crate::stream::unified_buffer::UnifiedBuffer;

pub struct ByteReader<'a> {
    inner: BitReader<'a>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: BitReader::new(data),
        }
    }

    pub fn from_unified(buf: UnifiedBuffer<'a>) -> Self {
        Self {
            inner: BitReader::from_unified(buf),
        }
    }
}

impl<'a> ExiReader for ByteReader<'a> {
    fn has_data(&self) -> bool {
        self.inner.has_data()
    }

    fn bit_pos(&self) -> u64 {
        self.inner.bit_pos()
    }

    fn align(&mut self) {
        self.inner.align();
    }

    fn read_bit(&mut self) -> ExiResult<bool> {
        let v = self.inner.read_bit()?;
        self.inner.align();
        Ok(v)
    }

    fn read_bits(&mut self, n: u32) -> ExiResult<u64> {
        let v = self.inner.read_bits(n)?;
        self.inner.align();
        Ok(v)
    }

    fn read_uint(&mut self) -> ExiResult<u64> {
        let v = self.inner.read_uint()?;
        self.inner.align();
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_read_leaves_byte_aligned() {
        let data = [0xABu8, 0xCD, 0xEF];
        let mut r = ByteReader::new(&data);
        r.read_bits(3).unwrap();
        assert_eq!(r.bit_pos() % 8, 0);
        r.read_bits(1).unwrap();
        assert_eq!(r.bit_pos() % 8, 0);
    }

    #[test]
    fn reads_whole_bytes_when_requested() {
        let data = [0xAB, 0xCD];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_byte().unwrap(), 0xAB);
        assert_eq!(r.read_byte().unwrap(), 0xCD);
    }
}
