//! The byte-packed writer, symmetric to [`super::ByteReader`].

use crate::error::ExiResult;
use crate::stream::bit_writer::BitWriter;
use crate::stream::traits::ExiWriter;

pub struct ByteWriter {
    inner: BitWriter,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            inner: BitWriter::new(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_bytes()
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExiWriter for ByteWriter {
    fn bit_pos(&self) -> u64 {
        self.inner.bit_pos()
    }

    fn align(&mut self) {
        self.inner.align();
    }

    fn write_bit(&mut self, v: bool) -> ExiResult<()> {
        self.inner.write_bit(v)?;
        self.inner.align();
        Ok(())
    }

    fn write_bits(&mut self, v: u64, n: u32) -> ExiResult<()> {
        self.inner.write_bits(v, n)?;
        self.inner.align();
        Ok(())
    }

    fn write_uint(&mut self, v: u64) -> ExiResult<()> {
        self.inner.write_uint(v)?;
        self.inner.align();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::byte_reader::ByteReader;
    use crate::stream::ExiReader;

    #[test]
    fn round_trips_through_byte_reader() {
        let mut w = ByteWriter::new();
        w.write_bits(0b101, 3).unwrap();
        w.write_uint(300).unwrap();
        w.write_byte(0xAB).unwrap();
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_uint().unwrap(), 300);
        assert_eq!(r.read_byte().unwrap(), 0xAB);
    }
}
