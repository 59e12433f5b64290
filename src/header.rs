//! The EXI header: optional cookie, distinguishing bits, version, and
//! (unimplemented) nested options document (spec.md §4.4 "Header").
//!
//! Grounded on `include/exi/Basic/ExiHeader.hpp` (field shape) and
//! `lib/exi/Encode/HeaderEncoder.cpp`'s `encodeHeaderImpl`/`EncodeVersion`/
//! `ValidateOptions`/`DoPreliminaryOptionsCheck` for the exact bit layout and
//! validation order. Decoding is the symmetric counterpart exiCPP does not
//! ship in the retrieved sources; it is derived here from the encoder.

use crate::error::{ExiError, ExiResult};
use crate::options::{AlignMode, ExiOptions};
use crate::stream::{BitReader, BitWriter, ExiReader, ExiWriter, StreamWriter, UnifiedBuffer};

/// The only EXI body version this crate understands.
pub const CURRENT_EXI_VERSION: u16 = 1;

const COOKIE: &[u8; 4] = b"$EXI";

/// The decoded (or to-be-encoded) EXI header (spec.md §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct ExiHeader {
    pub has_cookie: bool,
    pub has_options: bool,
    pub version: u16,
    /// `None` when options are supplied out-of-band rather than carried in
    /// the stream (only possible right after [`ExiHeader::decode`]; encoding
    /// requires `Some`, matching `DoPreliminaryOptionsCheck`'s "options must
    /// be provided" check).
    pub opts: Option<ExiOptions>,
}

impl ExiHeader {
    /// Builds a header ready to encode: no cookie, no in-stream options
    /// document (options travel out-of-band), current version.
    pub fn new(opts: ExiOptions) -> Self {
        Self {
            has_cookie: false,
            has_options: false,
            version: CURRENT_EXI_VERSION,
            opts: Some(opts),
        }
    }

    pub fn with_cookie(mut self, has_cookie: bool) -> Self {
        self.has_cookie = has_cookie;
        self
    }

    /// Validates and encodes the header, returning its bit-packed bytes.
    /// A thin wrapper over [`Self::encode_with`] for callers that want the
    /// header as a standalone buffer (e.g. tests); [`crate::codec::Encoder`]
    /// calls `encode_with` directly so header and body bits share one
    /// [`StreamWriter`] under [`AlignMode::BitPacked`] instead of padding
    /// between them.
    pub fn encode(&self) -> ExiResult<Vec<u8>> {
        let align = self
            .opts
            .as_ref()
            .ok_or(ExiError::InvalidConfig("options must be provided"))?
            .align;
        let mut w = StreamWriter::new(align);
        self.encode_with(&mut w)?;
        w.into_bytes()
    }

    /// Validates and writes the header into an already-constructed
    /// [`StreamWriter`], without padding or consuming it. Grounded on
    /// `encodeHeaderImpl`/`DoPreliminaryOptionsCheck` (`HeaderEncoder.cpp`
    /// lines 122-209).
    pub fn encode_with(&self, w: &mut StreamWriter) -> ExiResult<()> {
        let opts = self
            .opts
            .as_ref()
            .ok_or(ExiError::InvalidConfig("options must be provided"))?;

        if self.version == 0 {
            return Err(ExiError::HeaderVer(0));
        }
        if self.version > CURRENT_EXI_VERSION {
            return Err(ExiError::HeaderVer(self.version));
        }

        if opts.compression && opts.align == AlignMode::BitPacked {
            log::error!("bit alignment cannot be used with compression");
            return Err(ExiError::HeaderAlign(AlignMode::BitPacked, true));
        }
        if opts.compression && opts.align != AlignMode::PreCompression {
            log::warn!("compression requires PreCompression alignment");
            return Err(ExiError::HeaderAlign(opts.align, true));
        }

        opts.validate()?;

        if self.has_cookie {
            for &byte in COOKIE {
                w.write_bits(byte as u64, 8)?;
            }
            log::trace!("header has cookie");
        }

        w.write_bits(0b10, 2)?;
        w.write_bit(self.has_options)?;
        encode_version_w(self.version, w)?;
        log::trace!("EXI version: {}", self.version);

        if self.has_options {
            log::error!("options encode unimplemented");
            return Err(ExiError::Unimplemented("in-stream options document encode"));
        }
        log::trace!("options are out-of-band");

        if opts.align != AlignMode::BitPacked {
            w.align();
        }

        Ok(())
    }

    /// Parses a header from the start of `data`, returning the header plus a
    /// [`UnifiedBuffer`] positioned at the first bit of the body so a
    /// [`crate::stream::Stream`] can continue reading from exactly there.
    pub fn decode(data: &[u8]) -> ExiResult<(Self, UnifiedBuffer<'_>)> {
        let has_cookie = data.starts_with(COOKIE);
        let body_start = if has_cookie { COOKIE.len() } else { 0 };

        let mut r = BitReader::new(&data[body_start..]);

        let distinguishing = r.read_bits(2)?;
        if distinguishing != 0b10 {
            return Err(ExiError::HeaderBits);
        }

        let has_options = r.read_bit()?;
        let version = decode_version(&mut r)?;

        let opts = if has_options {
            log::error!("options decode unimplemented");
            return Err(ExiError::Unimplemented("in-stream options document decode"));
        } else {
            log::trace!("options are out-of-band");
            None
        };

        let header = ExiHeader {
            has_cookie,
            has_options,
            version,
            opts,
        };

        let offset = (body_start as u64) * 8 + r.bit_pos();
        Ok((header, UnifiedBuffer::with_bit_offset(data, offset)))
    }
}

fn encode_version(version: u16, w: &mut BitWriter) -> ExiResult<()> {
    w.write_bit(false)?; // IsPreviewVersion, always false.

    let mut remaining = (version - 1) as u32;
    loop {
        if remaining >= 0b1111 {
            w.write_bits(0b1111, 4)?;
            remaining -= 0b1111;
        } else {
            w.write_bits(remaining as u64, 4)?;
            return Ok(());
        }
    }
}

/// Identical to [`encode_version`], against a [`StreamWriter`] instead of a
/// bare [`BitWriter`] so [`ExiHeader::encode_with`] can share the body
/// writer under any [`AlignMode`].
fn encode_version_w(version: u16, w: &mut StreamWriter) -> ExiResult<()> {
    w.write_bit(false)?;

    let mut remaining = (version - 1) as u32;
    loop {
        if remaining >= 0b1111 {
            w.write_bits(0b1111, 4)?;
            remaining -= 0b1111;
        } else {
            w.write_bits(remaining as u64, 4)?;
            return Ok(());
        }
    }
}

fn decode_version(r: &mut BitReader) -> ExiResult<u16> {
    let preview = r.read_bit()?;
    if preview {
        return Err(ExiError::HeaderVer(0));
    }

    let mut version: u32 = 0;
    loop {
        let chunk = r.read_bits(4)? as u32;
        version += chunk;
        if chunk != 0b1111 {
            break;
        }
    }
    let version = version + 1;

    if version > CURRENT_EXI_VERSION as u32 {
        return Err(ExiError::HeaderVer(version as u16));
    }
    Ok(version as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_minimal_header() {
        let header = ExiHeader::new(ExiOptions::default());
        let bytes = header.encode().unwrap();
        let (decoded, _body) = ExiHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.version, CURRENT_EXI_VERSION);
        assert!(!decoded.has_cookie);
        assert!(!decoded.has_options);
    }

    #[test]
    fn round_trips_with_cookie() {
        let header = ExiHeader::new(ExiOptions::default()).with_cookie(true);
        let bytes = header.encode().unwrap();
        assert!(bytes.starts_with(COOKIE));
        let (decoded, _body) = ExiHeader::decode(&bytes).unwrap();
        assert!(decoded.has_cookie);
    }

    #[test]
    fn body_offset_continues_right_after_header_when_bit_packed() {
        let header = ExiHeader::new(ExiOptions::default());
        let bytes = header.encode().unwrap();
        let (_decoded, body) = ExiHeader::decode(&bytes).unwrap();
        // 2 distinguishing + 1 HasOptions + 1 preview + 4 version = 8 bits.
        assert_eq!(body.initial_bit_offset(), 8);
    }

    #[test]
    fn byte_packed_header_pads_to_byte_boundary() {
        let opts = ExiOptions {
            align: AlignMode::BytePacked,
            ..Default::default()
        };
        let header = ExiHeader::new(opts);
        let bytes = header.encode().unwrap();
        assert_eq!(bytes.len(), 1);
        let (_decoded, body) = ExiHeader::decode(&bytes).unwrap();
        assert_eq!(body.initial_bit_offset() % 8, 0);
    }

    #[test]
    fn rejects_missing_options_on_encode() {
        let header = ExiHeader {
            has_cookie: false,
            has_options: false,
            version: CURRENT_EXI_VERSION,
            opts: None,
        };
        assert!(header.encode().is_err());
    }

    #[test]
    fn rejects_malformed_distinguishing_bits() {
        // 00000000: distinguishing bits read as 00, not 10.
        let data = [0x00u8];
        assert_eq!(ExiHeader::decode(&data), Err(ExiError::HeaderBits));
    }

    #[test]
    fn compression_without_precompression_alignment_is_rejected() {
        let opts = ExiOptions {
            compression: true,
            align: AlignMode::BitPacked,
            ..Default::default()
        };
        let header = ExiHeader::new(opts);
        assert_eq!(
            header.encode(),
            Err(ExiError::HeaderAlign(AlignMode::BitPacked, true))
        );
    }

    #[test]
    fn version_chunking_round_trips_across_multiple_groups() {
        // Exercise the repeated-0b1111 path directly (version > 15).
        let mut w = BitWriter::new();
        encode_version(31, &mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(decode_version(&mut r).unwrap_err(), ExiError::HeaderVer(31));
    }
}
