//! gzip framing (RFC 1952).
//!
//! The fixed 10-byte header is `1F 8B 08 FLG MTIME(4) XFL OS`, optionally
//! followed by an EXTRA field, a NUL-terminated file name, a
//! NUL-terminated comment, and a CRC-16 of the header. The trailer is the
//! CRC-32 of the uncompressed data and its length modulo 2³², both
//! little-endian. A gzip file may concatenate several such members.
//!
//! The streaming engines read and write these fields themselves; this
//! module provides the header value type they share plus one-shot
//! buffer-to-buffer helpers.

use oxiflate_core::error::Result;
use oxiflate_core::traits::{Compressor, Decompressor};

use crate::deflate::{DeflateConfig, Deflater};
use crate::inflate::{Format, InflateConfig, Inflater};

/// FLG bit: the data is probably text.
pub const FTEXT: u8 = 0x01;
/// FLG bit: a header CRC-16 follows the other fields.
pub const FHCRC: u8 = 0x02;
/// FLG bit: an extra field is present.
pub const FEXTRA: u8 = 0x04;
/// FLG bit: an original file name is present.
pub const FNAME: u8 = 0x08;
/// FLG bit: a comment is present.
pub const FCOMMENT: u8 = 0x10;

// The decoder reads CM and FLG as one 16-bit little-endian unit, so the
// flag bits sit in the high byte there.
pub(crate) const FHCRC_WORD: u32 = (FHCRC as u32) << 8;
pub(crate) const FEXTRA_WORD: u32 = (FEXTRA as u32) << 8;
pub(crate) const FNAME_WORD: u32 = (FNAME as u32) << 8;
pub(crate) const FCOMMENT_WORD: u32 = (FCOMMENT as u32) << 8;

/// OS code for "unknown" (RFC 1952 §2.3).
pub const OS_UNKNOWN: u8 = 255;

/// gzip member header fields.
///
/// Used in both directions: the encoder emits whatever is set here, and
/// the decoder fills one in when asked to collect header metadata.
#[derive(Debug, Clone)]
pub struct GzipHeader {
    /// FTEXT hint: the data is probably text.
    pub text: bool,
    /// Modification time (Unix timestamp; 0 = unavailable).
    pub mtime: u32,
    /// Extra flags (2 = best compression, 4 = fastest).
    pub xfl: u8,
    /// Originating operating system.
    pub os: u8,
    /// EXTRA field payload.
    pub extra: Option<Vec<u8>>,
    /// Original file name, without the terminating NUL.
    pub name: Option<Vec<u8>>,
    /// Comment, without the terminating NUL.
    pub comment: Option<Vec<u8>>,
    /// Whether a header CRC-16 is present (decoder) or wanted (encoder).
    pub hcrc: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            xfl: 0,
            os: OS_UNKNOWN,
            extra: None,
            name: None,
            comment: None,
            hcrc: false,
        }
    }
}

impl GzipHeader {
    /// A header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A header carrying an original file name.
    pub fn with_name(name: &str) -> Self {
        Self {
            name: Some(name.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    /// The file name as a string, if present (lossy for non-UTF-8).
    pub fn name_lossy(&self) -> Option<String> {
        self.name
            .as_ref()
            .map(|n| String::from_utf8_lossy(n).into_owned())
    }

    /// The comment as a string, if present (lossy for non-UTF-8).
    pub fn comment_lossy(&self) -> Option<String> {
        self.comment
            .as_ref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

/// Compress `data` into a single gzip member.
pub fn gzip_compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_config(DeflateConfig {
        level,
        format: Format::Gzip,
        ..DeflateConfig::default()
    })?;
    deflater.compress_all(data)
}

/// Compress `data` into a gzip member with explicit header metadata.
pub fn gzip_compress_with_header(data: &[u8], level: i32, header: GzipHeader) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_config(DeflateConfig {
        level,
        format: Format::Gzip,
        ..DeflateConfig::default()
    })?;
    deflater.set_gzip_header(header)?;
    deflater.compress_all(data)
}

/// Decompress gzip data. Concatenated members decode to the
/// concatenation of their contents.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::with_config(InflateConfig {
        format: Format::Auto,
        ..InflateConfig::default()
    });
    inflater.decompress_all(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::checksum::Crc32;
    use oxiflate_core::traits::FlushMode;

    #[test]
    fn test_gzip_roundtrip() {
        let original = b"Hello, GZIP World! This is a test of compression.";
        let compressed = gzip_compress(original, 6).unwrap();
        assert_eq!(&compressed[..3], &[0x1F, 0x8B, 0x08]);
        let decompressed = gzip_decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_gzip_empty() {
        let compressed = gzip_compress(b"", 6).unwrap();
        assert_eq!(gzip_decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_gzip_trailer_fields() {
        let data = b"trailer check data";
        let compressed = gzip_compress(data, 6).unwrap();

        let n = compressed.len();
        let crc = u32::from_le_bytes(compressed[n - 8..n - 4].try_into().unwrap());
        let isize = u32::from_le_bytes(compressed[n - 4..].try_into().unwrap());
        assert_eq!(crc, Crc32::checksum(data));
        assert_eq!(isize, data.len() as u32);
    }

    #[test]
    fn test_gzip_header_metadata_roundtrip() {
        let header = GzipHeader {
            text: true,
            mtime: 1_234_567_890,
            name: Some(b"data.txt".to_vec()),
            comment: Some(b"a comment".to_vec()),
            extra: Some(vec![1, 2, 3, 4]),
            hcrc: true,
            ..GzipHeader::default()
        };
        let compressed =
            gzip_compress_with_header(b"payload bytes", 6, header).unwrap();

        let mut inflater = Inflater::with_config(InflateConfig {
            format: Format::Gzip,
            ..InflateConfig::default()
        });
        inflater.collect_header();
        let mut out = vec![0u8; 256];
        let (_, produced, _) = inflater
            .step(&compressed, &mut out, FlushMode::None)
            .unwrap();
        assert_eq!(&out[..produced], b"payload bytes");

        let head = inflater.header().expect("header should be collected");
        assert!(head.text);
        assert_eq!(head.mtime, 1_234_567_890);
        assert_eq!(head.name_lossy().as_deref(), Some("data.txt"));
        assert_eq!(head.comment_lossy().as_deref(), Some("a comment"));
        assert_eq!(head.extra.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert!(head.hcrc);
    }

    #[test]
    fn test_gzip_corrupted_crc_rejected() {
        let mut compressed = gzip_compress(b"check me", 6).unwrap();
        let n = compressed.len();
        compressed[n - 8] ^= 0xFF; // flip a CRC byte
        let err = gzip_decompress(&compressed).unwrap_err();
        assert!(err.to_string().contains("incorrect data check"));
    }

    #[test]
    fn test_gzip_corrupted_length_rejected() {
        let mut compressed = gzip_compress(b"check me", 6).unwrap();
        let n = compressed.len();
        compressed[n - 1] ^= 0xFF; // flip an ISIZE byte
        let err = gzip_decompress(&compressed).unwrap_err();
        assert!(err.to_string().contains("incorrect length check"));
    }

    #[test]
    fn test_multi_member_concatenation() {
        let mut joined = gzip_compress(b"first member / ", 6).unwrap();
        joined.extend_from_slice(&gzip_compress(b"second member", 9).unwrap());
        let out = gzip_decompress(&joined).unwrap();
        assert_eq!(out, b"first member / second member");
    }
}
