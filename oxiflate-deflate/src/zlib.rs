//! zlib framing (RFC 1950).
//!
//! The format is a 2-byte header, the raw DEFLATE stream, and a 4-byte
//! big-endian Adler-32 of the uncompressed data:
//!
//! ```text
//! +---+---+============+---+---+---+---+
//! |CMF|FLG| compressed |    ADLER32    |
//! +---+---+============+---+---+---+---+
//! ```
//!
//! CMF carries the method (8 = DEFLATE) in the low nibble and
//! log₂(window) − 8 in the high nibble. FLG carries a compression-level
//! hint, a dictionary-present bit, and check bits chosen so that
//! `(CMF·256 + FLG) mod 31 == 0`.
//!
//! The streaming engines emit and parse the framing themselves; this
//! module provides the one-shot buffer-to-buffer helpers composed from
//! them.

use oxiflate_core::error::Result;
use oxiflate_core::traits::{Compressor, Decompressor};

use crate::deflate::{DeflateConfig, Deflater};
use crate::inflate::{Format, InflateConfig, Inflater};

/// Compress data into the zlib format.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_config(DeflateConfig {
        level,
        format: Format::Zlib,
        ..DeflateConfig::default()
    })?;
    deflater.compress_all(input)
}

/// Decompress zlib-format data, verifying the trailer checksum.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::with_config(InflateConfig {
        format: Format::Zlib,
        ..InflateConfig::default()
    });
    inflater.decompress_all(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::checksum::Adler32;

    #[test]
    fn test_zlib_header() {
        let compressed = zlib_compress(b"test", 6).expect("compress failed");
        assert_eq!(compressed[0], 0x78);
        let cmf = compressed[0] as u16;
        let flg = compressed[1] as u16;
        assert_eq!((cmf * 256 + flg) % 31, 0);
    }

    #[test]
    fn test_zlib_empty_stream_bytes() {
        let compressed = zlib_compress(b"", 6).unwrap();
        assert_eq!(
            compressed,
            vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
        assert_eq!(zlib_decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_zlib_roundtrip_simple() {
        let data = b"Hello, World!";
        let compressed = zlib_compress(data, 6).expect("compress failed");
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_roundtrip_repeated() {
        let data = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let compressed = zlib_compress(data, 6).expect("compress failed");
        assert!(compressed.len() < data.len());
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_roundtrip_large() {
        let data: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();
        let compressed = zlib_compress(&data, 6).expect("compress failed");
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_levels() {
        let data = b"Hello, World! Hello, World! Hello, World!";
        for level in 0..=9 {
            let compressed =
                zlib_compress(data, level).unwrap_or_else(|_| panic!("level {} failed", level));
            let decompressed = zlib_decompress(&compressed)
                .unwrap_or_else(|_| panic!("level {} decompress failed", level));
            assert_eq!(&decompressed[..], &data[..]);
        }
    }

    #[test]
    fn test_zlib_trailer_is_adler32() {
        let data = b"checksum carrier";
        let compressed = zlib_compress(data, 6).unwrap();
        let n = compressed.len();
        let stored = u32::from_be_bytes(compressed[n - 4..].try_into().unwrap());
        assert_eq!(stored, Adler32::checksum(data));
    }

    #[test]
    fn test_zlib_checksum_verification() {
        let data = b"Test data for checksum";
        let mut compressed = zlib_compress(data, 6).expect("compress failed");
        let len = compressed.len();
        compressed[len - 1] ^= 0xFF;
        let err = zlib_decompress(&compressed).unwrap_err();
        assert!(err.to_string().contains("incorrect data check"));
    }

    #[test]
    fn test_zlib_invalid_header() {
        // CM != 8
        let bad_data = [0x08, 0x1D, 0x00, 0x00, 0x00, 0x01];
        assert!(zlib_decompress(&bad_data).is_err());
        // Failed FCHECK
        let bad_check = [0x78, 0x9D, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(zlib_decompress(&bad_check).is_err());
    }

    #[test]
    fn test_zlib_truncated() {
        let short_data = [0x78, 0x9C];
        assert!(zlib_decompress(&short_data).is_err());
    }
}
