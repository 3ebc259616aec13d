//! Bit-exact format checks and malformed-input handling.

use oxiflate_core::traits::{Decompressor, DecompressStatus, FlushMode};
use oxiflate_core::traits::Compressor;
use oxiflate_deflate::{
    gzip_compress, inflate, zlib_compress, zlib_decompress, DeflateConfig, Deflater, Format,
    GzipHeader, InflateConfig, Inflater, OxiFlateError,
};

#[test]
fn empty_zlib_stream_is_bit_exact() {
    let compressed = zlib_compress(b"", 6).unwrap();
    assert_eq!(
        compressed,
        vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]
    );

    let mut inflater = Inflater::new();
    let out = inflater.decompress_all(&compressed).unwrap();
    assert!(out.is_empty());
    assert_eq!(inflater.checksum(), 1);
}

#[test]
fn zlib_header_reflects_level() {
    for (level, flevel) in [(1, 0u8), (5, 1), (6, 2), (9, 3)] {
        let compressed = zlib_compress(b"x", level).unwrap();
        assert_eq!(compressed[0], 0x78, "level {}", level);
        assert_eq!(compressed[1] >> 6, flevel, "level {}", level);
        assert_eq!(
            ((compressed[0] as u16) * 256 + compressed[1] as u16) % 31,
            0
        );
    }
}

#[test]
fn gzip_header_is_bit_exact() {
    let compressed = gzip_compress(b"data", 9).unwrap();
    // 1F 8B 08 FLG MTIME(4) XFL OS
    assert_eq!(&compressed[..4], &[0x1F, 0x8B, 0x08, 0x00]);
    assert_eq!(&compressed[4..8], &[0, 0, 0, 0]); // no mtime by default
    assert_eq!(compressed[8], 2); // XFL: maximum compression
    assert_eq!(compressed[9], 255); // OS: unknown
}

#[test]
fn stored_block_length_mismatch() {
    // LEN/NLEN complement check fails.
    let bad = [0x78u8, 0x9C, 0x00, 0x01, 0x00, 0xFF, 0xFF];
    let err = zlib_decompress(&bad).unwrap_err();
    assert!(
        err.to_string().contains("invalid stored block lengths"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn sync_marker_is_a_valid_empty_block() {
    // 78 9C followed by the five sync-marker bytes is a well-formed but
    // unterminated stream: an empty non-final stored block whose LEN and
    // NLEN complement correctly. One-shot decoding reports truncation.
    let unterminated = [0x78u8, 0x9C, 0x00, 0x00, 0x00, 0xFF, 0xFF];
    let err = zlib_decompress(&unterminated).unwrap_err();
    assert!(
        matches!(err, OxiFlateError::UnexpectedEof { .. }),
        "expected truncation, got: {}",
        err
    );

    // Streaming reports a suspension, not a data error.
    let mut inf = Inflater::new();
    let mut out = [0u8; 32];
    let (consumed, produced, status) =
        inf.step(&unterminated, &mut out, FlushMode::None).unwrap();
    assert_eq!(consumed, unterminated.len());
    assert_eq!(produced, 0);
    assert_eq!(status, DecompressStatus::NeedsInput);
}

#[test]
fn reserved_block_type_is_a_data_error() {
    // BFINAL=1, BTYPE=11.
    let err = inflate(&[0x07]).unwrap_err();
    assert!(err.to_string().contains("invalid block type"));
}

#[test]
fn raw_stream_must_terminate() {
    // A valid non-final stored block with no final block after it.
    let unterminated = [0x00u8, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i'];
    let err = inflate(&unterminated).unwrap_err();
    assert!(matches!(err, OxiFlateError::UnexpectedEof { .. }));
}

#[test]
fn auto_detect_handles_both_wrappers() {
    let data = b"wrapped either way";
    let auto_config = InflateConfig::from_window_bits(47).unwrap();

    let zlib_stream = zlib_compress(data, 6).unwrap();
    let mut inf = Inflater::with_config(auto_config);
    assert_eq!(inf.decompress_all(&zlib_stream).unwrap(), data);

    let gzip_stream = gzip_compress(data, 6).unwrap();
    let mut inf = Inflater::with_config(auto_config);
    assert_eq!(inf.decompress_all(&gzip_stream).unwrap(), data);
}

#[test]
fn multi_member_gzip_with_auto_window_bits() {
    let mut joined = gzip_compress(b"alpha ", 6).unwrap();
    joined.extend_from_slice(&gzip_compress(b"beta", 6).unwrap());

    let mut inf = Inflater::with_config(InflateConfig::from_window_bits(47).unwrap());
    let mut out = vec![0u8; 256];
    let mut produced = Vec::new();
    let mut input: &[u8] = &joined;
    loop {
        let (c, p, status) = inf.step(input, &mut out, FlushMode::None).unwrap();
        input = &input[c..];
        produced.extend_from_slice(&out[..p]);
        if status == DecompressStatus::Done {
            break;
        }
    }
    assert_eq!(produced, b"alpha beta");
    assert!(input.is_empty());
}

#[test]
fn zlib_window_larger_than_decoder_is_rejected() {
    // CINFO=7 advertises a 32 KiB window; a decoder configured for less
    // must reject the stream.
    let stream = zlib_compress(b"needs a full window", 6).unwrap();
    let mut inf = Inflater::with_config(InflateConfig::new(Format::Zlib, 9).unwrap());
    let err = inf.decompress_all(&stream).unwrap_err();
    assert!(err.to_string().contains("invalid window size"));
}

#[test]
fn small_encoder_window_decodes_with_any_larger_window() {
    let input: Vec<u8> = b"format stability "
        .iter()
        .cycle()
        .take(30_000)
        .copied()
        .collect();
    let mut enc = Deflater::with_config(DeflateConfig {
        level: 6,
        format: Format::Raw,
        wbits: 9,
        ..DeflateConfig::default()
    })
    .unwrap();
    let compressed = enc.compress_all(&input).unwrap();

    for wbits in [9u32, 12, 15] {
        let mut inf = Inflater::with_config(InflateConfig::new(Format::Raw, wbits).unwrap());
        assert_eq!(
            inf.decompress_all(&compressed).unwrap(),
            input,
            "decoder wbits {}",
            wbits
        );
    }
}

#[test]
fn gzip_header_crc_is_validated() {
    let header = GzipHeader {
        name: Some(b"crc-protected".to_vec()),
        hcrc: true,
        ..GzipHeader::default()
    };
    let mut enc = Deflater::with_config(DeflateConfig {
        level: 6,
        format: Format::Gzip,
        ..DeflateConfig::default()
    })
    .unwrap();
    enc.set_gzip_header(header).unwrap();
    let mut compressed = enc.compress_all(b"guarded").unwrap();

    // Intact header decodes.
    let mut inf = Inflater::with_config(InflateConfig {
        format: Format::Gzip,
        ..InflateConfig::default()
    });
    assert_eq!(inf.decompress_all(&compressed).unwrap(), b"guarded");

    // Corrupt a header byte (inside the name field).
    compressed[12] ^= 0xFF;
    let mut inf = Inflater::with_config(InflateConfig {
        format: Format::Gzip,
        ..InflateConfig::default()
    });
    let err = inf.decompress_all(&compressed).unwrap_err();
    assert!(err.to_string().contains("header crc mismatch"));
}

#[test]
fn corrupted_huffman_table_is_rejected() {
    // Dynamic block declaring an over-subscribed code-length code: HLIT
    // minimal, then all nineteen code-length codes claim length 1.
    let mut enc_bits: Vec<u8> = Vec::new();
    let mut acc = 0u64;
    let mut n = 0u32;
    let mut put = |value: u64, count: u32| {
        acc |= value << n;
        n += count;
        while n >= 8 {
            enc_bits.push(acc as u8);
            acc >>= 8;
            n -= 8;
        }
    };
    put(1, 1); // BFINAL
    put(2, 2); // dynamic
    put(0, 5); // HLIT = 257
    put(0, 5); // HDIST = 1
    put(15, 4); // HCLEN = 19
    for _ in 0..19 {
        put(1, 3); // nineteen 1-bit codes: over-subscribed
    }
    put(0, 7); // padding
    enc_bits.push(acc as u8);

    let err = inflate(&enc_bits).unwrap_err();
    assert!(err.to_string().contains("invalid code lengths set"));
}

#[test]
fn missing_end_of_block_code_is_rejected() {
    // Dynamic block whose literal/length lengths give symbol 256 no code.
    let mut enc_bits: Vec<u8> = Vec::new();
    let mut acc = 0u64;
    let mut n = 0u32;
    let mut put = |value: u64, count: u32| {
        acc |= value << n;
        n += count;
        while n >= 8 {
            enc_bits.push(acc as u8);
            acc >>= 8;
            n -= 8;
        }
    };
    put(1, 1); // BFINAL
    put(2, 2); // dynamic
    put(0, 5); // HLIT = 257
    put(0, 5); // HDIST = 1
    put(14, 4); // HCLEN = 18
    // Code-length code: symbol 0 -> 1 bit, symbol 18 -> 1 bit (complete).
    // Order: 16,17,18,0,8,7,9,6,10,5,11,4,12,3,13,2,14,1
    let cl_lens = [0u64, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    for len in cl_lens {
        put(len, 3);
    }
    // Lengths for 257 literals + 1 distance, all zero via symbol 18
    // (code '1'), never giving 256 a length. 138 + 120 zeros = 258.
    put(1, 1); // symbol 18
    put(127, 7); // repeat zero 138 times
    put(1, 1); // symbol 18
    put(109, 7); // repeat zero 120 times
    put(0, 7); // padding
    enc_bits.push(acc as u8);

    let err = inflate(&enc_bits).unwrap_err();
    assert!(err.to_string().contains("missing end-of-block"));
}

#[test]
fn distance_too_far_back_is_rejected() {
    // A fixed-Huffman block: literal 'x', then a match at distance 4
    // with only one byte of history.
    let mut enc_bits: Vec<u8> = Vec::new();
    let mut acc = 0u64;
    let mut n = 0u32;
    let mut put = |value: u64, count: u32| {
        acc |= value << n;
        n += count;
        while n >= 8 {
            enc_bits.push(acc as u8);
            acc >>= 8;
            n -= 8;
        }
    };
    let rev = |code: u64, len: u32| -> u64 {
        let mut r = 0u64;
        for i in 0..len {
            r |= ((code >> i) & 1) << (len - 1 - i);
        }
        r
    };
    put(1, 1); // BFINAL
    put(1, 2); // fixed
    put(rev(0x30 + b'x' as u64, 8), 8); // literal 'x'
    put(rev(1, 7), 7); // length symbol 257 = 3
    put(rev(3, 5), 5); // distance symbol 3 = 4
    put(rev(0, 7), 7); // EOB
    put(0, 7);
    enc_bits.push(acc as u8);

    let err = inflate(&enc_bits).unwrap_err();
    assert!(
        err.to_string().contains("invalid distance too far back"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn lenient_mode_zero_fills_far_distances() {
    // Same malformed stream as above, decoded with strict distance
    // validation disabled: missing history reads as zero bytes.
    let mut enc_bits: Vec<u8> = Vec::new();
    let mut acc = 0u64;
    let mut n = 0u32;
    let mut put = |value: u64, count: u32| {
        acc |= value << n;
        n += count;
        while n >= 8 {
            enc_bits.push(acc as u8);
            acc >>= 8;
            n -= 8;
        }
    };
    let rev = |code: u64, len: u32| -> u64 {
        let mut r = 0u64;
        for i in 0..len {
            r |= ((code >> i) & 1) << (len - 1 - i);
        }
        r
    };
    put(1, 1);
    put(1, 2);
    put(rev(0x30 + b'x' as u64, 8), 8);
    put(rev(1, 7), 7); // length 3
    put(rev(3, 5), 5); // distance 4
    put(rev(0, 7), 7); // EOB
    put(0, 7);
    enc_bits.push(acc as u8);

    let mut inf = Inflater::with_config(InflateConfig::new(Format::Raw, 15).unwrap());
    inf.set_lenient_distances(true);
    let out = inf.decompress_all(&enc_bits).unwrap();
    assert_eq!(out, [b'x', 0, 0, 0]);
}
