//! # OxiFlate Deflate
//!
//! Streaming DEFLATE (RFC 1951) compression and decompression in pure
//! Rust, with the two standard framings: the zlib wrapper (RFC 1950) and
//! the gzip wrapper (RFC 1952).
//!
//! ## Features
//!
//! - **Decompression**: a resumable state machine supporting all three
//!   block types, arbitrary input/output chunking, preset dictionaries,
//!   gzip header metadata, concatenated gzip members, and a
//!   callback-driven variant ([`inflate_back`]) that decodes straight
//!   into a caller-supplied window.
//! - **Compression**: hash-chain match finding with lazy evaluation,
//!   levels 0-9, the filtered/huffman-only/RLE/fixed strategies,
//!   stored/fixed/dynamic block selection, sync/full/partial flushes,
//!   mid-stream parameter changes, and preset dictionaries.
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! Both engines expose a step interface over caller-supplied buffers:
//!
//! ```rust
//! use oxiflate_core::traits::{CompressStatus, FlushMode};
//! use oxiflate_deflate::Deflater;
//!
//! let mut enc = Deflater::new(6);
//! let mut out = vec![0u8; 64];
//! let (_, n, status) = enc.step(b"stream me", &mut out, FlushMode::Finish).unwrap();
//! assert_eq!(status, CompressStatus::Done);
//! assert!(n > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod gzip;
pub mod inflate;
pub mod inflate_back;
pub mod inftree;
pub mod lz77;
pub mod tables;
pub mod trees;
pub mod zlib;

// Re-exports
pub use deflate::{deflate, DeflateConfig, Deflater};
pub use gzip::{gzip_compress, gzip_decompress, GzipHeader};
pub use inflate::{inflate, Format, InflateConfig, Inflater};
pub use inflate_back::{inflate_back_buffer, InflateBack, InputSource, OutputSink};
pub use lz77::Strategy;
pub use trees::DataType;
pub use zlib::{zlib_compress, zlib_decompress};

// The streaming traits come from the core crate.
pub use oxiflate_core::traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};
pub use oxiflate_core::{Adler32, Crc32, OxiFlateError, Result};
