//! # OxiFlate Core
//!
//! Core components for the OxiFlate DEFLATE library.
//!
//! This crate provides the building blocks the codec engines are made of:
//!
//! - [`bitstream`]: LSB-first bit accumulators and per-call buffer cursors
//! - [`window`]: the decoder's circular sliding window
//! - [`checksum`]: Adler-32 and CRC-32 with combine operators
//! - [`traits`]: the streaming compressor/decompressor interface
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! OxiFlate is layered:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Framing                                             │
//! │     zlib / gzip headers and trailers, one-shot helpers  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflate and Inflate engines (LZ77 + Huffman)        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitBuf/BitSink, Window, Adler-32/CRC-32             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::checksum::{Adler32, Crc32};
//!
//! assert_eq!(Adler32::checksum(b""), 1);
//! assert_eq!(Crc32::checksum(b"123456789"), 0xCBF43926);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitBuf, BitSink, InputCursor, OutputCursor};
pub use checksum::{Adler32, Crc32, Crc32Combine};
pub use error::{OxiFlateError, Result};
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};
pub use window::{Window, MAX_WBITS, MIN_WBITS};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitBuf, BitSink, InputCursor, OutputCursor};
    pub use crate::checksum::{Adler32, Crc32};
    pub use crate::error::{OxiFlateError, Result};
    pub use crate::traits::{
        CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    };
    pub use crate::window::Window;
}
