//! Core traits for streaming compression and decompression.
//!
//! A step call advances an engine until it runs out of input, runs out of
//! output space, satisfies the requested flush, or finishes the stream,
//! and returns how many bytes it consumed and produced together with a
//! status. Engines own their private state; the caller owns both buffers,
//! which are only borrowed for the duration of one call.

use crate::error::{OxiFlateError, Result};

/// Status of a streaming decompression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// A preset dictionary must be supplied before decoding can continue.
    /// The expected Adler-32 is available on the engine.
    NeedDict,
    /// A block boundary was reached (only reported for the `Block` and
    /// `Trees` flush modes).
    BlockEnd,
    /// The stream ended and its trailer verified.
    Done,
}

/// Status of a streaming compression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// The stream is finished and fully flushed.
    Done,
}

/// Flush mode for a step call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush: buffer freely for best compression.
    #[default]
    None,
    /// End the current block with an alignment marker but no stored-block
    /// resync point.
    Partial,
    /// End the current block and emit an empty stored block
    /// (`00 00 FF FF` after padding) so a decoder can resynchronize on a
    /// byte boundary.
    Sync,
    /// Like `Sync`, but also reset the match state so decoding can
    /// restart from this point without prior history.
    Full,
    /// Decoder-side: return as soon as a block boundary is reached.
    /// Encoder-side: stop at a block boundary without emitting a marker.
    Block,
    /// Decoder-side: return once the block header and its code tables
    /// have been processed, before any symbols.
    Trees,
    /// Finish the stream: emit the final block and the wrapper trailer.
    Finish,
}

/// A streaming decompressor.
pub trait Decompressor {
    /// Decompress from `input` into `output`.
    ///
    /// Returns `(bytes consumed, bytes produced, status)`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the engine to its post-init state, keeping allocations.
    fn reset(&mut self);

    /// Whether the stream has ended.
    fn is_finished(&self) -> bool;

    /// Decompress a complete stream at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut pos = 0;

        loop {
            let (consumed, produced, status) = self.decompress(&input[pos..], &mut buffer)?;
            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedDict => {
                    return Err(OxiFlateError::stream_state(
                        "stream requires a preset dictionary",
                    ));
                }
                DecompressStatus::NeedsInput => {
                    if pos >= input.len() {
                        return Err(OxiFlateError::unexpected_eof(1));
                    }
                }
                DecompressStatus::NeedsOutput | DecompressStatus::BlockEnd => {}
            }

            if consumed == 0 && produced == 0 && status == DecompressStatus::NeedsInput {
                return Err(OxiFlateError::buffer_error("input"));
            }
        }

        Ok(output)
    }
}

/// A streaming compressor.
pub trait Compressor {
    /// Compress from `input` into `output` under the given flush mode.
    ///
    /// Returns `(bytes consumed, bytes produced, status)`.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the engine to its post-init state, keeping allocations.
    fn reset(&mut self);

    /// Whether the stream has been finished.
    fn is_finished(&self) -> bool;

    /// Compress a complete buffer at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut pos = 0;

        loop {
            let flush = if pos >= input.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let (consumed, produced, status) =
                self.compress(&input[pos..], &mut buffer, flush)?;
            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
        }

        Ok(output)
    }
}

/// Compression level for algorithms that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (stored blocks only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9; larger values clamp to 9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// The numeric level.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}
