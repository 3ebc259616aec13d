//! Error types for OxiFlate operations.
//!
//! A single enum covers every failure class of the codec: invalid
//! parameters, stream-state misuse, malformed compressed data, and
//! exhausted buffers. Malformed-data errors carry the input offset where
//! they were detected plus a short user-visible diagnostic (for example
//! `"invalid stored block lengths"` or `"incorrect data check"`); in the
//! decoder they are sticky until the stream is reset.

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiFlateError {
    /// I/O error from an underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An invalid parameter was passed to an initialization operation.
    #[error("Invalid parameter: {message}")]
    InvalidParam {
        /// Description of the offending parameter.
        message: String,
    },

    /// The stream is in the wrong state for the requested operation.
    #[error("Stream state error: {message}")]
    StreamState {
        /// Description of the misuse.
        message: String,
    },

    /// Malformed compressed input.
    #[error("Corrupted data at byte {offset}: {message}")]
    CorruptedData {
        /// Input byte offset where the corruption was detected.
        offset: u64,
        /// Diagnostic message.
        message: &'static str,
    },

    /// A preset dictionary is required but its checksum does not match.
    #[error("Dictionary mismatch: stream expects Adler-32 {expected:#010x}")]
    DictionaryMismatch {
        /// Adler-32 the stream expects.
        expected: u32,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// No forward progress is possible with the given buffers.
    #[error("Buffer error: no progress possible without more {needed}")]
    BufferError {
        /// What is missing ("input" or "output").
        needed: &'static str,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiFlateError>;

impl OxiFlateError {
    /// Create an invalid-parameter error.
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParam {
            message: message.into(),
        }
    }

    /// Create a stream-state error.
    pub fn stream_state(message: impl Into<String>) -> Self {
        Self::StreamState {
            message: message.into(),
        }
    }

    /// Create a corrupted-data error.
    pub fn corrupted(offset: u64, message: &'static str) -> Self {
        Self::CorruptedData { offset, message }
    }

    /// Create a dictionary-mismatch error.
    pub fn dictionary_mismatch(expected: u32) -> Self {
        Self::DictionaryMismatch { expected }
    }

    /// Create an unexpected-EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a buffer error.
    pub fn buffer_error(needed: &'static str) -> Self {
        Self::BufferError { needed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiFlateError::corrupted(12, "invalid stored block lengths");
        assert!(err.to_string().contains("invalid stored block lengths"));
        assert!(err.to_string().contains("12"));

        let err = OxiFlateError::invalid_param("windowBits out of range");
        assert!(err.to_string().contains("windowBits"));

        let err = OxiFlateError::dictionary_mismatch(0xDEADBEEF);
        assert!(err.to_string().contains("0xdeadbeef"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxiFlateError = io_err.into();
        assert!(matches!(err, OxiFlateError::Io(_)));
    }
}
