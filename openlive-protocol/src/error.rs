//! Protocol error types.
//!
//! Every variant is scoped to a single frame (or sub-frame of a batch).
//! None of them is fatal to a session.

use thiserror::Error;

/// Errors produced while decoding a frame or its body.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too short: {len} bytes (header is 16)")]
    FrameTooShort { len: usize },

    #[error("frame too long: {len} bytes (max {max})")]
    FrameTooLong { len: u32, max: u32 },

    #[error("invalid header length {header_len} for frame of {total_len} bytes")]
    InvalidHeaderLength { header_len: u16, total_len: u32 },

    #[error("incomplete frame: declared {declared} bytes, got {actual}")]
    IncompleteFrame { declared: u32, actual: usize },

    #[error("truncated batch: sub-frame at offset {offset} needs {needed} bytes, {available} available")]
    TruncatedBatch {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown body encoding: {0}")]
    UnknownEncoding(u16),

    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("decompressed batch exceeds {max} bytes")]
    DecompressedTooLarge { max: usize },

    #[error("batch nesting exceeds depth {max}")]
    BatchTooDeep { max: usize },

    #[error("invalid UTF-8 in body")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Short stable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::FrameTooShort { .. } => "frame_too_short",
            ProtocolError::FrameTooLong { .. } => "frame_too_long",
            ProtocolError::InvalidHeaderLength { .. } => "invalid_header_length",
            ProtocolError::IncompleteFrame { .. } => "incomplete_frame",
            ProtocolError::TruncatedBatch { .. } => "truncated_batch",
            ProtocolError::UnknownEncoding(_) => "unknown_encoding",
            ProtocolError::Decompression(_) | ProtocolError::DecompressedTooLarge { .. } => {
                "decompression_failure"
            }
            ProtocolError::BatchTooDeep { .. } => "batch_too_deep",
            ProtocolError::InvalidUtf8 => "invalid_utf8",
            ProtocolError::Json(_) => "json",
        }
    }
}
