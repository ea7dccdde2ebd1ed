//! # openlive-protocol
//!
//! Wire protocol for the open live platform's event feed.
//!
//! This crate provides:
//! - The fixed 16-byte big-endian frame header and operation codes
//! - Frame encoding for client-originated control frames (auth, heartbeat)
//! - Frame decoding, including zlib-compressed batches of sub-frames
//! - Application message and auth reply types
//!
//! Nothing here performs I/O; the decoder is immutable and can be shared
//! between sessions.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoded, Decoder, DecoderConfig, Encoder};
pub use error::ProtocolError;
pub use frame::{Encoding, Frame, FrameHeader, Operation, HEADER_LEN};
pub use message::{ApplicationMessage, AuthReply};

/// Default ceiling on the total length of a single frame.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 2048;

/// Default ceiling on the size of a decompressed batch body (1 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 1024 * 1024;

/// Default limit on how deeply compressed batches may nest.
pub const DEFAULT_MAX_BATCH_DEPTH: usize = 4;
