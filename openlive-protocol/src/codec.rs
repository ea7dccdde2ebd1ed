//! Encoder and decoder for feed frames.

use crate::error::ProtocolError;
use crate::frame::{Encoding, FrameHeader, Operation, HEADER_LEN};
use crate::message::{ApplicationMessage, AuthReply};
use crate::{DEFAULT_MAX_BATCH_DEPTH, DEFAULT_MAX_DECOMPRESSED_SIZE, DEFAULT_MAX_FRAME_SIZE};
use bytes::{BufMut, BytesMut};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Size of the big-endian length prefix of each sub-frame in a batch.
const BATCH_LEN_PREFIX: usize = 4;

/// Encodes client-originated frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a raw frame: `encoding = 0`, `sequence = 0`, 16-byte header.
    pub fn encode(operation: Operation, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN as usize + body.len());
        FrameHeader::raw(operation, body.len()).write(&mut buf);
        buf.put_slice(body);
        buf
    }

    /// Encodes the auth frame carrying the opaque auth payload.
    pub fn auth(payload: &[u8]) -> BytesMut {
        Self::encode(Operation::Auth, payload)
    }

    /// Encodes an empty-body heartbeat frame.
    pub fn heartbeat() -> BytesMut {
        Self::encode(Operation::Heartbeat, &[])
    }
}

/// Decoder limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Ceiling on `total_len` of any frame or sub-frame.
    pub max_frame_size: u32,
    /// Ceiling on the inflated size of one batch body.
    pub max_decompressed_size: usize,
    /// How many compressed batches may nest inside one another.
    pub max_batch_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            max_batch_depth: DEFAULT_MAX_BATCH_DEPTH,
        }
    }
}

impl DecoderConfig {
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn with_max_decompressed_size(mut self, size: usize) -> Self {
        self.max_decompressed_size = size;
        self
    }

    pub fn with_max_batch_depth(mut self, depth: usize) -> Self {
        self.max_batch_depth = depth;
        self
    }
}

/// One result of decoding a frame.
#[derive(Debug)]
pub enum Decoded {
    /// A pushed business event.
    Message(ApplicationMessage),
    /// The reply to the auth frame.
    AuthReply(AuthReply),
    /// A heartbeat reply; its body is not interpreted.
    ControlAck,
    /// The frame or sub-frame could not be decoded.
    Error(ProtocolError),
}

impl Decoded {
    pub fn into_message(self) -> Option<ApplicationMessage> {
        match self {
            Decoded::Message(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Decoded::Error(_))
    }
}

/// Decodes inbound frames into messages.
///
/// The decoder holds only immutable limits, so one instance can serve any
/// number of sessions concurrently.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one transport message holding a single frame.
    ///
    /// Returns every result in wire order. Sub-frames of a compressed batch
    /// are flattened into the same sequence; an error in one sub-frame does
    /// not discard results of the sub-frames before it.
    pub fn decode(&self, buf: &[u8]) -> Vec<Decoded> {
        let mut out = Vec::new();
        self.decode_frame(buf, 0, &mut out);
        out
    }

    fn decode_frame(&self, buf: &[u8], depth: usize, out: &mut Vec<Decoded>) {
        match self.split_frame(buf) {
            Ok((header, body)) => self.decode_body(&header, body, depth, out),
            Err(e) => out.push(Decoded::Error(e)),
        }
    }

    /// Validates the header against the limits and returns it with the body.
    fn split_frame<'a>(&self, buf: &'a [u8]) -> Result<(FrameHeader, &'a [u8]), ProtocolError> {
        let header = FrameHeader::parse(buf)?;

        if header.total_len < HEADER_LEN as u32 {
            return Err(ProtocolError::FrameTooShort {
                len: header.total_len as usize,
            });
        }

        if header.total_len > self.config.max_frame_size {
            return Err(ProtocolError::FrameTooLong {
                len: header.total_len,
                max: self.config.max_frame_size,
            });
        }

        let invalid_header = ProtocolError::InvalidHeaderLength {
            header_len: header.header_len,
            total_len: header.total_len,
        };
        if header.header_len < HEADER_LEN {
            return Err(invalid_header);
        }
        let body_len = header.body_len().ok_or(invalid_header)?;

        let total_len = header.total_len as usize;
        if buf.len() < total_len {
            return Err(ProtocolError::IncompleteFrame {
                declared: header.total_len,
                actual: buf.len(),
            });
        }

        let body_start = total_len - body_len;
        Ok((header, &buf[body_start..total_len]))
    }

    fn decode_body(&self, header: &FrameHeader, body: &[u8], depth: usize, out: &mut Vec<Decoded>) {
        if !header.operation.has_body() {
            out.push(Decoded::ControlAck);
            return;
        }

        if body.is_empty() {
            return;
        }

        match header.encoding {
            Encoding::Raw => out.push(match Self::decode_raw(header.operation, body) {
                Ok(decoded) => decoded,
                Err(e) => Decoded::Error(e),
            }),
            Encoding::Zlib => {
                if depth >= self.config.max_batch_depth {
                    out.push(Decoded::Error(ProtocolError::BatchTooDeep {
                        max: self.config.max_batch_depth,
                    }));
                    return;
                }
                match self.inflate(body) {
                    Ok(batch) => self.decode_batch(&batch, depth + 1, out),
                    Err(e) => out.push(Decoded::Error(e)),
                }
            }
            Encoding::Unknown(code) => {
                out.push(Decoded::Error(ProtocolError::UnknownEncoding(code)));
            }
        }
    }

    fn decode_raw(operation: Operation, body: &[u8]) -> Result<Decoded, ProtocolError> {
        match operation {
            Operation::AuthReply => Ok(Decoded::AuthReply(AuthReply::from_slice(body)?)),
            _ => Ok(Decoded::Message(ApplicationMessage::from_slice(body)?)),
        }
    }

    fn inflate(&self, body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let max = self.config.max_decompressed_size;
        let mut inflated = Vec::new();
        ZlibDecoder::new(body)
            .take(max as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(ProtocolError::Decompression)?;

        if inflated.len() > max {
            return Err(ProtocolError::DecompressedTooLarge { max });
        }
        Ok(inflated)
    }

    /// Walks a decompressed batch: `[len:4][frame]...`, where `len` is the
    /// sub-frame's own `total_len` field.
    fn decode_batch(&self, batch: &[u8], depth: usize, out: &mut Vec<Decoded>) {
        let mut offset = 0;

        while offset < batch.len() {
            let remaining = &batch[offset..];

            if remaining.len() < BATCH_LEN_PREFIX {
                out.push(Decoded::Error(ProtocolError::TruncatedBatch {
                    offset,
                    needed: BATCH_LEN_PREFIX,
                    available: remaining.len(),
                }));
                return;
            }

            let size = u32::from_be_bytes([remaining[0], remaining[1], remaining[2], remaining[3]])
                as usize;

            if size > remaining.len() {
                out.push(Decoded::Error(ProtocolError::TruncatedBatch {
                    offset,
                    needed: size,
                    available: remaining.len(),
                }));
                return;
            }

            // A size below the header length can never advance the walk.
            if size < HEADER_LEN as usize {
                out.push(Decoded::Error(ProtocolError::FrameTooShort { len: size }));
                return;
            }

            self.decode_frame(&remaining[..size], depth, out);
            offset += size;
        }
    }
}
