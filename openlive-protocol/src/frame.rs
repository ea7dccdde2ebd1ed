//! Binary frame format.
//!
//! Frame layout (16 bytes header + body, all integers big-endian):
//!
//! ```text
//! +--------------+------------+----------+-----------+----------+
//! | total_len    | header_len | encoding | operation | sequence |
//! | 4 bytes      | 2 bytes    | 2 bytes  | 4 bytes   | 4 bytes  |
//! +--------------+------------+----------+-----------+----------+
//! | body: total_len - header_len bytes                          |
//! +-------------------------------------------------------------+
//! ```

use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Size of the fixed frame header in bytes (4+2+2+4+4 = 16).
pub const HEADER_LEN: u16 = 16;

const HEADER_SIZE: usize = HEADER_LEN as usize;

/// Frame operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Client heartbeat.
    Heartbeat,
    /// Server reply to a heartbeat.
    HeartbeatReply,
    /// Server-pushed event.
    Message,
    /// Client authentication, the first frame on a connection.
    Auth,
    /// Server reply to the auth frame.
    AuthReply,
    /// Any other code. Accepted on decode, never produced by the encoder's
    /// convenience constructors.
    Unknown(u32),
}

impl Operation {
    pub fn from_u32(code: u32) -> Self {
        match code {
            2 => Operation::Heartbeat,
            3 => Operation::HeartbeatReply,
            5 => Operation::Message,
            7 => Operation::Auth,
            8 => Operation::AuthReply,
            other => Operation::Unknown(other),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Operation::Heartbeat => 2,
            Operation::HeartbeatReply => 3,
            Operation::Message => 5,
            Operation::Auth => 7,
            Operation::AuthReply => 8,
            Operation::Unknown(code) => *code,
        }
    }

    /// Returns whether the body of a frame with this operation is decoded.
    ///
    /// Only heartbeat replies skip body interpretation; unknown operations
    /// are decoded like pushed events.
    pub fn has_body(&self) -> bool {
        !matches!(self, Operation::HeartbeatReply)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Heartbeat => write!(f, "HEARTBEAT"),
            Operation::HeartbeatReply => write!(f, "HEARTBEAT_REPLY"),
            Operation::Message => write!(f, "MESSAGE"),
            Operation::Auth => write!(f, "AUTH"),
            Operation::AuthReply => write!(f, "AUTH_REPLY"),
            Operation::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// Body encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Body is UTF-8 JSON text.
    Raw,
    /// Body is a zlib stream of concatenated sub-frames.
    Zlib,
    Unknown(u16),
}

impl Encoding {
    pub fn from_u16(code: u16) -> Self {
        match code {
            0 => Encoding::Raw,
            2 => Encoding::Zlib,
            other => Encoding::Unknown(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Encoding::Raw => 0,
            Encoding::Zlib => 2,
            Encoding::Unknown(code) => *code,
        }
    }
}

/// A parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the whole frame, header included.
    pub total_len: u32,
    pub header_len: u16,
    pub encoding: Encoding,
    pub operation: Operation,
    /// Reserved; not interpreted.
    pub sequence: u32,
}

impl FrameHeader {
    /// Parses the five header fields from the start of `buf`.
    ///
    /// Only checks that 16 bytes are present; length validation against the
    /// decoder's limits happens in the decoder.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort { len: buf.len() });
        }

        Ok(Self {
            total_len: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            header_len: u16::from_be_bytes([buf[4], buf[5]]),
            encoding: Encoding::from_u16(u16::from_be_bytes([buf[6], buf[7]])),
            operation: Operation::from_u32(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])),
            sequence: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Writes the header into `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.total_len);
        buf.put_u16(self.header_len);
        buf.put_u16(self.encoding.as_u16());
        buf.put_u32(self.operation.as_u32());
        buf.put_u32(self.sequence);
    }

    /// Header for a client-originated raw frame carrying `body_len` bytes.
    pub fn raw(operation: Operation, body_len: usize) -> Self {
        Self {
            total_len: (HEADER_SIZE + body_len) as u32,
            header_len: HEADER_LEN,
            encoding: Encoding::Raw,
            operation,
            sequence: 0,
        }
    }

    /// Body length declared by this header, or `None` if `header_len`
    /// exceeds `total_len`.
    pub fn body_len(&self) -> Option<usize> {
        self.total_len
            .checked_sub(self.header_len as u32)
            .map(|len| len as usize)
    }
}

/// An outgoing frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub operation: Operation,
    pub body: Bytes,
}

impl Frame {
    /// Creates a new raw-encoded frame.
    pub fn new(operation: Operation, body: impl Into<Bytes>) -> Self {
        Self {
            operation,
            body: body.into(),
        }
    }

    /// Returns the header this frame is written with.
    pub fn header(&self) -> FrameHeader {
        FrameHeader::raw(self.operation, self.body.len())
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.body.len());
        self.header().write(&mut buf);
        buf.put_slice(&self.body);
        buf
    }
}
