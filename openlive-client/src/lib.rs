//! # openlive-client
//!
//! Session client for the open live event feed.
//!
//! This crate provides:
//! - A message-oriented transport abstraction and its WebSocket implementation
//! - The session state machine: auth handshake, periodic heartbeat and the
//!   receive loop that decodes frames and hands messages to a dispatcher
//! - The dispatch contract implemented by the embedding application

pub mod dispatch;
pub mod error;
pub mod session;
pub mod transport;

pub use dispatch::Dispatch;
pub use error::{SessionError, TransportError};
pub use session::{CloseReason, Session, SessionConfig, SessionState};
pub use transport::{FrameSink, FrameSource, WebSocketSink, WebSocketSource};
