//! # openlive-api
//!
//! Control-plane client for the open live platform.
//!
//! Before a feed session can be opened, the app session has to be started
//! over a signed REST API. The start call returns the feed endpoints and
//! the auth body; the app session is then kept alive with periodic
//! heartbeats and ended explicitly.
//!
//! This crate provides:
//! - Request signing (content MD5 plus an HMAC-SHA256 over the `x-bili-*`
//!   headers)
//! - [`ApiClient`] with the start, end, heartbeat and batch heartbeat calls
//! - The platform's status-code table
//! - [`KeepAlive`], a background heartbeat loop

pub mod client;
pub mod error;
pub mod keepalive;
pub mod message;
pub mod signing;
pub mod status;

pub use client::{ApiClient, ApiConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use keepalive::KeepAlive;
pub use message::{AnchorInfo, AppStartResult, BatchHeartbeatResult, GameInfo, WebsocketInfo};
pub use signing::{Credentials, SignedHeaders};
