//! Message-oriented transport used by a session.
//!
//! A transport is split into a [`FrameSink`] (write half) and a
//! [`FrameSource`] (read half) so the heartbeat task can write while the
//! receive loop is blocked on a read. Each transport message carries exactly
//! one frame.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one whole frame.
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Closes the transport.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a transport.
#[async_trait]
pub trait FrameSource: Send {
    /// Waits for the next whole frame. Returns `Ok(None)` once the peer has
    /// closed the connection cleanly.
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// Opens a WebSocket (`ws://` or `wss://`) and splits it into halves.
pub async fn connect_websocket(
    url: &str,
    timeout: Duration,
) -> Result<(WebSocketSink, WebSocketSource), TransportError> {
    tracing::debug!("Connecting to {}...", url);

    let (stream, response) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            TransportError::ConnectTimeout
        })??;

    tracing::debug!("WebSocket connected (status {})", response.status());

    let (sink, source) = stream.split();
    Ok((WebSocketSink { inner: sink }, WebSocketSource { inner: source }))
}

/// Write half of a WebSocket transport. Frames go out as binary messages.
pub struct WebSocketSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        self.inner.send(Message::Binary(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.inner.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read half of a WebSocket transport.
pub struct WebSocketSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Bytes::copy_from_slice(text.as_str().as_bytes())))
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Peer sent close frame: {:?}", frame);
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => {
                    return Ok(None)
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}
