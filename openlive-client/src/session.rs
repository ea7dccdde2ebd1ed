//! Session management.
//!
//! A session owns one transport. [`Session::run`] sends the auth frame,
//! spawns the heartbeat task and drives the receive loop until the session
//! closes. All writes go through a single writer lock; both the heartbeat
//! task and the receive loop watch the session state and stop on their own
//! once it leaves `Open`.

use crate::dispatch::Dispatch;
use crate::error::SessionError;
use crate::transport::{connect_websocket, FrameSink, FrameSource};
use bytes::Bytes;
use openlive_protocol::{Decoded, Decoder, DecoderConfig, Encoder, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Default interval between heartbeat frames (20 s).
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Default time allowed for the auth reply to arrive (10 s).
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default transport connect timeout (10 s).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the transport close handshake.
const TRANSPORT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between heartbeat frames.
    pub heartbeat_interval: Duration,
    /// Time allowed between sending the auth frame and receiving its reply.
    pub auth_timeout: Duration,
    /// Transport connect timeout, used by [`Session::connect`].
    pub connect_timeout: Duration,
    /// Frame decoder limits.
    pub decoder: DecoderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            decoder: DecoderConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handed over, auth not yet sent.
    Connecting,
    /// Auth frame sent, waiting for the reply.
    Authenticating,
    /// Auth accepted; heartbeats flow.
    Open,
    /// Shutting down.
    Closing,
    /// Transport released.
    Closed,
}

impl SessionState {
    pub fn is_closing(&self) -> bool {
        matches!(self, SessionState::Closing | SessionState::Closed)
    }
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// [`Session::close`] was called.
    Stopped,
    /// The peer closed the transport.
    RemoteClosed,
}

struct SessionInner {
    id: Uuid,
    config: SessionConfig,
    decoder: Decoder,
    state: watch::Sender<SessionState>,
    /// Single writer slot; `None` once the transport is released.
    writer: Mutex<Option<Box<dyn FrameSink>>>,
    /// Taken by `run`, so a session runs at most once.
    reader: Mutex<Option<Box<dyn FrameSource>>>,
}

impl SessionInner {
    /// Moves `from -> to`; returns false if the state was not `from`.
    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Moves to `Closing` unless already closing.
    fn begin_close(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_closing() {
                false
            } else {
                *state = SessionState::Closing;
                true
            }
        })
    }

    /// Writes one frame. The writer lock is held only for the write itself,
    /// and a pending write is abandoned as soon as the session starts
    /// closing so `close` can take the writer.
    async fn write(&self, frame: Bytes) -> Result<(), SessionError> {
        let mut state_rx = self.state.subscribe();
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(SessionError::NotOpen)?;

        tokio::select! {
            biased;

            _ = state_rx.wait_for(|s| s.is_closing()) => Err(SessionError::NotOpen),
            sent = sink.send(frame) => sent.map_err(SessionError::TransportWrite),
        }
    }
}

/// A feed session over one transport.
///
/// Cloning is cheap and yields another handle to the same session, which
/// is how an owner stops a running session from another task.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a session over an already-connected transport.
    pub fn new(
        sink: impl FrameSink + 'static,
        source: impl FrameSource + 'static,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                decoder: Decoder::with_config(config.decoder),
                config,
                state,
                writer: Mutex::new(Some(Box::new(sink))),
                reader: Mutex::new(Some(Box::new(source))),
            }),
        }
    }

    /// Connects a WebSocket to `url` and creates a session over it.
    pub async fn connect(url: &str, config: SessionConfig) -> Result<Self, SessionError> {
        let (sink, source) = connect_websocket(url, config.connect_timeout)
            .await
            .map_err(SessionError::Connect)?;
        Ok(Self::new(sink, source, config))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Runs the session to completion.
    ///
    /// Sends the auth frame, starts the heartbeat task and receives frames
    /// until the session is closed, the peer disconnects or a fatal error
    /// occurs. Every decoded message is passed to `dispatch` in arrival
    /// order. The heartbeat task is joined and the transport released
    /// before this returns.
    pub async fn run<D: Dispatch>(
        &self,
        auth_payload: &[u8],
        mut dispatch: D,
    ) -> Result<CloseReason, SessionError> {
        let id = self.inner.id;
        if self.inner.config.heartbeat_interval.is_zero() {
            self.close().await;
            return Err(SessionError::InvalidConfig(
                "heartbeat interval must be non-zero",
            ));
        }

        let mut source = self
            .inner
            .reader
            .lock()
            .await
            .take()
            .ok_or(SessionError::AlreadyStarted)?;

        if !self
            .inner
            .advance(SessionState::Connecting, SessionState::Authenticating)
        {
            // Closed before it started.
            return Ok(CloseReason::Stopped);
        }

        tracing::debug!(session = %id, "Sending auth frame ({} bytes)", auth_payload.len());
        match self.inner.write(Encoder::auth(auth_payload).freeze()).await {
            Ok(()) => {}
            Err(SessionError::NotOpen) => {
                // Closed while the auth frame was in flight.
                self.close().await;
                return Ok(CloseReason::Stopped);
            }
            Err(e) => {
                tracing::warn!(session = %id, "Auth write failed: {}", e);
                self.close().await;
                return Err(e);
            }
        }

        let mut heartbeat = tokio::spawn(heartbeat_loop(self.inner.clone()));

        let receive = self.receive_loop(source.as_mut(), &mut dispatch);
        tokio::pin!(receive);

        // The heartbeat task only finishes on its own when the session is
        // closing or it failed; either way receiving stops.
        let (result, joined) = tokio::select! {
            result = &mut receive => (result, None),
            joined = &mut heartbeat => (Ok(CloseReason::Stopped), Some(joined)),
        };

        self.inner.begin_close();
        let joined = match joined {
            Some(joined) => joined,
            None => heartbeat.await,
        };
        let heartbeat_result = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(session = %id, "Heartbeat task failed: {}", e);
                Err(SessionError::HeartbeatTask(e))
            }
        };
        self.close().await;

        match (result, heartbeat_result) {
            (Err(e), _) | (Ok(_), Err(e)) => {
                tracing::warn!(session = %id, "Session ended with error: {}", e);
                Err(e)
            }
            (Ok(reason), Ok(())) => {
                tracing::info!(session = %id, "Session ended: {:?}", reason);
                Ok(reason)
            }
        }
    }

    async fn receive_loop<D: Dispatch>(
        &self,
        source: &mut dyn FrameSource,
        dispatch: &mut D,
    ) -> Result<CloseReason, SessionError> {
        let id = self.inner.id;
        let auth_timeout = self.inner.config.auth_timeout;
        let mut state_rx = self.inner.state.subscribe();
        let auth_deadline = tokio::time::sleep(auth_timeout);
        tokio::pin!(auth_deadline);

        loop {
            let state = *state_rx.borrow_and_update();
            if state.is_closing() {
                return Ok(CloseReason::Stopped);
            }
            let authenticating = state == SessionState::Authenticating;

            tokio::select! {
                biased;

                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return Ok(CloseReason::Stopped);
                    }
                }

                _ = &mut auth_deadline, if authenticating => {
                    tracing::warn!(session = %id, "No auth reply within {:?}", auth_timeout);
                    return Err(SessionError::AuthTimeout(auth_timeout));
                }

                received = source.receive() => match received {
                    Ok(Some(frame)) => {
                        tracing::trace!(session = %id, "Received frame ({} bytes)", frame.len());
                        self.handle_frame(&frame, dispatch)?;
                    }
                    Ok(None) => {
                        tracing::info!(session = %id, "Connection closed by server");
                        return Ok(CloseReason::RemoteClosed);
                    }
                    Err(e) => {
                        tracing::debug!(session = %id, "Read error: {}", e);
                        return Err(SessionError::TransportRead(e));
                    }
                }
            }
        }
    }

    fn handle_frame<D: Dispatch>(&self, frame: &[u8], dispatch: &mut D) -> Result<(), SessionError> {
        let id = self.inner.id;

        for decoded in self.inner.decoder.decode(frame) {
            match decoded {
                Decoded::Message(message) => {
                    tracing::trace!(session = %id, cmd = %message.cmd, "Dispatching message");
                    dispatch.dispatch(message);
                }
                Decoded::AuthReply(reply) if reply.is_success() => {
                    if self
                        .inner
                        .advance(SessionState::Authenticating, SessionState::Open)
                    {
                        tracing::info!(session = %id, "Authenticated, session open");
                    }
                }
                Decoded::AuthReply(reply) => {
                    tracing::warn!(session = %id, "Auth rejected (code {})", reply.code);
                    return Err(SessionError::AuthRejected { code: reply.code });
                }
                Decoded::ControlAck => {
                    tracing::trace!(session = %id, "Heartbeat acknowledged");
                }
                Decoded::Error(e) => {
                    tracing::warn!(
                        session = %id,
                        kind = e.kind(),
                        "Dropping malformed frame: {}",
                        e
                    );
                }
            }
        }

        Ok(())
    }

    /// Sends an arbitrary frame through the session's writer.
    pub async fn send(&self, frame: Frame) -> Result<(), SessionError> {
        if self.state() != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        self.inner.write(frame.encode().freeze()).await
    }

    /// Closes the session. Safe to call any number of times; the transport
    /// is released once.
    pub async fn close(&self) {
        let id = self.inner.id;
        if self.inner.begin_close() {
            tracing::debug!(session = %id, "Closing session...");
        }

        // Pending writes give up the writer once the state is `Closing`.
        let sink = self.inner.writer.lock().await.take();
        if let Some(mut sink) = sink {
            match tokio::time::timeout(TRANSPORT_CLOSE_TIMEOUT, sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(session = %id, "Error closing transport: {}", e);
                }
                Err(_) => {
                    tracing::debug!(session = %id, "Transport close timed out");
                }
            }
            tracing::debug!(session = %id, "Transport released");
        }

        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
    }
}

/// Writes a heartbeat frame every interval while the session is open.
///
/// The first heartbeat goes out one full interval after start.
async fn heartbeat_loop(inner: Arc<SessionInner>) -> Result<(), SessionError> {
    let id = inner.id;
    let period = inner.config.heartbeat_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state_rx = inner.state.subscribe();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = state_rx.changed() => {
                if changed.is_err() || state_rx.borrow().is_closing() {
                    break;
                }
                continue;
            }
        }

        let state = *state_rx.borrow();
        match state {
            SessionState::Open => {}
            state if state.is_closing() => break,
            _ => {
                tracing::trace!(session = %id, "Skipping heartbeat while {:?}", state);
                continue;
            }
        }

        match inner.write(Encoder::heartbeat().freeze()).await {
            Ok(()) => tracing::debug!(session = %id, "Heartbeat sent"),
            Err(SessionError::NotOpen) => break,
            Err(e) => {
                tracing::warn!(session = %id, "Heartbeat failed: {}", e);
                inner.begin_close();
                return Err(e);
            }
        }
    }

    tracing::debug!(session = %id, "Heartbeat task stopped");
    Ok(())
}
