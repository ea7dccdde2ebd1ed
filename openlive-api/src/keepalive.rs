//! Background app-session heartbeat.

use crate::client::ApiClient;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Default interval between app heartbeats (20 s).
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Sends `heartbeat(game_id)` every interval until shut down.
///
/// Failures are logged and counted; the loop keeps going so a transient
/// control-plane error does not end the app session.
pub struct KeepAlive {
    client: ApiClient,
    game_id: String,
    interval: Duration,
    shutdown: AtomicBool,
    notify: Notify,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl KeepAlive {
    pub fn new(client: ApiClient, game_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            game_id: game_id.into(),
            interval,
            shutdown: AtomicBool::new(false),
            notify: Notify::new(),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Runs the heartbeat loop (call from a background task).
    pub async fn run(&self) {
        tracing::info!(
            game_id = %self.game_id,
            "Keep-alive started (interval={:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match self.client.heartbeat(&self.game_id).await {
                Ok(()) => {
                    self.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(game_id = %self.game_id, "App heartbeat failed: {}", e);
                }
            }
        }

        tracing::info!(game_id = %self.game_id, "Keep-alive stopped");
    }

    /// Signals the loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Returns (sent, failed) heartbeat counts.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.sent.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiConfig;
    use crate::signing::Credentials;
    use std::sync::Arc;

    fn unreachable_client() -> ApiClient {
        // Port 9 on localhost refuses connections.
        ApiClient::new(
            Credentials::new("k", "s"),
            ApiConfig::default()
                .with_base_url("http://127.0.0.1:9/")
                .with_timeout(Duration::from_secs(1)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let keepalive = Arc::new(KeepAlive::new(
            unreachable_client(),
            "g-1",
            Duration::from_secs(3600),
        ));

        let runner = keepalive.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        keepalive.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(keepalive.stats(), (0, 0));
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let keepalive = Arc::new(KeepAlive::new(
            unreachable_client(),
            "g-1",
            Duration::from_millis(20),
        ));

        let runner = keepalive.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while keepalive.stats().1 < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        keepalive.shutdown();
        handle.await.unwrap();

        let (sent, failed) = keepalive.stats();
        assert_eq!(sent, 0);
        assert!(failed >= 2);
    }
}
