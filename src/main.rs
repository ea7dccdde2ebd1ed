//! openlive - Live-room event feed runner
//!
//! Starts an app session on the control plane, connects to the event feed
//! and logs every event until interrupted, then ends the app session.

mod config;
mod router;

use config::Config;
use openlive_api::{ApiClient, KeepAlive};
use openlive_client::Session;
use openlive_protocol::message::cmd;
use openlive_protocol::ApplicationMessage;
use router::EventRouter;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if OPENLIVE_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    tracing::info!("Starting openlive");
    tracing::info!("  App id: {}", config.app.app_id);
    tracing::info!("  Control plane: {}", config.api.base_url);

    let client = ApiClient::new(
        config.credentials.to_credentials(),
        config.api.api_config(),
    )?;

    let start = client.app_start(config.app.app_id, &config.app.code).await?;
    let game_id = start.game_info.game_id.clone();
    if let Some(anchor) = &start.anchor_info {
        tracing::info!("  Room: {} ({})", anchor.room_id, anchor.uname);
    }

    // Keep the app session alive for as long as the feed runs
    let keepalive = Arc::new(KeepAlive::new(
        client.clone(),
        &game_id,
        config.api.keepalive_interval(),
    ));
    let keepalive_handle = {
        let ka = keepalive.clone();
        tokio::spawn(async move {
            ka.run().await;
        })
    };

    let result = run_feed(&config, &start.websocket_info).await;

    keepalive.shutdown();
    if let Err(e) = keepalive_handle.await {
        tracing::warn!("Keep-alive task failed: {}", e);
    }

    if let Err(e) = client.app_end(config.app.app_id, &game_id).await {
        tracing::error!("Failed to end app session {}: {}", game_id, e);
    }

    result?;
    tracing::info!("Stopped");
    Ok(())
}

/// Connects to the preferred feed endpoint and runs one session.
async fn run_feed(
    config: &Config,
    websocket: &openlive_api::WebsocketInfo,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = websocket
        .preferred_link()
        .ok_or("app start returned no feed endpoints")?;

    tracing::info!("  Feed endpoint: {}", url);
    let session = Session::connect(url, config.session.session_config()).await?;
    tracing::info!("Session {} connected", session.id());

    // Spawn shutdown signal handler
    let shutdown_session = session.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, closing session...");
        shutdown_session.close().await;
    });

    // The platform ends the feed on its side; close ours too.
    let end_session = session.clone();
    let router = router::with_logging_handlers(EventRouter::new(|m: ApplicationMessage| {
        tracing::debug!(cmd = %m.cmd, "Unhandled event: {}", m.data)
    }))
    .route(cmd::INTERACTION_END, move |_m: ApplicationMessage| {
        tracing::info!("Interaction ended by platform");
        let session = end_session.clone();
        tokio::spawn(async move { session.close().await });
    });

    let reason = session
        .run(websocket.auth_body.as_bytes(), router)
        .await?;
    tracing::info!("Session ended: {:?}", reason);
    Ok(())
}
