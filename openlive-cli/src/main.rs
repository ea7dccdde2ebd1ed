//! openlive-cli - Command-line interface for the open live event feed
//!
//! Control-plane calls, a live feed listener and an offline frame decoder.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use openlive_api::{ApiClient, ApiConfig, Credentials, DEFAULT_BASE_URL};
use openlive_client::{Session, SessionConfig};
use openlive_protocol::ApplicationMessage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openlive-cli")]
#[command(about = "Command-line interface for the open live event feed")]
#[command(version)]
struct Cli {
    /// Access key id
    #[arg(long, env = "OPENLIVE_ACCESS_KEY")]
    access_key: Option<String>,

    /// Access secret
    #[arg(long, env = "OPENLIVE_ACCESS_SECRET", hide_env_values = true)]
    access_secret: Option<String>,

    /// Control-plane base URL
    #[arg(long, env = "OPENLIVE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an app session
    Start {
        /// App id
        #[arg(short, long)]
        app_id: i64,

        /// Streamer identity code
        #[arg(short, long)]
        code: String,
    },

    /// End an app session
    End {
        /// App id
        #[arg(short, long)]
        app_id: i64,

        /// Game id returned by start
        #[arg(short, long)]
        game_id: String,
    },

    /// Send one app heartbeat
    Heartbeat {
        /// Game id
        game_id: String,
    },

    /// Send one heartbeat for several app sessions
    BatchHeartbeat {
        /// Comma-separated game ids
        #[arg(value_delimiter = ',')]
        game_ids: Vec<String>,
    },

    /// Connect to a feed endpoint and print messages as JSON lines
    Listen {
        /// Feed endpoint (wss://...)
        #[arg(short, long)]
        url: String,

        /// Auth body (or @file to read from file)
        #[arg(short = 'b', long)]
        auth_body: String,

        /// Heartbeat interval in seconds
        #[arg(long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
        heartbeat_secs: u64,
    },

    /// Decode one hex-encoded frame offline
    Decode {
        /// Frame bytes as hex
        hex: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // Handled locally (no credentials needed)
        Commands::Decode { hex } => match commands::decode(&hex) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
        Commands::Listen {
            url,
            auth_body,
            heartbeat_secs,
        } => {
            let auth_body = commands::read_arg(&auth_body)?;
            let config = SessionConfig::default()
                .with_heartbeat_interval(std::time::Duration::from_secs(heartbeat_secs));

            let session = Session::connect(&url, config).await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;

            eprintln!("{} {}", "Listening on".green(), url.cyan());
            eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

            let stopper = session.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\n{}", "Stopping...".dimmed());
                    stopper.close().await;
                }
            });

            let result = session
                .run(auth_body.as_bytes(), |message: ApplicationMessage| {
                    match serde_json::to_string(&message) {
                        Ok(line) => println!("{}", line),
                        Err(e) => eprintln!("{}: {}", "Warning".yellow(), e),
                    }
                })
                .await;

            match result {
                Ok(reason) => eprintln!("{}: {:?}", "Session ended".dimmed(), reason),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
        cmd => {
            let (Some(access_key), Some(access_secret)) = (cli.access_key, cli.access_secret)
            else {
                eprintln!(
                    "{}: --access-key and --access-secret are required",
                    "Error".red()
                );
                std::process::exit(1);
            };

            let client = ApiClient::new(
                Credentials::new(access_key, access_secret),
                ApiConfig::default().with_base_url(cli.base_url),
            )?;

            match commands::execute(&client, cmd).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
