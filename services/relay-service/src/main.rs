//! Relay Service for Deaddrop
//!
//! Accepts client-encrypted envelopes over HTTP, holds them in ephemeral
//! mailboxes, and serves them back to their recipients. The server never
//! sees plaintext or private keys.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod api;
mod error;

use deaddrop_core::RelayConfig;
use deaddrop_relay::Relay;

/// Relay Service CLI arguments
#[derive(Parser, Debug)]
#[command(name = "relay-service")]
#[command(about = "Deaddrop encrypted mailbox relay")]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Envelope lifetime in seconds
    #[arg(long, default_value_t = deaddrop_core::DEFAULT_MESSAGE_LIFETIME_SECS)]
    message_lifetime_secs: u64,

    /// Reaper sweep interval in seconds
    #[arg(long, default_value_t = deaddrop_core::DEFAULT_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,

    /// Minimum interval between sends per client, in seconds
    #[arg(long, default_value_t = deaddrop_core::DEFAULT_MIN_SEND_INTERVAL_SECS)]
    min_send_interval_secs: u64,

    /// Idle window before a rate entry is reclaimed, in seconds
    #[arg(long, default_value_t = deaddrop_core::DEFAULT_RATE_IDLE_SECS)]
    rate_idle_secs: u64,

    /// Maximum serialized payload size in bytes
    #[arg(long, default_value_t = deaddrop_core::DEFAULT_MAX_PAYLOAD_BYTES)]
    max_payload_bytes: usize,
}

/// Application state
pub struct AppState {
    pub relay: Arc<Relay>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = RelayConfig {
        message_lifetime_secs: args.message_lifetime_secs,
        sweep_interval_secs: args.sweep_interval_secs,
        min_send_interval_secs: args.min_send_interval_secs,
        rate_idle_secs: args.rate_idle_secs,
        max_payload_bytes: args.max_payload_bytes,
    };
    if let Err(e) = config.validate() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid configuration: {e}"),
        ));
    }

    info!(
        "Starting Relay Service on {}:{} (lifetime {}s, sweep every {}s)",
        args.host, args.port, config.message_lifetime_secs, config.sweep_interval_secs
    );

    let relay = Arc::new(Relay::new(config));
    let _reaper = relay.spawn_reaper();

    let app_state = web::Data::new(AppState {
        relay: Arc::clone(&relay),
    });

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
