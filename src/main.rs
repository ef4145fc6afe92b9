use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use landmark_relay::config::ConfigStore;
use landmark_relay::landmark::factory_from_config;
use landmark_relay::state::AppState;
use landmark_relay::web;
use landmark_relay::webrtc::WebRtcNegotiator;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// landmark-relay command line arguments
#[derive(Parser, Debug)]
#[command(name = "landmark-relay")]
#[command(version, about = "WebRTC relay that draws body, face and hand landmarks onto live video", long_about = None)]
struct CliArgs {
    /// Listen address (overrides config file)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// HTTP port (overrides config file)
    #[arg(short = 'p', long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Configuration file (created with defaults if missing)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose);

    tracing::info!("Starting landmark-relay v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.unwrap_or_else(get_config_path);
    tracing::info!("Configuration file: {}", config_path.display());

    let config_store = ConfigStore::open(&config_path).await?;
    let mut config = (*config_store.get()).clone();

    // CLI overrides apply to this run only and are not persisted
    if let Some(addr) = args.address {
        config.web.bind_address = addr;
    }
    if let Some(port) = args.http_port {
        config.web.http_port = port;
    }

    let ip: IpAddr = config
        .web
        .bind_address
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid bind address: {}", config.web.bind_address))?;
    let addr = SocketAddr::new(ip, config.web.http_port);

    let detectors = factory_from_config(&config.detector)?;
    tracing::info!("Landmark detector backend: {}", detectors.backend());

    let negotiator = Arc::new(WebRtcNegotiator::new(config.webrtc.clone()));
    tracing::info!("WebRTC video codec: {}", config.webrtc.video_codec);

    // Create shutdown channel
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let state = AppState::new(config_store, detectors, negotiator, shutdown_tx.clone());

    let app = web::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting HTTP server on http://{}", listener.local_addr()?);

    // Setup graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    tokio::select! {
        _ = shutdown_signal => {
            cleanup(&state);
        }
        result = async move { axum::serve(listener, app).await } => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
            }
            cleanup(&state);
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "landmark_relay=error,tower_http=error",
        LogLevel::Warn => "landmark_relay=warn,tower_http=warn",
        LogLevel::Info => "landmark_relay=info,tower_http=info",
        LogLevel::Verbose => "landmark_relay=debug,tower_http=info",
        LogLevel::Debug => "landmark_relay=debug,tower_http=debug,webrtc=info",
        LogLevel::Trace => "landmark_relay=trace,tower_http=debug,webrtc=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

/// Default configuration file location
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LANDMARK_RELAY_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("landmark-relay.json")
}

/// Tear down every live session
fn cleanup(state: &Arc<AppState>) {
    let closed = state.registry.close_all("shutdown");
    tracing::info!("Closed {} session(s)", closed);
}
