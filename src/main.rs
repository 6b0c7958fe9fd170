//! resilience-gateway
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!     Browser         │               RESILIENCE GATEWAY              │
//!     ────────────────┼─▶ http::server ─▶ proxy::InterceptionProxy    │
//!                     │                     │            │            │
//!                     │                     ▼            ▼            │
//!                     │              cache::Store   http::network ────┼──▶ Upstream
//!     ◀───────────────┼── cache / network / offline fallback          │
//!                     │                                               │
//!                     │  admin (/__resilience/*)   config watcher     │
//!                     └──────────────────────────────────────────────┘
//!
//!     `stream` subcommand: stream::ReconnectingStream over WebSocket
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

use resilience_gateway::cache::MemoryCacheStore;
use resilience_gateway::config::{load_config, ConfigWatcher, ResilienceConfig};
use resilience_gateway::http::GatewayServer;
use resilience_gateway::lifecycle::{wait_for_signal, Shutdown};
use resilience_gateway::observability::{logging::init_logging, metrics::init_metrics};
use resilience_gateway::stream::{ReconnectingStream, StreamEvent, WebSocketTransport};

#[derive(Parser)]
#[command(name = "resilience-gateway", version, about = "Offline-first gateway and reconnecting stream client")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the caching gateway in front of the upstream origin
    Serve {
        /// Reload the configuration file when it changes
        #[arg(long)]
        watch: bool,
    },
    /// Connect to a WebSocket endpoint, print messages, send stdin lines
    Stream {
        /// Endpoint URL; `[stream].url` when omitted
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };

    init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resilience-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Command::Serve { watch } => serve(config, cli.config.as_deref(), watch).await,
        Command::Stream { url } => stream(config, url).await,
    }
}

async fn serve(
    config: ResilienceConfig,
    config_path: Option<&Path>,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = match config.cache.persistence_path.as_deref() {
        Some(path) => MemoryCacheStore::load_from_file(Path::new(path)).unwrap_or_else(|e| {
            tracing::warn!(path, error = %e, "Ignoring unreadable cache snapshot");
            MemoryCacheStore::new()
        }),
        None => MemoryCacheStore::new(),
    };

    tracing::info!(
        bind_address = %config.gateway.bind_address,
        upstream = %config.gateway.upstream_origin,
        app_origin = %config.interception.app_origin,
        generation = %config.cache.generation,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.gateway.bind_address).await?;
    let server = GatewayServer::new(config, Arc::new(store))?;
    server.activate_configured_generation().await;

    // The watcher must stay alive for the lifetime of the server.
    let (_watcher, updates) = match (watch, config_path) {
        (true, Some(path)) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(updates))
        }
        (true, None) => {
            tracing::warn!("--watch needs --config, hot reload disabled");
            (None, None)
        }
        (false, _) => (None, None),
    };

    let shutdown = Arc::new(Shutdown::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, &shutdown, updates).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn stream(config: ResilienceConfig, url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let url = url.unwrap_or_else(|| config.stream.url.clone());
    tracing::info!(%url, "Starting stream client");

    let client = ReconnectingStream::from_config(WebSocketTransport::new(url), &config.stream);
    let mut events = client.subscribe();
    client.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = Shutdown::new();
    let stop = shutdown.token().stopped();
    tokio::pin!(stop);
    let signal = wait_for_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal, if !shutdown.is_triggered() => shutdown.trigger(),
            _ = &mut stop => break,
            event = events.recv() => match event {
                Some(StreamEvent::Message(payload)) => println!("{}", String::from_utf8_lossy(&payload)),
                Some(StreamEvent::Connecting { attempt }) => eprintln!("* connecting (attempt {attempt})"),
                Some(StreamEvent::Open) => eprintln!("* open"),
                Some(StreamEvent::Closed { reason }) => eprintln!("* closed: {reason}"),
                Some(StreamEvent::Disconnected) | None => {
                    eprintln!("* disconnected");
                    break;
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => client.send(line),
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    client.disconnect().await;
    Ok(())
}
