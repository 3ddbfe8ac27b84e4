//! panel-guard server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ access log ──▶ general limiter ──┬──▶ session check ──▶ pages / API
//!                                                  └──▶ login limiter ──▶ POST /login
//!
//!     sampler task ──▶ ResourceHistory ◀── API handlers
//!     cleanup tasks ──▶ limiter tables
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use panel_guard::auth::password::hash_password;
use panel_guard::auth::InMemoryUserStore;
use panel_guard::config::{load_config, validate_config, ConfigError, PanelConfig, TlsConfig};
use panel_guard::lifecycle::{wait_for_signal, Shutdown};
use panel_guard::monitoring::{ResourceSampler, SysinfoSource};
use panel_guard::observability::{logging, metrics};
use panel_guard::HttpServer;

#[derive(Parser)]
#[command(name = "panel-guard", version)]
#[command(about = "Request-governance core of a self-hosted control panel", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Serve HTTPS with --cert and --key
    #[arg(long, requires_all = ["cert", "key"])]
    https: bool,

    #[arg(long)]
    cert: Option<String>,

    #[arg(long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server (default)
    Serve,
    /// Print an argon2 hash for the `users` config section
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::HashPassword { ref password }) => {
            println!("{}", hash_password(password)?);
            Ok(())
        }
        Some(Command::Serve) | None => serve(cli).await,
    }
}

async fn serve(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, missing) = match load_config(&cli.config) {
        Ok(config) => (config, false),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            (PanelConfig::default(), true)
        }
        Err(e) => return Err(e.into()),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("panel-guard v{} starting", env!("CARGO_PKG_VERSION"));
    if missing {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let config = apply_overrides(config, &cli)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        requests_per_window = config.rate_limit.requests_per_window,
        login_attempts = config.rate_limit.login_attempts,
        window_secs = config.rate_limit.window_secs,
        login_window_secs = config.rate_limit.login_window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(InMemoryUserStore::from_accounts(&config.users));
    if store.is_empty() {
        tracing::warn!("No users configured, nobody can sign in");
    }

    let source = SysinfoSource::new(config.monitoring.disk_mount.as_str());
    let sampler = Arc::new(ResourceSampler::new(Box::new(source), &config.monitoring));

    let grace = Duration::from_secs(config.timeouts.shutdown_secs);

    let server = HttpServer::new(config, store, sampler);
    let shutdown = Arc::new(Shutdown::new());
    let tasks = server.start_background(&shutdown);

    let trigger = Arc::clone(&shutdown);
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    let served = server.serve(shutdown.subscribe()).await;

    shutdown.trigger();
    Shutdown::drain(tasks, grace).await;

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn apply_overrides(mut config: PanelConfig, cli: &Cli) -> Result<PanelConfig, ConfigError> {
    if let Some(host) = &cli.host {
        config.listener.set_host(host);
    }
    if let Some(port) = cli.port {
        config.listener.set_port(port);
    }
    if cli.https {
        if let (Some(cert), Some(key)) = (&cli.cert, &cli.key) {
            config.listener.tls = Some(TlsConfig {
                cert_path: cert.clone(),
                key_path: key.clone(),
            });
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
