use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use feedroom::app::App;
use feedroom::config::Config;
use feedroom::feed::HttpFetcher;
use feedroom::server;

#[derive(Parser, Debug)]
#[command(name = "feedroom", about = "Web feed reader with a JSON-file subscription store")]
struct Args {
    /// HTTP server port
    #[arg(long)]
    port: Option<u16>,

    /// Comma-separated list of feed URLs to subscribe to on first run
    #[arg(long, value_name = "URLS")]
    feeds: Option<String>,

    /// Directory to store data files
    #[arg(long, value_name = "DIR")]
    data: Option<PathBuf>,

    /// Only save on shutdown instead of after every change
    #[arg(long)]
    no_auto_save: bool,

    /// Allow fetching feeds from localhost and private networks
    #[arg(long)]
    allow_private_hosts: bool,

    /// Path to a TOML config file
    #[arg(long, value_name = "FILE", default_value = "feedroom.toml")]
    config: PathBuf,
}

impl Args {
    /// Flags win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(feeds) = &self.feeds {
            config.default_feeds.clone_from(feeds);
        }
        if let Some(data) = &self.data {
            config.data_dir.clone_from(data);
        }
        if self.no_auto_save {
            config.auto_save = false;
        }
        if self.allow_private_hosts {
            config.allow_private_hosts = true;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Server shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.apply(&mut config);

    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "Failed to create data directory '{}'",
                config.data_dir.display()
            )
        })?;
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedroom/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = HttpFetcher::new(client)
        .with_timeout(config.fetch_timeout())
        .allow_private_hosts(config.allow_private_hosts);

    let app = Arc::new(App::open(&config, Arc::new(fetcher)).context("Failed to open feeds file")?);

    let seeded = app.seed_defaults(&config.default_feed_urls()).await;
    if seeded > 0 {
        tracing::info!(count = seeded, "Subscribed to default feeds");
    }

    tracing::info!(
        feeds = app.registry().len(),
        path = %app.store().path().display(),
        auto_save = config.auto_save,
        "Feeds will be saved to the data directory"
    );

    let served = server::run_server(&config.listen_addr(), Arc::clone(&app), shutdown_signal()).await;

    // Save any pending changes even if the server failed
    match app.shutdown().await {
        Ok(true) => tracing::info!("Saved pending feed changes"),
        Ok(false) => {}
        Err(e) => tracing::error!(error = %e, "Error saving feeds"),
    }

    served.with_context(|| format!("HTTP server on {} failed", config.listen_addr()))?;
    Ok(())
}
