//! pacserve - Entry point.
//!
//! Serves a PAC script generated from a gfwlist rule list (plus an optional
//! custom list) over HTTP. The script is rebuilt lazily whenever one of the
//! list files changes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pacserve::config::Config;
use pacserve::server::run_server;
use pacserve::service::PacService;

/// Serve a gfwlist as a Proxy Auto-Configuration script.
#[derive(Debug, Parser)]
#[command(name = "pacserve", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Proxy directive returned for proxied hosts.
    #[arg(short = 's', long, value_name = "DIRECTIVE")]
    proxy: Option<String>,

    /// gfwlist file (base64 or plain text).
    #[arg(short, long, value_name = "FILE")]
    gfwlist: Option<PathBuf>,

    /// Custom rule list merged on top of the gfwlist.
    #[arg(long, value_name = "FILE")]
    custom: Option<PathBuf>,

    /// Print the merged host list and exit.
    #[arg(short, long)]
    print_hosts: bool,
}

impl Args {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(proxy) = &self.proxy {
            config.proxy.clone_from(proxy);
        }
        if let Some(gfwlist) = &self.gfwlist {
            config.gfwlist.clone_from(gfwlist);
        }
        if let Some(custom) = &self.custom {
            config.custom = Some(custom.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down..."),
        Err(err) => {
            error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    let service = PacService::from_config(&config).context("Failed to set up rule sources")?;

    if args.print_hosts {
        for host in service.hosts().context("Failed to load rule lists")? {
            println!("{host}");
        }
        return Ok(());
    }

    // Initialize metrics before any counter is recorded
    pacserve::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Starting pacserve...");
    info!("Proxy directive: {}", config.proxy);
    if config.uses_default_gfwlist() && !config.gfwlist.exists() {
        warn!(
            "{} not found, serving the bundled sample gfwlist; download the upstream list for full coverage",
            config.gfwlist.display()
        );
    }
    info!("Base rule list: {}", service.base_name());
    if let Some(custom) = service.custom_name() {
        info!("Custom rule list: {custom}");
    }

    let service = Arc::new(service);
    match service.load_pac() {
        Ok(pac) => info!(
            proxy_domains = pac.proxy_domains(),
            direct_domains = pac.direct_domains(),
            "PAC script ready"
        ),
        Err(err) => warn!("Initial PAC build failed, will retry on request: {err}"),
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    run_server(listener, service, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    run(Args::parse()).await
}
