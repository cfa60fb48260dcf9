//! ---
//! brew_section: "01-core-functionality"
//! brew_subsection: "binary"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Binary entrypoint for the BrewOps shell daemon."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use brewops_access::{MenuDescriptor, RouteTable, SessionStore};
use brewops_api::{spawn_api_server, ApiServer, ApiState};
use brewops_common::{init_tracing, log_startup, AppConfig};
use clap::Parser;
use prometheus::Registry;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("BrewOps ", env!("CARGO_PKG_VERSION")),
    about = "BrewOps dashboard shell daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(AppConfig::DEFAULT_PATH));

    let loaded_config = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded_config.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    init_tracing("brewopsd", &config.logging)?;
    log_startup("brewopsd", &loaded_config.source, &config);

    run_daemon(config).await
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let menu = MenuDescriptor::from_access_config(&config.access)
        .context("failed to load menu descriptor")?;
    let routes = RouteTable::from_config(&menu, &config);
    let session = match &config.access.session_file {
        Some(path) => SessionStore::restore(path)
            .with_context(|| format!("failed to restore session from {}", path.display()))?,
        None => SessionStore::new(),
    };
    info!(
        routes = routes.len(),
        authenticated = session.is_authenticated(),
        "access layer ready"
    );

    let mut api_server: Option<ApiServer> = None;
    if config.api.enabled {
        let registry = Arc::new(Registry::new());
        let state = ApiState::new(&config.access, session.clone(), menu, routes, registry)?;
        match spawn_api_server(Arc::new(state), config.api.listen) {
            Ok(server) => {
                info!(address = %server.addr(), "api server listening");
                api_server = Some(server);
            }
            Err(err) => {
                warn!(error = %err, "failed to start api server");
            }
        }
    } else {
        info!("api server disabled by configuration");
    }

    info!("daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    if let Some(server) = api_server {
        server.shutdown().await?;
    }
    if let Some(path) = &config.access.session_file {
        session
            .save(path)
            .with_context(|| format!("failed to persist session to {}", path.display()))?;
    }

    Ok(())
}
