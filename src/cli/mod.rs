use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, YouTubeBackend};
use crate::core::{Relay, Resolver};
use crate::extractors::{registry_from_config, SearchClient};
use crate::server::{self, AppState};
use crate::utils::http_client;

#[derive(Parser, Debug)]
#[command(name = "media-relay")]
#[command(about = "Resolves media URLs through upstream backends and relays the bytes")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Public base URL used when building streamUrl links
    #[arg(long, value_name = "URL")]
    pub public_url: Option<String>,

    /// YouTube backend: cobalt, tiered, direct or ytdlp
    #[arg(long, value_name = "BACKEND")]
    pub youtube_backend: Option<YouTubeBackend>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// File config with command-line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(public_url) = &self.public_url {
            config.server.public_url = Some(public_url.clone());
        }
        if let Some(backend) = self.youtube_backend {
            config.youtube.backend = backend;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub async fn run(&self) -> Result<()> {
        let config = self.config()?;

        let client = http_client(&config.user_agent, config.resolve_timeout())
            .context("building HTTP client")?;
        let relay_client = http_client(&config.user_agent, config.relay_timeout())
            .context("building relay HTTP client")?;

        let registry = registry_from_config(&config, client.clone())?;
        let resolver = Resolver::new(registry, Relay::new(relay_client))
            .with_public_base(config.server.public_url.clone());
        let search = SearchClient::new(client, &config.search.endpoint)
            .with_max_results(config.search.max_results);

        let state = AppState {
            resolver: Arc::new(resolver),
            search: Arc::new(search),
        };

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .with_context(|| {
                format!("invalid listen address {}:{}", config.server.host, config.server.port)
            })?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding to {}", addr))?;

        info!("media-relay v{} starting", env!("CARGO_PKG_VERSION"));
        server::serve(listener, server::router(state)).await
    }
}
