pub mod cobalt;
pub mod facebook;
pub mod search;
pub mod tiered;
pub mod tiktok;
pub mod youtube;
pub mod ytdlp;

pub use cobalt::{CobaltAdapter, CobaltSettings};
pub use facebook::FacebookAdapter;
pub use search::{SearchClient, SearchResults, SearchVideo};
pub use tiered::TieredAdapter;
pub use tiktok::TikTokAdapter;
pub use youtube::{DirectAdapter, WatchPageExtractor};
pub use ytdlp::{ProcessAdapter, YtDlp};

use crate::config::{Config, YouTubeBackend};
use crate::core::{AdapterRegistry, BackendAdapter, Platform};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Builds the platform → adapter table once at startup. `client` carries the
/// resolution timeout and user agent.
pub fn registry_from_config(
    config: &Config,
    client: reqwest::Client,
) -> anyhow::Result<AdapterRegistry> {
    let cobalt: Arc<dyn BackendAdapter> = Arc::new(
        CobaltAdapter::new(
            client.clone(),
            config.cobalt.instances.clone(),
            config.resolve_timeout(),
        )
        .with_settings(CobaltSettings {
            video_codec: config.cobalt.video_codec.clone(),
            audio_format: config.cobalt.audio_format.clone(),
            audio_bitrate: config.cobalt.audio_bitrate.clone(),
        }),
    );

    let youtube: Arc<dyn BackendAdapter> = match config.youtube.backend {
        YouTubeBackend::Cobalt => cobalt.clone(),
        YouTubeBackend::Tiered => {
            let endpoint = config
                .tiered
                .endpoint
                .as_deref()
                .context("tiered.endpoint is not configured")?;
            Arc::new(TieredAdapter::new(client.clone(), endpoint))
        }
        YouTubeBackend::Direct => Arc::new(DirectAdapter::new(Arc::new(WatchPageExtractor::new(
            client.clone(),
        )))),
        YouTubeBackend::Ytdlp => Arc::new(ProcessAdapter::new(Arc::new(YtDlp::new(
            &config.ytdlp.path,
            config.resolve_timeout(),
        )))),
    };

    let mut registry = AdapterRegistry::new();
    registry.register(Platform::YouTube, youtube);

    if config.tiktok.enabled {
        registry.register(
            Platform::TikTok,
            Arc::new(TikTokAdapter::new(client.clone(), &config.tiktok.endpoint)),
        );
    }

    if let Some(endpoint) = &config.facebook.endpoint {
        registry.register(
            Platform::Facebook,
            Arc::new(FacebookAdapter::new(client.clone(), endpoint)),
        );
    }

    for platform in &config.cobalt.platforms {
        registry.register(*platform, cobalt.clone());
    }

    info!(
        "Serving {} platform(s) with YouTube backend '{}'",
        registry.len(),
        config.youtube.backend
    );
    Ok(registry)
}
