use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::core::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// Resolution call timeout, seconds.
    pub timeout: u64,
    /// Whole-transfer timeout for relayed bytes, seconds.
    pub relay_timeout: u64,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub cobalt: CobaltConfig,
    pub youtube: YouTubeConfig,
    pub tiered: TieredConfig,
    pub ytdlp: YtDlpConfig,
    pub tiktok: TikTokConfig,
    pub facebook: FacebookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: format!("media-relay/{}", env!("CARGO_PKG_VERSION")),
            timeout: 30,
            relay_timeout: 300,
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            cobalt: CobaltConfig::default(),
            youtube: YouTubeConfig::default(),
            tiered: TieredConfig::default(),
            ytdlp: YtDlpConfig::default(),
            tiktok: TikTokConfig::default(),
            facebook: FacebookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://apiv3-2l3o.onrender.com/yts".to_string(),
            max_results: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CobaltConfig {
    /// Tried in order; the first success wins.
    pub instances: Vec<String>,
    /// Extra platforms routed to the cobalt resolver.
    pub platforms: Vec<Platform>,
    pub video_codec: String,
    pub audio_format: String,
    pub audio_bitrate: String,
}

impl Default for CobaltConfig {
    fn default() -> Self {
        Self {
            instances: vec!["https://api.cobalt.tools/".to_string()],
            platforms: Vec::new(),
            video_codec: "h264".to_string(),
            audio_format: "mp3".to_string(),
            audio_bitrate: "128".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YouTubeBackend {
    #[default]
    Cobalt,
    Tiered,
    Direct,
    Ytdlp,
}

impl fmt::Display for YouTubeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YouTubeBackend::Cobalt => "cobalt",
            YouTubeBackend::Tiered => "tiered",
            YouTubeBackend::Direct => "direct",
            YouTubeBackend::Ytdlp => "ytdlp",
        })
    }
}

impl FromStr for YouTubeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cobalt" => Ok(YouTubeBackend::Cobalt),
            "tiered" => Ok(YouTubeBackend::Tiered),
            "direct" => Ok(YouTubeBackend::Direct),
            "ytdlp" | "yt-dlp" => Ok(YouTubeBackend::Ytdlp),
            other => Err(format!(
                "unknown YouTube backend '{other}' (expected cobalt, tiered, direct or ytdlp)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub backend: YouTubeBackend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredConfig {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    pub path: String,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            path: "yt-dlp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TikTokConfig {
    pub endpoint: String,
    pub enabled: bool,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.tikwm.com/api/".to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacebookConfig {
    pub endpoint: Option<String>,
}

impl Config {
    /// Reads a TOML file when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout == 0 || self.relay_timeout == 0 {
            bail!("timeout and relay_timeout must be greater than zero");
        }

        let uses_cobalt =
            self.youtube.backend == YouTubeBackend::Cobalt || !self.cobalt.platforms.is_empty();
        if uses_cobalt && self.cobalt.instances.is_empty() {
            bail!("cobalt.instances must list at least one instance");
        }
        for instance in &self.cobalt.instances {
            check_url("cobalt.instances", instance)?;
        }
        if self.cobalt.platforms.contains(&Platform::Unknown) {
            bail!("cobalt.platforms cannot contain 'unknown'");
        }

        if self.youtube.backend == YouTubeBackend::Tiered {
            match self.tiered.endpoint.as_deref() {
                Some(endpoint) => check_url("tiered.endpoint", endpoint)?,
                None => bail!("tiered.endpoint is required when youtube.backend = \"tiered\""),
            }
        }

        check_url("search.endpoint", &self.search.endpoint)?;
        if self.search.max_results == 0 {
            bail!("search.max_results must be greater than zero");
        }
        if self.tiktok.enabled {
            check_url("tiktok.endpoint", &self.tiktok.endpoint)?;
        }
        if let Some(endpoint) = &self.facebook.endpoint {
            check_url("facebook.endpoint", endpoint)?;
        }
        if let Some(public_url) = &self.server.public_url {
            check_url("server.public_url", public_url)?;
        }
        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout)
    }
}

fn check_url(field: &str, value: &str) -> anyhow::Result<()> {
    let url = Url::parse(value).with_context(|| format!("{field}: invalid URL '{value}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{field}: expected an http(s) URL, got '{value}'");
    }
    Ok(())
}
