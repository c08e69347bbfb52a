use crate::core::normalize::normalize;
use crate::core::platform::{classify, is_valid_video_url};
use crate::core::relay::{Relay, RelayStream};
use crate::core::{
    AdapterRegistry, BackendAdapter, MediaQuery, MediaRequest, Platform, Quality, ResolveError,
    ResolvedMedia,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolution façade: validate, classify, dispatch, normalize. Either returns
/// the descriptor or opens a relay for the resolved bytes.
pub struct Resolver {
    registry: AdapterRegistry,
    relay: Relay,
    public_base: Option<String>,
}

impl Resolver {
    pub fn new(registry: AdapterRegistry, relay: Relay) -> Self {
        Self {
            registry,
            relay,
            public_base: None,
        }
    }

    /// Absolute base for generated `streamUrl` links. Without one the link is
    /// a same-origin path.
    pub fn with_public_base(mut self, base: Option<String>) -> Self {
        self.public_base = base
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        self
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.registry.platforms()
    }

    pub async fn resolve_media(&self, query: &MediaQuery) -> Result<ResolvedMedia, ResolveError> {
        let request = query.clone().into_request()?;
        self.resolve(&request).await
    }

    pub async fn resolve(&self, request: &MediaRequest) -> Result<ResolvedMedia, ResolveError> {
        let (_, media) = self.resolve_request(request).await?;
        Ok(media)
    }

    pub async fn resolve_and_relay(&self, query: &MediaQuery) -> Result<RelayStream, ResolveError> {
        let request = query.clone().into_request()?;
        let (adapter, media) = self.resolve_request(&request).await?;
        let target = adapter.relay_target(&request, &media)?;
        self.relay.open(target).await
    }

    /// Relay link that replays `request` against this service.
    pub fn stream_url(&self, request: &MediaRequest) -> String {
        let mut path = format!(
            "/stream?url={}&type={}",
            urlencoding::encode(request.url()),
            request.kind().type_token()
        );
        if request.quality() != Quality::Highest {
            path.push_str(&format!("&quality={}", request.quality()));
        }
        match &self.public_base {
            Some(base) => format!("{base}{path}"),
            None => path,
        }
    }

    fn adapter_for(&self, request: &MediaRequest) -> Result<(Platform, Arc<dyn BackendAdapter>), ResolveError> {
        let platform = classify(request.url());
        if platform == Platform::Unknown {
            return Err(ResolveError::UnsupportedPlatform {
                platform: None,
                supported: self.registry.platforms(),
            });
        }

        if platform == Platform::YouTube && !is_valid_video_url(request.url()) {
            return Err(ResolveError::invalid("Invalid YouTube video URL"));
        }

        let adapter = self.registry.get(platform).cloned().ok_or_else(|| {
            ResolveError::UnsupportedPlatform {
                platform: Some(platform),
                supported: self.registry.platforms(),
            }
        })?;

        Ok((platform, adapter))
    }

    async fn resolve_request(
        &self,
        request: &MediaRequest,
    ) -> Result<(Arc<dyn BackendAdapter>, ResolvedMedia), ResolveError> {
        let (platform, adapter) = self.adapter_for(request)?;
        info!(
            "Resolving {} {} ({}) via {}",
            platform,
            request.kind().type_token(),
            request.quality(),
            adapter.name()
        );

        let output = adapter.resolve(request).await.map_err(|e| {
            warn!("{} failed for {}: {}", adapter.name(), request.url(), e);
            e
        })?;

        let mut media = normalize(platform, output);
        if !media.has_media_for(request.kind()) {
            return Err(ResolveError::no_usable_format(format!(
                "No {} media found for this URL",
                request.kind().type_token()
            )));
        }

        media.stream_url = Some(self.stream_url(request));
        debug!("Resolved '{}' with {} link(s)", media.title, media.media.len());
        Ok((adapter, media))
    }
}
