use crate::core::normalize::AdapterOutput;
use crate::core::relay::{RelaySource, RelayTarget};
use crate::core::{MediaRequest, Platform, ResolveError, ResolvedMedia};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Uniform call contract around one external extraction mechanism.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError>;

    /// Where relay bytes come from once `media` has been resolved. Remote
    /// adapters hand back the first link whose bytes match the requested kind.
    fn relay_target(
        &self,
        request: &MediaRequest,
        media: &ResolvedMedia,
    ) -> Result<RelayTarget, ResolveError> {
        let url = media.relay_url(request.kind()).ok_or_else(|| {
            ResolveError::no_usable_format(format!(
                "No {} link resolved for this URL",
                request.kind().type_token()
            ))
        })?;
        Ok(RelayTarget::new(
            RelaySource::Remote(url.to_string()),
            request.kind(),
            &media.title,
        ))
    }
}

/// Maps each platform to the adapter that serves it. Populated once at
/// startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn BackendAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, platform: Platform, adapter: Arc<dyn BackendAdapter>) {
        tracing::debug!("Registering adapter {} for {}", adapter.name(), platform);
        self.adapters.insert(platform, adapter);
    }

    pub fn with(mut self, platform: Platform, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register(platform, adapter);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn BackendAdapter>> {
        self.adapters.get(&platform)
    }

    /// Registered platforms in a stable order.
    pub fn platforms(&self) -> Vec<Platform> {
        [
            Platform::YouTube,
            Platform::TikTok,
            Platform::Instagram,
            Platform::Twitter,
            Platform::Facebook,
            Platform::Reddit,
        ]
        .into_iter()
        .filter(|p| self.adapters.contains_key(p))
        .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
