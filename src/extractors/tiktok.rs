use crate::core::normalize::AdapterOutput;
use crate::core::payload::TikTokPayload;
use crate::core::{BackendAdapter, MediaRequest, ResolveError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Envelope returned by the TikTok scraping service. `code == 0` is the
/// success flag.
#[derive(Debug, Clone, Deserialize)]
pub struct TikTokEnvelope {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Option<TikTokPayload>,
}

pub struct TikTokAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl TikTokAdapter {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

/// Applies the library's success flag and shape checks.
pub fn unwrap_envelope(envelope: TikTokEnvelope) -> Result<TikTokPayload, ResolveError> {
    if envelope.code != 0 {
        return Err(ResolveError::upstream(
            envelope
                .msg
                .unwrap_or_else(|| format!("TikTok extraction failed (code {})", envelope.code)),
        ));
    }

    match envelope.data {
        Some(data) if data.is_image_set() || data.has_video() => Ok(data),
        _ => Err(ResolveError::upstream(
            "TikTok extraction returned an unexpected response shape",
        )),
    }
}

#[async_trait]
impl BackendAdapter for TikTokAdapter {
    fn name(&self) -> &'static str {
        "tiktok"
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let url = format!(
            "{}?url={}&hd=1",
            self.endpoint,
            urlencoding::encode(request.url())
        );
        debug!("Calling TikTok extractor: {}", url);

        let envelope: TikTokEnvelope = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::upstream_from("TikTok extraction failed", e))?
            .json()
            .await
            .map_err(|e| ResolveError::upstream_from("TikTok extraction returned unreadable data", e))?;

        let payload = unwrap_envelope(envelope)?;
        Ok(AdapterOutput::TikTok(payload))
    }
}
