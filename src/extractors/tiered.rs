use crate::core::normalize::AdapterOutput;
use crate::core::payload::{TieredOutcome, TieredPayload};
use crate::core::{BackendAdapter, MediaKind, MediaRequest, Quality, ResolveError};
use async_trait::async_trait;
use tracing::debug;

/// Fixed resolution buckets offered by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityBucket {
    P720,
    P480,
    P360,
}

impl QualityBucket {
    /// Exact bucket matches are honoured; anything else gets the top bucket.
    pub fn for_quality(quality: Quality) -> Self {
        match quality {
            Quality::Lowest | Quality::Height(360) => QualityBucket::P360,
            Quality::Height(480) => QualityBucket::P480,
            _ => QualityBucket::P720,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityBucket::P720 => "720p",
            QualityBucket::P480 => "480p",
            QualityBucket::P360 => "360p",
        }
    }
}

/// Remote operation path for a kind and bucket.
pub fn operation(kind: MediaKind, bucket: QualityBucket) -> &'static str {
    match (kind, bucket) {
        (MediaKind::Audio, _) => "ytmp3",
        (MediaKind::Video, QualityBucket::P720) => "ytmp4/720",
        (MediaKind::Video, QualityBucket::P480) => "ytmp4/480",
        (MediaKind::Video, QualityBucket::P360) => "ytmp4/360",
    }
}

pub struct TieredAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl TieredAdapter {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn operation_url(&self, request: &MediaRequest) -> String {
        let bucket = QualityBucket::for_quality(request.quality());
        format!(
            "{}/{}?url={}",
            self.endpoint,
            operation(request.kind(), bucket),
            urlencoding::encode(request.url())
        )
    }
}

#[async_trait]
impl BackendAdapter for TieredAdapter {
    fn name(&self) -> &'static str {
        "tiered"
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let url = self.operation_url(request);
        debug!("Calling tiered service: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::upstream_from("Tiered service request failed", e))?;

        let status = response.status();
        let payload: TieredPayload = response
            .json()
            .await
            .map_err(|e| ResolveError::upstream_from(&format!("Tiered service returned HTTP {status}"), e))?;

        if !status.is_success() || payload.reported_failure() {
            return Err(ResolveError::upstream(
                payload
                    .message
                    .unwrap_or_else(|| format!("Tiered service returned HTTP {status}")),
            ));
        }

        if payload.link().is_none() {
            return Err(ResolveError::upstream("Tiered service returned no download link"));
        }

        let quality = match request.kind() {
            MediaKind::Audio => "audio".to_string(),
            MediaKind::Video => QualityBucket::for_quality(request.quality()).label().to_string(),
        };

        Ok(AdapterOutput::Tiered(TieredOutcome {
            kind: request.kind(),
            quality,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_default_to_highest() {
        assert_eq!(QualityBucket::for_quality(Quality::Highest), QualityBucket::P720);
        assert_eq!(QualityBucket::for_quality(Quality::Height(1080)), QualityBucket::P720);
        assert_eq!(QualityBucket::for_quality(Quality::Height(500)), QualityBucket::P720);
        assert_eq!(QualityBucket::for_quality(Quality::Height(480)), QualityBucket::P480);
        assert_eq!(QualityBucket::for_quality(Quality::Lowest), QualityBucket::P360);
    }

    #[test]
    fn operation_url_encodes_target() {
        let adapter = TieredAdapter::new(reqwest::Client::new(), "https://svc.example/api/");
        let request = MediaRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            MediaKind::Video,
            Quality::Height(480),
        )
        .unwrap();
        assert_eq!(
            adapter.operation_url(&request),
            "https://svc.example/api/ytmp4/480?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ"
        );
    }

    #[test]
    fn link_field_aliases() {
        let payload: TieredPayload =
            serde_json::from_str(r#"{"title":"x","dlink":"","link":"https://cdn/x.mp4"}"#).unwrap();
        assert_eq!(payload.link(), Some("https://cdn/x.mp4"));

        let failed: TieredPayload = serde_json::from_str(r#"{"status":false,"message":"nope"}"#).unwrap();
        assert!(failed.reported_failure());
        assert_eq!(failed.link(), None);
    }
}
