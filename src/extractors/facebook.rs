use crate::core::normalize::AdapterOutput;
use crate::core::payload::FacebookPayload;
use crate::core::{BackendAdapter, MediaRequest, ResolveError};
use async_trait::async_trait;
use tracing::debug;

pub struct FacebookAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl FacebookAdapter {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

pub fn check_payload(payload: FacebookPayload) -> Result<FacebookPayload, ResolveError> {
    if !payload.success {
        return Err(ResolveError::upstream(
            payload
                .message
                .unwrap_or_else(|| "Facebook extraction failed".to_string()),
        ));
    }
    if !payload.has_video() {
        return Err(ResolveError::upstream(
            "Facebook extraction returned an unexpected response shape",
        ));
    }
    Ok(payload)
}

#[async_trait]
impl BackendAdapter for FacebookAdapter {
    fn name(&self) -> &'static str {
        "facebook"
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let url = format!("{}?url={}", self.endpoint, urlencoding::encode(request.url()));
        debug!("Calling Facebook extractor: {}", url);

        let payload: FacebookPayload = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::upstream_from("Facebook extraction failed", e))?
            .json()
            .await
            .map_err(|e| ResolveError::upstream_from("Facebook extraction returned unreadable data", e))?;

        Ok(AdapterOutput::Facebook(check_payload(payload)?))
    }
}
