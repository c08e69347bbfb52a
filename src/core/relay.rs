//! Byte relay from a resolved upstream to the caller.
//!
//! Bytes are forwarded chunk by chunk and never buffered whole. Once the
//! first chunk has gone out the response headers are committed, so a later
//! upstream failure surfaces as an `io::Error` item in the stream and the
//! transfer is cut short. That truncation is the only signal the caller
//! gets.

use crate::core::{MediaKind, ResolveError, VideoMetadata};
use crate::utils::attachment_filename;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A local extraction process: one call for the metadata document, one for a
/// long-running process whose stdout is the media itself.
#[async_trait]
pub trait ProcessExtractor: Send + Sync {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError>;

    /// Dropping the returned stream must release the process.
    async fn stream_media(&self, url: &str, selector: &str) -> Result<ByteStream, ResolveError>;
}

pub enum RelaySource {
    Remote(String),
    Process {
        extractor: Arc<dyn ProcessExtractor>,
        url: String,
        selector: String,
    },
}

pub struct RelayTarget {
    pub source: RelaySource,
    pub content_type: &'static str,
    pub filename: String,
}

impl RelayTarget {
    pub fn new(source: RelaySource, kind: MediaKind, title: &str) -> Self {
        Self {
            source,
            content_type: kind.content_type(),
            filename: attachment_filename(title, kind),
        }
    }
}

pub struct RelayStream {
    pub content_type: &'static str,
    pub filename: String,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream")
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl RelayStream {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub struct Relay {
    client: reqwest::Client,
    pub max_retries: u32,
    /// Base retry delay, doubled on every attempt.
    pub backoff: Duration,
}

impl Relay {
    /// `client` should carry the relay timeout, which bounds the whole
    /// transfer rather than just the connect.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_retries: 3,
            backoff: Duration::from_secs(1),
        }
    }

    pub async fn open(&self, target: RelayTarget) -> Result<RelayStream, ResolveError> {
        let RelayTarget {
            source,
            content_type,
            filename,
        } = target;

        match source {
            RelaySource::Remote(url) => {
                let response = self.fetch(&url).await?;
                let content_length = response.content_length();
                info!("Relaying {} ({} bytes)", filename, content_length.map_or("unknown".to_string(), |s| s.to_string()));

                let body = response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(io::Error::other));

                Ok(RelayStream {
                    content_type,
                    filename,
                    content_length,
                    body: Box::pin(body),
                })
            }
            RelaySource::Process {
                extractor,
                url,
                selector,
            } => {
                info!("Relaying {} from extractor process ({})", filename, selector);
                let mut body = extractor.stream_media(&url, &selector).await?;

                // Nothing is committed to the caller until the first chunk is in hand.
                let first = match body.next().await {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        return Err(ResolveError::upstream_from(
                            "Extractor failed before sending any data",
                            e,
                        ))
                    }
                    None => return Err(ResolveError::upstream("Extractor produced no output")),
                };

                Ok(RelayStream {
                    content_type,
                    filename,
                    content_length: None,
                    body: Box::pin(stream::once(async move { Ok(first) }).chain(body)),
                })
            }
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2_u32.pow(attempt)
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, ResolveError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = match self.client.get(url).header("Accept", "*/*").send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ResolveError::upstream_from("Relay request failed", e));
                    }
                    warn!("Relay request failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(self.delay(attempt)).await;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                return Ok(response);
            } else if status.as_u16() == 403 && attempt < self.max_retries {
                let delay = self.delay(attempt);
                warn!(
                    "Relay upstream returned 403 (attempt {}), retrying in {:?}...",
                    attempt, delay
                );
                tokio::time::sleep(delay).await;
                continue;
            } else {
                return Err(ResolveError::upstream(format!(
                    "Relay upstream returned HTTP {} after {} attempt(s)",
                    status, attempt
                )));
            }
        }
    }
}
