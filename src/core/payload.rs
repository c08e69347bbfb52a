//! Upstream response shapes handed from the adapters to the normalizer.

use crate::core::MediaKind;
use serde::Deserialize;
use serde_json::Value;

/// A successful answer from one multi-instance resolver instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CobaltOutcome {
    pub instance: String,
    pub status: String,
    pub url: String,
    pub filename: Option<String>,
    pub thumbnail: Option<String>,
    pub kind: MediaKind,
    pub quality: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TieredPayload {
    pub status: Option<Value>,
    pub message: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<Value>,
    pub size: Option<Value>,
    pub dlink: Option<String>,
    pub download: Option<String>,
    pub link: Option<String>,
    pub url: Option<String>,
}

impl TieredPayload {
    /// The service has used several names for the download link over time.
    pub fn link(&self) -> Option<&str> {
        [&self.dlink, &self.download, &self.link, &self.url]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|l| !l.trim().is_empty())
    }

    pub fn reported_failure(&self) -> bool {
        match &self.status {
            Some(Value::Bool(ok)) => !ok,
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "error" | "fail" | "failed"),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TieredOutcome {
    pub kind: MediaKind,
    pub quality: String,
    pub payload: TieredPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TikTokPayload {
    pub id: Option<String>,
    pub title: Option<String>,
    pub cover: Option<String>,
    pub origin_cover: Option<String>,
    pub duration: Option<u64>,
    pub play: Option<String>,
    pub wmplay: Option<String>,
    pub hdplay: Option<String>,
    pub size: Option<u64>,
    pub hd_size: Option<u64>,
    pub music: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub author: Option<TikTokAuthor>,
    pub play_count: Option<u64>,
    pub digg_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub share_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TikTokAuthor {
    pub nickname: Option<String>,
    pub unique_id: Option<String>,
}

impl TikTokPayload {
    pub fn is_image_set(&self) -> bool {
        !self.images.is_empty()
    }

    pub fn has_video(&self) -> bool {
        [&self.hdplay, &self.play, &self.wmplay]
            .into_iter()
            .flatten()
            .any(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacebookPayload {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_ms: Option<u64>,
    pub hd: Option<String>,
    pub sd: Option<String>,
}

impl FacebookPayload {
    pub fn has_video(&self) -> bool {
        [&self.hd, &self.sd]
            .into_iter()
            .flatten()
            .any(|u| !u.is_empty())
    }
}
