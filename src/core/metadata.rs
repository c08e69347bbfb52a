use crate::core::{Platform, ResolveError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested media kind. Accepts `MP3`/`audio` and `MP4`/`video` in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mp3" | "audio" => Some(MediaKind::Audio),
            "mp4" | "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Token echoed back to clients in the `type` field.
    pub fn type_token(&self) -> &'static str {
        match self {
            MediaKind::Audio => "MP3",
            MediaKind::Video => "MP4",
        }
    }
}

/// Quality hint: `highest`, `lowest` or a vertical resolution such as `720`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Highest,
    Lowest,
    Height(u32),
}

pub const MAX_HEIGHT: u32 = 4320;

impl Quality {
    /// A missing or empty token means [`Quality::Highest`].
    pub fn parse(token: Option<&str>) -> Result<Self, ResolveError> {
        let token = match token.map(str::trim) {
            None | Some("") => return Ok(Quality::Highest),
            Some(t) => t.to_ascii_lowercase(),
        };
        match token.as_str() {
            "highest" | "best" | "max" => Ok(Quality::Highest),
            "lowest" | "worst" | "min" => Ok(Quality::Lowest),
            other => other
                .strip_suffix('p')
                .unwrap_or(other)
                .parse::<u32>()
                .ok()
                .filter(|h| (1..=MAX_HEIGHT).contains(h))
                .map(Quality::Height)
                .ok_or_else(|| {
                    ResolveError::invalid(format!(
                        "Invalid \"quality\" parameter '{token}'. Use highest, lowest or a resolution such as 720"
                    ))
                }),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Highest => f.write_str("highest"),
            Quality::Lowest => f.write_str("lowest"),
            Quality::Height(h) => write!(f, "{h}"),
        }
    }
}

/// Raw query parameters of `/download` and `/stream`, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaQuery {
    pub url: Option<String>,
    pub urlytb: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub quality: Option<String>,
}

impl MediaQuery {
    pub fn new(url: &str, kind: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            kind: Some(kind.to_string()),
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: &str) -> Self {
        self.quality = Some(quality.to_string());
        self
    }

    /// Validates the request shape. No network access happens here.
    pub fn into_request(self) -> Result<MediaRequest, ResolveError> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .or(self.urlytb.filter(|u| !u.trim().is_empty()))
            .ok_or_else(|| {
                ResolveError::invalid(
                    "Missing \"url\" parameter. Use: /download?url=MEDIA_URL&type=MP3|MP4",
                )
            })?;

        let kind = self
            .kind
            .as_deref()
            .and_then(MediaKind::parse)
            .ok_or_else(|| ResolveError::invalid("Invalid \"type\" parameter. Use: MP3 or MP4"))?;

        let quality = Quality::parse(self.quality.as_deref())?;

        Ok(MediaRequest {
            url: url.trim().to_string(),
            kind,
            quality,
        })
    }
}

/// A validated request: non-empty URL, recognized kind, parsed quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    url: String,
    kind: MediaKind,
    quality: Quality,
}

impl MediaRequest {
    pub fn new(url: &str, kind: MediaKind, quality: Quality) -> Result<Self, ResolveError> {
        if url.trim().is_empty() {
            return Err(ResolveError::invalid("Missing \"url\" parameter"));
        }
        Ok(Self {
            url: url.trim().to_string(),
            kind,
            quality,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    Video,
    Audio,
    ImageSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaLink {
    pub kind: LinkKind,
    pub url: String,
}

impl MediaLink {
    pub fn new(kind: LinkKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub plays: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
}

/// Canonical result every adapter output is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub platform: Platform,
    pub service: String,
    pub title: String,
    pub author: Option<String>,
    pub duration: Option<u64>,
    pub thumbnail: Option<String>,
    pub media: Vec<MediaLink>,
    pub format: Option<String>,
    pub quality: String,
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Engagement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

impl ResolvedMedia {
    fn serves(link: &MediaLink, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => link.kind == LinkKind::Audio,
            MediaKind::Video => matches!(link.kind, LinkKind::Video | LinkKind::ImageSet),
        }
    }

    /// First usable link for the requested kind. Links are stored in
    /// preference order by the normalizer.
    pub fn primary_url(&self, kind: MediaKind) -> Option<&str> {
        self.media
            .iter()
            .find(|link| Self::serves(link, kind) && !link.url.trim().is_empty())
            .map(|link| link.url.as_str())
    }

    pub fn has_media_for(&self, kind: MediaKind) -> bool {
        self.primary_url(kind).is_some()
    }

    /// Link whose bytes really are `kind`. Image sets satisfy a video
    /// descriptor but are never relayed as a video file.
    pub fn relay_url(&self, kind: MediaKind) -> Option<&str> {
        let wanted = match kind {
            MediaKind::Audio => LinkKind::Audio,
            MediaKind::Video => LinkKind::Video,
        };
        self.media
            .iter()
            .find(|link| link.kind == wanted && !link.url.trim().is_empty())
            .map(|link| link.url.as_str())
    }
}

/// Metadata document produced by the extraction backends that expose a full
/// format list (embedded watch-page extraction and the local process).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub duration: Option<u64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub formats: Vec<VideoFormat>,
    pub thumbnails: Vec<Thumbnail>,
}

impl VideoMetadata {
    /// Largest thumbnail by width, falling back to the first listed.
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnails
            .iter()
            .max_by_key(|t| t.width.unwrap_or(0))
            .or_else(|| self.thumbnails.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub format_id: String,
    pub url: String,
    pub ext: String,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub tbr: Option<f64>, // total bitrate, kbps
    pub abr: Option<f64>, // audio bitrate, kbps
}

impl VideoFormat {
    pub fn has_audio(&self) -> bool {
        self.acodec.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.vcodec.is_some()
    }

    pub fn is_combined(&self) -> bool {
        self.has_audio() && self.has_video()
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    pub fn bitrate(&self) -> f64 {
        self.abr.or(self.tbr).unwrap_or(0.0)
    }

    pub fn quality_label(&self) -> String {
        match self.height {
            Some(h) if self.has_video() => format!("{h}p"),
            _ => "audio".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
