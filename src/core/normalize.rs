//! Result Normalizer: one explicit mapping per upstream shape into
//! [`ResolvedMedia`]. Schema drift in one upstream stays local to its arm.

use crate::core::{
    Engagement, LinkKind, MediaKind, MediaLink, Platform, ResolvedMedia, VideoFormat,
    VideoMetadata,
};
use crate::core::payload::{CobaltOutcome, FacebookPayload, TieredOutcome, TikTokPayload};
use crate::utils::parse_duration;
use serde_json::Value;

const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Raw output of a backend adapter, before normalization.
#[derive(Debug, Clone)]
pub enum AdapterOutput {
    Cobalt(CobaltOutcome),
    Tiered(TieredOutcome),
    TikTok(TikTokPayload),
    Facebook(FacebookPayload),
    Extracted(ExtractedMedia),
}

/// A metadata document plus the format picked from it.
#[derive(Debug, Clone)]
pub struct ExtractedMedia {
    pub backend: &'static str,
    pub kind: MediaKind,
    pub metadata: VideoMetadata,
    pub selected: VideoFormat,
}

pub fn normalize(platform: Platform, output: AdapterOutput) -> ResolvedMedia {
    match output {
        AdapterOutput::Cobalt(outcome) => from_cobalt(platform, outcome),
        AdapterOutput::Tiered(outcome) => from_tiered(platform, outcome),
        AdapterOutput::TikTok(payload) => from_tiktok(platform, payload),
        AdapterOutput::Facebook(payload) => from_facebook(platform, payload),
        AdapterOutput::Extracted(media) => from_extracted(platform, media),
    }
}

fn link_kind(kind: MediaKind) -> LinkKind {
    match kind {
        MediaKind::Audio => LinkKind::Audio,
        MediaKind::Video => LinkKind::Video,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_filename(filename: Option<&str>) -> (Option<String>, Option<String>) {
    match filename.map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                (Some(stem.to_string()), Some(ext.to_ascii_lowercase()))
            }
            _ => (Some(name.to_string()), None),
        },
        None => (None, None),
    }
}

fn from_cobalt(platform: Platform, outcome: CobaltOutcome) -> ResolvedMedia {
    let (stem, ext) = split_filename(outcome.filename.as_deref());

    ResolvedMedia {
        platform,
        service: "cobalt".to_string(),
        title: stem.unwrap_or_else(|| UNTITLED.to_string()),
        author: None,
        duration: None,
        thumbnail: outcome.thumbnail,
        media: vec![MediaLink::new(link_kind(outcome.kind), outcome.url)],
        format: ext.or_else(|| Some(outcome.kind.extension().to_string())),
        quality: outcome.quality,
        size: None,
        stats: None,
        stream_url: None,
    }
}

fn from_tiered(platform: Platform, outcome: TieredOutcome) -> ResolvedMedia {
    let link = outcome.payload.link().map(str::to_string);
    let payload = outcome.payload;

    ResolvedMedia {
        platform,
        service: "tiered".to_string(),
        title: non_empty(payload.title).unwrap_or_else(|| UNTITLED.to_string()),
        author: non_empty(payload.author),
        duration: payload.duration.as_ref().and_then(parse_duration),
        thumbnail: non_empty(payload.thumbnail),
        media: link
            .map(|url| vec![MediaLink::new(link_kind(outcome.kind), url)])
            .unwrap_or_default(),
        format: Some(outcome.kind.extension().to_string()),
        quality: outcome.quality,
        size: payload.size.as_ref().and_then(size_value),
        stats: None,
        stream_url: None,
    }
}

// sizes arrive as a byte count or a human string like "3.4 MB"
fn size_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            let split = s
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(s.len());
            let (number, unit) = s.split_at(split);
            let number: f64 = number.parse().ok()?;
            let factor = match unit.trim().to_ascii_uppercase().as_str() {
                "" | "B" => 1.0,
                "KB" | "K" => 1024.0,
                "MB" | "M" => 1024.0 * 1024.0,
                "GB" | "G" => 1024.0 * 1024.0 * 1024.0,
                _ => return None,
            };
            Some((number * factor).round() as u64)
        }
        _ => None,
    }
}

fn from_tiktok(platform: Platform, payload: TikTokPayload) -> ResolvedMedia {
    let mut media = Vec::new();
    let hd = non_empty(payload.hdplay.clone());
    let quality = if hd.is_some() { "hd" } else { "original" };

    for url in [hd, non_empty(payload.play), non_empty(payload.wmplay)]
        .into_iter()
        .flatten()
    {
        media.push(MediaLink::new(LinkKind::Video, url));
    }
    for image in payload.images.into_iter().filter(|i| !i.trim().is_empty()) {
        media.push(MediaLink::new(LinkKind::ImageSet, image));
    }
    if let Some(music) = non_empty(payload.music) {
        media.push(MediaLink::new(LinkKind::Audio, music));
    }

    let size = if quality == "hd" {
        payload.hd_size.or(payload.size)
    } else {
        payload.size
    };

    ResolvedMedia {
        platform,
        service: "tiktok".to_string(),
        title: non_empty(payload.title).unwrap_or_else(|| UNTITLED.to_string()),
        author: Some(
            payload
                .author
                .and_then(|a| non_empty(a.nickname).or(non_empty(a.unique_id)))
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        ),
        duration: payload.duration.filter(|d| *d > 0),
        thumbnail: non_empty(payload.origin_cover).or(non_empty(payload.cover)),
        media,
        format: Some("mp4".to_string()),
        quality: quality.to_string(),
        size,
        stats: Some(Engagement {
            plays: payload.play_count,
            likes: payload.digg_count,
            comments: payload.comment_count,
            shares: payload.share_count,
        }),
        stream_url: None,
    }
}

fn from_facebook(platform: Platform, payload: FacebookPayload) -> ResolvedMedia {
    let hd = non_empty(payload.hd);
    let quality = if hd.is_some() { "hd" } else { "sd" };
    let media = [hd, non_empty(payload.sd)]
        .into_iter()
        .flatten()
        .map(|url| MediaLink::new(LinkKind::Video, url))
        .collect();

    ResolvedMedia {
        platform,
        service: "facebook".to_string(),
        title: non_empty(payload.title).unwrap_or_else(|| UNTITLED.to_string()),
        author: Some(non_empty(payload.author).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())),
        duration: payload.duration_ms.map(|ms| ms / 1000),
        thumbnail: non_empty(payload.thumbnail),
        media,
        format: Some("mp4".to_string()),
        quality: quality.to_string(),
        size: None,
        stats: None,
        stream_url: None,
    }
}

fn from_extracted(platform: Platform, media: ExtractedMedia) -> ResolvedMedia {
    let ExtractedMedia {
        backend,
        kind,
        metadata,
        selected,
    } = media;
    let thumbnail = metadata.best_thumbnail().map(|t| t.url.clone());

    ResolvedMedia {
        platform,
        service: backend.to_string(),
        title: metadata.title,
        author: metadata.uploader,
        duration: metadata.duration,
        thumbnail,
        media: vec![MediaLink::new(link_kind(kind), selected.url.clone())],
        format: Some(selected.ext.clone()),
        quality: selected.quality_label(),
        size: selected.filesize,
        stats: metadata.like_count.or(metadata.view_count).map(|_| Engagement {
            plays: metadata.view_count,
            likes: metadata.like_count,
            comments: None,
            shares: None,
        }),
        stream_url: None,
    }
}
