use crate::core::normalize::{AdapterOutput, ExtractedMedia};
use crate::core::platform::extract_video_id;
use crate::core::{
    select_format, BackendAdapter, MediaRequest, ResolveError, Thumbnail, VideoFormat,
    VideoMetadata,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// An embedded extraction library that returns the full metadata document
/// for a URL in one call.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError>;
}

/// Reads `ytInitialPlayerResponse` from the watch page. Only formats that
/// carry a direct URL are kept; ciphered formats are skipped.
pub struct WatchPageExtractor {
    client: reqwest::Client,
}

impl WatchPageExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, ResolveError> {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let response = self
            .client
            .get(&video_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Accept-Encoding", "identity")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .send()
            .await
            .map_err(|e| ResolveError::upstream_from("Failed to fetch YouTube page", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::upstream(format!(
                "Failed to fetch YouTube page: HTTP {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ResolveError::upstream_from("Failed to read YouTube page", e))?;

        if html.is_empty() {
            return Err(ResolveError::upstream("Empty response from YouTube"));
        }
        Ok(html)
    }
}

/// Locates the player response assignment and parses the JSON object that
/// follows it, however long it is.
pub fn extract_player_response(html: &str) -> Result<Value, ResolveError> {
    let patterns = [
        r"ytInitialPlayerResponse\s*=\s*",
        r#"ytInitialPlayerResponse"\s*:\s*"#,
    ];

    for pattern in &patterns {
        let Ok(re) = Regex::new(pattern) else { continue };
        for found in re.find_iter(html) {
            let rest = &html[found.end()..];
            let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
            if let Some(Ok(value)) = values.next() {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    Err(ResolveError::upstream(
        "Could not find ytInitialPlayerResponse in YouTube page",
    ))
}

pub fn parse_player_response(
    player_response: &Value,
    video_id: &str,
) -> Result<VideoMetadata, ResolveError> {
    if let Some(status) = player_response
        .pointer("/playabilityStatus/status")
        .and_then(|v| v.as_str())
    {
        if status != "OK" {
            let reason = player_response
                .pointer("/playabilityStatus/reason")
                .and_then(|v| v.as_str())
                .unwrap_or("no reason provided");
            return Err(ResolveError::upstream(format!(
                "Video is not playable ({status}): {reason}"
            )));
        }
    }

    let video_details = player_response
        .get("videoDetails")
        .ok_or_else(|| ResolveError::upstream("No video details found"))?;

    let title = video_details
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Title")
        .to_string();

    let duration = video_details
        .get("lengthSeconds")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    let uploader = video_details
        .get("author")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let view_count = video_details
        .get("viewCount")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    let streaming_data = player_response
        .get("streamingData")
        .ok_or_else(|| ResolveError::upstream("No streaming data found"))?;

    let formats: Vec<VideoFormat> = ["formats", "adaptiveFormats"]
        .iter()
        .filter_map(|key| streaming_data.get(*key).and_then(|v| v.as_array()))
        .flatten()
        .filter_map(parse_format)
        .collect();

    tracing::debug!("Extracted {} direct formats for {}", formats.len(), video_id);

    Ok(VideoMetadata {
        id: video_id.to_string(),
        title,
        uploader,
        duration,
        view_count,
        like_count: None,
        formats,
        thumbnails: generate_thumbnails(video_id),
    })
}

fn parse_format(format: &Value) -> Option<VideoFormat> {
    let url = format.get("url").and_then(|v| v.as_str())?;

    let itag = format
        .get("itag")
        .and_then(|v| v.as_i64())
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mime_type = format
        .get("mimeType")
        .and_then(|v| v.as_str())
        .unwrap_or("video/mp4");
    let (vcodec, acodec, ext) = parse_mime_type(mime_type);

    let height = format
        .get("height")
        .and_then(|v| v.as_u64())
        .map(|h| h as u32);

    let bitrate_kbps = format
        .get("averageBitrate")
        .or_else(|| format.get("bitrate"))
        .and_then(|v| v.as_f64())
        .map(|bps| bps / 1000.0);

    let filesize = format
        .get("contentLength")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    Some(VideoFormat {
        format_id: itag,
        url: url.to_string(),
        ext: ext.to_string(),
        height,
        fps: format.get("fps").and_then(|v| v.as_f64()),
        abr: if vcodec.is_none() { bitrate_kbps } else { None },
        vcodec,
        acodec,
        filesize,
        tbr: bitrate_kbps,
    })
}

/// Splits `video/mp4; codecs="avc1.42001E, mp4a.40.2"` into video codec,
/// audio codec and container.
pub fn parse_mime_type(mime_type: &str) -> (Option<String>, Option<String>, &'static str) {
    let (essence, params) = mime_type.split_once(';').unwrap_or((mime_type, ""));
    let essence = essence.trim();

    let ext = match essence {
        "video/mp4" => "mp4",
        "audio/mp4" => "m4a",
        "video/webm" | "audio/webm" => "webm",
        "video/3gpp" => "3gp",
        _ => "unknown",
    };

    let codecs: Vec<String> = params
        .split_once("codecs=")
        .map(|(_, list)| {
            list.trim_matches(|c: char| c == '"' || c.is_whitespace())
                .split(',')
                .map(|c| c.trim().trim_matches('"').to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let acodec = codecs.iter().find(|c| is_audio_codec(c)).cloned();
    let vcodec = codecs.iter().find(|c| !is_audio_codec(c)).cloned();

    if codecs.is_empty() {
        // No codec list: trust the top-level type.
        return match essence.split('/').next() {
            Some("audio") => (None, Some("unknown".to_string()), ext),
            Some("video") => (Some("unknown".to_string()), None, ext),
            _ => (None, None, ext),
        };
    }

    (vcodec, acodec, ext)
}

fn is_audio_codec(codec: &str) -> bool {
    ["mp4a", "opus", "vorbis", "ac-3", "ec-3", "flac"]
        .iter()
        .any(|p| codec.starts_with(p))
}

fn generate_thumbnails(video_id: &str) -> Vec<Thumbnail> {
    vec![
        Thumbnail {
            url: format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", video_id),
            width: Some(1280),
            height: Some(720),
        },
        Thumbnail {
            url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
            width: Some(480),
            height: Some(360),
        },
        Thumbnail {
            url: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", video_id),
            width: Some(320),
            height: Some(180),
        },
    ]
}

#[async_trait]
impl MetadataSource for WatchPageExtractor {
    fn name(&self) -> &'static str {
        "youtube-direct"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| ResolveError::invalid("Could not extract video ID from URL"))?;

        let html = self.fetch_watch_page(&video_id).await?;
        let player_response = extract_player_response(&html)?;
        parse_player_response(&player_response, &video_id)
    }
}

/// Fetches the metadata once, then picks a format locally.
pub struct DirectAdapter {
    source: Arc<dyn MetadataSource>,
}

impl DirectAdapter {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl BackendAdapter for DirectAdapter {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let metadata = self.source.fetch_metadata(request.url()).await?;
        let selected = select_format(&metadata.formats, request.kind(), request.quality())?.clone();
        tracing::info!(
            "Selected format {} ({}) for {}",
            selected.format_id,
            selected.quality_label(),
            metadata.title
        );

        Ok(AdapterOutput::Extracted(ExtractedMedia {
            backend: self.source.name(),
            kind: request.kind(),
            metadata,
            selected,
        }))
    }
}
