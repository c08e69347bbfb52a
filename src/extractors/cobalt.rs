use crate::core::normalize::AdapterOutput;
use crate::core::payload::CobaltOutcome;
use crate::core::{BackendAdapter, MediaKind, MediaRequest, Quality, ResolveError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const EXHAUSTED: &str = "all resolver instances unavailable";

const QUALITY_TIERS: [u32; 9] = [144, 240, 360, 480, 720, 1080, 1440, 2160, 4320];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CobaltRequest {
    pub url: String,
    pub video_quality: String,
    pub audio_format: String,
    pub audio_bitrate: String,
    pub download_mode: &'static str,
    pub youtube_video_codec: String,
    pub filename_style: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CobaltResponse {
    pub status: String,
    pub url: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub picker: Vec<PickerItem>,
    pub error: Option<CobaltErrorBody>,
    // older instances report errors as plain text
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickerItem {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: String,
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CobaltErrorBody {
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct CobaltSettings {
    pub video_codec: String,
    pub audio_format: String,
    pub audio_bitrate: String,
}

impl Default for CobaltSettings {
    fn default() -> Self {
        Self {
            video_codec: "h264".to_string(),
            audio_format: "mp3".to_string(),
            audio_bitrate: "128".to_string(),
        }
    }
}

/// Resolver backed by an ordered list of cobalt-style instances. Instances
/// are tried one after another; the first recognized success wins.
pub struct CobaltAdapter {
    client: reqwest::Client,
    instances: Vec<String>,
    timeout: Duration,
    settings: CobaltSettings,
}

impl CobaltAdapter {
    pub fn new(client: reqwest::Client, instances: Vec<String>, timeout: Duration) -> Self {
        Self {
            client,
            instances,
            timeout,
            settings: CobaltSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CobaltSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn build_request(&self, request: &MediaRequest) -> CobaltRequest {
        CobaltRequest {
            url: request.url().to_string(),
            video_quality: video_quality(request.quality()),
            audio_format: self.settings.audio_format.clone(),
            audio_bitrate: self.settings.audio_bitrate.clone(),
            download_mode: match request.kind() {
                MediaKind::Audio => "audio",
                MediaKind::Video => "auto",
            },
            youtube_video_codec: self.settings.video_codec.clone(),
            filename_style: "basic",
        }
    }

    async fn try_instance(
        &self,
        instance: &str,
        body: &CobaltRequest,
        kind: MediaKind,
    ) -> Result<CobaltOutcome, String> {
        let response = self
            .client
            .post(instance)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        let parsed: CobaltResponse = serde_json::from_str(&text)
            .map_err(|e| format!("HTTP {status}, unreadable body: {e}"))?;

        interpret(instance, parsed, kind, body)
    }
}

fn interpret(
    instance: &str,
    response: CobaltResponse,
    kind: MediaKind,
    body: &CobaltRequest,
) -> Result<CobaltOutcome, String> {
    let quality = match kind {
        MediaKind::Audio => "audio".to_string(),
        MediaKind::Video if body.video_quality == "max" => "max".to_string(),
        MediaKind::Video => format!("{}p", body.video_quality),
    };

    let status = response.status.clone();
    match status.as_str() {
        "tunnel" | "redirect" | "stream" => {
            let url = response
                .url
                .filter(|u| !u.is_empty())
                .ok_or_else(|| format!("status '{status}' without url"))?;
            Ok(CobaltOutcome {
                instance: instance.to_string(),
                status: response.status,
                url,
                filename: response.filename,
                thumbnail: None,
                kind,
                quality,
            })
        }
        "picker" => {
            let first = response
                .picker
                .into_iter()
                .next()
                .ok_or_else(|| "picker response without items".to_string())?;
            debug!("Picker from {}: taking first item ({:?})", instance, first.kind);
            Ok(CobaltOutcome {
                instance: instance.to_string(),
                status: response.status,
                url: first.url,
                filename: response.filename,
                thumbnail: first.thumb,
                kind,
                quality,
            })
        }
        "error" | "rate-limit" => Err(response
            .error
            .map(|e| e.code)
            .or(response.text)
            .unwrap_or_else(|| status.clone())),
        other => Err(format!("unrecognized status '{other}'")),
    }
}

/// Snaps a quality hint onto the tiers cobalt understands.
pub fn video_quality(quality: Quality) -> String {
    match quality {
        Quality::Highest => "max".to_string(),
        Quality::Lowest => QUALITY_TIERS[0].to_string(),
        Quality::Height(h) => QUALITY_TIERS
            .iter()
            .min_by_key(|tier| tier.abs_diff(h))
            .unwrap_or(&720)
            .to_string(),
    }
}

#[async_trait]
impl BackendAdapter for CobaltAdapter {
    fn name(&self) -> &'static str {
        "cobalt"
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let body = self.build_request(request);
        let mut last_error = None;

        for instance in &self.instances {
            debug!("Trying resolver instance {}", instance);
            match self.try_instance(instance, &body, request.kind()).await {
                Ok(outcome) => {
                    info!("Resolved via {} ({})", instance, outcome.status);
                    return Ok(AdapterOutput::Cobalt(outcome));
                }
                Err(e) => {
                    warn!("Resolver instance {} failed: {}", instance, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ResolveError::upstream(match last_error {
            Some(e) => format!("{EXHAUSTED} (last error: {e})"),
            None => EXHAUSTED.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(quality: &str) -> CobaltRequest {
        CobaltRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            video_quality: quality.into(),
            audio_format: "mp3".into(),
            audio_bitrate: "128".into(),
            download_mode: "auto",
            youtube_video_codec: "h264".into(),
            filename_style: "basic",
        }
    }

    fn response(json: &str) -> CobaltResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn snaps_quality_to_tiers() {
        assert_eq!(video_quality(Quality::Highest), "max");
        assert_eq!(video_quality(Quality::Lowest), "144");
        assert_eq!(video_quality(Quality::Height(500)), "480");
        assert_eq!(video_quality(Quality::Height(1000)), "1080");
        assert_eq!(video_quality(Quality::Height(720)), "720");
    }

    #[test]
    fn builds_audio_request() {
        let adapter = CobaltAdapter::new(reqwest::Client::new(), vec![], Duration::from_secs(30));
        let request = MediaRequest::new(
            "https://youtu.be/dQw4w9WgXcQ",
            MediaKind::Audio,
            Quality::Highest,
        )
        .unwrap();
        let built = adapter.build_request(&request);
        assert_eq!(built.download_mode, "audio");
        assert_eq!(built.audio_format, "mp3");
        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["downloadMode"], "audio");
        assert_eq!(json["videoQuality"], "max");
    }

    #[test]
    fn tunnel_is_success() {
        let outcome = interpret(
            "https://a",
            response(r#"{"status":"tunnel","url":"https://a/tunnel?id=1","filename":"clip.mp4"}"#),
            MediaKind::Video,
            &body("720"),
        )
        .unwrap();
        assert_eq!(outcome.url, "https://a/tunnel?id=1");
        assert_eq!(outcome.quality, "720p");
    }

    #[test]
    fn picker_takes_first_item() {
        let outcome = interpret(
            "https://a",
            response(
                r#"{"status":"picker","picker":[{"type":"photo","url":"https://a/1.jpg","thumb":"https://a/t1.jpg"},{"type":"photo","url":"https://a/2.jpg"}]}"#,
            ),
            MediaKind::Video,
            &body("max"),
        )
        .unwrap();
        assert_eq!(outcome.url, "https://a/1.jpg");
        assert_eq!(outcome.thumbnail.as_deref(), Some("https://a/t1.jpg"));
    }

    #[test]
    fn error_statuses_fail_with_code() {
        let err = interpret(
            "https://a",
            response(r#"{"status":"error","error":{"code":"error.api.link.invalid"}}"#),
            MediaKind::Video,
            &body("max"),
        )
        .unwrap_err();
        assert_eq!(err, "error.api.link.invalid");

        let err = interpret(
            "https://a",
            response(r#"{"status":"rate-limit","text":"slow down"}"#),
            MediaKind::Video,
            &body("max"),
        )
        .unwrap_err();
        assert_eq!(err, "slow down");

        assert!(interpret(
            "https://a",
            response(r#"{"status":"picker","picker":[]}"#),
            MediaKind::Video,
            &body("max"),
        )
        .is_err());
    }
}
