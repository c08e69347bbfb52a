use crate::core::normalize::{AdapterOutput, ExtractedMedia};
use crate::core::relay::{ByteStream, ProcessExtractor, RelaySource, RelayTarget};
use crate::core::{
    select_format, ytdlp_selector, BackendAdapter, MediaRequest, ResolveError, ResolvedMedia,
    Thumbnail, VideoFormat, VideoMetadata,
};
use crate::utils::parse_duration;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// The `yt-dlp` command-line extractor.
pub struct YtDlp {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--no-warnings")
            .arg("--no-playlist")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ProcessExtractor for YtDlp {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError> {
        debug!("Extracting metadata with {}: {}", self.binary.display(), url);

        let output = tokio::time::timeout(
            self.timeout,
            self.command()
                .arg("--dump-json")
                .arg("--skip-download")
                .arg(url)
                .output(),
        )
        .await
        .map_err(|_| {
            ResolveError::upstream(format!(
                "Timeout fetching video info ({}s)",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| ResolveError::upstream_from("Failed to run yt-dlp", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::upstream(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::upstream_from("yt-dlp returned invalid JSON", e))?;

        parse_document(&json)
    }

    async fn stream_media(&self, url: &str, selector: &str) -> Result<ByteStream, ResolveError> {
        let mut child = self
            .command()
            .arg("--quiet")
            .arg("-f")
            .arg(selector)
            .arg("-o")
            .arg("-")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ResolveError::upstream_from("Failed to run yt-dlp", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ResolveError::upstream("yt-dlp stdout unavailable"))?;

        let stderr_reader = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    buf.push_str(&line);
                    buf.push('\n');
                }
                buf
            })
        });

        info!("yt-dlp streaming {} with format '{}'", url, selector);
        Ok(process_stream(child, stdout, stderr_reader))
    }
}

struct Piping {
    reader: ReaderStream<ChildStdout>,
    child: Child,
    stderr: Option<JoinHandle<String>>,
}

/// Yields stdout chunks as they arrive. A non-zero exit once stdout closes
/// becomes a trailing error item carrying the process stderr. Dropping the
/// stream drops the child, which kills it.
fn process_stream(
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
) -> ByteStream {
    let state = Piping {
        reader: ReaderStream::new(stdout),
        child,
        stderr,
    };

    let body = stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        match state.reader.next().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some(state))),
            Some(Err(e)) => Some((Err(e), None)),
            None => match state.child.wait().await {
                Ok(status) if status.success() => None,
                Ok(status) => {
                    let stderr = match state.stderr.take() {
                        Some(handle) => handle.await.unwrap_or_default(),
                        None => String::new(),
                    };
                    let stderr = stderr.trim();
                    warn!("yt-dlp exited with {}: {}", status, stderr);
                    let message = if stderr.is_empty() {
                        format!("yt-dlp exited with {status}")
                    } else {
                        format!("yt-dlp exited with {status}: {stderr}")
                    };
                    Some((Err(io::Error::other(message)), None))
                }
                Err(e) => Some((Err(e), None)),
            },
        }
    });

    Box::pin(body)
}

/// Maps a `--dump-json` document onto [`VideoMetadata`].
pub fn parse_document(json: &Value) -> Result<VideoMetadata, ResolveError> {
    let formats: Vec<VideoFormat> = json
        .get("formats")
        .and_then(|v| v.as_array())
        .map(|list| list.iter().filter_map(parse_format).collect())
        .unwrap_or_default();

    let mut thumbnails: Vec<Thumbnail> = json
        .get("thumbnails")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|t| {
                    Some(Thumbnail {
                        url: t.get("url")?.as_str()?.to_string(),
                        width: t.get("width").and_then(|v| v.as_u64()).map(|w| w as u32),
                        height: t.get("height").and_then(|v| v.as_u64()).map(|h| h as u32),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(url) = json.get("thumbnail").and_then(|v| v.as_str()) {
        if !thumbnails.iter().any(|t| t.url == url) {
            thumbnails.push(Thumbnail {
                url: url.to_string(),
                width: None,
                height: None,
            });
        }
    }

    Ok(VideoMetadata {
        id: json
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        title: json
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Title")
            .to_string(),
        uploader: json
            .get("uploader")
            .or_else(|| json.get("channel"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        duration: json.get("duration").and_then(parse_duration),
        view_count: json.get("view_count").and_then(|v| v.as_u64()),
        like_count: json.get("like_count").and_then(|v| v.as_u64()),
        formats,
        thumbnails,
    })
}

fn codec(format: &Value, key: &str) -> Option<String> {
    format
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|c| !c.is_empty() && *c != "none")
        .map(|c| c.to_string())
}

fn parse_format(format: &Value) -> Option<VideoFormat> {
    let url = format.get("url").and_then(|v| v.as_str())?;
    Some(VideoFormat {
        format_id: format
            .get("format_id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        url: url.to_string(),
        ext: format
            .get("ext")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        height: format.get("height").and_then(|v| v.as_u64()).map(|h| h as u32),
        fps: format.get("fps").and_then(|v| v.as_f64()),
        vcodec: codec(format, "vcodec"),
        acodec: codec(format, "acodec"),
        filesize: format
            .get("filesize")
            .and_then(|v| v.as_u64())
            .or_else(|| format.get("filesize_approx").and_then(|v| v.as_u64())),
        tbr: format.get("tbr").and_then(|v| v.as_f64()),
        abr: format.get("abr").and_then(|v| v.as_f64()),
    })
}

/// Resolves through a local extractor process. Descriptor mode selects from
/// the metadata document; relay mode hands an extractor-native selector to a
/// streaming process instead.
pub struct ProcessAdapter {
    extractor: Arc<dyn ProcessExtractor>,
}

impl ProcessAdapter {
    pub fn new(extractor: Arc<dyn ProcessExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl BackendAdapter for ProcessAdapter {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        let metadata = self.extractor.fetch_metadata(request.url()).await?;
        let selected = select_format(&metadata.formats, request.kind(), request.quality())?.clone();

        Ok(AdapterOutput::Extracted(ExtractedMedia {
            backend: self.name(),
            kind: request.kind(),
            metadata,
            selected,
        }))
    }

    fn relay_target(
        &self,
        request: &MediaRequest,
        media: &ResolvedMedia,
    ) -> Result<RelayTarget, ResolveError> {
        Ok(RelayTarget::new(
            RelaySource::Process {
                extractor: self.extractor.clone(),
                url: request.url().to_string(),
                selector: ytdlp_selector(request.kind(), request.quality()),
            },
            request.kind(),
            &media.title,
        ))
    }
}
