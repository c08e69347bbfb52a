#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use futures::StreamExt;
use media_relay::core::relay::{ByteStream, ProcessExtractor};
use media_relay::core::{
    AdapterOutput, AdapterRegistry, BackendAdapter, MediaRequest, Relay, ResolveError, Resolver,
    VideoFormat, VideoMetadata,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Binds an in-process server on an ephemeral port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn resolver(registry: AdapterRegistry) -> Resolver {
    Resolver::new(registry, Relay::new(reqwest::Client::new()))
}

pub const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Adapter returning a canned output and counting calls.
pub struct StubAdapter {
    output: AdapterOutput,
    pub calls: AtomicUsize,
}

impl StubAdapter {
    pub fn new(output: AdapterOutput) -> Arc<Self> {
        Arc::new(Self {
            output,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn resolve(&self, _request: &MediaRequest) -> Result<AdapterOutput, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Extractor process stand-in: one combined format, and a body made of
/// the given chunks, optionally followed by a failure.
pub struct FakeExtractor {
    pub chunks: Vec<&'static [u8]>,
    pub fail_after: bool,
    pub selectors: std::sync::Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(chunks: Vec<&'static [u8]>, fail_after: bool) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            fail_after,
            selectors: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ProcessExtractor for FakeExtractor {
    async fn fetch_metadata(&self, _url: &str) -> Result<VideoMetadata, ResolveError> {
        Ok(VideoMetadata {
            id: "dQw4w9WgXcQ".into(),
            title: "Process Clip".into(),
            uploader: Some("Uploader".into()),
            duration: Some(10),
            view_count: None,
            like_count: None,
            formats: vec![VideoFormat {
                format_id: "18".into(),
                url: "https://rr.example/18".into(),
                ext: "mp4".into(),
                height: Some(360),
                fps: Some(30.0),
                vcodec: Some("avc1".into()),
                acodec: Some("mp4a".into()),
                filesize: None,
                tbr: Some(500.0),
                abr: None,
            }],
            thumbnails: vec![],
        })
    }

    async fn stream_media(&self, _url: &str, selector: &str) -> Result<ByteStream, ResolveError> {
        self.selectors.lock().unwrap().push(selector.to_string());
        let mut items: Vec<std::io::Result<bytes::Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(bytes::Bytes::from_static(c)))
            .collect();
        if self.fail_after {
            items.push(Err(std::io::Error::other("extractor exited with status 1")));
        }
        // paced like a real process so the head is flushed before any failure
        let paced = futures::stream::iter(items).then(|item| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            item
        });
        Ok(Box::pin(paced))
    }
}

/// Writes an executable stand-in for the yt-dlp binary: `--dump-json` prints
/// a one-format document, any streaming invocation fails on stderr.
#[cfg(unix)]
pub fn failing_ytdlp_script(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp");
    let script = r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "--dump-json" ]; then
    echo '{"id":"dQw4w9WgXcQ","title":"Scripted Clip","formats":[{"format_id":"18","url":"https://rr.example/18","ext":"mp4","acodec":"mp4a.40.2","vcodec":"avc1.42001E","height":360,"tbr":500.0}]}'
    exit 0
  fi
done
echo "ERROR: [youtube] dQw4w9WgXcQ: Requested format is not available" >&2
exit 1
"#;
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
