mod common;

use axum::{
    extract::Query,
    http::{StatusCode, Uri},
    routing::get,
    Json, Router,
};
use common::spawn;
use media_relay::core::{AdapterOutput, BackendAdapter, MediaKind, MediaRequest, Quality, ResolveError};
use media_relay::extractors::{FacebookAdapter, TieredAdapter, TikTokAdapter};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

const TIKTOK_URL: &str = "https://www.tiktok.com/@user/video/7234567890123456789";
const FACEBOOK_URL: &str = "https://www.facebook.com/watch/?v=1234567890";
const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Path and query of every request the fake service received.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, HashMap<String, String>)>>>);

impl Seen {
    fn record(&self, uri: &Uri, params: HashMap<String, String>) {
        self.0.lock().unwrap().push((uri.path().to_string(), params));
    }

    fn requests(&self) -> Vec<(String, HashMap<String, String>)> {
        self.0.lock().unwrap().clone()
    }
}

fn request(url: &str, kind: MediaKind, quality: Quality) -> MediaRequest {
    MediaRequest::new(url, kind, quality).unwrap()
}

/// TikTok, Facebook and tiered services behind one listener.
async fn fake_services(seen: Seen) -> String {
    let (tt, fb, ok, audio, failed) = (
        seen.clone(),
        seen.clone(),
        seen.clone(),
        seen.clone(),
        seen.clone(),
    );
    let app = Router::new()
        .route(
            "/tiktok",
            get(move |uri: Uri, Query(params): Query<HashMap<String, String>>| async move {
                tt.record(&uri, params);
                Json(json!({
                    "code": 0,
                    "msg": "success",
                    "data": {
                        "title": "dance",
                        "play": "https://v.example/play.mp4",
                        "hdplay": "https://v.example/hd.mp4",
                        "music": "https://v.example/music.mp3",
                        "author": {"nickname": "dancer"}
                    }
                }))
            }),
        )
        .route(
            "/tiktok-private",
            get(|| async { Json(json!({"code": -1, "msg": "Url parsing is failed!"})) }),
        )
        .route(
            "/facebook",
            get(move |uri: Uri, Query(params): Query<HashMap<String, String>>| async move {
                fb.record(&uri, params);
                Json(json!({
                    "success": true,
                    "title": "reel",
                    "duration_ms": 15000,
                    "sd": "https://fb.example/sd.mp4"
                }))
            }),
        )
        .route(
            "/api/ytmp4/480",
            get(move |uri: Uri, Query(params): Query<HashMap<String, String>>| async move {
                ok.record(&uri, params);
                Json(json!({
                    "status": true,
                    "title": "Never Gonna",
                    "duration": "3:32",
                    "dlink": "https://cdn.example/480.mp4"
                }))
            }),
        )
        .route(
            "/api/ytmp3",
            get(move |uri: Uri, Query(params): Query<HashMap<String, String>>| async move {
                audio.record(&uri, params);
                Json(json!({"status": true, "title": "Never Gonna"}))
            }),
        )
        .route(
            "/api/ytmp4/720",
            get(move |uri: Uri, Query(params): Query<HashMap<String, String>>| async move {
                failed.record(&uri, params);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"status": false, "message": "daily quota reached"})),
                )
            }),
        );
    let addr = spawn(app).await;
    format!("http://{addr}")
}

#[tokio::test]
async fn test_tiktok_requests_hd_variant() {
    let seen = Seen::default();
    let base = fake_services(seen.clone()).await;
    let adapter = TikTokAdapter::new(reqwest::Client::new(), &format!("{base}/tiktok"));

    let output = assert_ok!(
        adapter
            .resolve(&request(TIKTOK_URL, MediaKind::Video, Quality::Highest))
            .await
    );

    match output {
        AdapterOutput::TikTok(payload) => {
            assert_eq!(payload.hdplay.as_deref(), Some("https://v.example/hd.mp4"));
            assert_eq!(payload.music.as_deref(), Some("https://v.example/music.mp3"));
        }
        other => panic!("expected TikTok output, got {other:?}"),
    }

    let requests = seen.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/tiktok");
    assert_eq!(requests[0].1["url"], TIKTOK_URL);
    assert_eq!(requests[0].1["hd"], "1");
}

#[tokio::test]
async fn test_tiktok_failure_flag_is_upstream_error() {
    let base = fake_services(Seen::default()).await;
    let adapter = TikTokAdapter::new(reqwest::Client::new(), &format!("{base}/tiktok-private"));

    let err = assert_err!(
        adapter
            .resolve(&request(TIKTOK_URL, MediaKind::Video, Quality::Highest))
            .await
    );
    assert_eq!(err, ResolveError::Upstream("Url parsing is failed!".into()));
}

#[tokio::test]
async fn test_facebook_passes_target_url() {
    let seen = Seen::default();
    let base = fake_services(seen.clone()).await;
    let adapter = FacebookAdapter::new(reqwest::Client::new(), &format!("{base}/facebook"));

    let output = assert_ok!(
        adapter
            .resolve(&request(FACEBOOK_URL, MediaKind::Video, Quality::Highest))
            .await
    );

    match output {
        AdapterOutput::Facebook(payload) => {
            assert_eq!(payload.sd.as_deref(), Some("https://fb.example/sd.mp4"));
            assert_eq!(payload.duration_ms, Some(15000));
        }
        other => panic!("expected Facebook output, got {other:?}"),
    }

    let requests = seen.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1["url"], FACEBOOK_URL);
}

#[tokio::test]
async fn test_tiered_uses_quality_bucket_path() {
    let seen = Seen::default();
    let base = fake_services(seen.clone()).await;
    let adapter = TieredAdapter::new(reqwest::Client::new(), &format!("{base}/api/"));

    let output = assert_ok!(
        adapter
            .resolve(&request(YOUTUBE_URL, MediaKind::Video, Quality::Height(480)))
            .await
    );

    match output {
        AdapterOutput::Tiered(outcome) => {
            assert_eq!(outcome.quality, "480p");
            assert_eq!(outcome.payload.link(), Some("https://cdn.example/480.mp4"));
        }
        other => panic!("expected tiered output, got {other:?}"),
    }

    let requests = seen.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/api/ytmp4/480");
    assert_eq!(requests[0].1["url"], YOUTUBE_URL);
}

#[tokio::test]
async fn test_tiered_reported_failures() {
    let seen = Seen::default();
    let base = fake_services(seen.clone()).await;
    let adapter = TieredAdapter::new(reqwest::Client::new(), &format!("{base}/api"));

    // highest maps to the 720 bucket, which is over quota
    let err = assert_err!(
        adapter
            .resolve(&request(YOUTUBE_URL, MediaKind::Video, Quality::Highest))
            .await
    );
    assert_eq!(err, ResolveError::Upstream("daily quota reached".into()));

    let err = assert_err!(
        adapter
            .resolve(&request(YOUTUBE_URL, MediaKind::Audio, Quality::Highest))
            .await
    );
    assert_eq!(
        err,
        ResolveError::Upstream("Tiered service returned no download link".into())
    );

    let paths: Vec<String> = seen.requests().into_iter().map(|(path, _)| path).collect();
    assert_eq!(paths, ["/api/ytmp4/720", "/api/ytmp3"]);
}

#[tokio::test]
async fn test_transport_errors_are_wrapped() {
    // nothing listens on the discard port
    let dead = "http://127.0.0.1:9";
    let client = reqwest::Client::new();
    let video = request(YOUTUBE_URL, MediaKind::Video, Quality::Highest);

    let adapters: Vec<(Box<dyn BackendAdapter>, &str)> = vec![
        (
            Box::new(TikTokAdapter::new(client.clone(), &format!("{dead}/tiktok"))),
            "TikTok extraction failed",
        ),
        (
            Box::new(FacebookAdapter::new(client.clone(), &format!("{dead}/facebook"))),
            "Facebook extraction failed",
        ),
        (
            Box::new(TieredAdapter::new(client.clone(), &format!("{dead}/api"))),
            "Tiered service request failed",
        ),
    ];

    for (adapter, context) in adapters {
        let err = assert_err!(adapter.resolve(&video).await);
        match err {
            ResolveError::Upstream(message) => {
                assert!(message.starts_with(context), "{}: {message}", adapter.name())
            }
            other => panic!("{}: expected upstream error, got {other:?}", adapter.name()),
        }
    }
}
