use crate::core::{MediaQuery, ResolveError, ResolvedMedia, Resolver};
use crate::extractors::SearchClient;
use crate::utils::{attachment_filename, timestamp};
use anyhow::Context;
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub search: Arc<SearchClient>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    timestamp: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn stamped(mut self) -> Self {
        self.timestamp = Some(timestamp());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{} {}", self.status, self.message);
        } else {
            warn!("{} {}", self.status, self.message);
        }

        let mut body = json!({
            "success": false,
            "error": self.message,
        });
        if let Some(ts) = self.timestamp {
            body["timestamp"] = json!(ts);
        }
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/recherche", get(search))
        .route("/download", get(download))
        .route("/stream", get(stream))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves until Ctrl+C, letting in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("reading listener address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", err);
        return;
    }
    info!("Shutdown signal received");
}

async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Media resolution and relay API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "recherche": "/recherche?titre=your_search",
            "download": "/download?url=MEDIA_URL&type=MP3|MP4&quality=highest|lowest|720",
            "stream": "/stream?url=MEDIA_URL&type=MP3|MP4&quality=highest|lowest|720",
        },
        "examples": {
            "recherche": "/recherche?titre=metamorphosis",
            "download": "/download?url=https://www.youtube.com/watch?v=dQw4w9WgXcQ&type=MP3",
            "stream": "/stream?url=https://www.youtube.com/watch?v=dQw4w9WgXcQ&type=MP4&quality=720",
        },
        "platforms": state.resolver.platforms(),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    titre: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    #[serde(flatten)]
    results: crate::extractors::SearchResults,
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Query(params) = params?;
    let title = params.titre.unwrap_or_default();
    let results = state.search.search(&title).await?;

    Ok(Json(SearchResponse {
        success: true,
        results,
    }))
}

#[derive(Serialize)]
struct DownloadResponse {
    success: bool,
    #[serde(flatten)]
    media: ResolvedMedia,
    url: Option<String>,
    #[serde(rename = "type")]
    kind: &'static str,
    filename: String,
    timestamp: String,
}

async fn download(
    State(state): State<AppState>,
    query: Result<Query<MediaQuery>, QueryRejection>,
) -> ApiResult<Json<DownloadResponse>> {
    let Query(query) = query.map_err(|e| ApiError::from(e).stamped())?;
    let request = query.into_request().map_err(|e| ApiError::from(e).stamped())?;
    let media = state
        .resolver
        .resolve(&request)
        .await
        .map_err(|e| ApiError::from(e).stamped())?;

    Ok(Json(DownloadResponse {
        success: true,
        url: media.primary_url(request.kind()).map(str::to_string),
        kind: request.kind().type_token(),
        filename: attachment_filename(&media.title, request.kind()),
        timestamp: timestamp(),
        media,
    }))
}

async fn stream(
    State(state): State<AppState>,
    query: Result<Query<MediaQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query.map_err(|e| ApiError::from(e).stamped())?;
    let relay = state
        .resolver
        .resolve_and_relay(&query)
        .await
        .map_err(|e| ApiError::from(e).stamped())?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(relay.content_type),
    );
    let disposition = HeaderValue::from_str(&relay.content_disposition()).map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).stamped()
    })?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = relay.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok((headers, Body::from_stream(relay.body)).into_response())
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}
