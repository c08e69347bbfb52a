use crate::core::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_MAX_RESULTS: usize = 6;

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    videos: Option<Vec<RawVideo>>,
    error: Option<String>,
}

impl SearchResponse {
    /// A body without a `videos` array is a failed search, whatever the status.
    fn into_videos(self) -> Result<Vec<RawVideo>, ResolveError> {
        match self.videos {
            Some(videos) => Ok(videos),
            None => Err(ResolveError::upstream(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Search service returned no results list".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawVideo {
    title: Option<String>,
    #[serde(default)]
    duration: Value,
    url: Option<String>,
    thumb: Option<String>,
    channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchVideo {
    pub index: usize,
    pub title: Option<String>,
    pub duration: Value,
    pub url: Option<String>,
    pub thumb: Option<String>,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub count: usize,
    pub videos: Vec<SearchVideo>,
}

/// YouTube title search through one fixed remote search service.
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl SearchClient {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub async fn search(&self, title: &str) -> Result<SearchResults, ResolveError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ResolveError::invalid(
                "Missing \"titre\" parameter. Use: /recherche?titre=your_search",
            ));
        }

        let url = format!("{}?title={}", self.endpoint, urlencoding::encode(title));
        debug!("Searching: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::upstream(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ResolveError::upstream(e.to_string()))?;
        let body = serde_json::from_str::<Value>(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("Search service returned HTTP {status}"));
            return Err(ResolveError::upstream(message));
        }

        let parsed: SearchResponse = body
            .ok_or_else(|| ResolveError::upstream("Search service returned invalid JSON"))
            .and_then(|b| {
                serde_json::from_value(b)
                    .map_err(|e| ResolveError::upstream_from("Unexpected search response", e))
            })?;

        Ok(map_results(title, parsed.into_videos()?, self.max_results))
    }
}

fn map_results(query: &str, videos: Vec<RawVideo>, max_results: usize) -> SearchResults {
    let videos: Vec<SearchVideo> = videos
        .into_iter()
        .take(max_results)
        .enumerate()
        .map(|(i, vid)| SearchVideo {
            index: i + 1,
            title: vid.title,
            duration: vid.duration,
            url: vid.url,
            thumb: vid.thumb,
            channel: vid
                .channel
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();

    SearchResults {
        query: query.to_string(),
        count: videos.len(),
        videos,
    }
}
