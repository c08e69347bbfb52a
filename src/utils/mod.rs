use crate::core::MediaKind;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::time::Duration;

pub const MAX_FILENAME_LEN: usize = 100;

pub fn sanitize_filename(title: &str) -> String {
    // Header-safe subset only: ASCII letters, digits, space, dot, dash, underscore
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            ' ' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(MAX_FILENAME_LEN)
        .collect();

    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Suggested download name for a relayed title, e.g. `Song_ Best_Mix_.mp3`.
pub fn attachment_filename(title: &str, kind: MediaKind) -> String {
    format!("{}.{}", sanitize_filename(title), kind.extension())
}

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn http_client(user_agent: &str, timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

/// Reads a duration given either as seconds or as `[hh:]mm:ss`.
pub fn parse_duration(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return Some(secs.max(0.0).round() as u64);
            }
            s.split(':').try_fold(0u64, |acc, part| {
                part.trim().parse::<u64>().ok().map(|p| acc * 60 + p)
            })
        }
        _ => None,
    }
}
