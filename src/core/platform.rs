use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Twitter,
    Facebook,
    Reddit,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Reddit => "reddit",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Host-anchored so that e.g. "notyoutube.com" does not match.
const HOST_PREFIX: &str = r"(?i)^(?:https?://)?(?:[a-z0-9-]+\.)*";

static PLATFORM_PATTERNS: LazyLock<Vec<(Platform, Regex)>> = LazyLock::new(|| {
    [
        (Platform::YouTube, r"(?:youtube\.com|youtu\.be|youtube-nocookie\.com)(?:[/?#:]|$)"),
        (Platform::TikTok, r"tiktok\.com(?:[/?#:]|$)"),
        (Platform::Instagram, r"instagram\.com/"),
        (Platform::Twitter, r"(?:twitter\.com|x\.com)/"),
        (Platform::Facebook, r"(?:facebook\.com|fb\.watch|fb\.com)(?:[/?#:]|$)"),
        (Platform::Reddit, r"(?:reddit\.com|redd\.it)/"),
    ]
    .into_iter()
    .filter_map(|(platform, host)| {
        Regex::new(&format!("{HOST_PREFIX}{host}"))
            .ok()
            .map(|re| (platform, re))
    })
    .collect()
});

static YOUTUBE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)|youtube-nocookie\.com/embed/|youtu\.be/)([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
    )
    .ok()
});

/// Detects which platform a URL belongs to. Patterns are tried in a fixed
/// order; anything unmatched is [`Platform::Unknown`].
pub fn classify(url: &str) -> Platform {
    let url = url.trim();
    PLATFORM_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(url))
        .map(|(platform, _)| *platform)
        .unwrap_or(Platform::Unknown)
}

/// Extracts the 11-character YouTube video id from watch, short-link,
/// shorts, embed and live URLs.
pub fn extract_video_id(url: &str) -> Option<String> {
    YOUTUBE_ID
        .as_ref()?
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strict gate applied to YouTube URLs before any adapter runs.
pub fn is_valid_video_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_supported_platforms() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Platform::YouTube),
            ("https://youtu.be/dQw4w9WgXcQ", Platform::YouTube),
            ("m.youtube.com/watch?v=dQw4w9WgXcQ", Platform::YouTube),
            ("https://music.youtube.com/watch?v=dQw4w9WgXcQ", Platform::YouTube),
            ("https://www.tiktok.com/@user/video/7234567890123456789", Platform::TikTok),
            ("https://vm.tiktok.com/ZMabc123/", Platform::TikTok),
            ("https://www.instagram.com/reel/Cabc123/", Platform::Instagram),
            ("https://twitter.com/user/status/1234567890", Platform::Twitter),
            ("https://x.com/user/status/1234567890", Platform::Twitter),
            ("https://www.facebook.com/watch/?v=1234567890", Platform::Facebook),
            ("https://fb.watch/abcDEF/", Platform::Facebook),
            ("https://www.reddit.com/r/videos/comments/abc/title/", Platform::Reddit),
            ("HTTPS://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ", Platform::YouTube),
        ];
        for (url, expected) in cases {
            assert_eq!(classify(url), expected, "{url}");
        }
    }

    #[test]
    fn unmatched_strings_are_unknown() {
        for url in [
            "",
            "hello world",
            "https://vimeo.com/123456",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
            "https://example.com/youtube.com/watch",
            "ftp://tiktok.example.org",
        ] {
            assert_eq!(classify(url), Platform::Unknown, "{url}");
        }
    }

    #[test]
    fn extracts_video_ids() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://m.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=123", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1", "dQw4w9WgXcQ"),
        ];
        for (url, id) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(id), "{url}");
        }
    }

    #[test]
    fn rejects_malformed_youtube_urls() {
        assert!(!is_valid_video_url("https://www.youtube.com/"));
        assert!(!is_valid_video_url("https://www.youtube.com/watch?v=short"));
        assert!(!is_valid_video_url("https://www.youtube.com/channel/UC123"));
        assert!(is_valid_video_url("https://youtu.be/dQw4w9WgXcQ"));
    }
}
