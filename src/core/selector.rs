//! Format selection over a metadata document's format list.
//!
//! Audio requests prefer audio-only formats by bitrate and fall back to
//! combined formats, breaking ties towards the smaller picture. Video
//! requests only consider combined audio+video formats.

use crate::core::{MediaKind, Quality, ResolveError, VideoFormat};
use std::cmp::Ordering;

pub fn select_format<'a>(
    formats: &'a [VideoFormat],
    kind: MediaKind,
    quality: Quality,
) -> Result<&'a VideoFormat, ResolveError> {
    let selected = match kind {
        MediaKind::Audio => select_audio(formats),
        MediaKind::Video => select_video(formats, quality),
    };

    selected.ok_or_else(|| {
        ResolveError::no_usable_format(format!(
            "No {} format available for quality '{}'",
            match kind {
                MediaKind::Audio => "audio",
                MediaKind::Video => "video+audio",
            },
            quality
        ))
    })
}

fn select_audio(formats: &[VideoFormat]) -> Option<&VideoFormat> {
    let audio_only = formats
        .iter()
        .filter(|f| f.is_audio_only())
        .max_by(|a, b| a.bitrate().total_cmp(&b.bitrate()));

    audio_only.or_else(|| {
        formats.iter().filter(|f| f.is_combined()).max_by(|a, b| {
            a.bitrate()
                .total_cmp(&b.bitrate())
                // lower height wins, so reverse the height ordering
                .then_with(|| height(b).cmp(&height(a)))
        })
    })
}

fn select_video(formats: &[VideoFormat], quality: Quality) -> Option<&VideoFormat> {
    let combined = formats.iter().filter(|f| f.is_combined());

    match quality {
        Quality::Highest => combined.max_by(|a, b| by_height_then_bitrate(a, b)),
        Quality::Lowest => combined.min_by(|a, b| by_height_then_bitrate(a, b)),
        Quality::Height(target) => {
            let candidates: Vec<&VideoFormat> = combined.collect();
            candidates
                .iter()
                .copied()
                .filter(|f| f.height == Some(target))
                .max_by(|a, b| a.bitrate().total_cmp(&b.bitrate()))
                .or_else(|| {
                    candidates
                        .iter()
                        .copied()
                        .filter(|f| f.height.is_some())
                        .min_by_key(|f| height(f).abs_diff(target))
                })
                .or_else(|| candidates.first().copied())
        }
    }
}

fn height(format: &VideoFormat) -> u32 {
    format.height.unwrap_or(0)
}

fn by_height_then_bitrate(a: &VideoFormat, b: &VideoFormat) -> Ordering {
    height(a)
        .cmp(&height(b))
        .then_with(|| a.bitrate().total_cmp(&b.bitrate()))
}

/// Extractor-native format expression for piping media straight from a
/// local extractor process.
pub fn ytdlp_selector(kind: MediaKind, quality: Quality) -> String {
    match (kind, quality) {
        (MediaKind::Audio, _) => "bestaudio/best".to_string(),
        (MediaKind::Video, Quality::Highest) => {
            "best[vcodec!=none][acodec!=none]/best".to_string()
        }
        (MediaKind::Video, Quality::Lowest) => {
            "worst[vcodec!=none][acodec!=none]/worst".to_string()
        }
        (MediaKind::Video, Quality::Height(h)) => format!(
            "best[height<={h}][vcodec!=none][acodec!=none]/best[height<={h}]/worst[vcodec!=none][acodec!=none]/best"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: &str, vcodec: bool, acodec: bool, height: Option<u32>, bitrate: f64) -> VideoFormat {
        VideoFormat {
            format_id: id.to_string(),
            url: format!("https://cdn.example/{id}"),
            ext: "mp4".to_string(),
            height,
            fps: None,
            vcodec: vcodec.then(|| "avc1".to_string()),
            acodec: acodec.then(|| "mp4a".to_string()),
            filesize: None,
            tbr: Some(bitrate),
            abr: None,
        }
    }

    #[test]
    fn audio_prefers_highest_bitrate_audio_only() {
        let formats = vec![
            format("a64", false, true, None, 64.0),
            format("a128", false, true, None, 128.0),
            format("a96", false, true, None, 96.0),
            format("v720", true, true, Some(720), 2000.0),
        ];
        let selected = select_format(&formats, MediaKind::Audio, Quality::Highest).unwrap();
        assert_eq!(selected.format_id, "a128");
    }

    #[test]
    fn audio_falls_back_to_combined_smallest_on_tie() {
        let formats = vec![
            format("v720", true, true, Some(720), 128.0),
            format("v360", true, true, Some(360), 128.0),
            format("v480", true, true, Some(480), 96.0),
            format("video-only", true, false, Some(1080), 4000.0),
        ];
        let selected = select_format(&formats, MediaKind::Audio, Quality::Highest).unwrap();
        assert_eq!(selected.format_id, "v360");
    }

    #[test]
    fn video_highest_and_lowest_pick_extremes() {
        let formats = vec![
            format("v480", true, true, Some(480), 800.0),
            format("v720", true, true, Some(720), 1500.0),
            format("v360", true, true, Some(360), 500.0),
            format("v1080-silent", true, false, Some(1080), 3000.0),
        ];
        let high = select_format(&formats, MediaKind::Video, Quality::Highest).unwrap();
        let low = select_format(&formats, MediaKind::Video, Quality::Lowest).unwrap();
        assert_eq!(high.format_id, "v720");
        assert_eq!(low.format_id, "v360");
    }

    #[test]
    fn numeric_quality_picks_closest_height() {
        let formats = vec![
            format("v360", true, true, Some(360), 500.0),
            format("v480", true, true, Some(480), 800.0),
            format("v720", true, true, Some(720), 1500.0),
        ];
        let selected = select_format(&formats, MediaKind::Video, Quality::Height(500)).unwrap();
        assert_eq!(selected.height, Some(480));

        let exact = select_format(&formats, MediaKind::Video, Quality::Height(720)).unwrap();
        assert_eq!(exact.format_id, "v720");
    }

    #[test]
    fn no_matching_kind_is_no_usable_format() {
        let formats = vec![format("video-only", true, false, Some(720), 1000.0)];
        let err = select_format(&formats, MediaKind::Video, Quality::Highest).unwrap_err();
        assert!(matches!(err, ResolveError::NoUsableFormat(_)));
        let err = select_format(&formats, MediaKind::Audio, Quality::Highest).unwrap_err();
        assert!(matches!(err, ResolveError::NoUsableFormat(_)));
    }

    #[test]
    fn selector_expressions() {
        assert_eq!(ytdlp_selector(MediaKind::Audio, Quality::Lowest), "bestaudio/best");
        assert!(ytdlp_selector(MediaKind::Video, Quality::Height(480)).starts_with("best[height<=480]"));
        assert!(ytdlp_selector(MediaKind::Video, Quality::Lowest).starts_with("worst"));
    }
}
