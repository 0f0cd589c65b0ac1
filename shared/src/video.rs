//! YouTube link handling for event videos.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref VIDEO_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

fn valid_id(candidate: &str) -> Option<String> {
    if VIDEO_ID_REGEX.is_match(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Extract the 11 character video id from a YouTube link.
///
/// Accepts `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/` and `/live/` forms,
/// with or without a scheme.
pub fn youtube_id(src: &str) -> Option<String> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    match host {
        "youtu.be" => segments.next().and_then(valid_id),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .and_then(|(_, v)| valid_id(&v)),
                Some("embed") | Some("shorts") | Some("live") | Some("v") => {
                    segments.next().and_then(valid_id)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Thumbnail url for a YouTube link, if the link is recognised
pub fn thumbnail_url(src: &str) -> Option<String> {
    youtube_id(src).map(|id| format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id))
}
