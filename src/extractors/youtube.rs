use once_cell::sync::Lazy;
use regex::Regex;

use crate::{BridgeError, Result};

/// URL shapes that carry a video id, tried in order; first match wins
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // youtube.com/watch?v=ID, also when v is not the first query parameter
        r"youtube\.com/watch\?(?:[^#\n]*&)?v=([^&?#\n]+)",
        r"youtu\.be/([^&?#\n]+)",
        r"youtube\.com/embed/([^&?#\n]+)",
        r"youtube\.com/shorts/([^&?#\n]+)",
        r"youtube\.com/v/([^&?#\n]+)",
        r"youtube\.com/live/([^&?#\n]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static video id pattern"))
    .collect()
});

static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static bare id pattern"));

/// Extract the canonical video id from a URL, or pass a bare id through.
///
/// Pure: no network access, redirects are never followed.
pub fn resolve(raw: &str) -> Result<String> {
    let input = raw.trim();

    for pattern in URL_PATTERNS.iter() {
        if let Some(id) = pattern.captures(input).and_then(|caps| caps.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }

    if BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }

    Err(BridgeError::InvalidReference(input.to_string()))
}

/// Watch URL handed to the extraction tool for a resolved id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
