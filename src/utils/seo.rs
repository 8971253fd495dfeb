// src/utils/seo.rs

use regex::Regex;
use std::sync::LazyLock;

/// `#word` where word is alphanumeric + underscore, unbounded length.
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"));

/// Scans `text` for `#word` tokens, in order, case preserved.
/// Returned tags carry no leading `#`.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Canned expansion phrase for a known topic hashtag.
/// Lookup is case-insensitive; unknown tags yield `None`.
fn topic_phrase(tag: &str) -> Option<&'static str> {
    let phrase = match tag.to_lowercase().as_str() {
        "tech" => "technology insights and updates",
        "news" => "breaking news and current events",
        "business" => "business strategies and market trends",
        "health" => "health and wellness advice",
        "travel" => "travel destinations and adventure stories",
        "food" => "culinary experiences and recipe ideas",
        "sports" => "sports analysis and game highlights",
        "music" => "music reviews and artist spotlights",
        "books" => "book recommendations and reading insights",
        "movies" => "film reviews and cinematic experiences",
        _ => return None,
    };
    Some(phrase)
}

/// Synthesizes the stored SEO description for a ping.
///
/// Hashtag tokens are removed from the text, then the expansion phrases of
/// any known hashtags are appended. When no hashtag matches the topic table
/// (including when there are no hashtags at all) a generic sentence is
/// appended instead.
pub fn build_seo_description(text: &str, hashtags: &[String]) -> String {
    let base = HASHTAG_RE.replace_all(text, "");

    let phrases: Vec<&str> = hashtags
        .iter()
        .filter_map(|tag| topic_phrase(tag))
        .collect();

    if phrases.is_empty() {
        format!("{}. Discover insights and discussions on this topic.", base)
    } else {
        format!("{}. Explore {}.", base, phrases.join(", "))
    }
}
