use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// `/r/<name>` links, optionally at the start of a bullet or numbered item.
static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:^[ \t]*(?:[*+-]|\d+\.)[ \t]*)?/r/([\w-]+)")
        .expect("mention pattern must compile")
});

/// Every subreddit mentioned in `text`, lowercased, in document order.
/// Repeated mentions are kept.
pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub fn unique_mentions(mentions: &[String]) -> BTreeSet<String> {
    mentions.iter().cloned().collect()
}
