use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

const HASHTAG_MAX_CHARS: usize = 100;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());

/// Lower-cased hashtag names in order of first appearance. Names too long for
/// the hashtag table are skipped.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(content)
        .map(|c| c[1].to_lowercase())
        .filter(|name| name.chars().count() <= HASHTAG_MAX_CHARS)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Mentioned usernames, case preserved, deduplicated.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Normalize a `?hashtag=` filter value: strip a leading `#`, lower-case.
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('#').to_lowercase();
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtags_are_lowercased_and_deduplicated() {
        let tags = extract_hashtags("Loving #Rust and #rust, also #axum_0_8! #");
        assert_eq!(tags, vec!["rust", "axum_0_8"]);
    }

    #[test]
    fn overlong_hashtags_are_skipped() {
        let content = format!("#{} #ok", "a".repeat(101));
        assert_eq!(extract_hashtags(&content), vec!["ok"]);
    }

    #[test]
    fn mentions_keep_case() {
        let mentions = extract_mentions("hi @Alice and @bob, cc @Alice");
        assert_eq!(mentions, vec!["Alice", "bob"]);
    }

    #[test]
    fn mention_pattern_matches_inside_emails() {
        assert_eq!(extract_mentions("mail me at me@example.com"), vec!["example"]);
    }

    #[test]
    fn filter_normalization() {
        assert_eq!(normalize_hashtag("#Rust").as_deref(), Some("rust"));
        assert_eq!(normalize_hashtag("  "), None);
        assert_eq!(normalize_hashtag("#"), None);
    }
}
