/// Splits a comma-separated list of URLs.
///
/// Each piece is trimmed; empty pieces are dropped; order is preserved.
///
/// ```
/// use feedroom::util::split_urls;
///
/// assert_eq!(
///     split_urls(" https://a/feed.xml, ,https://b/rss "),
///     vec!["https://a/feed.xml", "https://b/rss"]
/// );
/// assert!(split_urls("").is_empty());
/// ```
pub fn split_urls(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
