/// Length of `https://`. The host search starts after it, so the slashes of
/// the scheme separator are never mistaken for the start of the path.
const SCHEME_PREFIX_LEN: usize = 8;

/// Turns an item link into an absolute URL.
///
/// Feeds sometimes link items relative to the site root (`/articles/1`).
/// Such links are spliced onto the scheme and host of the feed's own URL;
/// everything else is used verbatim.
///
/// # Examples
///
/// ```
/// use enrichfeed::util::resolve_link;
///
/// assert_eq!(
///     resolve_link("/articles/1", "https://example.org/feed.xml"),
///     "https://example.org/articles/1"
/// );
/// assert_eq!(resolve_link("/a", "https://example.org"), "https://example.org/a");
/// assert_eq!(
///     resolve_link("https://other.org/x", "https://example.org/feed.xml"),
///     "https://other.org/x"
/// );
/// ```
pub fn resolve_link(link: &str, source_url: &str) -> String {
    if !link.starts_with('/') {
        return link.to_string();
    }

    let path_start = source_url
        .get(SCHEME_PREFIX_LEN..)
        .and_then(|rest| rest.find('/'))
        .filter(|&loc| loc > 0);

    match path_start {
        Some(loc) => format!("{}{}", &source_url[..SCHEME_PREFIX_LEN + loc], link),
        // No path on the source URL, e.g. "https://example.org"
        None => format!("{}{}", source_url, link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_root_relative_link_with_feed_path() {
        assert_eq!(
            resolve_link("/articles/1", "https://example.org/feed.xml"),
            "https://example.org/articles/1"
        );
    }

    #[test]
    fn test_root_relative_link_without_feed_path() {
        assert_eq!(resolve_link("/a", "https://example.org"), "https://example.org/a");
    }

    #[test]
    fn test_deep_feed_path_is_discarded() {
        assert_eq!(
            resolve_link("/story", "https://news.example.org/rss/world/feed.xml?x=1"),
            "https://news.example.org/story"
        );
    }

    #[test]
    fn test_absolute_link_verbatim() {
        assert_eq!(
            resolve_link("https://elsewhere.net/p?id=3", "https://example.org/feed"),
            "https://elsewhere.net/p?id=3"
        );
    }

    #[test]
    fn test_empty_link_verbatim() {
        assert_eq!(resolve_link("", "https://example.org/feed"), "");
    }

    #[test]
    fn test_http_source_with_port() {
        assert_eq!(
            resolve_link("/a/b", "http://127.0.0.1:8080/feed"),
            "http://127.0.0.1:8080/a/b"
        );
    }

    #[test]
    fn test_short_source_url_does_not_panic() {
        assert_eq!(resolve_link("/a", "http://"), "http:///a");
    }

    proptest! {
        #[test]
        fn prop_resolved_link_keeps_host_and_path(
            host in "[a-z]{1,12}\\.(org|com|net)",
            feed_path in "(/[a-z0-9]{1,8}){0,3}",
            link in "(/[a-z0-9_-]{1,10}){1,4}",
        ) {
            let source = format!("https://{host}{feed_path}");
            let resolved = resolve_link(&link, &source);
            prop_assert_eq!(resolved, format!("https://{host}{link}"));
        }

        #[test]
        fn prop_non_relative_links_untouched(link in "[a-z][a-z0-9:./]{0,30}") {
            prop_assert_eq!(resolve_link(&link, "https://example.org/feed"), link);
        }
    }
}
