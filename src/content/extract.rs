//! Article body extraction from a linked page.

use scraper::{Html, Selector};
use std::sync::Arc;

use crate::feed::{FetchError, HttpClient, StatusPolicy, MAX_PAGE_SIZE};

/// Fetches article pages and captures the fragment matched by a CSS selector.
///
/// Cheap to clone; workers each hold a copy.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    client: HttpClient,
    selector: Arc<Selector>,
}

impl ArticleExtractor {
    /// Parses `selector` once up front. An invalid selector is a setup error,
    /// reported before any page is fetched.
    pub fn new(client: HttpClient, selector: &str) -> Result<Self, FetchError> {
        let selector = Selector::parse(selector)
            .map_err(|e| FetchError::InvalidSetting(format!("selector '{selector}': {e}")))?;

        Ok(Self {
            client,
            selector: Arc::new(selector),
        })
    }

    /// GETs `url` and returns the fragment the selector matches.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let body = self
            .client
            .get_text(url, StatusPolicy::OkOnly, MAX_PAGE_SIZE)
            .await?;

        // Html is not Send, so parsing stays out of the awaited section
        extract_fragment(&body, &self.selector)
    }
}

/// Removes every `<script>` element from `html`, then returns the outer HTML
/// of all elements matching `selector`, concatenated in document order.
/// Matches nested inside another match are not repeated.
///
/// Zero matches is [`FetchError::NoMatch`].
pub fn extract_fragment(html: &str, selector: &Selector) -> Result<String, FetchError> {
    let mut document = Html::parse_document(html);

    let scripts: Vec<_> = document
        .root_element()
        .descendants()
        .filter(|node| {
            node.value()
                .as_element()
                .is_some_and(|element| element.name() == "script")
        })
        .map(|node| node.id())
        .collect();

    for id in scripts {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    // A match inside an earlier match is already part of its outer HTML.
    let mut captured = Vec::new();
    let mut fragment = String::new();
    for m in document.select(selector) {
        if m.ancestors().any(|a| captured.contains(&a.id())) {
            continue;
        }
        captured.push(m.id());
        fragment.push_str(&m.html());
    }
    if fragment.is_empty() {
        return Err(FetchError::NoMatch);
    }
    Ok(fragment)
}
