//! End-to-end enrichment run: fetch → filter → enrich → merge → synthesize.

use chrono::Utc;
use std::sync::Arc;

use crate::config::Settings;
use crate::content::{
    merge_results, run_jobs, ArticleExtractor, Dispatch, FetchResult, Html5everConverter,
    XhtmlConverter,
};
use crate::feed::{
    exclude_categories, fetch_feed, retain_recent, write_atom, Feed, FetchError, HttpClient,
};
use crate::util::resolve_link;

/// Counts reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items written to the output feed.
    pub items: usize,
    /// Items removed by the retention filter.
    pub dropped: usize,
    /// Items removed by the category filter.
    pub excluded: usize,
    /// Items that received extracted content.
    pub enriched: usize,
    /// Items whose enrichment failed and were passed through.
    pub failed: usize,
}

/// Everything needed to enrich feeds with one set of [`Settings`].
pub struct Pipeline {
    client: HttpClient,
    extractor: ArticleExtractor,
    converter: Arc<dyn XhtmlConverter>,
    max_days_back: u32,
    excluded_categories: Vec<String>,
    dispatch: Dispatch,
}

impl Pipeline {
    /// Builds the HTTP client and parses the selector. Fails on an invalid
    /// user agent, proxy or selector.
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = HttpClient::new(
            &settings.user_agent,
            settings.timeout,
            settings.proxy.as_deref(),
        )?;
        let extractor = ArticleExtractor::new(client.clone(), &settings.selector)?;

        Ok(Self {
            client,
            extractor,
            converter: Arc::new(Html5everConverter),
            max_days_back: settings.max_days_back,
            excluded_categories: settings.exclude_categories.clone(),
            dispatch: Dispatch::from_settings(settings.pool_size, settings.stagger),
        })
    }

    /// Swaps the HTML to XHTML converter.
    pub fn with_converter(mut self, converter: Arc<dyn XhtmlConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Runs the whole pipeline for `source_url` and returns the Atom document.
    ///
    /// Only feed-level failures are errors. Per-item failures are logged and
    /// the item is written without enriched content.
    pub async fn run(&self, source_url: &str) -> Result<(String, RunSummary), FetchError> {
        let mut feed = fetch_feed(&self.client, source_url).await?;
        let now = Utc::now();

        let dropped = retain_recent(&mut feed, self.max_days_back, now);
        let excluded = exclude_categories(&mut feed, &self.excluded_categories);
        let (enriched, failed) =
            enrich_feed(&mut feed, source_url, &self.extractor, self.dispatch).await;

        let summary = RunSummary {
            items: feed.items.len(),
            dropped,
            excluded,
            enriched,
            failed,
        };
        tracing::info!(
            items = summary.items,
            dropped = summary.dropped,
            excluded = summary.excluded,
            enriched = summary.enriched,
            failed = summary.failed,
            "Enrichment finished"
        );

        Ok((write_atom(&feed, self.converter.as_ref(), now), summary))
    }
}

/// Fetches the linked page of every item and stores the extracted fragment
/// in `Item::content`. Returns `(enriched, failed)`.
///
/// Relative links are resolved against `source_url`. An item without a link
/// counts as failed without being dispatched.
pub async fn enrich_feed(
    feed: &mut Feed,
    source_url: &str,
    extractor: &ArticleExtractor,
    dispatch: Dispatch,
) -> (usize, usize) {
    let item_count = feed.items.len();
    let mut results: Vec<FetchResult> = Vec::with_capacity(item_count);
    let mut jobs = Vec::with_capacity(item_count);

    for item in &feed.items {
        match item.primary_link().filter(|link| !link.trim().is_empty()) {
            Some(link) => jobs.push((item.index, resolve_link(link, source_url))),
            None => results.push(FetchResult {
                index: item.index,
                result: Err(FetchError::MissingLink),
            }),
        }
    }

    let work = {
        let extractor = extractor.clone();
        move |index: usize, url: String| {
            let extractor = extractor.clone();
            async move {
                tracing::debug!(index, url = %url, "Fetching article");
                extractor.fetch(&url).await
            }
        }
    };
    results.extend(run_jobs(jobs, dispatch, work).await);

    let failed = results.iter().filter(|r| r.result.is_err()).count();
    let slots = merge_results(results, item_count);

    let mut enriched = 0;
    for (item, content) in feed.items.iter_mut().zip(slots) {
        if content.is_some() {
            enriched += 1;
        }
        item.content = content;
    }
    (enriched, failed)
}
