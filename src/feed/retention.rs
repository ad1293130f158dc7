use chrono::{DateTime, Duration, Utc};

use super::model::Feed;

/// Drops items whose effective timestamp (updated, else published) is older
/// than `max_days_back` days before `now`.
///
/// `max_days_back == 0` disables the filter. Items without a usable
/// timestamp are always kept. Surviving items are renumbered so that
/// `Item::index` matches their new position.
///
/// Returns the number of items removed.
pub fn retain_recent(feed: &mut Feed, max_days_back: u32, now: DateTime<Utc>) -> usize {
    if max_days_back == 0 {
        return 0;
    }

    let cutoff = now - Duration::days(i64::from(max_days_back));
    let before = feed.items.len();

    feed.items.retain(|item| match item.effective_timestamp() {
        Some(ts) => ts >= cutoff,
        None => true,
    });
    feed.reindex();

    let removed = before - feed.items.len();
    if removed > 0 {
        tracing::info!(
            removed,
            kept = feed.items.len(),
            max_days_back,
            "Dropped items older than the retention window"
        );
    }
    removed
}

/// Drops items tagged with an excluded category. A term matches when it
/// appears, case-insensitively, anywhere in one of the item's categories.
///
/// An empty `terms` list disables the filter. Surviving items are
/// renumbered like [`retain_recent`] does.
///
/// Returns the number of items removed.
pub fn exclude_categories(feed: &mut Feed, terms: &[String]) -> usize {
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return 0;
    }

    let before = feed.items.len();
    feed.items.retain(|item| {
        !item.categories.iter().any(|category| {
            let category = category.to_lowercase();
            terms.iter().any(|term| category.contains(term.as_str()))
        })
    });
    feed.reindex();

    let removed = before - feed.items.len();
    if removed > 0 {
        tracing::info!(
            removed,
            kept = feed.items.len(),
            "Dropped items in excluded categories"
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Item;

    fn item(title: &str, updated_days_ago: Option<i64>, published_days_ago: Option<i64>, now: DateTime<Utc>) -> Item {
        Item {
            title: title.to_string(),
            updated: updated_days_ago.map(|d| now - Duration::days(d)),
            published: published_days_ago.map(|d| now - Duration::days(d)),
            ..Default::default()
        }
    }

    fn feed_of(items: Vec<Item>) -> Feed {
        let mut feed = Feed {
            items,
            ..Default::default()
        };
        feed.reindex();
        feed
    }

    fn titles(feed: &Feed) -> Vec<&str> {
        feed.items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_old_item_dropped_recent_kept() {
        let now = Utc::now();
        let mut feed = feed_of(vec![
            item("old", Some(20), None, now),
            item("recent", Some(5), None, now),
        ]);

        let removed = retain_recent(&mut feed, 15, now);
        assert_eq!(removed, 1);
        assert_eq!(titles(&feed), vec!["recent"]);
    }

    #[test]
    fn test_undated_item_kept() {
        let now = Utc::now();
        let mut feed = feed_of(vec![item("undated", None, None, now)]);

        assert_eq!(retain_recent(&mut feed, 1, now), 0);
        assert_eq!(titles(&feed), vec!["undated"]);
    }

    #[test]
    fn test_published_used_when_updated_missing() {
        let now = Utc::now();
        let mut feed = feed_of(vec![
            item("old-published", None, Some(30), now),
            item("new-published", None, Some(2), now),
        ]);

        retain_recent(&mut feed, 15, now);
        assert_eq!(titles(&feed), vec!["new-published"]);
    }

    #[test]
    fn test_updated_takes_precedence_over_published() {
        let now = Utc::now();
        // Published long ago but updated recently: kept
        let mut feed = feed_of(vec![item("refreshed", Some(1), Some(100), now)]);

        retain_recent(&mut feed, 15, now);
        assert_eq!(titles(&feed), vec!["refreshed"]);
    }

    #[test]
    fn test_zero_disables_filter() {
        let now = Utc::now();
        let mut feed = feed_of(vec![item("ancient", Some(3650), None, now)]);

        assert_eq!(retain_recent(&mut feed, 0, now), 0);
        assert_eq!(feed.items.len(), 1);
    }

    #[test]
    fn test_survivors_are_reindexed_in_order() {
        let now = Utc::now();
        let mut feed = feed_of(vec![
            item("a", Some(1), None, now),
            item("dropped", Some(40), None, now),
            item("b", None, None, now),
            item("c", Some(3), None, now),
        ]);

        retain_recent(&mut feed, 15, now);
        assert_eq!(titles(&feed), vec!["a", "b", "c"]);
        let indices: Vec<usize> = feed.items.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    fn tagged(title: &str, categories: &[&str]) -> Item {
        Item {
            title: title.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn terms(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_excluded_category_dropped_case_insensitively() {
        let mut feed = feed_of(vec![
            tagged("match", &["Local Politics", "news"]),
            tagged("other", &["Science"]),
            tagged("untagged", &[]),
        ]);

        let removed = exclude_categories(&mut feed, &terms(&["POLITICS"]));
        assert_eq!(removed, 1);
        assert_eq!(titles(&feed), vec!["other", "untagged"]);
        let indices: Vec<usize> = feed.items.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_any_term_excludes() {
        let mut feed = feed_of(vec![
            tagged("sport", &["sports"]),
            tagged("weather", &["Weather"]),
            tagged("tech", &["technology"]),
        ]);

        exclude_categories(&mut feed, &terms(&["sport", "weather"]));
        assert_eq!(titles(&feed), vec!["tech"]);
    }

    #[test]
    fn test_no_terms_keeps_everything() {
        let mut feed = feed_of(vec![tagged("a", &["anything"])]);

        assert_eq!(exclude_categories(&mut feed, &[]), 0);
        assert_eq!(exclude_categories(&mut feed, &terms(&["  "])), 0);
        assert_eq!(titles(&feed), vec!["a"]);
    }
}
