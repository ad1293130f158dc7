use chrono::{DateTime, Utc};

/// A feed normalized from RSS 2.0 or Atom, owned by the pipeline for one run.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    /// Feed title. Written verbatim, empty when the source had none.
    pub title: String,
    /// Feed-level identifier. Only Atom sources carry one.
    pub id: Option<String>,
    /// The single canonical (alternate) link, when the source names one.
    pub link: Option<String>,
    /// Every link the source declared, in source order.
    pub links: Vec<String>,
    pub updated: Option<DateTime<Utc>>,
    pub copyright: Option<String>,
    pub authors: Vec<Author>,
    pub generator: Option<String>,
    /// Icon or logo URL.
    pub image: Option<String>,
    pub items: Vec<Item>,
}

/// One entry of a [`Feed`].
///
/// `index` is the item's position in `Feed::items` and is the only key used
/// to correlate fetched article bodies with their item. GUIDs are not unique
/// enough for that: feeds repeat them or leave them out entirely.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub index: usize,
    pub title: String,
    /// Written as the Atom `id`. May be empty, or an id feed-rs synthesized
    /// when the source item had none.
    pub guid: String,
    pub link: Option<String>,
    pub links: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub authors: Vec<Author>,
    pub categories: Vec<String>,
    /// The feed-supplied summary or body.
    pub description: Option<String>,
    /// Article body extracted from the linked page, set after enrichment.
    pub content: Option<String>,
}

impl Item {
    /// The URL the enrichment fetch starts from: the canonical link, else the first link.
    pub fn primary_link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .or_else(|| self.links.first().map(String::as_str))
    }

    /// Timestamp used for retention: updated, falling back to published.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}

/// A feed or item author. Either field may be empty; an author with neither
/// is still written as an empty `<author/>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Feed {
    /// Renumbers `Item::index` to match positions after items were removed.
    pub fn reindex(&mut self) {
        for (position, item) in self.items.iter_mut().enumerate() {
            item.index = position;
        }
    }
}
