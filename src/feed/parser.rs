use anyhow::Result;
use feed_rs::model::{FeedType, Link, Person};
use feed_rs::parser;

use super::model::{Author, Feed, Item};

/// Parses RSS 2.0 or Atom bytes into the normalized [`Feed`] model.
///
/// Item indices follow source order. RSS has no feed-level identifier, so
/// `Feed::id` is only populated for Atom sources.
///
/// RSS items only carry a publication date. feed-rs mirrors `pubDate` into
/// the entry's `updated`, which is undone here so `Item::updated` is only
/// ever a real update time.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed> {
    let feed = parser::parse(bytes)?;
    let is_rss = matches!(
        feed.feed_type,
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2
    );

    let id = match feed.feed_type {
        FeedType::Atom if !feed.id.trim().is_empty() => Some(feed.id.clone()),
        _ => None,
    };

    let items: Vec<Item> = feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .filter(|d| !d.trim().is_empty());

            Item {
                index,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                guid: entry.id.trim().to_string(),
                link: canonical_link(&entry.links),
                links: entry.links.into_iter().map(|l| l.href).collect(),
                published: entry.published,
                updated: if is_rss { None } else { entry.updated },
                authors: entry.authors.iter().map(to_author).collect(),
                categories: entry
                    .categories
                    .into_iter()
                    .map(|c| c.term)
                    .filter(|t| !t.is_empty())
                    .collect(),
                description,
                content: None,
            }
        })
        .collect();

    Ok(Feed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        id,
        link: canonical_link(&feed.links),
        links: feed.links.into_iter().map(|l| l.href).collect(),
        updated: feed.updated,
        copyright: feed.rights.map(|r| r.content).filter(|r| !r.is_empty()),
        authors: feed.authors.iter().map(to_author).collect(),
        generator: feed
            .generator
            .map(|g| g.content)
            .filter(|g| !g.is_empty()),
        image: feed
            .icon
            .or(feed.logo)
            .map(|i| i.uri)
            .filter(|u| !u.is_empty()),
        items,
    })
}

/// The first link that is an alternate representation (no `rel`, or `rel="alternate"`).
fn canonical_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.clone())
        .filter(|href| !href.is_empty())
}

fn to_author(person: &Person) -> Author {
    Author {
        name: person.name.trim().to_string(),
        email: person
            .email
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    }
}
