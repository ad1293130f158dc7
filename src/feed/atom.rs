//! Atom 1.0 serialization of an enriched [`Feed`].

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::model::{Author, Feed, Item};
use crate::content::{normalize, Normalized, XhtmlConverter, XHTML_NS};
use crate::util::strip_xml_invalid_chars;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

type XmlWriter = Writer<Vec<u8>>;

/// Serializes `feed` as an Atom document.
///
/// Required Atom elements are always written: a missing feed `updated`
/// becomes `now`, a missing id an empty `<id>`. Summaries and enriched
/// content go through `converter`, falling back to escaped HTML.
///
/// Never fails. A write error stops serialization and whatever was written
/// up to that point is returned.
pub fn write_atom(feed: &Feed, converter: &dyn XhtmlConverter, now: DateTime<Utc>) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    if let Err(e) = write_feed(&mut writer, feed, converter, now) {
        tracing::error!(error = %e, "Failed to write Atom document, output is incomplete");
    }

    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

fn write_feed(
    writer: &mut XmlWriter,
    feed: &Feed,
    converter: &dyn XhtmlConverter,
    now: DateTime<Utc>,
) -> Result<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NS));
    writer
        .write_event(Event::Start(root))
        .context("Failed to write feed element")?;

    text_element(writer, "title", &feed.title)?;
    text_element(writer, "id", feed.id.as_deref().unwrap_or_default())?;
    write_links(writer, feed.link.as_deref(), &feed.links)?;

    let feed_updated = feed.updated.unwrap_or(now);
    text_element(writer, "updated", &timestamp(feed_updated))?;

    if let Some(rights) = &feed.copyright {
        text_element(writer, "rights", rights)?;
    }
    for author in &feed.authors {
        write_author(writer, author)?;
    }
    if let Some(generator) = &feed.generator {
        text_element(writer, "generator", generator)?;
    }
    if let Some(icon) = &feed.image {
        text_element(writer, "icon", icon)?;
    }

    for item in &feed.items {
        write_entry(writer, item, converter, feed_updated)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("feed")))
        .context("Failed to write feed end")?;
    Ok(())
}

fn write_entry(
    writer: &mut XmlWriter,
    item: &Item,
    converter: &dyn XhtmlConverter,
    feed_updated: DateTime<Utc>,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("entry")))
        .context("Failed to write entry element")?;

    text_element(writer, "title", &item.title)?;
    text_element(writer, "id", &item.guid)?;

    match (item.updated, item.published) {
        (Some(updated), published) => {
            text_element(writer, "updated", &timestamp(updated))?;
            if let Some(published) = published {
                text_element(writer, "published", &timestamp(published))?;
            }
        }
        (None, Some(published)) => text_element(writer, "updated", &timestamp(published))?,
        (None, None) => text_element(writer, "updated", &timestamp(feed_updated))?,
    }

    for author in &item.authors {
        write_author(writer, author)?;
    }

    if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
        write_html_content(writer, "summary", &normalize(description, converter))?;
    }

    write_links(writer, item.link.as_deref(), &item.links)?;

    match item.content.as_deref().filter(|c| !c.is_empty()) {
        Some(content) => write_html_content(writer, "content", &normalize(content, converter))?,
        None => {
            tracing::info!(
                index = item.index,
                link = item.primary_link().unwrap_or_default(),
                "Entry has no enriched content"
            );
        }
    }

    for term in &item.categories {
        let mut category = BytesStart::new("category");
        category.push_attribute(("term", strip_xml_invalid_chars(term).as_ref()));
        writer
            .write_event(Event::Empty(category))
            .context("Failed to write category element")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("entry")))
        .context("Failed to write entry end")?;
    Ok(())
}

/// One canonical link when there is one, otherwise every known link.
fn write_links(writer: &mut XmlWriter, canonical: Option<&str>, all: &[String]) -> Result<()> {
    let links: Vec<&str> = match canonical {
        Some(link) => vec![link],
        None => all.iter().map(String::as_str).collect(),
    };

    for href in links {
        let mut link = BytesStart::new("link");
        link.push_attribute(("href", strip_xml_invalid_chars(href).as_ref()));
        writer
            .write_event(Event::Empty(link))
            .context("Failed to write link element")?;
    }
    Ok(())
}

fn write_author(writer: &mut XmlWriter, author: &Author) -> Result<()> {
    if author.name.is_empty() && author.email.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("author")))
            .context("Failed to write author element")?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(BytesStart::new("author")))
        .context("Failed to write author element")?;
    if !author.name.is_empty() {
        text_element(writer, "name", &author.name)?;
    }
    if !author.email.is_empty() {
        text_element(writer, "email", &author.email)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("author")))
        .context("Failed to write author end")?;
    Ok(())
}

/// `summary` or `content` carrying either inline XHTML or escaped HTML.
fn write_html_content(writer: &mut XmlWriter, name: &str, body: &Normalized) -> Result<()> {
    match body {
        Normalized::Xhtml(xhtml) => {
            let mut element = BytesStart::new(name);
            element.push_attribute(("type", "xhtml"));
            writer
                .write_event(Event::Start(element))
                .with_context(|| format!("Failed to write {name} element"))?;

            let mut div = BytesStart::new("div");
            div.push_attribute(("xmlns", XHTML_NS));
            writer
                .write_event(Event::Start(div))
                .context("Failed to write xhtml div")?;
            // Already well-formed and escaped
            writer
                .write_event(Event::Text(BytesText::from_escaped(xhtml.as_str())))
                .context("Failed to write xhtml body")?;
            writer
                .write_event(Event::End(BytesEnd::new("div")))
                .context("Failed to write xhtml div end")?;

            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .with_context(|| format!("Failed to write {name} end"))?;
        }
        Normalized::Html(html) => {
            let mut element = BytesStart::new(name);
            element.push_attribute(("type", "html"));
            writer
                .write_event(Event::Start(element))
                .with_context(|| format!("Failed to write {name} element"))?;
            writer
                .write_event(Event::Text(BytesText::new(html)))
                .with_context(|| format!("Failed to write {name} text"))?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .with_context(|| format!("Failed to write {name} end"))?;
        }
    }
    Ok(())
}

/// `<name>text</name>`, with an explicit empty text node so empty elements
/// stay on one line.
fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    let text = strip_xml_invalid_chars(text);
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
