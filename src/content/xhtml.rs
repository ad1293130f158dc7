//! HTML → XHTML normalization for Atom `type="xhtml"` content.
//!
//! Conversion sits behind [`XhtmlConverter`] so the synthesizer never cares
//! which HTML parser did the work. [`normalize`] wraps a converter with the
//! fallback policy: anything that fails to convert, or converts into
//! something that is not well-formed, is embedded as escaped HTML instead.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use thiserror::Error;

use crate::util::strip_xml_invalid_chars;

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Nesting deeper than this is refused rather than recursed into.
const MAX_DEPTH: usize = 256;

/// Elements serialized as `<name/>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Errors from converting an HTML fragment to XHTML. Always recoverable.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// An element name that cannot be written as an XML name
    #[error("Element name is not a valid XML name: {0}")]
    InvalidName(String),
    /// The fragment nests deeper than the converter is willing to follow
    #[error("Fragment nesting exceeds {0} levels")]
    TooDeep(usize),
    /// The converted output did not parse back as well-formed XML
    #[error("Converted fragment is not well-formed: {0}")]
    Malformed(String),
    /// Writing the converted output failed
    #[error("Failed to write XHTML: {0}")]
    Write(String),
}

/// Converts an HTML fragment into well-formed XHTML markup.
///
/// The output is the fragment's children only; callers supply the wrapping
/// `<div xmlns="http://www.w3.org/1999/xhtml">`.
pub trait XhtmlConverter: Send + Sync {
    fn to_xhtml(&self, html: &str) -> Result<String, ConversionError>;
}

/// Converter built on html5ever (through `scraper`), which repairs markup the
/// way a browser would: unclosed tags are closed, entities decoded, stray
/// end tags dropped. Comments are removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html5everConverter;

impl XhtmlConverter for Html5everConverter {
    fn to_xhtml(&self, html: &str) -> Result<String, ConversionError> {
        let fragment = Html::parse_fragment(html);
        let mut writer = Writer::new(Vec::new());

        write_children(&mut writer, fragment.root_element(), XHTML_NS, 0)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| ConversionError::Write(e.to_string()))
    }
}

/// Content ready to embed in an Atom `summary` or `content` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Well-formed XHTML markup, written raw inside an XHTML `div`.
    Xhtml(String),
    /// The original HTML, written as escaped text with `type="html"`.
    Html(String),
}

/// Converts `html` with `converter`, falling back to escaped HTML when
/// conversion fails. Never fails.
pub fn normalize(html: &str, converter: &dyn XhtmlConverter) -> Normalized {
    let converted = converter
        .to_xhtml(html)
        .and_then(|xhtml| check_well_formed(&xhtml).map(|()| xhtml));

    match converted {
        Ok(xhtml) => Normalized::Xhtml(xhtml),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to convert to XHTML, using HTML instead");
            Normalized::Html(strip_xml_invalid_chars(html).into_owned())
        }
    }
}

/// Verifies that `markup` parses as XML once wrapped in a single root element.
pub fn check_well_formed(markup: &str) -> Result<(), ConversionError> {
    let wrapped = format!("<root>{markup}</root>");
    let mut reader = Reader::from_str(&wrapped);
    let malformed = |e: &dyn std::fmt::Display| ConversionError::Malformed(e.to_string());
    let mut depth: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| malformed(&e))?;
                    attr.decode_and_unescape_value(reader.decoder())
                        .map_err(|e| malformed(&e))?;
                }
            }
            Ok(Event::Empty(e)) => {
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| malformed(&e))?;
                    attr.decode_and_unescape_value(reader.decoder())
                        .map_err(|e| malformed(&e))?;
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(e)) => {
                e.unescape().map_err(|e| malformed(&e))?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e)),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ConversionError::Malformed("unclosed element".into()));
    }
    Ok(())
}

fn write_children(
    writer: &mut Writer<Vec<u8>>,
    parent: ElementRef<'_>,
    parent_ns: &str,
    depth: usize,
) -> Result<(), ConversionError> {
    if depth > MAX_DEPTH {
        return Err(ConversionError::TooDeep(MAX_DEPTH));
    }

    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                let text = strip_xml_invalid_chars(text);
                write(writer, Event::Text(BytesText::new(&text)))?;
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(writer, element, parent_ns, depth)?;
                }
            }
            // Comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: ElementRef<'_>,
    parent_ns: &str,
    depth: usize,
) -> Result<(), ConversionError> {
    let value = element.value();
    let name = value.name();
    if !is_xml_name(name) {
        return Err(ConversionError::InvalidName(name.to_string()));
    }

    let ns: &str = &value.name.ns;
    let mut start = BytesStart::new(name);
    if !ns.is_empty() && ns != parent_ns {
        start.push_attribute(("xmlns", ns));
    }
    for (attr, attr_value) in value.attrs() {
        if attr == "xmlns" || !is_xml_name(attr) {
            tracing::debug!(attribute = %attr, "Dropping attribute without a valid XML name");
            continue;
        }
        let attr_value = strip_xml_invalid_chars(attr_value);
        start.push_attribute((attr, attr_value.as_ref()));
    }

    if VOID_ELEMENTS.contains(&name) && !element.has_children() {
        return write(writer, Event::Empty(start));
    }

    write(writer, Event::Start(start))?;
    let child_ns = if ns.is_empty() { parent_ns } else { ns };
    write_children(writer, element, child_ns, depth + 1)?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ConversionError> {
    writer
        .write_event(event)
        .map_err(|e| ConversionError::Write(e.to_string()))
}

/// A conservative XML name check: no prefixes, ASCII punctuation limited to
/// `-`, `_` and `.`.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
