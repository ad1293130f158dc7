//! Feed handling: reading the source feed and writing the enriched one.
//!
//! - [`model`] - the normalized feed/item model shared by every stage
//! - [`parser`] - RSS 2.0 and Atom parsing via `feed-rs`
//! - [`fetcher`] - HTTP client with browser headers, size limits and timeouts
//! - [`retention`] - age and category based item filtering
//! - [`atom`] - Atom serialization with `quick-xml`

mod atom;
mod fetcher;
mod model;
mod parser;
mod retention;

pub use atom::{write_atom, ATOM_NS};
pub use fetcher::{
    fetch_feed, FetchError, HttpClient, StatusPolicy, MAX_FEED_SIZE, MAX_PAGE_SIZE,
};
pub use model::{Author, Feed, Item};
pub use parser::parse_feed;
pub use retention::{exclude_categories, retain_recent};
