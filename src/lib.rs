//! Re-publishes an RSS or Atom feed as Atom, with each entry's full article
//! body fetched from its linked page and embedded as content.
//!
//! The pipeline, in order:
//!
//! 1. [`feed::fetch_feed`] reads the source feed into the [`feed::Feed`] model
//! 2. [`feed::retain_recent`] drops items past the retention window
//! 3. [`pipeline::enrich_feed`] fetches linked pages concurrently and
//!    captures the selector match of each
//! 4. [`feed::write_atom`] writes the Atom document, normalizing captured
//!    HTML to XHTML where possible
//!
//! [`pipeline::Pipeline`] runs all of it for one source URL. The [`rewrite`]
//! module is a separate download-and-substitute utility sharing the HTTP
//! client.

pub mod config;
pub mod content;
pub mod feed;
pub mod pipeline;
pub mod rewrite;
pub mod util;

pub use config::{Config, ConfigError, Overrides, Settings};
pub use pipeline::{Pipeline, RunSummary};
