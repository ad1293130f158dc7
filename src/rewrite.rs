//! Download a single document and apply ordered regex substitutions to it.
//!
//! Independent of the enrichment pipeline; it only shares the HTTP client.

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use thiserror::Error;

use crate::feed::{FetchError, HttpClient, StatusPolicy, MAX_FEED_SIZE};

#[derive(Debug, Error)]
pub enum RewriteError {
    /// Patterns and replacements must come in pairs
    #[error("Pattern '{0}' has no replacement")]
    UnpairedPattern(String),
    /// A pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The download failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A pattern and the literal text that replaces each of its matches.
#[derive(Debug, Clone)]
pub struct Replacement {
    pattern: Regex,
    replacement: String,
}

impl Replacement {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, RewriteError> {
        let compiled = Regex::new(pattern).map_err(|source| RewriteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            replacement: replacement.to_string(),
        })
    }

    /// Replaces every match. `$` in the replacement is not special.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern
            .replace_all(text, NoExpand(self.replacement.as_str()))
    }
}

/// Builds rules from a flat `[pattern, replacement, pattern, replacement, ...]` list.
pub fn parse_pairs<S: AsRef<str>>(args: &[S]) -> Result<Vec<Replacement>, RewriteError> {
    let mut rules = Vec::with_capacity(args.len() / 2);

    for pair in args.chunks(2) {
        let pattern = pair[0].as_ref();
        let Some(replacement) = pair.get(1) else {
            return Err(RewriteError::UnpairedPattern(pattern.to_string()));
        };
        rules.push(Replacement::new(pattern, replacement.as_ref())?);
    }
    Ok(rules)
}

/// Applies `rules` in order; each sees the output of the previous one.
pub fn apply_replacements(text: &str, rules: &[Replacement]) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
}

/// Downloads `url` (200 and 304 both count as success) and rewrites it.
pub async fn download_and_rewrite(
    client: &HttpClient,
    url: &str,
    rules: &[Replacement],
) -> Result<String, RewriteError> {
    let body = client
        .get_text(url, StatusPolicy::OkOrNotModified, MAX_FEED_SIZE)
        .await?;
    tracing::info!(url = %url, bytes = body.len(), rules = rules.len(), "Downloaded document");
    Ok(apply_replacements(&body, rules))
}
