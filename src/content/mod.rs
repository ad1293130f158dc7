//! Article content: fetching linked pages, capturing their body, and
//! normalizing it for embedding in Atom.
//!
//! - [`extract`] - page fetch plus script stripping and selector capture
//! - [`pool`] - bounded concurrent dispatch and index-keyed merge
//! - [`xhtml`] - HTML to XHTML conversion with escaped-HTML fallback

mod extract;
mod pool;
mod xhtml;

pub use extract::{extract_fragment, ArticleExtractor};
pub use pool::{merge_results, run_jobs, Dispatch, FetchResult, DEFAULT_POOL_SIZE};
pub use xhtml::{
    check_well_formed, normalize, ConversionError, Html5everConverter, Normalized, XhtmlConverter,
    XHTML_NS,
};
