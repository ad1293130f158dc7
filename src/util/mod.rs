//! Small helpers shared by the fetch and synthesis stages.
//!
//! - **Link resolution**: turning root-relative item links into absolute URLs
//! - **Text hygiene**: stripping characters XML cannot carry

mod text;
mod url;

pub use text::strip_xml_invalid_chars;
pub use url::resolve_link;
