//! Page fetching and biography page extraction.
//!
//! This crate provides:
//! - [`fetch`] — the [`PageFetcher`] seam and its `reqwest` implementation
//! - [`document`] — the typed markup-tree contract, implemented over `scraper`
//! - [`context`] — sentence boundaries and link context windows
//! - [`paragraphs`] — every hyperlink in body prose, with context
//! - [`infobox`] — person details from the infobox

pub mod context;
pub mod document;
pub mod fetch;
pub mod infobox;
pub mod paragraphs;

pub use context::{
    Fragment, LinkFragment, extract_context, find_next_boundary, find_previous_boundary,
};
pub use document::{ContentNode, ContentTree, HtmlNode, HtmlPage};
pub use fetch::{HttpFetcher, PageFetcher};
pub use infobox::extract_person_details;
pub use paragraphs::{ScanOptions, scan_paragraph_links};
