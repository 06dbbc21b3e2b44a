//! Paragraph link scanning: every hyperlink in body prose, with context.

use personlink_shared::ParagraphLink;
use tracing::debug;
use url::Url;

use crate::context::{Fragment, LinkFragment, extract_context};
use crate::document::{ContentNode, ContentTree};

/// Element id of the article body.
pub const CONTENT_ID: &str = "mw-content-text";

/// Inline elements dropped before flattening (footnote markers).
const NOISE_TAGS: &[&str] = &["sup"];

const PARAGRAPH_TAG: &str = "p";
const LINK_TAG: &str = "a";

/// Resolves and filters candidate links for [`scan_paragraph_links`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    base_url: Url,
    exclude_patterns: Vec<regex::Regex>,
}

impl ScanOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            exclude_patterns: Vec::new(),
        }
    }

    /// Skip links whose path matches any glob (e.g. `/wiki/File:*`).
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Self {
        self.exclude_patterns = patterns.iter().filter_map(|p| glob_to_regex(p)).collect();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, link: &LinkFragment) -> Option<Url> {
        let href = link.href.as_deref()?;
        let mut resolved = self.base_url.join(href).ok()?;
        resolved.set_fragment(None);

        if self
            .exclude_patterns
            .iter()
            .any(|p| p.is_match(resolved.path()))
        {
            debug!(url = %resolved, "excluded by scan pattern");
            return None;
        }
        Some(resolved)
    }
}

/// Scan a page's paragraphs and emit one [`ParagraphLink`] per resolvable
/// hyperlink, in document order. A page without the expected content block
/// yields no links.
pub fn scan_paragraph_links<T: ContentTree>(page: &T, options: &ScanOptions) -> Vec<ParagraphLink> {
    let Some(body) = page
        .find_by_id(CONTENT_ID)
        .and_then(|content| content.first_element_child())
    else {
        debug!("no content block, nothing to scan");
        return Vec::new();
    };

    body.children()
        .into_iter()
        .filter(|node| node.is_tag(PARAGRAPH_TAG))
        .flat_map(|paragraph| paragraph_links(paragraph, options))
        .collect()
}

/// Links of a single paragraph element.
pub fn paragraph_links<'a, N: ContentNode<'a>>(
    paragraph: N,
    options: &ScanOptions,
) -> Vec<ParagraphLink> {
    let fragments = flatten_paragraph(paragraph);
    if !fragments.iter().any(|f| f.as_link().is_some()) {
        return Vec::new();
    }

    fragments
        .iter()
        .enumerate()
        .filter_map(|(i, fragment)| {
            let link = fragment.as_link()?;
            let target = options.resolve(link)?;
            Some(ParagraphLink {
                text: link
                    .title
                    .clone()
                    .unwrap_or_else(|| link.display_text.clone()),
                link: target.to_string(),
                context: extract_context(&fragments, i),
            })
        })
        .collect()
}

/// Flatten a paragraph's children: text stays text, `<a>` becomes a link
/// fragment, any other element contributes its text. Noise elements vanish.
pub fn flatten_paragraph<'a, N: ContentNode<'a>>(paragraph: N) -> Vec<Fragment> {
    paragraph
        .children()
        .into_iter()
        .filter_map(|child| match child.tag_name() {
            None => child.as_text().map(Fragment::text),
            Some(tag) if NOISE_TAGS.contains(&tag) => None,
            Some(LINK_TAG) => Some(Fragment::Link(LinkFragment {
                display_text: child.text(),
                href: child.attr("href").map(String::from),
                title: child.attr("title").map(String::from),
            })),
            Some(_) => Some(Fragment::text(child.text())),
        })
        .collect()
}

/// Convert a glob-like pattern to a regex.
fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    regex::Regex::new(&format!("^{escaped}$")).ok()
}
