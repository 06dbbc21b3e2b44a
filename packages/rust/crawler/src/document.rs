//! Typed query contract over a parsed markup tree.
//!
//! Extraction code is written against [`ContentTree`] and [`ContentNode`]
//! rather than a concrete parser, so the structural lookups it performs
//! (by id, by class set, by tag, child and sibling walks) are explicit.
//! [`HtmlPage`] implements the contract over `scraper`.

use scraper::{ElementRef, Html, Node, Selector};

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A node of a parsed page: either an element or a run of text.
pub trait ContentNode<'a>: Copy + Sized {
    /// Lowercase tag name, or `None` for text nodes.
    fn tag_name(&self) -> Option<&'a str>;

    /// Attribute value on an element.
    fn attr(&self, name: &str) -> Option<&'a str>;

    /// Raw string content if this is a text node.
    fn as_text(&self) -> Option<&'a str>;

    /// Concatenated text of this node and all its descendants.
    fn text(&self) -> String;

    /// Direct children (elements and non-empty text runs) in document order.
    fn children(&self) -> Vec<Self>;

    /// Next sibling element, skipping interleaved text.
    fn next_sibling(&self) -> Option<Self>;

    /// First descendant carrying every class in `classes`.
    fn find_by_class(&self, classes: &[&str]) -> Option<Self>;

    /// All descendants with the given tag, in document order.
    fn find_all_by_tag(&self, tag: &str) -> Vec<Self>;

    /// Whether this is an element with tag `tag`.
    fn is_tag(&self, tag: &str) -> bool {
        self.tag_name() == Some(tag)
    }

    /// First element child.
    fn first_element_child(&self) -> Option<Self> {
        self.children().into_iter().find(|c| c.tag_name().is_some())
    }
}

/// A whole parsed page.
pub trait ContentTree {
    type Node<'a>: ContentNode<'a>
    where
        Self: 'a;

    /// Element with the given `id` attribute.
    fn find_by_id(&self, id: &str) -> Option<Self::Node<'_>>;
}

// ---------------------------------------------------------------------------
// scraper implementation
// ---------------------------------------------------------------------------

/// A page parsed with `scraper`.
pub struct HtmlPage {
    doc: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }
}

impl ContentTree for HtmlPage {
    type Node<'a> = HtmlNode<'a>;

    fn find_by_id(&self, id: &str) -> Option<HtmlNode<'_>> {
        let sel = Selector::parse(&format!(r#"[id="{id}"]"#)).ok()?;
        self.doc.select(&sel).next().map(HtmlNode::Element)
    }
}

/// Node handle into an [`HtmlPage`].
#[derive(Debug, Clone, Copy)]
pub enum HtmlNode<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

impl<'a> ContentNode<'a> for HtmlNode<'a> {
    fn tag_name(&self) -> Option<&'a str> {
        match self {
            HtmlNode::Element(el) => Some(el.value().name()),
            HtmlNode::Text(_) => None,
        }
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        match self {
            HtmlNode::Element(el) => el.value().attr(name),
            HtmlNode::Text(_) => None,
        }
    }

    fn as_text(&self) -> Option<&'a str> {
        match self {
            HtmlNode::Element(_) => None,
            HtmlNode::Text(t) => Some(*t),
        }
    }

    fn text(&self) -> String {
        match self {
            HtmlNode::Element(el) => el.text().collect(),
            HtmlNode::Text(t) => (*t).to_string(),
        }
    }

    fn children(&self) -> Vec<Self> {
        let HtmlNode::Element(el) = self else {
            return Vec::new();
        };

        el.children()
            .filter_map(|child| match child.value() {
                Node::Text(text) if !text.is_empty() => Some(HtmlNode::Text(&**text)),
                Node::Element(_) => ElementRef::wrap(child).map(HtmlNode::Element),
                _ => None,
            })
            .collect()
    }

    fn next_sibling(&self) -> Option<Self> {
        match self {
            HtmlNode::Element(el) => el
                .next_siblings()
                .find_map(ElementRef::wrap)
                .map(HtmlNode::Element),
            HtmlNode::Text(_) => None,
        }
    }

    fn find_by_class(&self, classes: &[&str]) -> Option<Self> {
        let HtmlNode::Element(el) = self else {
            return None;
        };
        if classes.is_empty() {
            return None;
        }

        let compound: String = classes.iter().map(|c| format!(".{c}")).collect();
        let sel = Selector::parse(&compound).ok()?;
        el.select(&sel).next().map(HtmlNode::Element)
    }

    fn find_all_by_tag(&self, tag: &str) -> Vec<Self> {
        let HtmlNode::Element(el) = self else {
            return Vec::new();
        };
        let Ok(sel) = Selector::parse(tag) else {
            return Vec::new();
        };
        el.select(&sel).map(HtmlNode::Element).collect()
    }
}
