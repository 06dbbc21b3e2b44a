//! Sentence-bounded context windows around hyperlinks.
//!
//! A paragraph is flattened into a sequence of [`Fragment`]s. Sentence
//! boundaries are the text fragments containing a terminator (`.`, `?`, `!`);
//! the context of a link is the sentence it sits in plus one sentence either
//! side. Boundary search and context assembly always run over the same slice,
//! so indices stay meaningful for the whole paragraph.

/// Characters that end a sentence.
const TERMINATORS: [char; 3] = ['.', '?', '!'];

/// One item of a flattened paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Plain prose (text nodes and the text of non-link inline elements).
    Text(String),
    /// A hyperlink.
    Link(LinkFragment),
}

/// A hyperlink item inside a flattened paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFragment {
    /// Visible link text.
    pub display_text: String,
    /// Raw `href`, unresolved.
    pub href: Option<String>,
    /// `title` attribute.
    pub title: Option<String>,
}

impl Fragment {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn link(display_text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::Link(LinkFragment {
            display_text: display_text.into(),
            href: Some(href.into()),
            title: None,
        })
    }

    /// Text as it reads in the plain-text view of the paragraph.
    pub fn plain_text(&self) -> &str {
        match self {
            Fragment::Text(s) => s,
            Fragment::Link(link) => &link.display_text,
        }
    }

    /// Only text fragments can close a sentence; link text never does.
    pub fn is_sentence_boundary(&self) -> bool {
        match self {
            Fragment::Text(s) => s.contains(TERMINATORS),
            Fragment::Link(_) => false,
        }
    }

    pub fn as_link(&self) -> Option<&LinkFragment> {
        match self {
            Fragment::Link(link) => Some(link),
            Fragment::Text(_) => None,
        }
    }

    /// Byte offset of the first terminator, for text fragments only.
    fn terminator_offset(&self) -> Option<usize> {
        match self {
            Fragment::Text(s) => s.find(TERMINATORS),
            Fragment::Link(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary search
// ---------------------------------------------------------------------------

/// Highest index below `index` holding a sentence boundary, or `0`.
pub fn find_previous_boundary(fragments: &[Fragment], index: usize) -> usize {
    if index > fragments.len() {
        return 0;
    }
    (0..index)
        .rev()
        .find(|&i| fragments[i].is_sentence_boundary())
        .unwrap_or(0)
}

/// Lowest index above `index` holding a sentence boundary, or the last index.
pub fn find_next_boundary(fragments: &[Fragment], index: usize) -> usize {
    let last = fragments.len().saturating_sub(1);
    (index.saturating_add(1)..fragments.len())
        .find(|&i| fragments[i].is_sentence_boundary())
        .unwrap_or(last)
}

// ---------------------------------------------------------------------------
// Context assembly
// ---------------------------------------------------------------------------

/// Build the previous + current + next sentence string around the link at
/// `link_index`.
pub fn extract_context(fragments: &[Fragment], link_index: usize) -> String {
    if fragments.is_empty() {
        return String::new();
    }

    let current_start = find_previous_boundary(fragments, link_index);
    let current_end = find_next_boundary(fragments, link_index);
    let current = form_sentence(fragments, current_start, current_end);

    let previous_start = find_previous_boundary(fragments, current_start);
    let previous = if previous_start != current_start {
        form_sentence(fragments, previous_start, current_start)
    } else {
        String::new()
    };

    let next_end = find_next_boundary(fragments, current_end);
    let next = if next_end != current_end {
        form_sentence(fragments, current_end, next_end)
    } else {
        String::new()
    };

    clean_text(&format!("{previous}{current}{next}"))
}

/// Text from just past the terminator in `begin` through the terminator in
/// `end`, inclusive. A fragment without a terminator contributes all of its
/// text.
fn form_sentence(fragments: &[Fragment], begin: usize, end: usize) -> String {
    let begin_fragment = &fragments[begin];
    if begin == end {
        return begin_fragment.plain_text().to_string();
    }

    let begin_text = begin_fragment.plain_text();
    let head = match begin_fragment.terminator_offset() {
        Some(i) => &begin_text[i + 1..],
        None => begin_text,
    };

    let end_fragment = &fragments[end];
    let end_text = end_fragment.plain_text();
    let tail = match end_fragment.terminator_offset() {
        Some(i) => &end_text[..=i],
        None => end_text,
    };

    let mut sentence = String::from(head);
    for fragment in &fragments[begin + 1..end] {
        sentence.push_str(fragment.plain_text());
    }
    sentence.push_str(tail);
    sentence
}

/// Strip embedded newlines and trim surrounding whitespace.
pub fn clean_text(text: &str) -> String {
    text.replace('\n', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Fragment {
        Fragment::text(s)
    }

    fn a(s: &str) -> Fragment {
        Fragment::link(s, format!("/wiki/{}", s.replace(' ', "_")))
    }

    #[test]
    fn links_are_never_boundaries() {
        let seq = vec![t("He met "), a("St. Louis"), t(" later")];
        assert!(!seq[1].is_sentence_boundary());
        assert_eq!(find_previous_boundary(&seq, 2), 0);
        assert_eq!(find_next_boundary(&seq, 0), 2);
    }

    #[test]
    fn boundary_search_finds_nearest_terminator() {
        let seq = vec![
            t("One. Two "),
            a("X"),
            t(" three"),
            t(" four! Five "),
            a("Y"),
            t(" six?"),
        ];
        assert_eq!(find_previous_boundary(&seq, 4), 3);
        assert_eq!(find_previous_boundary(&seq, 3), 0);
        assert_eq!(find_next_boundary(&seq, 1), 3);
        assert_eq!(find_next_boundary(&seq, 4), 5);
    }

    #[test]
    fn boundary_search_degrades_at_edges() {
        let seq = vec![t("no terminator "), a("X"), t(" here")];
        assert_eq!(find_previous_boundary(&seq, 1), 0);
        assert_eq!(find_next_boundary(&seq, 1), 2);

        // Out-of-range indices fall back to the sequence ends.
        assert_eq!(find_previous_boundary(&seq, 99), 0);
        assert_eq!(find_next_boundary(&seq, 99), 2);
        assert_eq!(find_next_boundary(&[], 0), 0);
    }

    #[test]
    fn no_terminators_yields_whole_text() {
        let seq = vec![t("Alice and "), a("Bob"), t(" went\n fishing ")];
        assert_eq!(extract_context(&seq, 1), "Alice and Bob went fishing");
    }

    #[test]
    fn sandwiched_link_yields_text_between_terminators() {
        let seq = vec![t("Earlier text. Then "), a("Bob Smith"), t(" arrived. Later")];
        assert_eq!(extract_context(&seq, 1), "Then Bob Smith arrived.");
    }

    #[test]
    fn single_sentence_scenario() {
        let seq = vec![
            t("Alice worked with "),
            a("Bob Smith"),
            t(" on the project. It succeeded."),
        ];
        assert_eq!(
            extract_context(&seq, 1),
            "Alice worked with Bob Smith on the project."
        );
    }

    #[test]
    fn previous_and_next_sentences_are_included() {
        let seq = vec![
            t("Intro here"),
            t(". Born in "),
            a("Paris"),
            t(", she studied. Then she joined "),
            a("Acme"),
            t(" in 1990. After that she moved to "),
            a("Rome"),
            t(". The end."),
        ];

        // Current sentence for Acme runs from index 3 to index 5; previous is
        // 1..3 and next is 5..7.
        assert_eq!(
            extract_context(&seq, 4),
            "Born in Paris, she studied. Then she joined Acme in 1990. After that she moved to Rome."
        );
    }

    #[test]
    fn first_sentence_has_no_previous() {
        let seq = vec![
            t("Carol met "),
            a("Dan"),
            t(" twice. Nobody knew "),
            a("Eve"),
            t("."),
        ];
        assert_eq!(
            extract_context(&seq, 1),
            "Carol met Dan twice. Nobody knew Eve."
        );
    }

    #[test]
    fn lone_link_returns_its_text() {
        let seq = vec![a("Bob")];
        assert_eq!(extract_context(&seq, 0), "Bob");
    }

    #[test]
    fn link_at_start_keeps_dotted_display_text() {
        let seq = vec![a("St. Louis"), t(" is a city. Yes.")];
        assert_eq!(extract_context(&seq, 0), "St. Louis is a city.");
    }

    #[test]
    fn empty_sequence_is_empty_context() {
        assert_eq!(extract_context(&[], 0), "");
    }
}
