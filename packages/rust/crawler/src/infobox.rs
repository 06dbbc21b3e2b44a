//! Person details from a biography page's infobox.
//!
//! Infobox layouts vary a lot between pages, so every missing piece of
//! structure is reported as `None` rather than an error.

use personlink_shared::PersonDetails;
use tracing::debug;

use crate::document::{ContentNode, ContentTree};
use crate::paragraphs::CONTENT_ID;

/// Classes that mark a person infobox.
const INFOBOX_CLASSES: &[&str] = &["infobox", "vcard"];

const BORN_HEADER: &str = "Born";
const DIED_HEADER: &str = "Died";

/// Read the person described by `page`, which was fetched from `url`.
pub fn extract_person_details<T: ContentTree>(url: &str, page: &T) -> Option<PersonDetails> {
    let content = page.find_by_id(CONTENT_ID)?;
    let body = content.first_element_child()?;

    let Some(table) = body.find_by_class(INFOBOX_CLASSES) else {
        debug!(url, "no infobox");
        return None;
    };

    let name = clean_cell_text(&title_row(table)?.text());
    if name.is_empty() {
        debug!(url, "infobox has no name row");
        return None;
    }

    let Some(birth_date) = header_value(table, BORN_HEADER) else {
        debug!(url, "infobox has no birth date");
        return None;
    };
    let death_date = header_value(table, DIED_HEADER);

    Some(PersonDetails {
        name,
        url: url.to_string(),
        birth_date,
        death_date,
    })
}

/// First element child of the table, looking through the row-group wrappers
/// HTML parsers insert.
fn title_row<'a, N: ContentNode<'a>>(table: N) -> Option<N> {
    let mut node = table.first_element_child()?;
    while node.is_tag("tbody") || node.is_tag("thead") {
        node = node.first_element_child()?;
    }
    Some(node)
}

/// Cleaned text of the cell following the header cell labelled `label`.
fn header_value<'a, N: ContentNode<'a>>(table: N, label: &str) -> Option<String> {
    let header = table
        .find_all_by_tag("th")
        .into_iter()
        .find(|th| th.text().trim() == label)?;
    let value = clean_cell_text(&header.next_sibling()?.text());
    (!value.is_empty()).then_some(value)
}

/// Collapse all runs of whitespace (newlines included) to single spaces.
fn clean_cell_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
