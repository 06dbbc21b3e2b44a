//! Core domain types: people, the links between them, and the prose that
//! justified each link.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PersonDetails
// ---------------------------------------------------------------------------

/// A person resolved from a biography page's infobox.
///
/// `url` is the page the details were read from and is the identity used for
/// deduplication in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonDetails {
    /// Display name (first row of the infobox).
    pub name: String,
    /// Canonical page URL.
    pub url: String,
    /// Birth date, free-form as extracted.
    pub birth_date: String,
    /// Death date, absent for living people or when the infobox omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
}

// ---------------------------------------------------------------------------
// ParagraphLink
// ---------------------------------------------------------------------------

/// A hyperlink found in body prose, together with the sentences around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphLink {
    /// The link's title (or display text when no title is present).
    pub text: String,
    /// Absolute target URL.
    pub link: String,
    /// Previous + current + next sentence surrounding the link.
    pub context: String,
}

// ---------------------------------------------------------------------------
// PersonConnection
// ---------------------------------------------------------------------------

/// One directed edge: the person a source page links to, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonConnection {
    /// The linked-to person.
    pub connection_person: PersonDetails,
    /// Context string of the paragraph link that produced this edge.
    pub context: String,
}
