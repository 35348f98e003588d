//! Catalog entry model and member-facing search filter.
//!
//! # Responsibility
//! - Define the per-library catalog record and its public projection.
//! - Match entries against optional case-insensitive substring filters.
//!
//! # Invariants
//! - `(isbn, library_id)` identifies an entry; `isbn` alone does not.
//! - Unset or blank authors are projected as [`UNKNOWN_AUTHOR`].

use crate::model::member::LibraryId;
use serde::{Deserialize, Serialize};

/// Placeholder shown when an entry has no author data.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// One book title's record within one library's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub isbn: String,
    pub library_id: LibraryId,
    pub title: String,
    /// Comma separated author list as stored by the catalog owner.
    pub authors: Option<String>,
    pub publisher: String,
    pub available_copies: u32,
}

impl CatalogEntry {
    pub fn new(
        isbn: impl Into<String>,
        library_id: LibraryId,
        title: impl Into<String>,
        available_copies: u32,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            library_id,
            title: title.into(),
            authors: None,
            publisher: String::new(),
            available_copies,
        }
    }

    /// Whether at least one copy can be handed out right now.
    pub fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }

    /// Author text for display, substituting [`UNKNOWN_AUTHOR`] when unset.
    pub fn display_author(&self) -> &str {
        match self.authors.as_deref().map(str::trim) {
            Some(authors) if !authors.is_empty() => authors,
            _ => UNKNOWN_AUTHOR,
        }
    }

    /// Public projection returned to members.
    pub fn to_view(&self) -> CatalogEntryView {
        CatalogEntryView {
            isbn: self.isbn.clone(),
            title: self.title.clone(),
            author: self.display_author().to_string(),
            publisher: self.publisher.clone(),
            available_copies: self.available_copies,
            library_id: self.library_id,
        }
    }
}

/// Member-facing projection of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntryView {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub available_copies: u32,
    pub library_id: LibraryId,
}

/// Optional free-text filters for catalog search.
///
/// Every supplied filter must match (AND). Blank filters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
}

impl CatalogFilter {
    /// Returns whether `entry` satisfies all supplied filters.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        contains_folded(entry.title.as_str(), self.title.as_deref())
            && contains_folded(entry.authors.as_deref().unwrap_or(""), self.author.as_deref())
            && contains_folded(entry.publisher.as_str(), self.publisher.as_deref())
    }

    /// Whether no filter narrows the result.
    pub fn is_empty(&self) -> bool {
        [&self.title, &self.author, &self.publisher]
            .iter()
            .all(|value| value.as_deref().map_or(true, |text| text.trim().is_empty()))
    }
}

fn contains_folded(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Trims a caller-supplied catalog key; `None` when nothing is left.
///
/// Keys are opaque: any non-blank value goes on to the catalog lookup.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_isbn, CatalogEntry, CatalogFilter, UNKNOWN_AUTHOR};

    fn entry() -> CatalogEntry {
        let mut entry = CatalogEntry::new("978-0131103627", 1, "The C Programming Language", 2);
        entry.authors = Some("Kernighan, Ritchie".to_string());
        entry.publisher = "Prentice Hall".to_string();
        entry
    }

    #[test]
    fn filters_are_case_insensitive_and_anded() {
        let filter = CatalogFilter {
            title: Some("programming".to_string()),
            author: Some("RITCHIE".to_string()),
            publisher: None,
        };
        assert!(filter.matches(&entry()));

        let mismatch = CatalogFilter {
            publisher: Some("O'Reilly".to_string()),
            ..filter
        };
        assert!(!mismatch.matches(&entry()));
    }

    #[test]
    fn blank_filters_are_no_ops() {
        let filter = CatalogFilter {
            title: Some("   ".to_string()),
            ..CatalogFilter::default()
        };
        assert!(filter.is_empty());
        assert!(filter.matches(&entry()));
    }

    #[test]
    fn author_filter_never_matches_unset_authors() {
        let mut entry = entry();
        entry.authors = None;
        let filter = CatalogFilter {
            author: Some("unknown".to_string()),
            ..CatalogFilter::default()
        };
        assert!(!filter.matches(&entry));
        assert_eq!(entry.display_author(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn folding_handles_non_ascii_titles() {
        let mut entry = entry();
        entry.title = "ÉTUDES DE STYLE".to_string();
        let filter = CatalogFilter {
            title: Some("études".to_string()),
            ..CatalogFilter::default()
        };
        assert!(filter.matches(&entry));
    }

    #[test]
    fn normalize_isbn_trims_and_rejects_only_blank_keys() {
        assert_eq!(normalize_isbn(" 0-13-110362-8 ").as_deref(), Some("0-13-110362-8"));
        assert_eq!(normalize_isbn("ISBN_978").as_deref(), Some("ISBN_978"));
        assert_eq!(normalize_isbn("12 34").as_deref(), Some("12 34"));
        assert_eq!(normalize_isbn(""), None);
        assert_eq!(normalize_isbn(" \t "), None);
    }
}
