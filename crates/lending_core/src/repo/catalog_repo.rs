//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load catalog entries scoped to a set of libraries.
//! - Resolve one entry by its per-library key.
//!
//! # Invariants
//! - Listing order is deterministic: `library_id ASC, title ASC, isbn ASC`.
//! - `available_copies` read back from storage is never negative.

use crate::model::catalog::CatalogEntry;
use crate::model::member::LibraryId;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTRY_SELECT_SQL: &str = "SELECT
    isbn,
    library_id,
    title,
    authors,
    publisher,
    available_copies
FROM catalog_entries";

/// Repository interface for per-library catalog data.
pub trait CatalogRepository {
    /// Lists all entries owned by any of `library_ids`.
    fn list_entries_in_libraries(&self, library_ids: &[LibraryId])
        -> RepoResult<Vec<CatalogEntry>>;
    /// Gets one entry by `(isbn, library_id)`.
    fn get_entry(&self, isbn: &str, library_id: LibraryId) -> RepoResult<Option<CatalogEntry>>;
    /// Inserts or replaces an entry. Used by the catalog owner to mirror stock.
    fn upsert_entry(&self, entry: &CatalogEntry) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn list_entries_in_libraries(
        &self,
        library_ids: &[LibraryId],
    ) -> RepoResult<Vec<CatalogEntry>> {
        if library_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; library_ids.len()].join(", ");
        let sql = format!(
            "{ENTRY_SELECT_SQL}
             WHERE library_id IN ({placeholders})
             ORDER BY library_id ASC, title ASC, isbn ASC;"
        );
        let bind_values = library_ids.iter().map(|id| Value::Integer(*id));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn get_entry(&self, isbn: &str, library_id: LibraryId) -> RepoResult<Option<CatalogEntry>> {
        load_entry(self.conn, isbn, library_id)
    }

    fn upsert_entry(&self, entry: &CatalogEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO catalog_entries (
                isbn,
                library_id,
                title,
                authors,
                publisher,
                available_copies
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (isbn, library_id) DO UPDATE SET
                title = excluded.title,
                authors = excluded.authors,
                publisher = excluded.publisher,
                available_copies = excluded.available_copies;",
            params![
                entry.isbn.as_str(),
                entry.library_id,
                entry.title.as_str(),
                entry.authors.as_deref(),
                entry.publisher.as_str(),
                i64::from(entry.available_copies),
            ],
        )?;
        Ok(())
    }
}

/// Entry lookup usable inside an open transaction.
pub(crate) fn load_entry(
    conn: &Connection,
    isbn: &str,
    library_id: LibraryId,
) -> RepoResult<Option<CatalogEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT_SQL}
         WHERE isbn = ?1 AND library_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![isbn, library_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_entry_row(row)?));
    }
    Ok(None)
}

/// Adjusts stock by `delta` inside an open transaction.
///
/// Returns `false` when the entry is missing or the change would drive the
/// count below zero.
pub(crate) fn adjust_available_copies(
    conn: &Connection,
    isbn: &str,
    library_id: LibraryId,
    delta: i64,
) -> RepoResult<bool> {
    let changed = conn.execute(
        "UPDATE catalog_entries
         SET available_copies = available_copies + ?3
         WHERE isbn = ?1
           AND library_id = ?2
           AND available_copies + ?3 >= 0;",
        params![isbn, library_id, delta],
    )?;
    Ok(changed == 1)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<CatalogEntry> {
    let isbn: String = row.get("isbn")?;
    let copies: i64 = row.get("available_copies")?;
    let available_copies = u32::try_from(copies).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid available_copies `{copies}` for catalog entry `{isbn}`"
        ))
    })?;

    Ok(CatalogEntry {
        isbn,
        library_id: row.get("library_id")?,
        title: row.get("title")?,
        authors: row.get("authors")?,
        publisher: row.get("publisher")?,
        available_copies,
    })
}
