//! Membership repository contracts and SQLite implementation.
//!
//! Memberships are owned by the external onboarding flow; the engine only
//! reads them, apart from the `add_membership` mirror entry point.

use crate::model::member::{LibraryId, MemberId, Membership};
use crate::repo::RepoResult;
use rusqlite::{params, Connection};

/// Repository interface for member-to-library affiliations.
pub trait MembershipRepository {
    /// Returns every library the member belongs to, sorted ascending.
    fn library_ids_for_member(&self, member_id: MemberId) -> RepoResult<Vec<LibraryId>>;
    /// Returns whether the member belongs to the library.
    fn has_membership(&self, member_id: MemberId, library_id: LibraryId) -> RepoResult<bool>;
    /// Records a membership. Idempotent.
    fn add_membership(&self, membership: Membership) -> RepoResult<()>;
}

/// SQLite-backed membership repository.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn library_ids_for_member(&self, member_id: MemberId) -> RepoResult<Vec<LibraryId>> {
        let mut stmt = self.conn.prepare(
            "SELECT library_id
             FROM memberships
             WHERE member_id = ?1
             ORDER BY library_id ASC;",
        )?;
        let mut rows = stmt.query([member_id])?;
        let mut library_ids = Vec::new();
        while let Some(row) = rows.next()? {
            library_ids.push(row.get(0)?);
        }
        Ok(library_ids)
    }

    fn has_membership(&self, member_id: MemberId, library_id: LibraryId) -> RepoResult<bool> {
        membership_exists(self.conn, member_id, library_id)
    }

    fn add_membership(&self, membership: Membership) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO memberships (member_id, library_id) VALUES (?1, ?2);",
            params![membership.member_id, membership.library_id],
        )?;
        Ok(())
    }
}

/// Membership check usable inside an open transaction.
pub(crate) fn membership_exists(
    conn: &Connection,
    member_id: MemberId,
    library_id: LibraryId,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM memberships
            WHERE member_id = ?1 AND library_id = ?2
        );",
        params![member_id, library_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
