//! Loan repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Record issued copies and their returns.
//! - Answer the earliest-expected-return query used for availability forecasts.
//!
//! # Invariants
//! - Outstanding loans are those with `returned_at IS NULL`.
//! - An issue and its stock decrement commit together, as do a return and
//!   its stock increment.

use crate::model::catalog::CatalogEntry;
use crate::model::loan::{LoanId, LoanRecord};
use crate::model::member::LibraryId;
use crate::model::EpochSeconds;
use crate::repo::catalog_repo::{adjust_available_copies, load_entry};
use crate::repo::membership_repo::membership_exists;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const LOAN_SELECT_SQL: &str = "SELECT
    uuid,
    isbn,
    library_id,
    member_id,
    issued_at,
    expected_return_at,
    returned_at
FROM loans";

/// State observed under the write lock before a direct issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSnapshot {
    pub entry: Option<CatalogEntry>,
    /// Whether the borrower belongs to the entry's library.
    pub is_member: bool,
}

/// Repository interface for loan records.
pub trait LoanRepository {
    /// Outstanding loan with the earliest expected return for one entry.
    fn earliest_outstanding_loan(
        &self,
        isbn: &str,
        library_id: LibraryId,
    ) -> RepoResult<Option<LoanRecord>>;
    /// All outstanding loans for one entry, earliest expected return first.
    fn list_outstanding_loans(&self, isbn: &str, library_id: LibraryId)
        -> RepoResult<Vec<LoanRecord>>;
    /// Persists a loan record as-is. Does not touch stock counts.
    fn create_loan(&self, loan: &LoanRecord) -> RepoResult<LoanId>;
    /// Opens `loan` and consumes one copy if `guard` accepts the snapshot
    /// taken under the write lock. Nothing is written on failure.
    fn issue_loan<E, F>(&self, loan: &LoanRecord, guard: F) -> Result<(), E>
    where
        E: From<RepoError>,
        F: FnOnce(&IssueSnapshot) -> Result<(), E>;
    /// Records the return of an outstanding loan and restores one copy.
    fn mark_returned(&self, loan_id: LoanId, returned_at: EpochSeconds) -> RepoResult<LoanRecord>;
}

/// SQLite-backed loan repository.
pub struct SqliteLoanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLoanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LoanRepository for SqliteLoanRepository<'_> {
    fn earliest_outstanding_loan(
        &self,
        isbn: &str,
        library_id: LibraryId,
    ) -> RepoResult<Option<LoanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LOAN_SELECT_SQL}
             WHERE isbn = ?1
               AND library_id = ?2
               AND returned_at IS NULL
             ORDER BY expected_return_at ASC, uuid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![isbn, library_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_loan_row(row)?));
        }
        Ok(None)
    }

    fn list_outstanding_loans(
        &self,
        isbn: &str,
        library_id: LibraryId,
    ) -> RepoResult<Vec<LoanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LOAN_SELECT_SQL}
             WHERE isbn = ?1
               AND library_id = ?2
               AND returned_at IS NULL
             ORDER BY expected_return_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![isbn, library_id])?;
        let mut loans = Vec::new();
        while let Some(row) = rows.next()? {
            loans.push(parse_loan_row(row)?);
        }
        Ok(loans)
    }

    fn create_loan(&self, loan: &LoanRecord) -> RepoResult<LoanId> {
        insert_loan(self.conn, loan)?;
        Ok(loan.loan_id)
    }

    fn issue_loan<E, F>(&self, loan: &LoanRecord, guard: F) -> Result<(), E>
    where
        E: From<RepoError>,
        F: FnOnce(&IssueSnapshot) -> Result<(), E>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let snapshot = IssueSnapshot {
            entry: load_entry(&tx, loan.isbn.as_str(), loan.library_id)?,
            is_member: membership_exists(&tx, loan.member_id, loan.library_id)?,
        };
        guard(&snapshot)?;

        if !adjust_available_copies(&tx, loan.isbn.as_str(), loan.library_id, -1)? {
            return Err(RepoError::InvalidData(format!(
                "no copy left to issue for catalog entry `{}`",
                loan.isbn
            ))
            .into());
        }
        insert_loan(&tx, loan)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(())
    }

    fn mark_returned(&self, loan_id: LoanId, returned_at: EpochSeconds) -> RepoResult<LoanRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut loan = load_loan(&tx, loan_id)?.ok_or(RepoError::LoanNotFound(loan_id))?;

        if !loan.is_outstanding() {
            return Err(RepoError::LoanAlreadyReturned(loan_id));
        }

        tx.execute(
            "UPDATE loans SET returned_at = ?2 WHERE uuid = ?1 AND returned_at IS NULL;",
            params![loan_id.to_string(), returned_at],
        )?;
        if !adjust_available_copies(&tx, loan.isbn.as_str(), loan.library_id, 1)? {
            return Err(RepoError::InvalidData(format!(
                "loan {loan_id} references missing catalog entry `{}`",
                loan.isbn
            )));
        }

        tx.commit()?;
        loan.returned_at = Some(returned_at);
        Ok(loan)
    }
}

/// Loan insert usable inside an open transaction.
pub(crate) fn insert_loan(conn: &Connection, loan: &LoanRecord) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO loans (
            uuid,
            isbn,
            library_id,
            member_id,
            issued_at,
            expected_return_at,
            returned_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            loan.loan_id.to_string(),
            loan.isbn.as_str(),
            loan.library_id,
            loan.member_id,
            loan.issued_at,
            loan.expected_return_at,
            loan.returned_at,
        ],
    )?;
    Ok(())
}

fn load_loan(conn: &Connection, loan_id: LoanId) -> RepoResult<Option<LoanRecord>> {
    let mut stmt = conn.prepare(&format!("{LOAN_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([loan_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_loan_row(row)?));
    }
    Ok(None)
}

fn parse_loan_row(row: &Row<'_>) -> RepoResult<LoanRecord> {
    let uuid_text: String = row.get("uuid")?;
    Ok(LoanRecord {
        loan_id: parse_uuid(&uuid_text, "loans.uuid")?,
        isbn: row.get("isbn")?,
        library_id: row.get("library_id")?,
        member_id: row.get("member_id")?,
        issued_at: row.get("issued_at")?,
        expected_return_at: row.get("expected_return_at")?,
        returned_at: row.get("returned_at")?,
    })
}
