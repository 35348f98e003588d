use lending_core::db::open_db_in_memory;
use lending_core::{
    CatalogEntry, CatalogRepository, LendingError, LoanService, Membership, MembershipRepository,
    SqliteCatalogRepository, SqliteLoanRepository, SqliteMembershipRepository,
};
use rusqlite::Connection;

const MEMBER: i64 = 7;
const STAFF: i64 = 900;
const LIBRARY: i64 = 1;
const NOW: i64 = 1_714_000_000;

fn fixed_clock() -> i64 {
    NOW
}

fn service(conn: &Connection) -> LoanService<SqliteLoanRepository<'_>> {
    LoanService::new(SqliteLoanRepository::new(conn)).with_clock(fixed_clock)
}

fn seed(conn: &Connection, copies: u32) {
    SqliteCatalogRepository::new(conn)
        .upsert_entry(&CatalogEntry::new("111", LIBRARY, "Dune", copies))
        .unwrap();
    SqliteMembershipRepository::new(conn)
        .add_membership(Membership::new(MEMBER, LIBRARY))
        .unwrap();
}

fn available_copies(conn: &Connection) -> u32 {
    SqliteCatalogRepository::new(conn)
        .get_entry("111", LIBRARY)
        .unwrap()
        .unwrap()
        .available_copies
}

fn loan_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM loans;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn issue_opens_loan_and_consumes_copy() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 2);

    let loan = service(&conn)
        .with_loan_period_days(21)
        .issue_book(Some(STAFF), MEMBER, " 111 ", LIBRARY)
        .unwrap();

    assert_eq!(loan.isbn, "111");
    assert_eq!(loan.member_id, MEMBER);
    assert_eq!(loan.issued_at, NOW);
    assert_eq!(loan.expected_return_at, NOW + 21 * 24 * 60 * 60);
    assert!(loan.is_outstanding());
    assert_eq!(available_copies(&conn), 1);

    let outstanding = service(&conn).outstanding_loans("111", LIBRARY).unwrap();
    assert_eq!(outstanding, vec![loan]);
}

#[test]
fn issued_copy_can_be_returned() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);

    let loan = service(&conn)
        .issue_book(Some(STAFF), MEMBER, "111", LIBRARY)
        .unwrap();
    assert_eq!(available_copies(&conn), 0);

    service(&conn).return_loan(Some(STAFF), loan.loan_id).unwrap();
    assert_eq!(available_copies(&conn), 1);
}

#[test]
fn missing_staff_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);

    let err = service(&conn)
        .issue_book(None, MEMBER, "111", LIBRARY)
        .unwrap_err();
    assert!(matches!(err, LendingError::Unauthenticated));
    assert_eq!(loan_count(&conn), 0);
}

#[test]
fn blank_key_or_bad_ids_are_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);
    let service = service(&conn);

    let cases = [(MEMBER, "  ", LIBRARY), (0, "111", LIBRARY), (MEMBER, "111", -1)];
    for (member, isbn, library) in cases {
        let err = service
            .issue_book(Some(STAFF), member, isbn, library)
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidInput(_)));
        assert_eq!(err.status_code(), 400);
    }
    assert_eq!(loan_count(&conn), 0);
}

#[test]
fn unknown_entry_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);

    let err = service(&conn)
        .issue_book(Some(STAFF), MEMBER, "999", LIBRARY)
        .unwrap_err();
    assert!(matches!(err, LendingError::NotFound(_)));
    assert_eq!(loan_count(&conn), 0);
}

#[test]
fn empty_shelf_is_unavailable() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 0);

    let err = service(&conn)
        .issue_book(Some(STAFF), MEMBER, "111", LIBRARY)
        .unwrap_err();
    assert!(matches!(err, LendingError::Unavailable { .. }));
    assert_eq!(loan_count(&conn), 0);
    assert_eq!(available_copies(&conn), 0);
}

#[test]
fn non_member_is_not_authorized() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);

    let err = service(&conn)
        .issue_book(Some(STAFF), 8, "111", LIBRARY)
        .unwrap_err();
    assert!(matches!(err, LendingError::NotAuthorized));
    assert_eq!(loan_count(&conn), 0);
    assert_eq!(available_copies(&conn), 1);
}

#[test]
fn store_fault_leaves_stock_untouched() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1);
    conn.execute_batch(
        "CREATE TRIGGER loans_offline BEFORE INSERT ON loans
         BEGIN SELECT RAISE(ABORT, 'loans offline'); END;",
    )
    .unwrap();

    let err = service(&conn)
        .issue_book(Some(STAFF), MEMBER, "111", LIBRARY)
        .unwrap_err();
    assert!(matches!(err, LendingError::Persistence(_)));
    assert_eq!(loan_count(&conn), 0);
    assert_eq!(available_copies(&conn), 1);
}
