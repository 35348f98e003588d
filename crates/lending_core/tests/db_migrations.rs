use lending_core::db::migrations::latest_version;
use lending_core::db::{open_db, open_db_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "memberships");
    assert_table_exists(&conn, "catalog_entries");
    assert_table_exists(&conn, "loans");
    assert_table_exists(&conn, "borrow_requests");
    assert!(column_exists(&conn, "borrow_requests", "rejected_at"));
    assert!(column_exists(&conn, "borrow_requests", "rejected_by"));
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lending.db");

    let conn_first = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "borrow_requests");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pending_uniqueness_index_rejects_second_pending_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO catalog_entries (isbn, library_id, title, available_copies)
         VALUES ('111', 1, 'Dune', 1);
         INSERT INTO borrow_requests (uuid, member_id, isbn, library_id, request_kind, requested_at)
         VALUES ('a', 7, '111', 1, 'issue', 10);",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO borrow_requests (uuid, member_id, isbn, library_id, request_kind, requested_at)
         VALUES ('b', 7, '111', 1, 'issue', 11);",
        [],
    );
    assert!(duplicate.is_err());

    conn.execute(
        "UPDATE borrow_requests SET rejected_at = 12, rejected_by = 1 WHERE uuid = 'a';",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO borrow_requests (uuid, member_id, isbn, library_id, request_kind, requested_at)
         VALUES ('c', 7, '111', 1, 'issue', 13);",
        [],
    )
    .unwrap();
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});")).unwrap();
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    names.iter().any(|name| name == column)
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
