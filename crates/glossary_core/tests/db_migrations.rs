use glossary_core::db::migrations::{apply_migrations, latest_version};
use glossary_core::db::{open_db, open_db_in_memory, DbError};
use glossary_core::{
    RepoError, SearchQuery, SearchRouter, SearchStrategies, SqliteTermRepository,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "terms",
        "tags",
        "term_tags",
        "canonical_groups",
        "term_versions",
        "terms_fts",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "term_versions");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
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
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTermRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn fts_migration_indexes_existing_terms() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0002_term_versions.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO terms (id, term_string, definition, examples, search_text)
         VALUES (
            '11111111-2222-4333-8444-555555555555',
            'Frazil',
            'Loose ice crystals.',
            'legacy example',
            'loose ice crystals. legacy example'
         );",
    )
    .unwrap();
    conn.execute_batch("PRAGMA user_version = 2;").unwrap();

    apply_migrations(&mut conn).unwrap();
    assert_eq!(schema_version(&conn), latest_version());

    let full_text_only = SearchStrategies {
        display_string: false,
        definition: false,
        full_text: true,
    };
    let hits = SearchRouter::new(&conn)
        .with_strategies(full_text_only)
        .search(&SearchQuery::new("legacy"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].term_string, "Frazil");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
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
