use glossary_core::db::{open_db_in_memory, DbError};
use glossary_core::{
    NewTerm, RepoError, SqliteTermRepository, SqliteVersionRepository, TermRepository,
    VersionOrder, VersionRepository, VersionSnapshot,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

fn snapshot(definition: &str) -> VersionSnapshot {
    VersionSnapshot {
        definition: definition.to_string(),
        examples: String::new(),
        tags_snapshot: "oop, types".to_string(),
    }
}

fn create_term(conn: &Connection, name: &str) -> Uuid {
    let repo = SqliteTermRepository::try_new(conn).unwrap();
    repo.create_term(&NewTerm::new(name, "defined")).unwrap().id
}

#[test]
fn append_assigns_gap_free_sequence_numbers() {
    let conn = open_db_in_memory().unwrap();
    let term_id = create_term(&conn, "Polymorphism");
    let versions = SqliteVersionRepository::try_new(&conn).unwrap();

    assert_eq!(versions.latest_sequence_number(term_id).unwrap(), 0);
    for (idx, definition) in ["one", "two", "three"].iter().enumerate() {
        let version = versions.append_version(term_id, &snapshot(definition)).unwrap();
        assert_eq!(version.sequence_number, idx as i64 + 1);
        assert_eq!(version.term_id, term_id);
        assert!(version.captured_at > 0);
    }
    assert_eq!(versions.latest_sequence_number(term_id).unwrap(), 3);

    let descending = versions
        .list_versions(term_id, VersionOrder::Descending)
        .unwrap();
    let numbers: Vec<_> = descending.iter().map(|v| v.sequence_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let ascending = versions
        .list_versions(term_id, VersionOrder::Ascending)
        .unwrap();
    let definitions: Vec<_> = ascending.iter().map(|v| v.definition.as_str()).collect();
    assert_eq!(definitions, vec!["one", "two", "three"]);
    assert_eq!(
        ascending[0].tags(),
        vec!["oop".to_string(), "types".to_string()]
    );

    let second = versions.get_version(term_id, 2).unwrap().unwrap();
    assert_eq!(second.definition, "two");
    assert!(versions.get_version(term_id, 4).unwrap().is_none());
}

#[test]
fn sequences_are_independent_per_term() {
    let conn = open_db_in_memory().unwrap();
    let first = create_term(&conn, "Encapsulation");
    let second = create_term(&conn, "Inheritance");
    let versions = SqliteVersionRepository::try_new(&conn).unwrap();

    versions.append_version(first, &snapshot("a")).unwrap();
    versions.append_version(first, &snapshot("b")).unwrap();
    let other = versions.append_version(second, &snapshot("c")).unwrap();

    assert_eq!(other.sequence_number, 1);
    assert_eq!(versions.latest_sequence_number(first).unwrap(), 2);
}

#[test]
fn append_and_list_for_unknown_term_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let versions = SqliteVersionRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = versions.append_version(missing, &snapshot("x")).unwrap_err();
    assert!(matches!(err, RepoError::TermNotFound(id) if id == missing));

    let err = versions
        .list_versions(missing, VersionOrder::Descending)
        .unwrap_err();
    assert!(matches!(err, RepoError::TermNotFound(_)));
}

#[test]
fn duplicate_sequence_number_is_rejected_by_storage() {
    let conn = open_db_in_memory().unwrap();
    let term_id = create_term(&conn, "Abstraction");
    let versions = SqliteVersionRepository::try_new(&conn).unwrap();
    versions.append_version(term_id, &snapshot("first")).unwrap();

    let err = conn
        .execute(
            "INSERT INTO term_versions (id, term_id, sequence_number, definition, examples, tags_snapshot)
             VALUES (?1, ?2, 1, 'racer', '', '');",
            params![Uuid::new_v4().to_string(), term_id.to_string()],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_unique_violation());
}

#[test]
fn versions_cannot_be_updated_or_deleted() {
    let conn = open_db_in_memory().unwrap();
    let term_id = create_term(&conn, "Coupling");
    let versions = SqliteVersionRepository::try_new(&conn).unwrap();
    versions.append_version(term_id, &snapshot("kept")).unwrap();

    let update = conn.execute(
        "UPDATE term_versions SET definition = 'rewritten' WHERE term_id = ?1;",
        [term_id.to_string()],
    );
    assert!(update.is_err());

    let delete = conn.execute(
        "DELETE FROM term_versions WHERE term_id = ?1;",
        [term_id.to_string()],
    );
    assert!(delete.is_err());

    let stored = versions.get_version(term_id, 1).unwrap().unwrap();
    assert_eq!(stored.definition, "kept");
}
