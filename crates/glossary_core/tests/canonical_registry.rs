use glossary_core::db::open_db_in_memory;
use glossary_core::{
    CanonicalRegistry, NewTerm, RegistryError, SqliteGroupRepository, SqliteTermRepository,
    TermRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn registry(conn: &Connection) -> CanonicalRegistry<SqliteGroupRepository<'_>> {
    CanonicalRegistry::new(SqliteGroupRepository::try_new(conn).unwrap())
}

fn create_term(conn: &Connection, name: &str) -> Uuid {
    SqliteTermRepository::try_new(conn)
        .unwrap()
        .create_term(&NewTerm::new(name, "defined"))
        .unwrap()
        .id
}

#[test]
fn duplicate_group_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);

    let group = registry
        .create_group("Polymorphism-lineage", "Shared history.")
        .unwrap();
    assert_eq!(group.name, "Polymorphism-lineage");
    assert_eq!(group.description, "Shared history.");

    let err = registry
        .create_group("Polymorphism-lineage", "Again.")
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateName(_)));

    let err = registry
        .create_group(" polymorphism-LINEAGE ", "Case variant.")
        .unwrap_err();
    assert_eq!(err.code(), "duplicate_name");
    assert_eq!(registry.list_groups().unwrap().len(), 1);
}

#[test]
fn blank_group_name_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let err = registry(&conn).create_group("   ", "x").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidInput(_)));
}

#[test]
fn assigning_twice_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let group = registry.create_group("Ice-lineage", "").unwrap();
    let term_id = create_term(&conn, "White ice");

    registry.assign_term_to_group(term_id, group.id).unwrap();
    registry.assign_term_to_group(term_id, group.id).unwrap();

    let members = registry.members_of(group.id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, term_id);
    assert_eq!(members[0].canonical_group_id, Some(group.id));
}

#[test]
fn assignment_with_unknown_ids_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let group = registry.create_group("Snow-lineage", "").unwrap();
    let term_id = create_term(&conn, "Firn");

    let err = registry
        .assign_term_to_group(Uuid::new_v4(), group.id)
        .unwrap_err();
    assert!(matches!(err, RegistryError::TermNotFound(_)));

    let err = registry
        .assign_term_to_group(term_id, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, RegistryError::GroupNotFound(_)));
    assert_eq!(err.code(), "not_found");

    let err = registry.members_of(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, RegistryError::GroupNotFound(_)));
}

#[test]
fn reassignment_leaves_group_and_other_members_untouched() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let first = registry.create_group("Lineage A", "first").unwrap();
    let second = registry.create_group("Lineage B", "second").unwrap();
    let moved = create_term(&conn, "Young ice");
    let stays = create_term(&conn, "Grey ice");

    registry.assign_term_to_group(moved, first.id).unwrap();
    registry.assign_term_to_group(stays, first.id).unwrap();
    registry.assign_term_to_group(moved, second.id).unwrap();

    let first_members = registry.members_of(first.id).unwrap();
    assert_eq!(first_members.len(), 1);
    assert_eq!(first_members[0].id, stays);
    assert_eq!(registry.members_of(second.id).unwrap()[0].id, moved);
    assert_eq!(registry.get_group(first.id).unwrap(), first);

    registry.unassign_term(stays).unwrap();
    assert!(registry.members_of(first.id).unwrap().is_empty());
    assert_eq!(registry.get_group(first.id).unwrap(), first);
}

#[test]
fn group_changes_are_not_versioned() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let group = registry.create_group("Lineage", "").unwrap();
    let term_id = create_term(&conn, "Nilas");

    registry.assign_term_to_group(term_id, group.id).unwrap();
    registry.unassign_term(term_id).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM term_versions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(
        registry.find_group_by_name("LINEAGE").unwrap().map(|g| g.id),
        Some(group.id)
    );
}
