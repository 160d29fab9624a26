use glossary_core::db::open_db_in_memory;
use glossary_core::{
    NewTerm, RepoError, SearchQuery, SearchRouter, SearchStrategies, SqliteTermRepository,
    TermListQuery, TermRepository, TermValidationError,
};

fn full_text_only() -> SearchStrategies {
    SearchStrategies {
        display_string: false,
        definition: false,
        full_text: true,
    }
}

#[test]
fn create_term_normalizes_tags_and_derives_search_text() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();

    let term = repo
        .create_term(
            &NewTerm::new("  White ice ", "Opaque ice with trapped air.")
                .with_examples("Seen on lakes\nin spring.")
                .with_tags(["Sea Ice", "sea ice ", "Lake"]),
        )
        .unwrap();

    assert_eq!(term.term_string, "White ice");
    assert_eq!(term.tags, vec!["lake".to_string(), "sea ice".to_string()]);
    assert_eq!(
        term.search_text,
        "opaque ice with trapped air. seen on lakes in spring. lake sea ice"
    );
    assert!(term.canonical_group_id.is_none());

    let loaded = repo.get_term(term.id).unwrap().unwrap();
    assert_eq!(loaded, term);
}

#[test]
fn create_term_rejects_blank_definition() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();

    let err = repo.create_term(&NewTerm::new("Young ice", "  ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TermValidationError::EmptyDefinition)
    ));
    assert_eq!(repo.count_terms().unwrap(), 0);
}

#[test]
fn find_term_by_string_is_case_insensitive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();
    let created = repo
        .create_term(&NewTerm::new("Young ice", "Ice in transition."))
        .unwrap();

    let found = repo.find_term_by_string("young ICE").unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(repo.find_term_by_string("Old ice").unwrap().is_none());
}

#[test]
fn list_terms_orders_by_display_string_and_pages() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();
    for name in ["gamma", "Alpha", "beta"] {
        repo.create_term(&NewTerm::new(name, "defined")).unwrap();
    }

    let first_page = repo
        .list_terms(&TermListQuery {
            limit: Some(2),
            offset: 0,
        })
        .unwrap();
    let names: Vec<_> = first_page.iter().map(|t| t.term_string.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "beta"]);

    let second_page = repo
        .list_terms(&TermListQuery {
            limit: Some(2),
            offset: 2,
        })
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].term_string, "gamma");
    assert_eq!(repo.count_terms().unwrap(), 3);
}

#[test]
fn rebuild_search_index_restores_lost_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();
    repo.create_term(&NewTerm::new("Nilas", "Thin elastic crust.").with_tags(["sea"]))
        .unwrap();
    repo.create_term(&NewTerm::new("Grease ice", "Soupy layer.")).unwrap();

    conn.execute_batch("DELETE FROM terms_fts;").unwrap();
    let router = SearchRouter::new(&conn).with_strategies(full_text_only());
    assert!(router.search(&SearchQuery::new("elastic")).unwrap().is_empty());

    let rebuilt = repo.rebuild_search_index().unwrap();
    assert_eq!(rebuilt, 2);

    let hits = router.search(&SearchQuery::new("elastic")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].term_string, "Nilas");
}
