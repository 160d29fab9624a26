//! Database health probe.
//!
//! # Responsibility
//! - Open a glossary database through core bootstrap (migrations included).
//! - Print a deterministic summary: term count, first terms, group count
//!   and a sample search.
//!
//! Usage: `glossary_cli [DB_PATH] [SEARCH_TEXT]`. Settings not given as
//! arguments come from `GLOSSARY_*` environment variables.

use glossary_core::db::{open_db, open_db_in_memory};
use glossary_core::{
    core_version, init_logging_from_config, CoreConfig, GroupRepository, SearchQuery,
    SearchRouter, SqliteGroupRepository, SqliteTermRepository, TermListQuery, TermRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const PREVIEW_LIMIT: u32 = 10;
const DEFAULT_SEARCH_TEXT: &str = "ice";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let mut config = CoreConfig::from_env()?;
    if let Some(path) = args.next() {
        config.db_path = Some(PathBuf::from(path));
    }
    let search_text = args
        .next()
        .unwrap_or_else(|| DEFAULT_SEARCH_TEXT.to_string());

    init_logging_from_config(&config)?;

    let conn = match config.db_path.as_ref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let terms = SqliteTermRepository::try_new(&conn)?;
    let groups = SqliteGroupRepository::try_new(&conn)?;

    println!("glossary_core version={}", core_version());
    println!("Total terms in database: {}", terms.count_terms()?);
    println!("Canonical groups: {}", groups.list_groups()?.len());

    println!("\nFirst {PREVIEW_LIMIT} terms:");
    let listed = terms.list_terms(&TermListQuery {
        limit: Some(PREVIEW_LIMIT),
        offset: 0,
    })?;
    for term in listed {
        println!("- {} (ID: {})", term.term_string, term.id);
    }

    let mut query = SearchQuery::new(search_text.as_str());
    query.limit = config.search_limit;
    let outcome = SearchRouter::new(&conn).search_detailed(&query)?;
    println!(
        "\nTerms matching '{search_text}': {} (full_text={:?})",
        outcome.terms.len(),
        outcome.full_text
    );
    for term in outcome.terms {
        println!("- {}", term.term_string);
    }

    Ok(())
}
