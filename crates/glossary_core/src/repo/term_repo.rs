//! Term repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist current term state, tag links and the derived search index.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Exactly one `terms` row exists per term id.
//! - `terms.search_text` and the `terms_fts` row for a term are only ever
//!   written together through `update_term` + `refresh_search_index`.
//! - Write methods other than `create_term` run inside the caller's
//!   transaction and never open their own.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::group::GroupId;
use crate::model::term::{
    derive_search_text, normalize_tags, NewTerm, Term, TermId, TermValidationError,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const TERM_SELECT_SQL: &str = "SELECT
    id,
    term_string,
    definition,
    examples,
    search_text,
    canonical_group_id,
    created_at,
    updated_at
FROM terms";

const TERMS_DEFAULT_LIMIT: u32 = 50;
const TERMS_LIMIT_MAX: u32 = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by term, version and group persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TermValidationError),
    Db(DbError),
    TermNotFound(TermId),
    GroupNotFound(GroupId),
    DuplicateGroupName(String),
    /// Another append for the same term claimed the computed sequence number.
    SequenceConflict(TermId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl RepoError {
    /// Returns whether storage stayed locked past the busy timeout.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_busy())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "canonical group not found: {id}"),
            Self::DuplicateGroupName(name) => {
                write!(f, "canonical group name already exists: `{name}`")
            }
            Self::SequenceConflict(id) => {
                write!(f, "concurrent version append lost the race for term {id}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TermValidationError> for RepoError {
    fn from(value: TermValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Paging options for listing terms by display string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermListQuery {
    /// Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for current term state.
pub trait TermRepository {
    /// Inserts a new term with its tags and index row in one transaction.
    fn create_term(&self, draft: &NewTerm) -> RepoResult<Term>;
    fn get_term(&self, id: TermId) -> RepoResult<Option<Term>>;
    /// Case-insensitive exact match on the display string.
    fn find_term_by_string(&self, term_string: &str) -> RepoResult<Option<Term>>;
    /// Lists terms ordered by display string.
    fn list_terms(&self, query: &TermListQuery) -> RepoResult<Vec<Term>>;
    fn count_terms(&self) -> RepoResult<u64>;
    /// Writes content fields, tag links and `search_text` for an existing term.
    fn update_term(&self, term: &Term) -> RepoResult<()>;
    /// Rewrites the full-text row of one term from its stored `search_text`.
    fn refresh_search_index(&self, id: TermId) -> RepoResult<()>;
    /// Recomputes `search_text` and the full-text rows for every term.
    fn rebuild_search_index(&self) -> RepoResult<usize>;
}

/// SQLite-backed term repository.
///
/// Accepts a plain connection or a `Transaction` (via deref).
pub struct SqliteTermRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTermRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TermRepository for SqliteTermRepository<'_> {
    fn create_term(&self, draft: &NewTerm) -> RepoResult<Term> {
        draft.validate()?;

        let id = Uuid::new_v4();
        let tags = normalize_tags(&draft.tags);
        let search_text = derive_search_text(&draft.definition, &draft.examples, &tags);

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO terms (
                id,
                term_string,
                definition,
                examples,
                search_text
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                draft.term_string.trim(),
                draft.definition.as_str(),
                draft.examples.as_str(),
                search_text.as_str(),
            ],
        )?;
        replace_term_tags(&tx, id, &tags)?;
        write_fts_row(&tx, id, &search_text)?;
        tx.commit()?;

        load_required_term(self.conn, id)
    }

    fn get_term(&self, id: TermId) -> RepoResult<Option<Term>> {
        load_term(self.conn, id)
    }

    fn find_term_by_string(&self, term_string: &str) -> RepoResult<Option<Term>> {
        let terms = query_terms(
            self.conn,
            "WHERE term_string = ?1 COLLATE NOCASE ORDER BY created_at ASC, id ASC LIMIT 1",
            vec![Value::Text(term_string.trim().to_string())],
        )?;
        Ok(terms.into_iter().next())
    }

    fn list_terms(&self, query: &TermListQuery) -> RepoResult<Vec<Term>> {
        let limit = normalize_term_limit(query.limit);
        let mut sql = String::from("ORDER BY term_string COLLATE NOCASE ASC, id ASC LIMIT ?");
        let mut bind_values = vec![Value::Integer(i64::from(limit))];
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }
        query_terms(self.conn, &sql, bind_values)
    }

    fn count_terms(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM terms;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative term count `{count}`")))
    }

    fn update_term(&self, term: &Term) -> RepoResult<()> {
        let expected = derive_search_text(&term.definition, &term.examples, &term.tags);
        if term.search_text != expected {
            return Err(RepoError::InvalidData(format!(
                "stale search_text for term {}",
                term.id
            )));
        }

        let changed = self.conn.execute(
            "UPDATE terms
             SET
                term_string = ?2,
                definition = ?3,
                examples = ?4,
                search_text = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                term.id.to_string(),
                term.term_string.as_str(),
                term.definition.as_str(),
                term.examples.as_str(),
                term.search_text.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::TermNotFound(term.id));
        }

        replace_term_tags(self.conn, term.id, &normalize_tags(&term.tags))
    }

    fn refresh_search_index(&self, id: TermId) -> RepoResult<()> {
        let search_text: Option<String> = self
            .conn
            .query_row(
                "SELECT search_text FROM terms WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(search_text) = search_text else {
            return Err(RepoError::TermNotFound(id));
        };
        write_fts_row(self.conn, id, &search_text)
    }

    fn rebuild_search_index(&self) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let terms = query_terms(&tx, "ORDER BY id ASC", Vec::new())?;
        tx.execute("DELETE FROM terms_fts;", [])?;
        for term in &terms {
            let search_text = derive_search_text(&term.definition, &term.examples, &term.tags);
            tx.execute(
                "UPDATE terms SET search_text = ?2 WHERE id = ?1;",
                params![term.id.to_string(), search_text.as_str()],
            )?;
            tx.execute(
                "INSERT INTO terms_fts (term_id, search_text) VALUES (?1, ?2);",
                params![term.id.to_string(), search_text.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(terms.len())
    }
}

/// Normalizes list limit according to the terms contract.
pub fn normalize_term_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => TERMS_DEFAULT_LIMIT,
        Some(value) if value > TERMS_LIMIT_MAX => TERMS_LIMIT_MAX,
        Some(value) => value,
    }
}

pub(crate) fn term_exists(conn: &Connection, id: TermId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM terms WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn load_term(conn: &Connection, id: TermId) -> RepoResult<Option<Term>> {
    let terms = query_terms(conn, "WHERE id = ?1", vec![Value::Text(id.to_string())])?;
    Ok(terms.into_iter().next())
}

pub(crate) fn load_required_term(conn: &Connection, id: TermId) -> RepoResult<Term> {
    load_term(conn, id)?.ok_or(RepoError::TermNotFound(id))
}

/// Runs `TERM_SELECT_SQL` with a trailing clause and loads tags per row.
pub(crate) fn query_terms(
    conn: &Connection,
    clause: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Term>> {
    let mut stmt = conn.prepare(&format!("{TERM_SELECT_SQL} {clause};"))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut terms = Vec::new();
    while let Some(row) = rows.next()? {
        terms.push(parse_term_row(conn, row)?);
    }
    Ok(terms)
}

fn parse_term_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Term> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "terms.id")?;
    let canonical_group_id = match row.get::<_, Option<String>>("canonical_group_id")? {
        Some(value) => Some(parse_uuid(&value, "terms.canonical_group_id")?),
        None => None,
    };

    Ok(Term {
        id,
        term_string: row.get("term_string")?,
        definition: row.get("definition")?,
        examples: row.get("examples")?,
        tags: load_tags_for_term(conn, &id_text)?,
        canonical_group_id,
        search_text: row.get("search_text")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_tags_for_term(conn: &Connection, term_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM term_tags tt
         INNER JOIN tags t ON t.id = tt.tag_id
         WHERE tt.term_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([term_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn replace_term_tags(conn: &Connection, term_id: TermId, tags: &[String]) -> RepoResult<()> {
    let term_id_text = term_id.to_string();
    conn.execute(
        "DELETE FROM term_tags WHERE term_id = ?1;",
        [term_id_text.as_str()],
    )?;

    for tag in tags {
        conn.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1);",
            [tag.as_str()],
        )?;
        conn.execute(
            "INSERT INTO term_tags (term_id, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![term_id_text.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

fn write_fts_row(conn: &Connection, term_id: TermId, search_text: &str) -> RepoResult<()> {
    let term_id_text = term_id.to_string();
    conn.execute(
        "DELETE FROM terms_fts WHERE term_id = ?1;",
        [term_id_text.as_str()],
    )?;
    conn.execute(
        "INSERT INTO terms_fts (term_id, search_text) VALUES (?1, ?2);",
        params![term_id_text.as_str(), search_text],
    )?;
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Rejects connections that have not been opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in [
        "terms",
        "tags",
        "term_tags",
        "term_versions",
        "canonical_groups",
    ] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
