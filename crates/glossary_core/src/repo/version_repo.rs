//! Version store: append-only history of term snapshots.
//!
//! # Responsibility
//! - Assign per-term sequence numbers and write immutable snapshots.
//! - Serve restartable, read-only history listings.
//!
//! # Invariants
//! - Sequence numbers per term are `1..=N` with no gaps or duplicates.
//! - Sequence assignment and insert happen in one SQL statement; the
//!   `(term_id, sequence_number)` unique constraint rejects a lost race
//!   instead of overwriting.
//! - Rows are never updated or deleted (enforced by schema triggers).

use crate::db::DbError;
use crate::model::term::TermId;
use crate::model::version::{TermVersion, VersionOrder, VersionSnapshot};
use crate::repo::term_repo::{
    ensure_connection_ready, parse_uuid, term_exists, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const VERSION_SELECT_SQL: &str = "SELECT
    id,
    term_id,
    sequence_number,
    definition,
    examples,
    tags_snapshot,
    captured_at
FROM term_versions";

/// Repository interface for the version store.
pub trait VersionRepository {
    /// Appends one snapshot with sequence number `max + 1` (or 1).
    ///
    /// Returns `SequenceConflict` when a concurrent append claimed the same
    /// number; the caller must retry with a freshly computed number.
    fn append_version(
        &self,
        term_id: TermId,
        snapshot: &VersionSnapshot,
    ) -> RepoResult<TermVersion>;
    /// Lists all versions of an existing term.
    fn list_versions(&self, term_id: TermId, order: VersionOrder)
        -> RepoResult<Vec<TermVersion>>;
    fn get_version(&self, term_id: TermId, sequence_number: i64)
        -> RepoResult<Option<TermVersion>>;
    /// Highest assigned sequence number, `0` when the term has no history.
    fn latest_sequence_number(&self, term_id: TermId) -> RepoResult<i64>;
}

/// SQLite-backed version store.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn append_version(
        &self,
        term_id: TermId,
        snapshot: &VersionSnapshot,
    ) -> RepoResult<TermVersion> {
        if !term_exists(self.conn, term_id)? {
            return Err(RepoError::TermNotFound(term_id));
        }

        let id = Uuid::new_v4();
        let inserted = self.conn.query_row(
            "INSERT INTO term_versions (
                id,
                term_id,
                sequence_number,
                definition,
                examples,
                tags_snapshot
            )
            SELECT ?1, ?2, COALESCE(MAX(sequence_number), 0) + 1, ?3, ?4, ?5
            FROM term_versions
            WHERE term_id = ?2
            RETURNING sequence_number, captured_at;",
            params![
                id.to_string(),
                term_id.to_string(),
                snapshot.definition.as_str(),
                snapshot.examples.as_str(),
                snapshot.tags_snapshot.as_str(),
            ],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        );

        let (sequence_number, captured_at) = match inserted {
            Ok(values) => values,
            Err(err) if crate::db::is_unique_violation(&err) => {
                return Err(RepoError::SequenceConflict(term_id));
            }
            Err(err) => return Err(RepoError::Db(DbError::Sqlite(err))),
        };

        Ok(TermVersion {
            id,
            term_id,
            sequence_number,
            definition: snapshot.definition.clone(),
            examples: snapshot.examples.clone(),
            tags_snapshot: snapshot.tags_snapshot.clone(),
            captured_at,
        })
    }

    fn list_versions(
        &self,
        term_id: TermId,
        order: VersionOrder,
    ) -> RepoResult<Vec<TermVersion>> {
        if !term_exists(self.conn, term_id)? {
            return Err(RepoError::TermNotFound(term_id));
        }

        let direction = match order {
            VersionOrder::Descending => "DESC",
            VersionOrder::Ascending => "ASC",
        };
        let mut stmt = self.conn.prepare(&format!(
            "{VERSION_SELECT_SQL}
             WHERE term_id = ?1
             ORDER BY sequence_number {direction};"
        ))?;
        let mut rows = stmt.query([term_id.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(parse_version_row(row)?);
        }
        Ok(versions)
    }

    fn get_version(
        &self,
        term_id: TermId,
        sequence_number: i64,
    ) -> RepoResult<Option<TermVersion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VERSION_SELECT_SQL}
             WHERE term_id = ?1
               AND sequence_number = ?2;"
        ))?;
        let mut rows = stmt.query(params![term_id.to_string(), sequence_number])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_version_row(row)?));
        }
        Ok(None)
    }

    fn latest_sequence_number(&self, term_id: TermId) -> RepoResult<i64> {
        let latest: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(sequence_number) FROM term_versions WHERE term_id = ?1;",
                [term_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(latest.unwrap_or(0))
    }
}

fn parse_version_row(row: &Row<'_>) -> RepoResult<TermVersion> {
    let id_text: String = row.get("id")?;
    let term_id_text: String = row.get("term_id")?;
    let sequence_number: i64 = row.get("sequence_number")?;
    if sequence_number < 1 {
        return Err(RepoError::InvalidData(format!(
            "invalid sequence_number `{sequence_number}` in term_versions.sequence_number"
        )));
    }

    Ok(TermVersion {
        id: parse_uuid(&id_text, "term_versions.id")?,
        term_id: parse_uuid(&term_id_text, "term_versions.term_id")?,
        sequence_number,
        definition: row.get("definition")?,
        examples: row.get("examples")?,
        tags_snapshot: row.get("tags_snapshot")?,
        captured_at: row.get("captured_at")?,
    })
}
