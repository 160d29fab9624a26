//! Canonical group repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist canonical groups and the term -> group reference.
//!
//! # Invariants
//! - Group names are unique case-insensitively.
//! - Changing one term's reference never touches the group row or any
//!   other member.
//! - Membership changes are not versioned.

use crate::model::group::{CanonicalGroup, GroupId};
use crate::model::term::{Term, TermId};
use crate::repo::term_repo::{
    ensure_connection_ready, parse_uuid, query_terms, term_exists, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const GROUP_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    created_at
FROM canonical_groups";

/// Repository interface for canonical groups.
pub trait GroupRepository {
    fn create_group(&self, name: &str, description: &str) -> RepoResult<CanonicalGroup>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<CanonicalGroup>>;
    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<CanonicalGroup>>;
    fn list_groups(&self) -> RepoResult<Vec<CanonicalGroup>>;
    /// Points a term at a group; re-assigning the same pair is a no-op.
    fn assign_term(&self, term_id: TermId, group_id: GroupId) -> RepoResult<()>;
    /// Clears a term's group reference.
    fn unassign_term(&self, term_id: TermId) -> RepoResult<()>;
    /// Lists member terms ordered by display string.
    fn members_of(&self, group_id: GroupId) -> RepoResult<Vec<Term>>;
}

/// SQLite-backed canonical group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&self, name: &str, description: &str) -> RepoResult<CanonicalGroup> {
        let name = name.trim();
        if self.find_group_by_name(name)?.is_some() {
            return Err(RepoError::DuplicateGroupName(name.to_string()));
        }

        let id = Uuid::new_v4();
        let inserted = self.conn.execute(
            "INSERT INTO canonical_groups (id, name, description) VALUES (?1, ?2, ?3);",
            params![id.to_string(), name, description],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if crate::db::is_unique_violation(&err) => {
                return Err(RepoError::DuplicateGroupName(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        self.get_group(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("group {id} missing after insert")))
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<CanonicalGroup>> {
        self.query_one(&format!("{GROUP_SELECT_SQL} WHERE id = ?1;"), id.to_string())
    }

    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<CanonicalGroup>> {
        self.query_one(
            &format!("{GROUP_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"),
            name.trim().to_string(),
        )
    }

    fn list_groups(&self) -> RepoResult<Vec<CanonicalGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn assign_term(&self, term_id: TermId, group_id: GroupId) -> RepoResult<()> {
        if !term_exists(self.conn, term_id)? {
            return Err(RepoError::TermNotFound(term_id));
        }
        if self.get_group(group_id)?.is_none() {
            return Err(RepoError::GroupNotFound(group_id));
        }

        self.conn.execute(
            "UPDATE terms SET canonical_group_id = ?2 WHERE id = ?1;",
            params![term_id.to_string(), group_id.to_string()],
        )?;
        Ok(())
    }

    fn unassign_term(&self, term_id: TermId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE terms SET canonical_group_id = NULL WHERE id = ?1;",
            [term_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TermNotFound(term_id));
        }
        Ok(())
    }

    fn members_of(&self, group_id: GroupId) -> RepoResult<Vec<Term>> {
        if self.get_group(group_id)?.is_none() {
            return Err(RepoError::GroupNotFound(group_id));
        }
        query_terms(
            self.conn,
            "WHERE canonical_group_id = ?1 ORDER BY term_string COLLATE NOCASE ASC, id ASC",
            vec![Value::Text(group_id.to_string())],
        )
    }
}

impl SqliteGroupRepository<'_> {
    fn query_one(&self, sql: &str, key: String) -> RepoResult<Option<CanonicalGroup>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }
        Ok(None)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<CanonicalGroup> {
    let id_text: String = row.get("id")?;
    Ok(CanonicalGroup {
        id: parse_uuid(&id_text, "canonical_groups.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}
