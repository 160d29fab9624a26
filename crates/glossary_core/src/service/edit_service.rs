//! Term edit coordinator.
//!
//! # Responsibility
//! - Run the snapshot-then-mutate sequence for one edit.
//! - Retry whole edits that lost a version-sequence race.
//! - Serve version history reads.
//!
//! # Invariants
//! - Validation happens before any storage access.
//! - Snapshot append, term mutation and index refresh commit in one
//!   `IMMEDIATE` transaction: no committed mutation exists without its
//!   preceding version row.
//! - Any failure (or drop mid-edit) rolls the whole edit back.

use crate::model::term::{Term, TermEdit, TermId, TermValidationError};
use crate::model::version::{TermVersion, VersionOrder, VersionSnapshot};
use crate::repo::term_repo::{RepoError, SqliteTermRepository, TermRepository};
use crate::repo::version_repo::{SqliteVersionRepository, VersionRepository};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Default number of attempts for [`TermEditService::edit_term_with_retry`].
pub const DEFAULT_EDIT_RETRY_LIMIT: u32 = 3;

/// Edit/history failure surfaced to callers.
#[derive(Debug)]
pub enum EditError {
    /// Caller-supplied fields violate a precondition.
    InvalidInput(TermValidationError),
    NotFound(TermId),
    /// Version-append race lost; retry the whole edit.
    ConcurrentSequenceConflict(TermId),
    /// Underlying storage failure; `code()` reports `storage_busy` when
    /// another writer held the lock past the busy timeout.
    StorageUnavailable(RepoError),
}

impl EditError {
    /// Stable snake_case code for logs and outer layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::ConcurrentSequenceConflict(_) => "concurrent_sequence_conflict",
            Self::StorageUnavailable(err) if err.is_busy() => "storage_busy",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::NotFound(id) => write!(f, "term not found: {id}"),
            Self::ConcurrentSequenceConflict(id) => {
                write!(f, "concurrent version sequence conflict for term {id}")
            }
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl Error for EditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::StorageUnavailable(err) => Some(err),
            Self::NotFound(_) | Self::ConcurrentSequenceConflict(_) => None,
        }
    }
}

impl From<RepoError> for EditError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err),
            RepoError::TermNotFound(id) => Self::NotFound(id),
            RepoError::SequenceConflict(id) => Self::ConcurrentSequenceConflict(id),
            other => Self::StorageUnavailable(other),
        }
    }
}

impl From<rusqlite::Error> for EditError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageUnavailable(RepoError::from(value))
    }
}

impl From<TermValidationError> for EditError {
    fn from(value: TermValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Coordinates versioned edits on one connection.
///
/// The service holds no shared state; every worker builds its own over its
/// own connection.
pub struct TermEditService<'conn> {
    conn: &'conn Connection,
    retry_limit: u32,
}

impl<'conn> TermEditService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            retry_limit: DEFAULT_EDIT_RETRY_LIMIT,
        }
    }

    /// Sets the attempt bound for retried edits (minimum 1).
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    /// Applies one edit, recording the pre-edit state as a new version.
    ///
    /// # Errors
    /// - `InvalidInput` before touching storage.
    /// - `NotFound` when the term does not exist.
    /// - `ConcurrentSequenceConflict` when a concurrent append won the
    ///   sequence number; nothing was committed.
    pub fn edit_term(&self, term_id: TermId, edit: &TermEdit) -> Result<Term, EditError> {
        edit.validate()?;

        let started_at = Instant::now();
        match self.edit_term_in_tx(term_id, edit) {
            Ok((term, sequence_number)) => {
                info!(
                    "event=term_edit module=service status=ok term_id={} sequence_number={} duration_ms={}",
                    term_id,
                    sequence_number,
                    started_at.elapsed().as_millis()
                );
                Ok(term)
            }
            Err(err) => {
                error!(
                    "event=term_edit module=service status=error term_id={} duration_ms={} error_code={} error={}",
                    term_id,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Runs [`TermEditService::edit_term`], re-running the whole edit on
    /// `ConcurrentSequenceConflict` up to the configured attempt bound.
    pub fn edit_term_with_retry(
        &self,
        term_id: TermId,
        edit: &TermEdit,
    ) -> Result<Term, EditError> {
        retry_on_conflict(self.retry_limit, |attempt| {
            if attempt > 1 {
                warn!(
                    "event=term_edit_retry module=service status=retry term_id={} attempt={}",
                    term_id, attempt
                );
            }
            self.edit_term(term_id, edit)
        })
    }

    /// Lists the version history of an existing term.
    pub fn list_versions(
        &self,
        term_id: TermId,
        order: VersionOrder,
    ) -> Result<Vec<TermVersion>, EditError> {
        let versions = SqliteVersionRepository::try_new(self.conn)?;
        Ok(versions.list_versions(term_id, order)?)
    }

    fn edit_term_in_tx(&self, term_id: TermId, edit: &TermEdit) -> Result<(Term, i64), EditError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let terms = SqliteTermRepository::try_new(&tx)?;
        let versions = SqliteVersionRepository::try_new(&tx)?;

        let mut term = terms.get_term(term_id)?.ok_or(EditError::NotFound(term_id))?;
        let snapshot = VersionSnapshot {
            definition: term.definition.clone(),
            examples: term.examples.clone(),
            tags_snapshot: term.tags_snapshot(),
        };
        let version = versions.append_version(term_id, &snapshot)?;

        term.apply_edit(edit);
        terms.update_term(&term)?;
        terms.refresh_search_index(term_id)?;
        let updated = terms.get_term(term_id)?.ok_or(EditError::NotFound(term_id))?;

        tx.commit()?;
        Ok((updated, version.sequence_number))
    }
}

/// Calls `op` with a 1-based attempt number until it succeeds, fails with
/// anything other than `ConcurrentSequenceConflict`, or runs out of attempts.
pub(crate) fn retry_on_conflict<T>(
    max_attempts: u32,
    mut op: impl FnMut(u32) -> Result<T, EditError>,
) -> Result<T, EditError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Err(EditError::ConcurrentSequenceConflict(_)) if attempt < max_attempts => {
                attempt += 1;
            }
            result => return result,
        }
    }
}
