//! Canonical registry use-case service.
//!
//! # Responsibility
//! - Create canonical groups and manage the term -> group reference.
//! - Translate repository errors into the registry error taxonomy.
//!
//! # Invariants
//! - Group names are trimmed and non-empty before reaching storage.
//! - Assignment is idempotent and never snapshotted.

use crate::model::group::{CanonicalGroup, GroupId};
use crate::model::term::{Term, TermId};
use crate::repo::group_repo::GroupRepository;
use crate::repo::term_repo::RepoError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registry failure surfaced to callers.
#[derive(Debug)]
pub enum RegistryError {
    /// Caller-supplied data violates a precondition.
    InvalidInput(String),
    DuplicateName(String),
    TermNotFound(TermId),
    GroupNotFound(GroupId),
    StorageUnavailable(RepoError),
}

impl RegistryError {
    /// Stable snake_case code for logs and outer layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::DuplicateName(_) => "duplicate_name",
            Self::TermNotFound(_) | Self::GroupNotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::DuplicateName(name) => {
                write!(f, "canonical group name already exists: `{name}`")
            }
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "canonical group not found: {id}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateGroupName(name) => Self::DuplicateName(name),
            RepoError::TermNotFound(id) => Self::TermNotFound(id),
            RepoError::GroupNotFound(id) => Self::GroupNotFound(id),
            other => Self::StorageUnavailable(other),
        }
    }
}

/// Canonical registry facade over a group repository.
pub struct CanonicalRegistry<R: GroupRepository> {
    repo: R,
}

impl<R: GroupRepository> CanonicalRegistry<R> {
    /// Creates a registry using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a new canonical group.
    ///
    /// Fails with `DuplicateName` when the name exists (case-insensitive).
    pub fn create_group(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CanonicalGroup, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::InvalidInput(
                "group name cannot be empty".to_string(),
            ));
        }

        match self.repo.create_group(name, description) {
            Ok(group) => {
                info!(
                    "event=group_create module=registry status=ok group_id={}",
                    group.id
                );
                Ok(group)
            }
            Err(err) => {
                let err = RegistryError::from(err);
                error!(
                    "event=group_create module=registry status=error error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Points a term at a group. Re-assigning the same pair succeeds.
    pub fn assign_term_to_group(
        &self,
        term_id: TermId,
        group_id: GroupId,
    ) -> Result<(), RegistryError> {
        self.repo.assign_term(term_id, group_id)?;
        info!(
            "event=group_assign module=registry status=ok term_id={} group_id={}",
            term_id, group_id
        );
        Ok(())
    }

    /// Clears a term's group reference without touching the group.
    pub fn unassign_term(&self, term_id: TermId) -> Result<(), RegistryError> {
        self.repo.unassign_term(term_id)?;
        info!(
            "event=group_unassign module=registry status=ok term_id={}",
            term_id
        );
        Ok(())
    }

    /// Lists all terms currently referencing the group.
    pub fn members_of(&self, group_id: GroupId) -> Result<Vec<Term>, RegistryError> {
        Ok(self.repo.members_of(group_id)?)
    }

    pub fn get_group(&self, group_id: GroupId) -> Result<CanonicalGroup, RegistryError> {
        self.repo
            .get_group(group_id)?
            .ok_or(RegistryError::GroupNotFound(group_id))
    }

    pub fn find_group_by_name(&self, name: &str) -> Result<Option<CanonicalGroup>, RegistryError> {
        Ok(self.repo.find_group_by_name(name)?)
    }

    pub fn list_groups(&self) -> Result<Vec<CanonicalGroup>, RegistryError> {
        Ok(self.repo.list_groups()?)
    }
}
