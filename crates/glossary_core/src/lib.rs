//! Core versioning and canonical-grouping engine for the glossary.
//! This crate is the single source of truth for term history invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::group::{CanonicalGroup, GroupId};
pub use model::term::{NewTerm, Term, TermEdit, TermId, TermValidationError};
pub use model::version::{TermVersion, VersionId, VersionOrder, VersionSnapshot};
pub use repo::group_repo::{GroupRepository, SqliteGroupRepository};
pub use repo::term_repo::{
    RepoError, RepoResult, SqliteTermRepository, TermListQuery, TermRepository,
};
pub use repo::version_repo::{SqliteVersionRepository, VersionRepository};
pub use search::fts::{SearchError, SearchQuery, SearchResult};
pub use search::router::{
    FullTextStatus, SearchOutcome, SearchRouter, SearchStrategies, SearchStrategy,
};
pub use service::edit_service::{EditError, TermEditService, DEFAULT_EDIT_RETRY_LIMIT};
pub use service::registry_service::{CanonicalRegistry, RegistryError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
