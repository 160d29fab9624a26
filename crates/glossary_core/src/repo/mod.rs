//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories only accept fully migrated connections.
//! - Repository APIs return semantic errors (`TermNotFound`,
//!   `SequenceConflict`, ...) in addition to DB transport errors.

pub mod group_repo;
pub mod term_repo;
pub mod version_repo;
