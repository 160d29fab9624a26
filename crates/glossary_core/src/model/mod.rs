//! Domain model for glossary terms, their history and canonical lineages.
//!
//! # Responsibility
//! - Define the data structures shared by storage, services and search.
//! - Own pure derivations: tag normalization, tag snapshots and the
//!   search-index text.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `Term` is mutable current state; `TermVersion` is write-once history.

pub mod group;
pub mod term;
pub mod version;
