//! Version (history snapshot) model.
//!
//! # Invariants
//! - A version is never mutated after creation.
//! - `sequence_number` starts at 1 per term and has no gaps.
//! - Captured fields describe the term *before* the edit that produced it.

use crate::model::term::{parse_tags_snapshot, TermId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VersionId = Uuid;

/// Immutable snapshot of a term's prior content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermVersion {
    pub id: VersionId,
    pub term_id: TermId,
    pub sequence_number: i64,
    pub definition: String,
    pub examples: String,
    /// Tag set serialized by [`crate::model::term::tags_snapshot`].
    pub tags_snapshot: String,
    /// Capture time, epoch milliseconds.
    pub captured_at: i64,
}

impl TermVersion {
    /// Parses the captured tag snapshot back into a tag list.
    pub fn tags(&self) -> Vec<String> {
        parse_tags_snapshot(&self.tags_snapshot)
    }
}

/// Pre-edit content handed to the version store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSnapshot {
    pub definition: String,
    pub examples: String,
    pub tags_snapshot: String,
}

/// Ordering for version listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionOrder {
    /// Newest first.
    #[default]
    Descending,
    Ascending,
}
