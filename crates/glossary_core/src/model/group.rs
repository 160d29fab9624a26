//! Canonical group model.
//!
//! A canonical group is a named lineage shared by related terms. Groups are
//! not versioned.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalGroup {
    pub id: GroupId,
    /// Unique, compared case-insensitively.
    pub name: String,
    pub description: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}
