//! Term search entry points.
//!
//! # Responsibility
//! - Expose the tiered search router over current term state.
//! - Keep the FTS5 strategy and its query shaping inside core.

pub mod fts;
pub mod router;
