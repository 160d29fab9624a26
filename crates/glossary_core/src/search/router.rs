//! Tiered search router over current term state.
//!
//! # Responsibility
//! - Union three independent strategies: display-string substring,
//!   definition substring and FTS5 full-text.
//! - Degrade to the substring strategies when full-text fails.
//!
//! # Invariants
//! - Blank queries return no terms.
//! - Results are de-duplicated by term id: full-text hits first in rank
//!   order, then substring hits by display string.
//! - Full-text failure is never surfaced; substring failure surfaces as
//!   `SearchError::Unavailable`.

use crate::model::term::{Term, TermId};
use crate::repo::term_repo::load_term;
use crate::search::fts::{full_text_matches, SearchError, SearchQuery, SearchResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Individual matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    DisplayString,
    Definition,
    FullText,
}

impl SearchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisplayString => "display_string",
            Self::Definition => "definition",
            Self::FullText => "full_text",
        }
    }
}

/// Which strategies take part in a search. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStrategies {
    pub display_string: bool,
    pub definition: bool,
    pub full_text: bool,
}

impl Default for SearchStrategies {
    fn default() -> Self {
        Self {
            display_string: true,
            definition: true,
            full_text: true,
        }
    }
}

/// How the full-text strategy fared in one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullTextStatus {
    Disabled,
    Matched(usize),
    /// Strategy failed and the result fell back to substring matches.
    Degraded,
}

/// Search result with strategy diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub terms: Vec<Term>,
    pub full_text: FullTextStatus,
}

/// Read-only search router bound to one connection.
pub struct SearchRouter<'conn> {
    conn: &'conn Connection,
    strategies: SearchStrategies,
}

impl<'conn> SearchRouter<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            strategies: SearchStrategies::default(),
        }
    }

    pub fn with_strategies(mut self, strategies: SearchStrategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// Searches terms; each call re-executes every strategy.
    pub fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Term>> {
        self.search_detailed(query).map(|outcome| outcome.terms)
    }

    /// Like [`SearchRouter::search`] but also reports full-text status.
    pub fn search_detailed(&self, query: &SearchQuery) -> SearchResult<SearchOutcome> {
        let Some(text) = query.normalized_text() else {
            return Ok(SearchOutcome {
                terms: Vec::new(),
                full_text: FullTextStatus::Disabled,
            });
        };
        if query.limit == Some(0) {
            return Ok(SearchOutcome {
                terms: Vec::new(),
                full_text: FullTextStatus::Disabled,
            });
        }

        let started_at = Instant::now();
        let mut ordered: Vec<(TermId, SearchStrategy)> = Vec::new();
        let mut seen: HashSet<TermId> = HashSet::new();

        let full_text = if self.strategies.full_text {
            match full_text_matches(self.conn, query) {
                Ok(ids) => {
                    let count = ids.len();
                    push_unique(&mut ordered, &mut seen, ids, SearchStrategy::FullText);
                    FullTextStatus::Matched(count)
                }
                Err(err) => {
                    warn!(
                        "event=search_fallback module=search status=degraded strategy=full_text error_code={} error={}",
                        err.code(),
                        err
                    );
                    FullTextStatus::Degraded
                }
            }
        } else {
            FullTextStatus::Disabled
        };

        let needle = text.to_lowercase();
        if self.strategies.display_string {
            let ids = self.substring_matches(SubstringField::DisplayString, &needle)?;
            push_unique(&mut ordered, &mut seen, ids, SearchStrategy::DisplayString);
        }
        if self.strategies.definition {
            let ids = self.substring_matches(SubstringField::Definition, &needle)?;
            push_unique(&mut ordered, &mut seen, ids, SearchStrategy::Definition);
        }

        let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
        let mut terms = Vec::new();
        for (id, strategy) in ordered {
            if terms.len() >= limit {
                break;
            }
            let loaded = load_term(self.conn, id).map_err(|err| SearchError::Unavailable {
                strategy,
                cause: Box::new(SearchError::InvalidData(format!(
                    "failed to load term {id}: {err}"
                ))),
            })?;
            // Full-text rows can briefly outlive their term; skip them.
            if let Some(term) = loaded {
                terms.push(term);
            }
        }

        debug!(
            "event=search module=search status=ok hits={} full_text={:?} duration_ms={}",
            terms.len(),
            full_text,
            started_at.elapsed().as_millis()
        );

        Ok(SearchOutcome { terms, full_text })
    }

    fn substring_matches(&self, field: SubstringField, needle: &str) -> SearchResult<Vec<TermId>> {
        substring_query(self.conn, field, needle).map_err(|err| SearchError::Unavailable {
            strategy: field.strategy(),
            cause: Box::new(err),
        })
    }
}

/// Columns served by the substring strategies.
#[derive(Debug, Clone, Copy)]
enum SubstringField {
    DisplayString,
    Definition,
}

impl SubstringField {
    fn column(self) -> &'static str {
        match self {
            Self::DisplayString => "term_string",
            Self::Definition => "definition",
        }
    }

    fn strategy(self) -> SearchStrategy {
        match self {
            Self::DisplayString => SearchStrategy::DisplayString,
            Self::Definition => SearchStrategy::Definition,
        }
    }
}

/// Scans one column and keeps rows containing `needle` (already lowercased).
/// SQLite `LIKE` folds ASCII only, so the comparison runs in Rust.
fn substring_query(
    conn: &Connection,
    field: SubstringField,
    needle: &str,
) -> SearchResult<Vec<TermId>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, {column}
         FROM terms
         ORDER BY term_string COLLATE NOCASE ASC, id ASC;",
        column = field.column()
    ))?;
    let mut rows = stmt.query([])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let haystack: String = row.get(1)?;
        if !contains_folded(&haystack, needle) {
            continue;
        }
        let value: String = row.get(0)?;
        let id = Uuid::parse_str(&value)
            .map_err(|_| SearchError::InvalidData(format!("invalid term id `{value}`")))?;
        ids.push(id);
    }
    Ok(ids)
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn push_unique(
    ordered: &mut Vec<(TermId, SearchStrategy)>,
    seen: &mut HashSet<TermId>,
    ids: Vec<TermId>,
    strategy: SearchStrategy,
) {
    for id in ids {
        if seen.insert(id) {
            ordered.push((id, strategy));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::contains_folded;

    #[test]
    fn folding_covers_non_ascii_letters() {
        assert!(contains_folded("Éclair", &"ÉCL".to_lowercase()));
        assert!(contains_folded("Straße über alles", "ÜBER".to_lowercase().as_str()));
        assert!(!contains_folded("Eclair", "écl"));
    }

    #[test]
    fn wildcard_characters_match_literally() {
        assert!(contains_folded("100% ice", "%"));
        assert!(!contains_folded("plain text", "%"));
        assert!(!contains_folded("plain text", "_"));
    }
}
