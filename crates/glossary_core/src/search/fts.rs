//! SQLite FTS5 full-text strategy.
//!
//! # Responsibility
//! - Match tokenized queries against `terms_fts.search_text`.
//! - Define the search query/error types shared with the router.
//!
//! # Invariants
//! - Hits are ordered by `bm25` rank, then term id.
//! - Blank queries never reach SQLite.

use crate::db::DbError;
use crate::model::term::TermId;
use crate::search::router::SearchStrategy;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
    /// A mandatory substring strategy failed.
    Unavailable {
        strategy: SearchStrategy,
        cause: Box<SearchError>,
    },
}

impl SearchError {
    /// Stable snake_case code for logs and outer layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery { .. } => "invalid_query",
            Self::Db(_) => "storage_unavailable",
            Self::InvalidData(_) => "invalid_data",
            Self::Unavailable { .. } => "search_unavailable",
        }
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
            Self::Unavailable { strategy, cause } => {
                write!(f, "search unavailable: {} failed: {cause}", strategy.as_str())
            }
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::Unavailable { cause, .. } => Some(cause.as_ref()),
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Maximum number of terms to return; `None` returns every match.
    pub limit: Option<u32>,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false` so ordinary punctuation never breaks a search.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates an unbounded query with escaped full-text tokens.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
            raw_fts_syntax: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Trimmed query text, `None` for empty or whitespace-only input.
    pub fn normalized_text(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Runs the full-text strategy and returns matching term ids by rank.
pub fn full_text_matches(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<TermId>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn
        .prepare(
            "SELECT term_id
             FROM terms_fts
             WHERE terms_fts MATCH ?1
             ORDER BY bm25(terms_fts), term_id ASC;",
        )
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut rows = stmt
        .query([match_expr.as_str()])
        .map_err(|err| map_query_error(err, &match_expr))?;

    let mut ids = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        let value: String = row.get(0)?;
        let id = Uuid::parse_str(&value)
            .map_err(|_| SearchError::InvalidData(format!("invalid term id `{value}`")))?;
        ids.push(id);
    }
    Ok(ids)
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.normalized_text()?;

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
