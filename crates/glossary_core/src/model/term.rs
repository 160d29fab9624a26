//! Term domain model.
//!
//! # Responsibility
//! - Define the mutable current state of one glossary entry.
//! - Define creation drafts and partial edits, plus their validation.
//! - Derive tag snapshots and the full-text index text.
//!
//! # Invariants
//! - `id` is stable and never reused for another term.
//! - `tags` are trimmed, lowercase, unique and sorted ascending.
//! - `search_text` is always `derive_search_text(definition, examples, tags)`.

use crate::model::group::GroupId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one glossary term.
pub type TermId = Uuid;

/// Separator used in serialized tag snapshots.
pub const TAG_SNAPSHOT_SEPARATOR: &str = ", ";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Current state of a glossary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    /// Display string, e.g. `Polymorphism`.
    pub term_string: String,
    pub definition: String,
    pub examples: String,
    /// Normalized tag set.
    pub tags: Vec<String>,
    pub canonical_group_id: Option<GroupId>,
    /// Derived, recomputable text backing the full-text index.
    pub search_text: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Term {
    /// Applies a validated edit to this in-memory state.
    ///
    /// Tags, when present, replace the whole set. `search_text` is
    /// recomputed so the derived field never lags behind its sources.
    pub fn apply_edit(&mut self, edit: &TermEdit) {
        if let Some(term_string) = edit.term_string.as_deref() {
            self.term_string = term_string.trim().to_string();
        }
        if let Some(definition) = edit.definition.as_ref() {
            self.definition = definition.clone();
        }
        if let Some(examples) = edit.examples.as_ref() {
            self.examples = examples.clone();
        }
        if let Some(tags) = edit.tags.as_ref() {
            self.tags = normalize_tags(tags);
        }
        self.search_text = derive_search_text(&self.definition, &self.examples, &self.tags);
    }

    /// Serializes the current tag set for a version snapshot.
    pub fn tags_snapshot(&self) -> String {
        tags_snapshot(&self.tags)
    }
}

/// Creation draft for a term.
///
/// Term creation belongs to the surrounding application; the draft is the
/// shape it hands to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerm {
    pub term_string: String,
    pub definition: String,
    #[serde(default)]
    pub examples: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTerm {
    pub fn new(term_string: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term_string: term_string.into(),
            definition: definition.into(),
            ..Self::default()
        }
    }

    pub fn with_examples(mut self, examples: impl Into<String>) -> Self {
        self.examples = examples.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Validates required fields and tag values.
    pub fn validate(&self) -> Result<(), TermValidationError> {
        validate_term_string(&self.term_string)?;
        validate_definition(&self.definition)?;
        validate_tags(&self.tags)
    }
}

/// Caller-supplied replacement fields for one edit.
///
/// `None` leaves a field untouched. `tags: Some(..)` replaces the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEdit {
    #[serde(default)]
    pub term_string: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TermEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term_string(mut self, value: impl Into<String>) -> Self {
        self.term_string = Some(value.into());
        self
    }

    pub fn definition(mut self, value: impl Into<String>) -> Self {
        self.definition = Some(value.into());
        self
    }

    pub fn examples(mut self, value: impl Into<String>) -> Self {
        self.examples = Some(value.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Returns whether the edit carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.term_string.is_none()
            && self.definition.is_none()
            && self.examples.is_none()
            && self.tags.is_none()
    }

    /// Validates the edit before any storage access.
    pub fn validate(&self) -> Result<(), TermValidationError> {
        if self.is_empty() {
            return Err(TermValidationError::EmptyEdit);
        }
        if let Some(term_string) = self.term_string.as_deref() {
            validate_term_string(term_string)?;
        }
        if let Some(definition) = self.definition.as_deref() {
            validate_definition(definition)?;
        }
        if let Some(tags) = self.tags.as_deref() {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

/// Precondition failures on caller-supplied term data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermValidationError {
    EmptyTermString,
    EmptyDefinition,
    /// Tag is blank or contains the snapshot separator.
    InvalidTag(String),
    /// Edit request carries no field to change.
    EmptyEdit,
}

impl Display for TermValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTermString => write!(f, "term string cannot be empty"),
            Self::EmptyDefinition => write!(f, "definition cannot be empty"),
            Self::InvalidTag(tag) => write!(f, "invalid tag: `{tag}`"),
            Self::EmptyEdit => write!(f, "edit contains no fields"),
        }
    }
}

impl Error for TermValidationError {}

fn validate_term_string(value: &str) -> Result<(), TermValidationError> {
    if value.trim().is_empty() {
        return Err(TermValidationError::EmptyTermString);
    }
    Ok(())
}

fn validate_definition(value: &str) -> Result<(), TermValidationError> {
    if value.trim().is_empty() {
        return Err(TermValidationError::EmptyDefinition);
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), TermValidationError> {
    for tag in tags {
        if tag.trim().is_empty() || tag.contains(',') {
            return Err(TermValidationError::InvalidTag(tag.clone()));
        }
    }
    Ok(())
}

/// Normalizes one tag value: trimmed and lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

/// Renders a tag set as a deterministic delimited string.
///
/// The output depends only on set content, never on input order.
pub fn tags_snapshot(tags: &[String]) -> String {
    normalize_tags(tags).join(TAG_SNAPSHOT_SEPARATOR)
}

/// Parses a snapshot produced by [`tags_snapshot`].
pub fn parse_tags_snapshot(snapshot: &str) -> Vec<String> {
    let parts = snapshot
        .split(',')
        .map(str::to_string)
        .collect::<Vec<_>>();
    normalize_tags(&parts)
}

/// Builds the full-text index text from definition, examples and tags.
///
/// Lowercased with whitespace runs collapsed to single spaces.
pub fn derive_search_text(definition: &str, examples: &str, tags: &[String]) -> String {
    let mut joined = String::with_capacity(definition.len() + examples.len() + 16);
    joined.push_str(definition);
    joined.push(' ');
    joined.push_str(examples);
    for tag in tags {
        joined.push(' ');
        joined.push_str(tag);
    }
    let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
    collapsed.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{
        derive_search_text, parse_tags_snapshot, tags_snapshot, NewTerm, TermEdit,
        TermValidationError,
    };

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn snapshot_is_order_independent() {
        let first = tags_snapshot(&owned(&["OOP", "types", " oop "]));
        let second = tags_snapshot(&owned(&["types", "oop"]));
        assert_eq!(first, "oop, types");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_snapshot_parses_to_empty_set() {
        assert_eq!(tags_snapshot(&[]), "");
        assert!(parse_tags_snapshot("").is_empty());
        assert_eq!(parse_tags_snapshot("oop, types"), owned(&["oop", "types"]));
    }

    #[test]
    fn search_text_collapses_whitespace_and_lowercases() {
        let text = derive_search_text("Many\n  Forms", "", &owned(&["oop"]));
        assert_eq!(text, "many forms oop");
    }

    #[test]
    fn edit_without_fields_is_rejected() {
        assert_eq!(
            TermEdit::new().validate(),
            Err(TermValidationError::EmptyEdit)
        );
    }

    #[test]
    fn blank_display_string_is_rejected() {
        let err = TermEdit::new().term_string("   ").validate().unwrap_err();
        assert_eq!(err, TermValidationError::EmptyTermString);

        let err = NewTerm::new("", "defined").validate().unwrap_err();
        assert_eq!(err, TermValidationError::EmptyTermString);
    }

    #[test]
    fn tags_with_separator_are_rejected() {
        let err = TermEdit::new().tags(["a,b"]).validate().unwrap_err();
        assert!(matches!(err, TermValidationError::InvalidTag(_)));
    }
}
