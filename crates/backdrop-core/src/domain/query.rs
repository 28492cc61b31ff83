//! HistoryQuery - filters and pagination over repository history.

use chrono::{DateTime, Utc};

use super::artifact::{Artifact, OriginKind};

/// Filter set evaluated against history rows.
///
/// An unset filter matches everything. `*_equals` wins over `*_contains`
/// when both are given for the same field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub origin_equals: Option<String>,
    pub origin_contains: Option<String>,
    pub origin_kinds: Vec<OriginKind>,
    pub filename_equals: Option<String>,
    pub title_contains: Option<String>,
    pub author_contains: Option<String>,
    pub fetched_after: Option<DateTime<Utc>>,
    pub fetched_before: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin_equals = Some(origin.into());
        self
    }

    pub fn origin_containing(mut self, needle: impl Into<String>) -> Self {
        self.origin_contains = Some(needle.into());
        self
    }

    pub fn kind(mut self, kind: OriginKind) -> Self {
        if !self.origin_kinds.contains(&kind) {
            self.origin_kinds.push(kind);
        }
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename_equals = Some(filename.into());
        self
    }

    pub fn title_containing(mut self, needle: impl Into<String>) -> Self {
        self.title_contains = Some(needle.into());
        self
    }

    pub fn author_containing(mut self, needle: impl Into<String>) -> Self {
        self.author_contains = Some(needle.into());
        self
    }

    pub fn fetched_after(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_after = Some(at);
        self
    }

    pub fn fetched_before(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_before = Some(at);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        let origin_ok = match (&self.origin_equals, &self.origin_contains) {
            (Some(origin), _) => artifact.origin == *origin,
            (None, Some(needle)) => artifact.origin.contains(needle.as_str()),
            (None, None) => true,
        };

        let kind_ok =
            self.origin_kinds.is_empty() || self.origin_kinds.contains(&artifact.origin_kind());

        let filename_ok = self
            .filename_equals
            .as_ref()
            .is_none_or(|name| artifact.filename == *name);

        let title_ok = self
            .title_contains
            .as_ref()
            .is_none_or(|needle| artifact.title.contains(needle.as_str()));

        let author_ok = self
            .author_contains
            .as_ref()
            .is_none_or(|needle| artifact.author.contains(needle.as_str()));

        let after_ok = self.fetched_after.is_none_or(|at| artifact.fetched_at > at);
        let before_ok = self.fetched_before.is_none_or(|at| artifact.fetched_at < at);

        origin_ok && kind_ok && filename_ok && title_ok && author_ok && after_ok && before_ok
    }

    /// Filter `rows` (kept in their given order) and apply pagination.
    pub fn apply(&self, rows: Vec<Artifact>) -> Vec<Artifact> {
        let matching = rows
            .into_iter()
            .filter(|artifact| self.matches(artifact))
            .skip(self.offset);
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
