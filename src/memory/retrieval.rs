//! Linear-scan search and summary statistics over the logs.

use std::collections::HashMap;

use serde::Serialize;

use super::codec::encode;
use super::core::MemoryCore;
use super::error::MemoryResult;
use super::types::{ArchiveRecord, LogRecord, ShadowRecord};

/// Number of tags reported by [`MemoryCore::stats`].
pub const TOP_TAGS_LIMIT: usize = 15;

const CONFIDENCE_EPSILON: f64 = 1e-9;

/// Confidence predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceFilter {
    Exact(f64),
    AtLeast(f64),
}

impl ConfidenceFilter {
    fn accepts(self, confidence: f64) -> bool {
        match self {
            Self::Exact(target) => (confidence - target).abs() < CONFIDENCE_EPSILON,
            Self::AtLeast(floor) => confidence >= floor,
        }
    }
}

/// Conjunctive search predicates. An empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Every listed tag must be present.
    pub tags: Vec<String>,
    pub confidence: Option<ConfidenceFilter>,
    /// Case-insensitive substring of the encoded record.
    pub text: Option<String>,
    /// Archive only; Shadow records have no owner.
    pub owner: Option<String>,
}

impl SearchQuery {
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn confidence(mut self, filter: ConfidenceFilter) -> Self {
        self.confidence = Some(filter);
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    fn matches<R: LogRecord>(&self, record: &R) -> bool {
        if !self.tags.iter().all(|tag| record.tags().contains(tag)) {
            return false;
        }
        if let Some(filter) = self.confidence {
            if !filter.accepts(record.confidence()) {
                return false;
            }
        }
        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => encode(record)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Counts and tag frequencies across both logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub archive: usize,
    pub shadow: usize,
    pub top_tags: Vec<TagCount>,
    /// Mean Archive confidence, 0.0 for an empty Archive.
    pub avg_confidence: f64,
}

impl MemoryCore {
    /// Archive records matching `query`, in log order.
    pub fn search_archive(&self, query: &SearchQuery) -> MemoryResult<Vec<ArchiveRecord>> {
        let owner = query.owner.as_deref();
        Ok(self
            .archive_records()?
            .into_iter()
            .filter(|record| owner.is_none_or(|owner| record.owner == owner))
            .filter(|record| query.matches(record))
            .collect())
    }

    /// Shadow records matching `query`, in log order. `owner` is ignored.
    pub fn search_shadow(&self, query: &SearchQuery) -> MemoryResult<Vec<ShadowRecord>> {
        Ok(self
            .shadow_records()?
            .into_iter()
            .filter(|record| query.matches(record))
            .collect())
    }

    pub fn stats(&self) -> MemoryResult<MemoryStats> {
        let archive = self.archive_records()?;
        let shadow = self.shadow_records()?;

        let tags = archive
            .iter()
            .flat_map(|record| record.tags.iter())
            .chain(shadow.iter().flat_map(|record| record.tags.iter()));
        let avg_confidence = if archive.is_empty() {
            0.0
        } else {
            archive.iter().map(|record| record.confidence).sum::<f64>() / archive.len() as f64
        };

        Ok(MemoryStats {
            archive: archive.len(),
            shadow: shadow.len(),
            top_tags: top_tags(tags, TOP_TAGS_LIMIT),
            avg_confidence,
        })
    }
}

/// Most frequent tags, ties broken by name.
pub(crate) fn top_tags<'a, I>(tags: I, limit: usize) -> Vec<TagCount>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in tags {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}
