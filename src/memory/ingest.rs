//! Append path: redact, assign id, validate, append.

use std::collections::BTreeSet;

use super::core::{next_id, MemoryCore};
use super::error::MemoryResult;
use super::governance::redact;
use super::types::{iso_now, ArchiveRecord, LogRecord, ShadowRecord};

/// Caller-supplied Archive entry. `id` and `date` are always assigned here.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDraft {
    pub title: String,
    pub entry_type: String,
    pub content: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub owner: Option<String>,
    pub evidence: Vec<String>,
    pub next_review: Option<String>,
}

impl ArchiveDraft {
    pub fn new(
        title: impl Into<String>,
        entry_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            entry_type: entry_type.into(),
            content: content.into(),
            tags: Vec::new(),
            confidence: 0.75,
            owner: None,
            evidence: Vec::new(),
            next_review: None,
        }
    }

    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence = evidence.into_iter().map(Into::into).collect();
        self
    }

    fn into_record(self, id: u64) -> ArchiveRecord {
        ArchiveRecord {
            id,
            date: iso_now(),
            title: redact(&self.title),
            entry_type: self.entry_type,
            content: redact(&self.content),
            tags: self.tags.into_iter().collect::<BTreeSet<_>>(),
            confidence: self.confidence,
            next_review: self.next_review.unwrap_or_default(),
            owner: self.owner.unwrap_or_default(),
            evidence: self.evidence.iter().map(|item| redact(item)).collect(),
        }
    }
}

/// Caller-supplied Shadow hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowDraft {
    pub signal: String,
    pub hypothesis: String,
    pub counter: Option<String>,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub review_after: Option<String>,
}

impl ShadowDraft {
    pub fn new(signal: impl Into<String>, hypothesis: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            hypothesis: hypothesis.into(),
            counter: None,
            tags: Vec::new(),
            confidence: 0.5,
            review_after: None,
        }
    }

    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn counter(mut self, counter: impl Into<String>) -> Self {
        self.counter = Some(counter.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    fn into_record(self, id: u64) -> ShadowRecord {
        ShadowRecord {
            id,
            date: iso_now(),
            signal: redact(&self.signal),
            hypothesis: redact(&self.hypothesis),
            counter: self.counter.as_deref().map(redact),
            tags: self.tags.into_iter().collect(),
            confidence: self.confidence,
            review_after: self.review_after.unwrap_or_default(),
        }
    }
}

impl MemoryCore {
    /// Append one Archive record and return it as persisted.
    pub fn append_archive(&self, draft: ArchiveDraft) -> MemoryResult<ArchiveRecord> {
        self.commit(|id| draft.into_record(id))
    }

    /// Append one Shadow record and return it as persisted.
    pub fn append_shadow(&self, draft: ShadowDraft) -> MemoryResult<ShadowRecord> {
        self.commit(|id| draft.into_record(id))
    }

    fn commit<R, F>(&self, build: F) -> MemoryResult<R>
    where
        R: LogRecord,
        F: FnOnce(u64) -> R,
    {
        let store = self.store::<R>();
        let existing: Vec<R> = store.read_records()?;
        let record = self.validator.validate(build(next_id(&existing)?))?;
        store.append_record(&record)?;
        Ok(record)
    }
}
