//! Schema validation for Archive and Shadow records.
//!
//! One versioned rule table drives both the normalizing `validate` used on
//! append and the exhaustive `violations` used by bulk validation.

use super::error::ValidationError;
use super::types::{
    add_days, parse_iso, ArchiveRecord, LogRecord, RecordKind, ShadowRecord, DEFAULT_OWNER,
};

/// Version of the rule table below. Bump when a rule changes meaning.
pub const SCHEMA_VERSION: u32 = 2;

/// Confidence ceiling (inclusive) and the review delay it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewTier {
    pub max_confidence: f64,
    pub days: i64,
}

/// Declarative schema rules.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRules {
    pub version: u32,
    /// Archive `next_review` tiers, checked in order; the last one catches all.
    pub archive_review_tiers: &'static [ReviewTier],
    /// Shadow records at or above this confidence are reviewed sooner.
    pub shadow_fast_review_confidence: f64,
    pub shadow_fast_review_days: i64,
    pub shadow_slow_review_days: i64,
}

const ARCHIVE_REVIEW_TIERS: &[ReviewTier] = &[
    ReviewTier {
        max_confidence: 0.3,
        days: 1,
    },
    ReviewTier {
        max_confidence: 0.6,
        days: 7,
    },
    ReviewTier {
        max_confidence: 0.85,
        days: 30,
    },
    ReviewTier {
        max_confidence: f64::INFINITY,
        days: 90,
    },
];

impl SchemaRules {
    pub const CURRENT: Self = Self {
        version: SCHEMA_VERSION,
        archive_review_tiers: ARCHIVE_REVIEW_TIERS,
        shadow_fast_review_confidence: 0.7,
        shadow_fast_review_days: 3,
        shadow_slow_review_days: 7,
    };

    /// Days until an Archive record with this confidence is due for review.
    pub fn archive_review_days(&self, confidence: f64) -> i64 {
        self.archive_review_tiers
            .iter()
            .find(|tier| confidence <= tier.max_confidence)
            .or(self.archive_review_tiers.last())
            .map_or(90, |tier| tier.days)
    }

    /// Days until a Shadow hypothesis should be revisited.
    pub fn shadow_review_days(&self, confidence: f64) -> i64 {
        if confidence >= self.shadow_fast_review_confidence {
            self.shadow_fast_review_days
        } else {
            self.shadow_slow_review_days
        }
    }
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Per-kind normalization and rule checks.
pub trait Schema {
    /// Apply defaults in place (trimmed text, cleaned tags, owner, schedule).
    fn normalize(&mut self, rules: &SchemaRules);
    /// Every rule violation, in field order.
    fn violations(&self, rules: &SchemaRules) -> Vec<ValidationError>;
    /// Schedule value derived from `date` and confidence, if `date` is valid.
    fn derived_schedule(&self, rules: &SchemaRules) -> Option<String>;
}

/// Validator over the current rule table.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: SchemaRules,
}

impl Validator {
    pub fn new(rules: SchemaRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SchemaRules {
        &self.rules
    }

    /// Normalized copy of `record`, or its first violation.
    pub fn validate<R: LogRecord>(&self, mut record: R) -> Result<R, ValidationError> {
        record.normalize(&self.rules);
        self.check(&record)?;
        Ok(record)
    }

    /// Check without normalizing. Used when rewriting persisted records.
    pub fn check<R: LogRecord>(&self, record: &R) -> Result<(), ValidationError> {
        match record.violations(&self.rules).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn violations<R: LogRecord>(&self, record: &R) -> Vec<ValidationError> {
        record.violations(&self.rules)
    }
}

// ---------------------------------------------------------------------------
// Shared rule helpers
// ---------------------------------------------------------------------------

fn normalize_tags(tags: &mut std::collections::BTreeSet<String>) {
    *tags = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

struct Checker {
    kind: RecordKind,
    errors: Vec<ValidationError>,
}

impl Checker {
    fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors
            .push(ValidationError::new(self.kind, field, reason));
    }

    fn id(&mut self, id: u64) {
        if id == 0 {
            self.fail("id", "must be a positive integer");
        }
    }

    fn text(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.fail(field, "must be non-empty text");
        }
    }

    fn confidence(&mut self, value: f64) {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            self.fail("confidence", format!("{value} out of [0.0, 1.0] range"));
        }
    }

    fn tags(&mut self, tags: &std::collections::BTreeSet<String>) {
        if tags.iter().any(|tag| tag.trim().is_empty()) {
            self.fail("tags", "must not contain blank tags");
        }
    }

    fn timestamps(&mut self, date: &str, field: &'static str, schedule: &str) {
        let parsed_date = parse_iso(date);
        if parsed_date.is_none() {
            self.fail("date", format!("{date:?} is not YYYY-MM-DDTHH:MM:SSZ"));
        }
        match (parsed_date, parse_iso(schedule)) {
            (_, None) => self.fail(field, format!("{schedule:?} is not YYYY-MM-DDTHH:MM:SSZ")),
            (Some(created), Some(due)) if due < created => {
                self.fail(field, format!("{schedule} is earlier than date {date}"));
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Archive rules
// ---------------------------------------------------------------------------

impl Schema for ArchiveRecord {
    fn normalize(&mut self, rules: &SchemaRules) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.entry_type);
        trim_in_place(&mut self.content);
        trim_in_place(&mut self.owner);
        normalize_tags(&mut self.tags);
        if self.owner.is_empty() {
            self.owner = DEFAULT_OWNER.to_string();
        }
        if self.next_review.trim().is_empty() {
            if let Some(due) = self.derived_schedule(rules) {
                self.next_review = due;
            }
        }
    }

    fn violations(&self, _rules: &SchemaRules) -> Vec<ValidationError> {
        let mut check = Checker::new(RecordKind::Archive);
        check.id(self.id);
        check.text("title", &self.title);
        check.text("type", &self.entry_type);
        check.text("content", &self.content);
        check.confidence(self.confidence);
        check.tags(&self.tags);
        check.timestamps(&self.date, "next_review", &self.next_review);
        check.text("owner", &self.owner);
        check.errors
    }

    fn derived_schedule(&self, rules: &SchemaRules) -> Option<String> {
        add_days(&self.date, rules.archive_review_days(self.confidence))
    }
}

// ---------------------------------------------------------------------------
// Shadow rules
// ---------------------------------------------------------------------------

impl Schema for ShadowRecord {
    fn normalize(&mut self, rules: &SchemaRules) {
        trim_in_place(&mut self.signal);
        trim_in_place(&mut self.hypothesis);
        if let Some(counter) = self.counter.as_mut() {
            trim_in_place(counter);
        }
        normalize_tags(&mut self.tags);
        if self.review_after.trim().is_empty() {
            if let Some(due) = self.derived_schedule(rules) {
                self.review_after = due;
            }
        }
    }

    fn violations(&self, _rules: &SchemaRules) -> Vec<ValidationError> {
        let mut check = Checker::new(RecordKind::Shadow);
        check.id(self.id);
        check.text("signal", &self.signal);
        check.text("hypothesis", &self.hypothesis);
        check.confidence(self.confidence);
        check.tags(&self.tags);
        check.timestamps(&self.date, "review_after", &self.review_after);
        check.errors
    }

    fn derived_schedule(&self, rules: &SchemaRules) -> Option<String> {
        add_days(&self.date, rules.shadow_review_days(self.confidence))
    }
}
