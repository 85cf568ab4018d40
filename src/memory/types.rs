//! Record types for the Archive and Shadow logs.
//!
//! Both logs hold explicit tagged records. Anything that reaches a log goes
//! through [`crate::memory::schema`] first; decoding tolerates missing text
//! and schedule fields so that validation (not the decoder) can report them.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use super::schema::Schema;

/// Fixed timestamp layout: ISO-8601 UTC, seconds precision, trailing `Z`.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Owner assigned to Archive records that do not name one.
pub const DEFAULT_OWNER: &str = "user";

static ISO_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").expect("valid timestamp pattern")
});

// ---------------------------------------------------------------------------
// Record kinds
// ---------------------------------------------------------------------------

/// Which log a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Archive,
    Shadow,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Shadow => "shadow",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" => Ok(Self::Archive),
            "shadow" => Ok(Self::Shadow),
            other => Err(format!("unknown record kind '{other}' (expected archive or shadow)")),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Archive record
// ---------------------------------------------------------------------------

/// A durable, confidence-scored memory unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    /// Free-form category label ("decision", "fact", "question", "insight", ...).
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(alias = "thought", default)]
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "deserialize_schedule")]
    pub next_review: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

// ---------------------------------------------------------------------------
// Shadow record
// ---------------------------------------------------------------------------

/// A lower-confidence, time-boxed hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub hypothesis: String,
    /// Falsifying observation or rebuttal. Always text when present.
    #[serde(default)]
    pub counter: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "deserialize_schedule")]
    pub review_after: String,
}

// ---------------------------------------------------------------------------
// Shared record behavior
// ---------------------------------------------------------------------------

/// Behavior shared by both record kinds so lifecycle code is written once.
pub trait LogRecord: Schema + Serialize + DeserializeOwned + Clone + PartialEq {
    const KIND: RecordKind;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn date(&self) -> &str;
    fn set_date(&mut self, date: String);
    fn confidence(&self) -> f64;
    fn tags(&self) -> &BTreeSet<String>;
    /// Text hashed by dedupe: title+content or signal+hypothesis.
    fn dedupe_key(&self) -> String;
    /// `next_review` for Archive, `review_after` for Shadow.
    fn schedule(&self) -> &str;
    fn set_schedule(&mut self, value: String);
}

impl LogRecord for ArchiveRecord {
    const KIND: RecordKind = RecordKind::Archive;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn set_date(&mut self, date: String) {
        self.date = date;
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn dedupe_key(&self) -> String {
        format!("{}|{}", self.title, self.content)
    }

    fn schedule(&self) -> &str {
        &self.next_review
    }

    fn set_schedule(&mut self, value: String) {
        self.next_review = value;
    }
}

impl LogRecord for ShadowRecord {
    const KIND: RecordKind = RecordKind::Shadow;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn set_date(&mut self, date: String) {
        self.date = date;
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn dedupe_key(&self) -> String {
        format!("{}|{}", self.signal, self.hypothesis)
    }

    fn schedule(&self) -> &str {
        &self.review_after
    }

    fn set_schedule(&mut self, value: String) {
        self.review_after = value;
    }
}

// ---------------------------------------------------------------------------
// Field decoding helpers
// ---------------------------------------------------------------------------

/// Accept a JSON number or a numeric string; the schema checks the range.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawConfidence {
        Number(f64),
        Text(String),
    }

    match RawConfidence::deserialize(deserializer)? {
        RawConfidence::Number(value) => Ok(value),
        RawConfidence::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("confidence {text:?} is not a number"))),
    }
}

/// Schedule fields may be absent, `null` or of the wrong JSON type in older
/// logs; all of those decode to "" so `upgrade` can fill them in.
fn deserialize_schedule<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => Ok(text),
        _ => Ok(String::new()),
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current UTC time in the fixed log format.
pub fn iso_now() -> String {
    format_iso(Utc::now())
}

pub fn format_iso(at: DateTime<Utc>) -> String {
    at.format(ISO_FORMAT).to_string()
}

/// Parse a timestamp in the fixed log format. Anything else is `None`.
pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    if !ISO_SHAPE.is_match(value) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, ISO_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn is_iso(value: &str) -> bool {
    parse_iso(value).is_some()
}

/// Shift a log timestamp by whole days. `None` if `value` is malformed.
pub fn add_days(value: &str, days: i64) -> Option<String> {
    parse_iso(value).map(|at| format_iso(at + Duration::days(days)))
}

/// Compact UTC stamp used in snapshot file names.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
