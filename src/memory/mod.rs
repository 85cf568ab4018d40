//! Archive/Shadow memory: append-only JSONL logs with schema validation,
//! redaction, whole-log maintenance and stitch summaries.
//!
//! Module tree:
//!   memory/types.rs        - Record types, record trait, timestamps
//!   memory/codec.rs        - One record per line encode/decode
//!   memory/schema.rs       - Versioned rule table and validator
//!   memory/error.rs        - Validation, malformed-record and I/O errors
//!   memory/store/jsonl.rs  - Append-only log file with atomic rewrite
//!   memory/governance.rs   - On-disk layout and PII redaction
//!   memory/core.rs         - `MemoryCore` handle and paths
//!   memory/ingest.rs       - Append path
//!   memory/retrieval.rs    - Search and stats
//!   memory/maintenance.rs  - Reindex, dedupe, compact, upgrade, validate-all
//!   memory/stitch.rs       - Rule-8 / rule-88 stitch pass
//!   memory/scan.rs         - Transcript and log-directory scans
//!   memory/snapshot.rs     - Snapshot and export
//!   memory/shared.rs       - Lock-serialized shared handle

pub mod codec;
mod core;
pub mod error;
pub mod governance;
mod ingest;
mod maintenance;
mod retrieval;
mod scan;
pub mod schema;
mod shared;
mod snapshot;
mod stitch;
pub mod store;
pub mod types;

pub use self::core::{MemoryCore, MemoryPaths};
pub use error::{MalformedRecord, MemoryError, MemoryResult, ValidationError};
pub use governance::{redact, DEFAULT_MAX_RECORDS};
pub use ingest::{ArchiveDraft, ShadowDraft};
pub use maintenance::{content_hash, CompactReport, KindCounts, Problem, ValidationReport};
pub use retrieval::{ConfidenceFilter, MemoryStats, SearchQuery, TagCount};
pub use scan::{DirectoryScan, TranscriptScan};
pub use schema::{SchemaRules, Validator, SCHEMA_VERSION};
pub use shared::SharedMemory;
pub use snapshot::SnapshotReport;
pub use stitch::{StitchSummary, RULE_88_WINDOW, RULE_8_WINDOW};
pub use types::{ArchiveRecord, LogRecord, RecordKind, ShadowRecord};
