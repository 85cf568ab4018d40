//! Whole-log maintenance: reindex, dedupe, compact, upgrade and validate-all.
//!
//! Every mutating operation reads the full log, transforms it in memory and
//! commits with one atomic rewrite per log. Any error is returned before the
//! first rewrite starts.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::codec::decode;
use super::core::MemoryCore;
use super::error::MemoryResult;
use super::types::{iso_now, is_iso, ArchiveRecord, LogRecord, RecordKind, ShadowRecord};

/// Hex digits kept from the SHA-256 content hash.
const CONTENT_HASH_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub archive: usize,
    pub shadow: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactReport {
    pub kept: usize,
    pub removed: usize,
}

/// One problem found by [`MemoryCore::validate_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: RecordKind,
    pub id: Option<u64>,
    /// 1-based line within the log.
    pub line: usize,
    pub field: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub ok: bool,
    pub problems: Vec<Problem>,
}

/// Truncated SHA-256 of a record's dedupe key.
pub fn content_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

impl MemoryCore {
    /// Renumber ids to 1-based file position in both logs.
    pub fn reindex(&self) -> MemoryResult<KindCounts> {
        let archive = self.renumbered::<ArchiveRecord>()?;
        let shadow = self.renumbered::<ShadowRecord>()?;
        self.archive.rewrite_records(&archive)?;
        self.shadow.rewrite_records(&shadow)?;
        Ok(KindCounts {
            archive: archive.len(),
            shadow: shadow.len(),
        })
    }

    /// Drop later records whose content hash repeats an earlier one.
    /// Returns the number removed per kind.
    pub fn dedupe(&self) -> MemoryResult<KindCounts> {
        let archive: Vec<ArchiveRecord> = self.archive_records()?;
        let shadow: Vec<ShadowRecord> = self.shadow_records()?;
        let (archive_kept, archive_removed) = first_occurrences(archive);
        let (shadow_kept, shadow_removed) = first_occurrences(shadow);
        if archive_removed > 0 {
            self.archive.rewrite_records(&archive_kept)?;
        }
        if shadow_removed > 0 {
            self.shadow.rewrite_records(&shadow_kept)?;
        }
        Ok(KindCounts {
            archive: archive_removed,
            shadow: shadow_removed,
        })
    }

    /// Keep the `max_records` best Archive records by confidence (desc) then
    /// date (asc). Kept records stay in log order.
    pub fn compact(&self, max_records: usize) -> MemoryResult<CompactReport> {
        let archive = self.archive_records()?;
        if archive.len() <= max_records {
            return Ok(CompactReport {
                kept: archive.len(),
                removed: 0,
            });
        }

        let mut ranked: Vec<usize> = (0..archive.len()).collect();
        ranked.sort_by(|&a, &b| rank(&archive[a], &archive[b]).then(a.cmp(&b)));
        let keep: HashSet<usize> = ranked.into_iter().take(max_records).collect();
        let removed = archive.len() - keep.len();
        let kept: Vec<ArchiveRecord> = archive
            .into_iter()
            .enumerate()
            .filter(|(index, _)| keep.contains(index))
            .map(|(_, record)| record)
            .collect();
        self.archive.rewrite_records(&kept)?;
        Ok(CompactReport {
            kept: kept.len(),
            removed,
        })
    }

    /// Fill missing or malformed schedule fields. Returns how many changed.
    pub fn upgrade(&self) -> MemoryResult<KindCounts> {
        let mut archive: Vec<ArchiveRecord> = self.archive_records()?;
        let mut shadow: Vec<ShadowRecord> = self.shadow_records()?;
        let changed = KindCounts {
            archive: self.fill_schedules(&mut archive),
            shadow: self.fill_schedules(&mut shadow),
        };
        if changed.archive > 0 {
            self.archive.rewrite_records(&archive)?;
        }
        if changed.shadow > 0 {
            self.shadow.rewrite_records(&shadow)?;
        }
        Ok(changed)
    }

    /// Check every line of both logs. Never mutates; corrupt lines are
    /// reported as problems.
    pub fn validate_all(&self) -> MemoryResult<ValidationReport> {
        let mut problems = Vec::new();
        let mut checked = self.collect_problems::<ArchiveRecord>(&mut problems)?;
        checked += self.collect_problems::<ShadowRecord>(&mut problems)?;
        Ok(ValidationReport {
            checked,
            ok: problems.is_empty(),
            problems,
        })
    }

    fn renumbered<R: LogRecord>(&self) -> MemoryResult<Vec<R>> {
        let mut records: Vec<R> = self.store::<R>().read_records()?;
        for (position, record) in records.iter_mut().enumerate() {
            record.set_id(position as u64 + 1);
            self.validator.check(record)?;
        }
        Ok(records)
    }

    fn fill_schedules<R: LogRecord>(&self, records: &mut [R]) -> usize {
        let rules = self.validator.rules();
        let mut changed = 0;
        for record in records.iter_mut() {
            if is_iso(record.schedule()) {
                continue;
            }
            let due = record.derived_schedule(rules).or_else(|| {
                let mut dated = record.clone();
                dated.set_date(iso_now());
                dated.derived_schedule(rules)
            });
            if let Some(due) = due {
                record.set_schedule(due);
                changed += 1;
            }
        }
        changed
    }

    fn collect_problems<R: LogRecord>(&self, problems: &mut Vec<Problem>) -> MemoryResult<usize> {
        let lines = self.store::<R>().read_lines()?;
        let mut seen = HashSet::new();
        for (line, text) in &lines {
            let record = match decode::<R>(text) {
                Ok(record) => record,
                Err(err) => {
                    problems.push(Problem {
                        kind: R::KIND,
                        id: raw_id(text),
                        line: *line,
                        field: None,
                        reason: err.reason,
                    });
                    continue;
                }
            };
            for violation in self.validator.violations(&record) {
                problems.push(Problem {
                    kind: R::KIND,
                    id: Some(record.id()),
                    line: *line,
                    field: Some(violation.field.to_string()),
                    reason: violation.reason,
                });
            }
            if !seen.insert(record.id()) {
                problems.push(Problem {
                    kind: R::KIND,
                    id: Some(record.id()),
                    line: *line,
                    field: Some("id".to_string()),
                    reason: format!("duplicate id {}", record.id()),
                });
            }
        }
        Ok(lines.len())
    }
}

fn rank(a: &ArchiveRecord, b: &ArchiveRecord) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.date.cmp(&b.date))
}

fn first_occurrences<R: LogRecord>(records: Vec<R>) -> (Vec<R>, usize) {
    let total = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<R> = records
        .into_iter()
        .filter(|record| seen.insert(content_hash(&record.dedupe_key())))
        .collect();
    let removed = total - kept.len();
    (kept, removed)
}

/// Best-effort id of a line that failed to decode.
fn raw_id(text: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()?
        .get("id")?
        .as_u64()
}
