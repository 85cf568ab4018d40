//! Windowed stitch pass over recent Archive records.
//!
//! The synthesized insight (and the optional open-questions hypothesis) go
//! through the normal append path.

use serde::Serialize;

use super::core::MemoryCore;
use super::error::MemoryResult;
use super::ingest::{ArchiveDraft, ShadowDraft};
use super::retrieval::top_tags;
use super::types::ArchiveRecord;

/// Short stitch window ("rule 8").
pub const RULE_8_WINDOW: usize = 8;
/// Long stitch window ("rule 88").
pub const RULE_88_WINDOW: usize = 88;

/// Tags quoted in the insight text.
const STITCH_TOP_TAGS: usize = 5;
const STITCH_OWNER: &str = "system.stitch";
const STITCH_CONFIDENCE: f64 = 0.5;

const DECISION_TYPES: &[&str] = &["decision", "решение"];
const QUESTION_TYPES: &[&str] = &["question", "вопрос"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StitchSummary {
    pub rule: String,
    pub window: usize,
    /// Records actually analyzed (at most `window`).
    pub analysed: usize,
    pub decisions: usize,
    pub questions: usize,
    pub top_tags: Vec<String>,
    pub insight_id: Option<u64>,
    pub shadow_id: Option<u64>,
}

fn rule_label(window: usize) -> String {
    match window {
        RULE_8_WINDOW => "rule8".to_string(),
        RULE_88_WINDOW => "rule88".to_string(),
        other => format!("window{other}"),
    }
}

fn is_type(record: &ArchiveRecord, labels: &[&str]) -> bool {
    let entry_type = record.entry_type.trim();
    labels
        .iter()
        .any(|label| entry_type.eq_ignore_ascii_case(label))
}

impl MemoryCore {
    /// Summarize the last `window` Archive records.
    pub fn stitch(&self, window: usize) -> MemoryResult<StitchSummary> {
        let archive = self.archive_records()?;
        let recent = &archive[archive.len().saturating_sub(window)..];
        let rule = rule_label(window);

        let decisions = recent
            .iter()
            .filter(|record| is_type(record, DECISION_TYPES))
            .count();
        let questions = recent
            .iter()
            .filter(|record| is_type(record, QUESTION_TYPES))
            .count();
        let tags: Vec<String> = top_tags(
            recent.iter().flat_map(|record| record.tags.iter()),
            STITCH_TOP_TAGS,
        )
        .into_iter()
        .map(|entry| entry.tag)
        .collect();

        let mut summary = StitchSummary {
            rule: rule.clone(),
            window,
            analysed: recent.len(),
            decisions,
            questions,
            top_tags: tags,
            insight_id: None,
            shadow_id: None,
        };
        if recent.is_empty() {
            return Ok(summary);
        }

        let mut content = format!(
            "Analysed {} records: {decisions} decisions, {questions} questions.",
            recent.len()
        );
        if !summary.top_tags.is_empty() {
            content.push_str(&format!(" Active tags: {}.", summary.top_tags.join(", ")));
        }
        let insight = self.append_archive(
            ArchiveDraft::new("Stitch summary", "insight", content)
                .confidence(STITCH_CONFIDENCE)
                .owner(STITCH_OWNER)
                .tags(["stitch".to_string(), rule.clone()]),
        )?;
        summary.insight_id = Some(insight.id);

        if questions > 0 && questions >= decisions {
            let shadow = self.append_shadow(
                ShadowDraft::new(
                    "open_questions",
                    format!(
                        "Open questions ({questions}) are not outnumbered by decisions ({decisions}); the questions need follow-up."
                    ),
                )
                .counter("Check the next series of records to confirm the trend.")
                .confidence(STITCH_CONFIDENCE)
                .tags(["stitch".to_string(), rule]),
            )?;
            summary.shadow_id = Some(shadow.id);
        }
        Ok(summary)
    }
}
