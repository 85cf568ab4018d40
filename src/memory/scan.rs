//! Rule-8 transcript scan and rule-88 log-directory scan.
//!
//! Both produce one Shadow hypothesis through the normal append path.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::core::MemoryCore;
use super::error::MemoryResult;
use super::ingest::ShadowDraft;
use super::retrieval::top_tags;

const TRANSCRIPT_TAIL_LINES: usize = 200;
const TRANSCRIPT_QUOTE_LIMIT: usize = 20;
const DIRECTORY_SAMPLE_LINES: usize = 88;
const DIRECTORY_TOP_TOKENS: usize = 25;
const SCANNED_EXTENSIONS: &[&str] = &["log", "txt"];

static PROMISE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:will|promise|plan|обещаю|сделаю|планирую|назначу)\b")
        .expect("valid promise pattern")
});

static DECISION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:decided|approve|решено|выбираем)\b").expect("valid decision pattern")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zА-Яа-яёЁ0-9]{2,}").expect("valid token pattern"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptScan {
    pub lines: usize,
    pub questions: usize,
    pub promises: usize,
    pub decisions: usize,
    pub unique_tokens: usize,
    /// Tokens per analyzed line.
    pub density: f64,
    pub insight: String,
    pub shadow_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryScan {
    pub files: usize,
    pub sample_len: usize,
    pub top: Vec<(String, usize)>,
    pub shadow_id: u64,
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn tokens(lines: &[&str]) -> Vec<String> {
    let joined = lines.join(" ").to_lowercase();
    TOKEN
        .find_iter(&joined)
        .map(|m| m.as_str().to_string())
        .collect()
}

impl MemoryCore {
    /// Count questions, promises and decisions in the last 200 non-blank
    /// lines of `text` and record the result as a `rule8_insight` hypothesis.
    pub fn scan_transcript(&self, text: &str) -> MemoryResult<TranscriptScan> {
        let all: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let lines = tail(&all, TRANSCRIPT_TAIL_LINES);

        let questions: Vec<&str> = lines.iter().copied().filter(|l| l.contains('?')).collect();
        let promises: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| PROMISE_CUE.is_match(l))
            .collect();
        let decisions: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| DECISION_CUE.is_match(l))
            .collect();

        let tokens = tokens(lines);
        let unique_tokens = tokens.iter().collect::<HashSet<_>>().len();
        let density = tokens.len() as f64 / lines.len().max(1) as f64;
        let insight = format!(
            "Q:{} P:{} D:{} | uniq:{unique_tokens} dens:{density:.1}",
            questions.len(),
            promises.len(),
            decisions.len()
        );

        let hypothesis = json!({
            "questions": tail(&questions, TRANSCRIPT_QUOTE_LIMIT),
            "promises": tail(&promises, TRANSCRIPT_QUOTE_LIMIT),
            "decisions": tail(&decisions, TRANSCRIPT_QUOTE_LIMIT),
            "insight": insight,
        });
        let shadow = self.append_shadow(
            ShadowDraft::new("rule8_insight", hypothesis.to_string())
                .tags(["rule8", "insight"])
                .confidence(0.7),
        )?;

        Ok(TranscriptScan {
            lines: lines.len(),
            questions: questions.len(),
            promises: promises.len(),
            decisions: decisions.len(),
            unique_tokens,
            density,
            insight,
            shadow_id: shadow.id,
        })
    }

    /// Sample the last 88 non-blank lines across `.log`/`.txt` files under
    /// `dir` and record the most frequent tokens as a `rule88_pattern`.
    pub fn scan_directory(&self, dir: &Path) -> MemoryResult<DirectoryScan> {
        let files = log_files(dir)?;
        let mut buffer: Vec<String> = Vec::new();
        for file in &files {
            // Unreadable or non-UTF-8 files are skipped.
            let Ok(content) = fs::read_to_string(file) else {
                continue;
            };
            buffer.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }
        let sample: Vec<&str> = tail(&buffer, DIRECTORY_SAMPLE_LINES)
            .iter()
            .map(String::as_str)
            .collect();
        let tokens = tokens(&sample);
        let top: Vec<(String, usize)> = top_tags(tokens.iter(), DIRECTORY_TOP_TOKENS)
            .into_iter()
            .map(|entry| (entry.tag, entry.count))
            .collect();

        let hypothesis = json!({ "sample": sample, "top": top });
        let shadow = self.append_shadow(
            ShadowDraft::new("rule88_pattern", hypothesis.to_string())
                .tags(["rule88", "pattern"])
                .confidence(0.6),
        )?;

        Ok(DirectoryScan {
            files: files.len(),
            sample_len: sample.len(),
            top,
            shadow_id: shadow.id,
        })
    }
}

/// `.log`/`.txt` files under `dir`, depth-first in name order.
fn log_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort_unstable();
    for path in entries {
        if path.is_dir() {
            if let Ok(nested) = log_files(&path) {
                found.extend(nested);
            }
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SCANNED_EXTENSIONS.contains(&ext))
        {
            found.push(path);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::core::test_support::{open_temp, temp_root};
    use crate::memory::error::MemoryError;

    #[test]
    fn transcript_scan_counts_cues_and_records_a_hypothesis() {
        let (root, core) = open_temp("scan-text");
        let text = "Can we ship today?\n\nI will write the notes\nрешено: выпускаем\nok ok ok\n";
        let scan = core.scan_transcript(text).expect("scan");
        assert_eq!(scan.lines, 4);
        assert_eq!(scan.questions, 1);
        assert_eq!(scan.promises, 1);
        assert_eq!(scan.decisions, 1);
        assert!(scan.insight.starts_with("Q:1 P:1 D:1 | uniq:"));

        let shadow = core.shadow_records().expect("read");
        assert_eq!(shadow.len(), 1);
        assert_eq!(shadow[0].id, scan.shadow_id);
        assert_eq!(shadow[0].signal, "rule8_insight");
        assert!(shadow[0].tags.contains("rule8"));
        let payload: serde_json::Value =
            serde_json::from_str(&shadow[0].hypothesis).expect("json hypothesis");
        assert_eq!(payload["questions"][0], "Can we ship today?");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn transcript_scan_only_reads_the_tail() {
        let (root, core) = open_temp("scan-tail");
        let mut text = String::from("old question?\n");
        for i in 0..TRANSCRIPT_TAIL_LINES {
            text.push_str(&format!("line {i}\n"));
        }
        let scan = core.scan_transcript(&text).expect("scan");
        assert_eq!(scan.lines, TRANSCRIPT_TAIL_LINES);
        assert_eq!(scan.questions, 0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn directory_scan_ranks_tokens_from_log_and_txt_files() {
        let (root, core) = open_temp("scan-dir");
        let logs = temp_root("scan-dir-input");
        fs::create_dir_all(logs.join("nested")).expect("mkdir");
        fs::write(logs.join("a.log"), "alpha beta\nalpha\n").expect("write");
        fs::write(logs.join("nested").join("b.txt"), "alpha gamma\n").expect("write");
        fs::write(logs.join("ignored.md"), "alpha alpha alpha\n").expect("write");

        let scan = core.scan_directory(&logs).expect("scan");
        assert_eq!(scan.files, 2);
        assert_eq!(scan.sample_len, 3);
        assert_eq!(scan.top[0], ("alpha".to_string(), 3));
        assert_eq!(scan.top.len(), 3);
        let shadow = core.shadow_records().expect("read");
        assert_eq!(shadow[0].signal, "rule88_pattern");
        assert_eq!(shadow[0].confidence, 0.6);
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_dir_all(&logs);
    }

    #[test]
    fn directory_scan_of_missing_dir_is_an_io_error() {
        let (root, core) = open_temp("scan-missing");
        let err = core
            .scan_directory(&root.join("does-not-exist"))
            .expect_err("missing dir");
        assert!(matches!(err, MemoryError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(core.shadow_records().expect("read").is_empty());
        let _ = fs::remove_dir_all(&root);
    }
}
