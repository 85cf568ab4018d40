//! Memory governance: on-disk layout and PII redaction before persistence.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Default memory root, relative to the working directory.
pub const MEMORY_DIR: &str = "memory";

/// Archive log path, relative to the memory root.
pub const ARCHIVE_JSONL: &str = "ARCHIVE/main_archive.jsonl";

/// Shadow log path, relative to the memory root.
pub const SHADOW_JSONL: &str = "SHADOW/main_shadow.jsonl";

/// Snapshot directory name, created beside the Archive log.
pub const BACKUPS_DIR: &str = "backups";

/// Default Archive retention cap used by `compact`.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

pub const EMAIL_PLACEHOLDER: &str = "<EMAIL>";
pub const PHONE_PLACEHOLDER: &str = "<PHONE>";
pub const CARD_PLACEHOLDER: &str = "<CARD>";
pub const IBAN_PLACEHOLDER: &str = "<IBAN?>";
pub const PASSPORT_PLACEHOLDER: &str = "<PASS>";

pub fn archive_path(root: &Path) -> PathBuf {
    root.join(ARCHIVE_JSONL)
}

pub fn shadow_path(root: &Path) -> PathBuf {
    root.join(SHADOW_JSONL)
}

/// `backups/` beside the Archive log.
pub fn default_backups_dir(archive_log: &Path) -> PathBuf {
    archive_log
        .parent()
        .map_or_else(|| PathBuf::from(BACKUPS_DIR), |dir| dir.join(BACKUPS_DIR))
}

struct PiiRule {
    pattern: Regex,
    placeholder: &'static str,
}

fn rule(pattern: &str, placeholder: &'static str) -> PiiRule {
    PiiRule {
        pattern: Regex::new(pattern).expect("valid PII pattern"),
        placeholder,
    }
}

// Order matters: phone runs are replaced before card runs.
static PII_RULES: LazyLock<Vec<PiiRule>> = LazyLock::new(|| {
    vec![
        rule(
            r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
            EMAIL_PLACEHOLDER,
        ),
        rule(r"(?:\+|\b)\d(?:[ \-()]?\d){6,18}\b", PHONE_PLACEHOLDER),
        rule(r"\b(?:\d[ -]?){13,19}\b", CARD_PLACEHOLDER),
        rule(r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b", IBAN_PLACEHOLDER),
        rule(r"(?i)\b(?:passport|паспорт)[#: ]*\w+\b", PASSPORT_PLACEHOLDER),
    ]
});

/// Replace PII-like spans with fixed placeholders. Idempotent.
pub fn redact(text: &str) -> String {
    let mut out = Cow::Borrowed(text);
    for rule in PII_RULES.iter() {
        if let Cow::Owned(replaced) = rule.pattern.replace_all(&out, rule.placeholder) {
            out = Cow::Owned(replaced);
        }
    }
    out.into_owned()
}
