//! Memory Core: the explicit handle over one Archive log and one Shadow log.
//!
//! Lifecycle operations live beside this file (`ingest`, `retrieval`,
//! `maintenance`, `stitch`, `scan`, `snapshot`) as further `impl MemoryCore`
//! blocks. The handle is not internally synchronized; see
//! [`crate::memory::SharedMemory`] for the serialized variant.

use std::path::{Path, PathBuf};

use super::error::{MemoryResult, ValidationError};
use super::governance::{archive_path, default_backups_dir, shadow_path};
use super::schema::Validator;
use super::store::LogStore;
use super::types::{ArchiveRecord, LogRecord, RecordKind, ShadowRecord};

/// Where the two logs and their snapshots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPaths {
    pub archive: PathBuf,
    pub shadow: PathBuf,
    pub backups: PathBuf,
}

impl MemoryPaths {
    /// Standard layout under a memory root.
    pub fn under(root: &Path) -> Self {
        let archive = archive_path(root);
        let backups = default_backups_dir(&archive);
        Self {
            archive,
            shadow: shadow_path(root),
            backups,
        }
    }

    /// Explicit log paths; snapshots go beside the Archive log.
    pub fn new(archive: PathBuf, shadow: PathBuf) -> Self {
        let backups = default_backups_dir(&archive);
        Self {
            archive,
            shadow,
            backups,
        }
    }

    #[must_use]
    pub fn with_backups(mut self, backups: PathBuf) -> Self {
        self.backups = backups;
        self
    }
}

/// Explicit store handle. Every operation reads the logs fresh.
#[derive(Debug, Clone)]
pub struct MemoryCore {
    pub(super) archive: LogStore,
    pub(super) shadow: LogStore,
    pub(super) backups: PathBuf,
    pub(super) validator: Validator,
}

impl MemoryCore {
    /// Bind to both logs, creating their directories. Files are created lazily.
    pub fn open(paths: &MemoryPaths) -> MemoryResult<Self> {
        Ok(Self {
            archive: LogStore::open(&paths.archive)?,
            shadow: LogStore::open(&paths.shadow)?,
            backups: paths.backups.clone(),
            validator: Validator::default(),
        })
    }

    pub fn open_root(root: &Path) -> MemoryResult<Self> {
        Self::open(&MemoryPaths::under(root))
    }

    pub fn archive_path(&self) -> &Path {
        self.archive.path()
    }

    pub fn shadow_path(&self) -> &Path {
        self.shadow.path()
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups
    }

    pub fn archive_records(&self) -> MemoryResult<Vec<ArchiveRecord>> {
        self.archive.read_records()
    }

    pub fn shadow_records(&self) -> MemoryResult<Vec<ShadowRecord>> {
        self.shadow.read_records()
    }

    pub(super) fn store<R: LogRecord>(&self) -> &LogStore {
        match R::KIND {
            RecordKind::Archive => &self.archive,
            RecordKind::Shadow => &self.shadow,
        }
    }
}

/// `max(existing ids) + 1`, or 1 for an empty log. Fails once the id space
/// is used up instead of reissuing the maximum.
pub(super) fn next_id<R: LogRecord>(records: &[R]) -> Result<u64, ValidationError> {
    match records.iter().map(LogRecord::id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| ValidationError::new(R::KIND, "id", "id space exhausted")),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Fresh memory root under the system temp dir.
    pub(crate) fn temp_root(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("iskra-memory-{label}-{nanos}"))
    }

    pub(crate) fn open_temp(label: &str) -> (PathBuf, MemoryCore) {
        let root = temp_root(label);
        let core = MemoryCore::open_root(&root).expect("open memory root");
        (root, core)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::open_temp;
    use super::*;
    use std::fs;

    #[test]
    fn standard_layout_under_root() {
        let paths = MemoryPaths::under(Path::new("/srv/mem"));
        assert_eq!(paths.archive, PathBuf::from("/srv/mem/ARCHIVE/main_archive.jsonl"));
        assert_eq!(paths.shadow, PathBuf::from("/srv/mem/SHADOW/main_shadow.jsonl"));
        assert_eq!(paths.backups, PathBuf::from("/srv/mem/ARCHIVE/backups"));
    }

    #[test]
    fn explicit_backups_override_default() {
        let paths = MemoryPaths::new("a/arc.jsonl".into(), "s/sh.jsonl".into())
            .with_backups("snapshots".into());
        assert_eq!(paths.backups, PathBuf::from("snapshots"));
    }

    #[test]
    fn open_creates_log_directories_but_not_files() {
        let (root, core) = open_temp("open");
        assert!(root.join("ARCHIVE").is_dir());
        assert!(root.join("SHADOW").is_dir());
        assert!(!core.archive_path().exists());
        assert!(core.archive_records().expect("read").is_empty());
        assert!(core.shadow_records().expect("read").is_empty());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn next_id_follows_the_maximum() {
        let empty: Vec<ShadowRecord> = Vec::new();
        assert_eq!(next_id(&empty), Ok(1));
        let record = ShadowRecord {
            id: 9,
            date: String::new(),
            signal: String::new(),
            hypothesis: String::new(),
            counter: None,
            tags: Default::default(),
            confidence: 0.0,
            review_after: String::new(),
        };
        let mut other = record.clone();
        other.id = 4;
        assert_eq!(next_id(&[record.clone(), other]), Ok(10));

        let mut last = record;
        last.id = u64::MAX;
        let err = next_id(&[last]).expect_err("no id after u64::MAX");
        assert_eq!(err.kind, RecordKind::Shadow);
        assert_eq!(err.field, "id");
    }
}
