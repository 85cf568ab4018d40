//! Point-in-time copies of both logs as one JSON document.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use super::core::MemoryCore;
use super::error::MemoryResult;
use super::types::{file_stamp, ArchiveRecord, ShadowRecord};

const SNAPSHOT_PREFIX: &str = "memory_snapshot_";

#[derive(Debug, Serialize)]
struct SnapshotDocument<'a> {
    archive: &'a [ArchiveRecord],
    shadow: &'a [ShadowRecord],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub path: PathBuf,
    pub archive: usize,
    pub shadow: usize,
}

impl MemoryCore {
    /// Write both logs to a new timestamped file under `target_dir`
    /// (default: the configured backups directory). Never overwrites.
    pub fn snapshot(&self, target_dir: Option<&Path>) -> MemoryResult<SnapshotReport> {
        let dir = target_dir.unwrap_or(self.backups.as_path());
        fs::create_dir_all(dir)?;
        let (archive, shadow) = (self.archive_records()?, self.shadow_records()?);
        let body = render(&archive, &shadow)?;

        let stamp = file_stamp(Utc::now());
        let mut attempt = 0usize;
        let path = loop {
            let name = if attempt == 0 {
                format!("{SNAPSHOT_PREFIX}{stamp}.json")
            } else {
                format!("{SNAPSHOT_PREFIX}{stamp}_{attempt}.json")
            };
            let candidate = dir.join(name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(mut file) => {
                    file.write_all(body.as_bytes())?;
                    file.sync_all()?;
                    break candidate;
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        };

        Ok(SnapshotReport {
            path,
            archive: archive.len(),
            shadow: shadow.len(),
        })
    }

    /// Write both logs to `dest` in the snapshot layout, replacing any file there.
    pub fn export(&self, dest: &Path) -> MemoryResult<SnapshotReport> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let (archive, shadow) = (self.archive_records()?, self.shadow_records()?);
        fs::write(dest, render(&archive, &shadow)?)?;
        Ok(SnapshotReport {
            path: dest.to_path_buf(),
            archive: archive.len(),
            shadow: shadow.len(),
        })
    }
}

fn render(archive: &[ArchiveRecord], shadow: &[ShadowRecord]) -> io::Result<String> {
    serde_json::to_string_pretty(&SnapshotDocument { archive, shadow })
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::core::test_support::open_temp;
    use crate::memory::ingest::{ArchiveDraft, ShadowDraft};

    #[test]
    fn snapshot_captures_both_logs_without_touching_them() {
        let (root, core) = open_temp("snapshot");
        core.append_archive(ArchiveDraft::new("t", "fact", "c")).expect("append");
        core.append_shadow(ShadowDraft::new("s", "h")).expect("append");
        let before = fs::read_to_string(core.archive_path()).expect("read");

        let report = core.snapshot(None).expect("snapshot");
        assert_eq!((report.archive, report.shadow), (1, 1));
        assert!(report.path.starts_with(core.backups_dir()));
        let name = report
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .expect("file name");
        assert!(name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json"));

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report.path).expect("read")).expect("json");
        assert_eq!(doc["archive"][0]["title"], "t");
        assert_eq!(doc["shadow"][0]["signal"], "s");
        assert_eq!(fs::read_to_string(core.archive_path()).expect("read"), before);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn snapshots_in_the_same_second_do_not_overwrite() {
        let (root, core) = open_temp("snapshot-twice");
        let target = root.join("snaps");
        let first = core.snapshot(Some(target.as_path())).expect("snapshot");
        let second = core.snapshot(Some(target.as_path())).expect("snapshot");
        assert_ne!(first.path, second.path);
        assert_eq!(fs::read_dir(&target).expect("list").count(), 2);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn export_writes_to_an_explicit_path() {
        let (root, core) = open_temp("export");
        core.append_shadow(ShadowDraft::new("s", "h")).expect("append");
        let dest = root.join("out").join("memory.json");
        let report = core.export(&dest).expect("export");
        assert_eq!(report.path, dest);
        assert_eq!(report.shadow, 1);
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&dest).expect("read")).expect("json");
        assert!(doc["archive"].as_array().expect("array").is_empty());
        let _ = fs::remove_dir_all(&root);
    }
}
