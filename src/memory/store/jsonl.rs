//! Append-only JSONL log file for one record kind.
//!
//! Records are written one-per-line. Appends are a single write of the full
//! line followed by a flush; whole-log rewrites go through a temp file in the
//! same directory that is renamed over the target, so readers see either the
//! old log or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use super::super::codec::{decode, encode};
use super::super::error::MemoryResult;
use super::super::types::LogRecord;

/// Handle to one log file. Holds no open descriptor between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    /// Bind to the log at `path`, creating its parent directory.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Underlying file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one encoded line. The line and its terminator go out in one write.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        if line.contains('\n') || line.contains('\r') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "log line must not contain a line break",
            ));
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let framed = format!("{line}\n");
        file.write_all(framed.as_bytes())?;
        file.flush()
    }

    /// Non-blank lines with their 1-based line numbers. A missing log is empty.
    pub fn read_lines(&self) -> io::Result<Vec<(usize, String)>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut lines = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            lines.push((index + 1, line));
        }
        Ok(lines)
    }

    /// Replace the whole log with `lines`, atomically.
    pub fn rewrite_all<I, S>(&self, lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let temp_path = self.temp_path();
        let written = write_temp(&temp_path, lines);
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        if let Err(err) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        sync_parent_dir(&self.path);
        Ok(())
    }

    /// Decode every record in log order. The first corrupt line is an error.
    pub fn read_records<R: LogRecord>(&self) -> MemoryResult<Vec<R>> {
        let mut records = Vec::new();
        for (number, line) in self.read_lines()? {
            let record = decode::<R>(&line).map_err(|err| err.at_line(number))?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn append_record<R: LogRecord>(&self, record: &R) -> io::Result<()> {
        self.append_line(&encode(record))
    }

    pub fn rewrite_records<R: LogRecord>(&self, records: &[R]) -> io::Result<()> {
        self.rewrite_all(records.iter().map(encode::<R>))
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("log.jsonl");
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.path
            .with_file_name(format!(".{name}.{}.{nanos}.tmp", process::id()))
    }
}

fn write_temp<I, S>(temp_path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()
}

/// Persist the rename itself. Platforms that cannot open a directory skip it.
fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    let dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}
