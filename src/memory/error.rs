//! Error taxonomy for memory lifecycle operations.

use std::fmt;
use std::io;

use super::types::RecordKind;

/// First structural problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: RecordKind,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(kind: RecordKind, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} record: {}: {}", self.kind, self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// A log line (or input) that is not a structurally valid record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub kind: RecordKind,
    /// 1-based line number within the log, when the input came from a file.
    pub line: Option<usize>,
    pub reason: String,
}

impl MalformedRecord {
    pub(crate) fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "malformed {} record at line {line}: {}",
                self.kind, self.reason
            ),
            None => write!(f, "malformed {} record: {}", self.kind, self.reason),
        }
    }
}

impl std::error::Error for MalformedRecord {}

/// Failure of a memory lifecycle operation. Nothing is committed when one
/// of these is returned.
#[derive(Debug)]
pub enum MemoryError {
    Validation(ValidationError),
    Malformed(MalformedRecord),
    Io(io::Error),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for MemoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Malformed(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ValidationError> for MemoryError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<MalformedRecord> for MemoryError {
    fn from(err: MalformedRecord) -> Self {
        Self::Malformed(err)
    }
}

impl From<io::Error> for MemoryError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_field_and_reason() {
        let err = ValidationError::new(RecordKind::Shadow, "signal", "must be non-empty text");
        assert_eq!(
            err.to_string(),
            "shadow record: signal: must be non-empty text"
        );
    }

    #[test]
    fn malformed_display_includes_line_when_known() {
        let err = MalformedRecord {
            kind: RecordKind::Archive,
            line: None,
            reason: "not a mapping".to_string(),
        };
        assert_eq!(err.to_string(), "malformed archive record: not a mapping");
        assert_eq!(
            err.at_line(4).to_string(),
            "malformed archive record at line 4: not a mapping"
        );
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn fails() -> MemoryResult<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(MemoryError::Io(_))));
    }
}
