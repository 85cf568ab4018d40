//! One record per line: compact JSON, no embedded newline.

use serde_json::Value;

use super::error::MalformedRecord;
use super::types::LogRecord;

/// Encode a record as a single self-contained line (no terminator).
pub fn encode<R: LogRecord>(record: &R) -> String {
    // Records hold only strings, numbers and string sets, so serialization
    // cannot fail; the fallback keeps the signature infallible.
    serde_json::to_string(record).unwrap_or_else(|_| String::from("{}"))
}

/// Decode one line produced by [`encode`] (or by older tooling).
pub fn decode<R: LogRecord>(line: &str) -> Result<R, MalformedRecord> {
    let malformed = |reason: String| MalformedRecord {
        kind: R::KIND,
        line: None,
        reason,
    };

    let value: Value =
        serde_json::from_str(line.trim()).map_err(|err| malformed(format!("invalid JSON: {err}")))?;
    if !value.is_object() {
        return Err(malformed("not a mapping".to_string()));
    }
    serde_json::from_value(value).map_err(|err| malformed(err.to_string()))
}
