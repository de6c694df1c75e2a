//! Editor error log.
//!
//! Errors surfaced to the user (failed loads, rejected saves, rejected
//! actions) are appended here and stay until cleared. The log lives in
//! session state, so it is never persisted and never part of history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClipdeckError;

/// A logged error, stamped when it was pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// An error to log; the timestamp is assigned on push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEditorError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

impl NewEditorError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn stamp(self, timestamp: DateTime<Utc>) -> EditorError {
        EditorError {
            code: self.code,
            message: self.message,
            details: self.details,
            timestamp,
        }
    }
}

impl From<&ClipdeckError> for NewEditorError {
    fn from(error: &ClipdeckError) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}

/// Errors in the order they were pushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorLog {
    entries: Vec<EditorError>,
}

impl ErrorLog {
    pub fn push(&mut self, error: NewEditorError, now: DateTime<Utc>) {
        self.entries.push(error.stamp(now));
    }

    /// Drop every entry. Returns true if there was anything to drop.
    pub fn clear(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }

    pub fn entries(&self) -> &[EditorError] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&EditorError> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_push_stamps_and_keeps_order() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut log = ErrorLog::default();
        log.push(NewEditorError::new("LOAD_PROJECT_ERROR", "no project"), now);
        log.push(
            NewEditorError::new("SAVE_PROJECT_ERROR", "disk full").with_details(json!({"key": "p"})),
            now,
        );

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].code, "LOAD_PROJECT_ERROR");
        assert_eq!(log.latest().unwrap().details, Some(json!({"key": "p"})));
        assert_eq!(log.latest().unwrap().timestamp, now);
    }

    #[test]
    fn test_clear_reports_change() {
        let mut log = ErrorLog::default();
        assert!(!log.clear());
        log.push(NewEditorError::new("X", "y"), Utc::now());
        assert!(log.clear());
        assert!(log.is_empty());
    }

    #[test]
    fn test_from_clipdeck_error_uses_code() {
        let error = ClipdeckError::InvalidParameter {
            name: "zoom",
            reason: "must be positive".to_string(),
        };
        let entry = NewEditorError::from(&error);
        assert_eq!(entry.code, "INVALID_PARAMETER");
        assert!(entry.message.contains("zoom"));
    }
}
