//! Comparing two profiles' `settings.json`.
//!
//! Only top-level keys are compared, matching how templates are merged.

use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::metadata::CLAUDE_SETTINGS_FILE;

/// One differing top-level key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyDiff {
    OnlyLeft { key: String, value: Value },
    OnlyRight { key: String, value: Value },
    Changed { key: String, left: Value, right: Value },
}

impl KeyDiff {
    pub fn key(&self) -> &str {
        match self {
            KeyDiff::OnlyLeft { key, .. }
            | KeyDiff::OnlyRight { key, .. }
            | KeyDiff::Changed { key, .. } => key,
        }
    }
}

/// Read a profile's settings; a missing file reads as an empty object
pub fn load_settings(profile_dir: &Path) -> Result<Map<String, Value>> {
    let path = profile_dir.join(CLAUDE_SETTINGS_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => {
            return Err(Error::Io {
                context: format!("Failed to read {}", path.display()),
                source: e,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| Error::Malformed { path, source })
}

/// Differences between two settings objects, sorted by key
pub fn diff_settings(left: &Map<String, Value>, right: &Map<String, Value>) -> Vec<KeyDiff> {
    let mut diffs = Vec::new();

    for (key, value) in left {
        match right.get(key) {
            None => diffs.push(KeyDiff::OnlyLeft {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(other) if other != value => diffs.push(KeyDiff::Changed {
                key: key.clone(),
                left: value.clone(),
                right: other.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, value) in right {
        if !left.contains_key(key) {
            diffs.push(KeyDiff::OnlyRight {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }

    diffs.sort_by(|a, b| a.key().cmp(b.key()));
    diffs
}

/// Short one-line rendering of a JSON value for tables
pub fn format_value(value: &Value) -> String {
    let s = match value {
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{...}} ({} keys)", obj.len()),
        other => other.to_string(),
    };
    if s.chars().count() > 50 {
        let truncated: String = s.chars().take(47).collect();
        format!("{truncated}...")
    } else {
        s
    }
}
