use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use crate::config::write_atomic;
use crate::error::{Error, Result};

/// Metadata file kept inside every profile directory
pub const METADATA_FILE: &str = ".metadata.json";
/// Claude Code's credentials/state file, opaque to cdp
pub const CLAUDE_CONFIG_FILE: &str = ".claude.json";
/// Claude Code's user settings file; templates are merged into this one
pub const CLAUDE_SETTINGS_FILE: &str = "settings.json";

/// Files a profile must contain before it can be activated
pub const REQUIRED_FILES: [&str; 3] = [METADATA_FILE, CLAUDE_CONFIG_FILE, CLAUDE_SETTINGS_FILE];

/// Content written for placeholder config files
pub const EMPTY_JSON_OBJECT: &str = "{}";

/// Per-profile usage metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub created_at: DateTime<Utc>,

    #[serde(
        default,
        alias = "lastUsed",
        deserialize_with = "deserialize_last_used",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub usage_count: u64,

    #[serde(default, alias = "template", skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_flags: Vec<String>,
}

impl ProfileMetadata {
    /// Fresh metadata for a profile created right now
    pub fn new(description: impl Into<String>, template_name: Option<String>) -> Self {
        Self {
            created_at: Utc::now(),
            last_used_at: None,
            description: description.into(),
            usage_count: 0,
            template_name,
            custom_flags: Vec::new(),
        }
    }

    pub fn read(profile_dir: &Path) -> Result<Self> {
        let path = profile_dir.join(METADATA_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            let name = profile_name(profile_dir);
            if e.kind() == IoErrorKind::NotFound {
                Error::Corrupted {
                    name,
                    reason: format!("{METADATA_FILE} is missing"),
                }
            } else {
                Error::Io {
                    context: format!("Failed to read {}", path.display()),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|source| Error::Malformed { path, source })
    }

    pub fn write(&self, profile_dir: &Path) -> Result<()> {
        let path = profile_dir.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(self).map_err(|source| Error::Malformed {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, content.as_bytes())
    }

    /// Record one more activation
    pub fn touch(&mut self) {
        self.last_used_at = Some(Utc::now());
        self.usage_count = self.usage_count.saturating_add(1);
    }
}

fn profile_name(profile_dir: &Path) -> String {
    profile_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// Older metadata files store "never used" as the zero timestamp
// 0001-01-01T00:00:00Z rather than omitting the key.
fn deserialize_last_used<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|ts| ts.year() > 1))
}
