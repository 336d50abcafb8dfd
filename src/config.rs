use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoContext, Result};
use crate::paths::Paths;

/// Schema version written by this release
pub const SCHEMA_VERSION: &str = "1.0";

/// Global settings stored in ~/.cdp/config.json
///
/// There is exactly one of these per user. It is loaded explicitly by the
/// caller and handed to each operation; nothing keeps it in global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub schema_version: String,

    /// Directory holding one subdirectory per profile
    pub storage_root: PathBuf,

    /// The profile `cdp use` last activated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile_name: Option<String>,
}

impl Config {
    pub fn new(storage_root: PathBuf) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            storage_root,
            active_profile_name: None,
        }
    }

    /// Create the cdp directories and a default config if none exists yet.
    ///
    /// Returns the config and whether it was freshly written.
    pub fn init(paths: &Paths) -> Result<(Self, bool)> {
        fs::create_dir_all(&paths.config_dir).io_context(|| {
            format!("Failed to create config directory: {}", paths.config_dir.display())
        })?;

        if paths.config_file.exists() {
            let config = Self::load(&paths.config_file)?;
            fs::create_dir_all(&config.storage_root).io_context(|| {
                format!("Failed to create storage root: {}", config.storage_root.display())
            })?;
            return Ok((config, false));
        }

        let config = Self::new(paths.default_storage_root.clone());
        fs::create_dir_all(&config.storage_root).io_context(|| {
            format!("Failed to create storage root: {}", config.storage_root.display())
        })?;
        config.write(&paths.config_file)?;
        log::debug!("initialized config at {}", paths.config_file.display());

        Ok((config, true))
    }

    /// Read the config, failing with `NotInitialized` if the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(Error::NotInitialized(path.to_path_buf()));
            }
            Err(e) => {
                return Err(Error::Io {
                    context: format!("Failed to read config file: {}", path.display()),
                    source: e,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| Error::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config atomically: temp file, then rename over the original.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).io_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|source| Error::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        write_atomic(path, content.as_bytes())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_profile_name.as_deref() == Some(name)
    }

    /// Directory a profile of this name lives in (whether or not it exists)
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.storage_root.join(name)
    }
}

/// Write `bytes` to `<path>.tmp` and rename it into place
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, bytes)
        .io_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path).io_context(|| {
        format!(
            "Failed to rename {} -> {}",
            temp_path.display(),
            path.display()
        )
    })
}
