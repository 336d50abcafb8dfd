use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Name of the per-user cdp directory under `$HOME`
pub const CONFIG_DIR_NAME: &str = ".cdp";
/// Default storage root under `$HOME`
pub const PROFILES_DIR_NAME: &str = ".claude-profiles";

/// All computed per-user paths used by cdp
#[derive(Debug, Clone)]
pub struct Paths {
    /// $HOME
    pub home: PathBuf,
    /// ~/.cdp
    pub config_dir: PathBuf,
    /// ~/.cdp/config.json
    pub config_file: PathBuf,
    /// ~/.cdp/templates
    pub templates_dir: PathBuf,
    /// ~/.cdp/backups
    pub backups_dir: PathBuf,
    /// ~/.claude-profiles, used when initializing a fresh config
    pub default_storage_root: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::with_home(base_dirs.home_dir()))
    }

    /// Lay out every path relative to an explicit home directory
    pub fn with_home(home: &Path) -> Self {
        let config_dir = home.join(CONFIG_DIR_NAME);

        Self {
            home: home.to_path_buf(),
            config_file: config_dir.join("config.json"),
            templates_dir: config_dir.join("templates"),
            backups_dir: config_dir.join("backups"),
            default_storage_root: home.join(PROFILES_DIR_NAME),
            config_dir,
        }
    }

    pub fn expand_home(&self, path: &str) -> PathBuf {
        expand_home(path, &self.home)
    }
}

/// Expand a leading `~` (alone or followed by `/`) to `home`
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
