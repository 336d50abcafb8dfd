//! Point-in-time profile snapshots.
//!
//! A backup is a gzip-compressed tar of one profile directory, stored as
//! `<profile>-<YYYYMMDD>-<HHMMSS>.tar.gz` in the backup directory. The file
//! name is the only place the profile name and timestamp are recorded, so it
//! is parsed from the right: profile names may contain hyphens themselves.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Entity, Error, IoContext, Result};
use crate::fs_utils::Partial;
use crate::profiles::validate_name;

pub const ARCHIVE_EXTENSION: &str = ".tar.gz";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One archive found in the backup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Archive file name, e.g. `work-20250101-120000.tar.gz`
    pub name: String,
    pub profile_name: String,
    pub archive_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Split `<profile>-<date>-<time>.tar.gz` into its three parts.
///
/// Only the two rightmost hyphens are separators; the profile part keeps any
/// hyphens of its own.
fn split_archive_name(file_name: &str) -> Option<(&str, &str, &str)> {
    let stem = file_name.strip_suffix(ARCHIVE_EXTENSION)?;
    let mut parts = stem.rsplitn(3, '-');
    let time = parts.next()?;
    let date = parts.next()?;
    let profile = parts.next()?;
    Some((profile, date, time))
}

/// Local timestamp encoded in an archive name, as UTC
fn archive_timestamp(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{date}-{time}"), TIMESTAMP_FORMAT).ok()?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

pub struct BackupManager {
    backup_dir: PathBuf,
    storage_root: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf, storage_root: PathBuf) -> Self {
        Self {
            backup_dir,
            storage_root,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Archive a profile directory, returning the new archive's path.
    ///
    /// Fails with `AlreadyExists` rather than overwriting when a backup of
    /// the same profile was already taken within the same second.
    pub fn backup(&self, profile_name: &str) -> Result<PathBuf> {
        validate_name(profile_name)?;
        let profile_dir = self.storage_root.join(profile_name);
        if !profile_dir.is_dir() {
            return Err(Error::not_found(Entity::Profile, profile_name));
        }

        fs::create_dir_all(&self.backup_dir).io_context(|| {
            format!("Failed to create backup directory: {}", self.backup_dir.display())
        })?;

        let file_name = format!(
            "{profile_name}-{}{ARCHIVE_EXTENSION}",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        let archive_path = self.backup_dir.join(&file_name);

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archive_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(Error::already_exists(Entity::Backup, file_name));
            }
            Err(e) => {
                return Err(Error::Io {
                    context: format!("Failed to create archive: {}", archive_path.display()),
                    source: e,
                });
            }
        };

        Partial::adopt_file(&archive_path).build(|path| {
            let context = || format!("Failed to write archive: {}", path.display());

            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.follow_symlinks(false);
            builder.append_dir_all(".", &profile_dir).io_context(context)?;

            let encoder = builder.into_inner().io_context(context)?;
            let file = encoder.finish().io_context(context)?;
            file.sync_all().io_context(context)
        })?;

        log::debug!("backed up '{profile_name}' to {}", archive_path.display());
        Ok(archive_path)
    }

    /// Extract an archive back into the storage root.
    ///
    /// The profile name comes from the archive's file name. Returns it.
    pub fn restore(&self, archive_path: &Path, overwrite: bool) -> Result<String> {
        let display_name = archive_path.display().to_string();
        let file = match File::open(archive_path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(Error::not_found(Entity::Backup, display_name));
            }
            Err(e) => {
                return Err(Error::Io {
                    context: format!("Failed to open archive: {display_name}"),
                    source: e,
                });
            }
        };

        let file_name = archive_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidArchiveName(display_name.clone()))?;
        let (profile_name, _, _) = split_archive_name(file_name)
            .ok_or_else(|| Error::InvalidArchiveName(file_name.to_string()))?;
        validate_name(profile_name)?;

        let profile_dir = self.storage_root.join(profile_name);
        let replacing = profile_dir.exists();
        if replacing && !overwrite {
            return Err(Error::ExistsNoOverwrite(profile_name.to_string()));
        }

        fs::create_dir_all(&self.storage_root).io_context(|| {
            format!("Failed to create storage root: {}", self.storage_root.display())
        })?;

        // Extract beside the profile so a bad archive never touches it
        let staging_dir = self.storage_root.join(format!(".{profile_name}.restore-tmp"));
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir).io_context(|| {
                format!("Failed to remove stale {}", staging_dir.display())
            })?;
        }

        Partial::create_dir(&staging_dir, Entity::Profile)?.build(|dir| {
            let context = || format!("Failed to extract archive: {display_name}");
            let mut archive = tar::Archive::new(GzDecoder::new(file));

            for entry in archive.entries().io_context(context)? {
                let mut entry = entry.io_context(context)?;
                if !entry.unpack_in(dir).io_context(context)? {
                    let path = entry.path().map(|p| p.display().to_string());
                    log::warn!(
                        "skipped archive entry outside the profile: {}",
                        path.unwrap_or_default()
                    );
                }
            }

            if replacing {
                fs::remove_dir_all(&profile_dir).io_context(|| {
                    format!("Failed to remove existing profile: {}", profile_dir.display())
                })?;
                log::debug!("removed existing profile '{profile_name}' before restore");
            }
            fs::rename(dir, &profile_dir).io_context(|| {
                format!(
                    "Failed to move {} into place at {}",
                    dir.display(),
                    profile_dir.display()
                )
            })
        })?;

        log::debug!("restored '{profile_name}' from {display_name}");
        Ok(profile_name.to_string())
    }

    /// Every parseable archive, newest first
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Io {
                    context: format!(
                        "Failed to read backup directory: {}",
                        self.backup_dir.display()
                    ),
                    source: e,
                });
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry
                .io_context(|| format!("Failed to read entry in {}", self.backup_dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            let Some((profile_name, date, time)) = split_archive_name(&name) else {
                continue;
            };
            if validate_name(profile_name).is_err() {
                log::debug!("skipping {name}: not a valid profile name");
                continue;
            }
            let Some(created_at) = archive_timestamp(date, time) else {
                log::debug!("skipping {name}: unparseable timestamp");
                continue;
            };
            let metadata = entry
                .metadata()
                .io_context(|| format!("Failed to stat {}", entry.path().display()))?;
            if !metadata.is_file() {
                continue;
            }

            records.push(BackupRecord {
                profile_name: profile_name.to_string(),
                archive_path: entry.path(),
                created_at,
                size_bytes: metadata.len(),
                name,
            });
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }

    /// Delete one archive by bare file name
    pub fn delete(&self, archive_name: &str) -> Result<()> {
        if archive_name.is_empty()
            || archive_name.contains(['/', '\\'])
            || archive_name == "."
            || archive_name == ".."
        {
            return Err(Error::InvalidArchiveName(archive_name.to_string()));
        }

        let path = self.backup_dir.join(archive_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("deleted backup {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(Error::not_found(Entity::Backup, archive_name))
            }
            Err(e) => Err(Error::Io {
                context: format!("Failed to delete backup: {}", path.display()),
                source: e,
            }),
        }
    }

    /// Delete archives not newer than `retention_days` ago.
    ///
    /// Returns how many were removed; zero days removes every archive.
    pub fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let Some(cutoff) =
            Utc::now().checked_sub_signed(TimeDelta::days(i64::from(retention_days)))
        else {
            return Ok(0);
        };

        let mut removed = 0;
        for record in self.list()? {
            if record.created_at > cutoff {
                continue;
            }
            fs::remove_file(&record.archive_path).io_context(|| {
                format!("Failed to delete backup: {}", record.archive_path.display())
            })?;
            log::debug!("cleaned up backup {}", record.name);
            removed += 1;
        }

        Ok(removed)
    }
}
