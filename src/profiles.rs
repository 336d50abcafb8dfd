//! Core profile management logic.
//!
//! This module handles the "data model" of profiles:
//! - Validating profile names
//! - Creating, cloning and importing profiles
//! - Listing, reading and validating profiles
//! - Renaming and deleting inactive profiles
//! - Recording usage
//!
//! Every profile is one directory under the configured storage root. Work
//! that builds a new directory runs inside a [`Partial`] guard so a failure
//! never leaves a half-written profile behind.

use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::Config;
use crate::error::{Entity, Error, IoContext, Result};
use crate::fs_utils::{Partial, copy_top_level_files};
use crate::metadata::{
    CLAUDE_CONFIG_FILE, CLAUDE_SETTINGS_FILE, EMPTY_JSON_OBJECT, METADATA_FILE, ProfileMetadata,
    REQUIRED_FILES,
};
use crate::paths::expand_home;
use crate::templates::TemplateManager;

/// Longest accepted profile name, in characters
pub const MAX_NAME_LEN: usize = 50;

/// Validate profile name
///
/// Accepts 1 to 50 characters from `[A-Za-z0-9_-]`.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name cannot be empty");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return invalid("name cannot be longer than 50 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return invalid("use only letters, numbers, hyphens (-) and underscores (_)");
    }

    Ok(())
}

/// A profile as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub path: PathBuf,
    pub metadata: ProfileMetadata,
}

/// What an import will do, shown to the user before anything is written
#[derive(Debug, Clone)]
pub struct ImportPreview {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub profile_name: String,
    pub description: String,
    pub has_claude_config: bool,
    pub has_settings: bool,
    pub has_metadata: bool,
    /// Top-level files other than the three well-known ones
    pub other_files: Vec<String>,
    /// Subdirectories of the source; never imported
    pub skipped_dirs: Vec<String>,
    pub destination_exists: bool,
}

impl ImportPreview {
    /// Number of files that will be copied (metadata is regenerated, not copied)
    pub fn files_to_copy(&self) -> usize {
        usize::from(self.has_claude_config) + usize::from(self.has_settings) + self.other_files.len()
    }
}

/// Decisions an import needs from whoever is driving it
pub trait ImportPrompt {
    /// The destination profile exists. Returning true deletes it.
    fn confirm_overwrite(&mut self, preview: &ImportPreview) -> bool;
    /// Final go-ahead before any file is copied
    fn confirm_import(&mut self, preview: &ImportPreview) -> bool;
    /// Import finished; whether to delete the source directory
    fn confirm_remove_source(&mut self, preview: &ImportPreview) -> bool;
}

/// Non-interactive answers, e.g. for `--yes`
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm {
    pub overwrite: bool,
    pub remove_source: bool,
}

impl ImportPrompt for AutoConfirm {
    fn confirm_overwrite(&mut self, _: &ImportPreview) -> bool {
        self.overwrite
    }

    fn confirm_import(&mut self, _: &ImportPreview) -> bool {
        true
    }

    fn confirm_remove_source(&mut self, _: &ImportPreview) -> bool {
        self.remove_source
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRemoval {
    Kept,
    Removed,
    /// Removal was attempted and failed; the import itself still stands
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub profile: Profile,
    pub copied: Vec<String>,
    /// Well-known files that were missing and created empty
    pub placeholders: Vec<&'static str>,
    pub source_removal: SourceRemoval,
}

/// Profile lifecycle operations against one storage root
pub struct ProfileManager<'a> {
    config: &'a Config,
    templates: &'a TemplateManager,
}

impl<'a> ProfileManager<'a> {
    pub fn new(config: &'a Config, templates: &'a TemplateManager) -> Self {
        Self { config, templates }
    }

    pub fn storage_root(&self) -> &Path {
        &self.config.storage_root
    }

    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.config.profile_dir(name)
    }

    /// Check if a profile directory exists
    pub fn profile_exists(&self, name: &str) -> bool {
        self.profile_dir(name).is_dir()
    }

    /// Create a new profile, optionally seeding settings.json from a template
    pub fn create_profile(
        &self,
        name: &str,
        description: &str,
        template: Option<&str>,
    ) -> Result<Profile> {
        validate_name(name)?;
        let profile_dir = self.profile_dir(name);

        if profile_dir.exists() {
            return Err(Error::already_exists(Entity::Profile, name));
        }
        if let Some(template) = template
            && !self.templates.template_exists(template)
        {
            return Err(Error::not_found(Entity::Template, template));
        }

        self.ensure_storage_root()?;
        let metadata = self.build_profile_dir(name, |dir| {
            let metadata = ProfileMetadata::new(description, template.map(str::to_string));
            metadata.write(dir)?;
            write_placeholder(dir, CLAUDE_CONFIG_FILE)?;
            write_placeholder(dir, CLAUDE_SETTINGS_FILE)?;
            if let Some(template) = template {
                self.templates.apply_template(dir, template)?;
            }
            Ok(metadata)
        })?;

        log::debug!("created profile '{name}' at {}", profile_dir.display());
        Ok(Profile {
            name: name.to_string(),
            path: profile_dir,
            metadata,
        })
    }

    /// Remove a profile and everything in it
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let profile_dir = self.profile_dir(name);

        if !profile_dir.is_dir() {
            return Err(Error::not_found(Entity::Profile, name));
        }
        if self.config.is_active(name) {
            return Err(Error::ActiveProfile {
                name: name.to_string(),
                action: "delete",
            });
        }

        fs::remove_dir_all(&profile_dir).io_context(|| {
            format!("Failed to remove profile directory: {}", profile_dir.display())
        })?;
        log::debug!("deleted profile '{name}'");

        Ok(())
    }

    /// List readable profiles, most recently used first.
    ///
    /// Never-used profiles follow in name order. Directories whose name or
    /// metadata is invalid are skipped.
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let root = self.storage_root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Io {
                    context: format!("Failed to read storage root: {}", root.display()),
                    source: e,
                });
            }
        };

        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.io_context(|| format!("Failed to read entry in {}", root.display()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if validate_name(name).is_err() {
                log::debug!("skipping {}: not a valid profile name", path.display());
                continue;
            }

            match ProfileMetadata::read(&path) {
                Ok(metadata) => profiles.push(Profile {
                    name: name.to_string(),
                    path: path.clone(),
                    metadata,
                }),
                Err(e) => log::debug!("skipping {}: {e}", path.display()),
            }
        }

        profiles.sort_by(compare_by_recent_use);
        Ok(profiles)
    }

    pub fn get_profile(&self, name: &str) -> Result<Profile> {
        validate_name(name)?;
        let path = self.profile_dir(name);

        if !path.is_dir() {
            return Err(Error::not_found(Entity::Profile, name));
        }
        let metadata = ProfileMetadata::read(&path)?;

        Ok(Profile {
            name: name.to_string(),
            path,
            metadata,
        })
    }

    /// Stamp `lastUsedAt` and bump `usageCount`
    pub fn update_last_used(&self, name: &str) -> Result<ProfileMetadata> {
        let mut profile = self.get_profile(name)?;
        profile.metadata.touch();
        profile.metadata.write(&profile.path)?;
        Ok(profile.metadata)
    }

    /// Check the directory still has every file Claude Code and cdp need
    pub fn validate_profile(&self, profile: &Profile) -> Result<()> {
        if !profile.path.is_dir() {
            return Err(Error::Corrupted {
                name: profile.name.clone(),
                reason: "profile directory does not exist".to_string(),
            });
        }

        for file in REQUIRED_FILES {
            if !profile.path.join(file).is_file() {
                return Err(Error::Corrupted {
                    name: profile.name.clone(),
                    reason: format!("required file '{file}' is missing"),
                });
            }
        }

        Ok(())
    }

    /// Copy a profile's top-level files under a new name with fresh usage stats
    pub fn clone_profile(&self, source: &str, dest: &str) -> Result<Profile> {
        validate_name(dest)?;
        let source_profile = self.get_profile(source)?;
        let dest_dir = self.profile_dir(dest);

        if dest_dir.exists() {
            return Err(Error::already_exists(Entity::Profile, dest));
        }

        let metadata = self.build_profile_dir(dest, |dir| {
            copy_top_level_files(&source_profile.path, dir, |_| false)?;

            let metadata = ProfileMetadata {
                created_at: Utc::now(),
                last_used_at: None,
                usage_count: 0,
                description: format!("Cloned from {source}"),
                ..source_profile.metadata.clone()
            };
            metadata.write(dir)?;
            Ok(metadata)
        })?;

        log::debug!("cloned profile '{source}' to '{dest}'");
        Ok(Profile {
            name: dest.to_string(),
            path: dest_dir,
            metadata,
        })
    }

    /// Rename an inactive profile
    pub fn rename_profile(&self, old_name: &str, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        validate_name(old_name)?;
        let old_dir = self.profile_dir(old_name);
        let new_dir = self.profile_dir(new_name);

        if !old_dir.is_dir() {
            return Err(Error::not_found(Entity::Profile, old_name));
        }
        if new_dir.exists() {
            return Err(Error::already_exists(Entity::Profile, new_name));
        }
        if self.config.is_active(old_name) {
            return Err(Error::ActiveProfile {
                name: old_name.to_string(),
                action: "rename",
            });
        }

        fs::rename(&old_dir, &new_dir).io_context(|| {
            format!(
                "Failed to rename '{}' to '{}'",
                old_dir.display(),
                new_dir.display()
            )
        })?;
        log::debug!("renamed profile '{old_name}' to '{new_name}'");

        Ok(())
    }

    /// Import an existing Claude configuration directory as a profile.
    ///
    /// `source` may start with `~`, which expands to `home`. Only top-level
    /// files are imported. Every decision (overwrite, proceed, remove the
    /// source) goes through `prompt`; declining either of the first two
    /// aborts with [`Error::Cancelled`].
    pub fn import_profile(
        &self,
        source: &str,
        home: &Path,
        name: &str,
        description: &str,
        prompt: &mut dyn ImportPrompt,
    ) -> Result<ImportOutcome> {
        validate_name(name)?;
        let source_dir = resolve_source(source, home)?;
        let destination = self.profile_dir(name);

        if source_dir.starts_with(&destination) {
            return Err(Error::SourceInsideDestination(source_dir));
        }

        let preview = preview_import(&source_dir, &destination, name, description)?;

        if preview.destination_exists {
            if !prompt.confirm_overwrite(&preview) {
                return Err(Error::Cancelled("import"));
            }
            fs::remove_dir_all(&destination).io_context(|| {
                format!("Failed to remove existing profile: {}", destination.display())
            })?;
            log::debug!("removed existing profile '{name}' for import");
        }

        if !prompt.confirm_import(&preview) {
            return Err(Error::Cancelled("import"));
        }

        self.ensure_storage_root()?;
        let (copied, placeholders, metadata) = self.build_profile_dir(name, |dir| {
            let copied = copy_top_level_files(&source_dir, dir, |f| f == METADATA_FILE)?;

            let mut placeholders = Vec::new();
            for (file, present) in [
                (CLAUDE_CONFIG_FILE, preview.has_claude_config),
                (CLAUDE_SETTINGS_FILE, preview.has_settings),
            ] {
                if !present {
                    write_placeholder(dir, file)?;
                    placeholders.push(file);
                }
            }

            let mut metadata = ProfileMetadata::new(description, None);
            if preview.has_metadata {
                match ProfileMetadata::read(&source_dir) {
                    Ok(imported) => {
                        metadata.template_name = imported.template_name;
                        metadata.custom_flags = imported.custom_flags;
                    }
                    Err(e) => log::warn!("ignoring unreadable imported metadata: {e}"),
                }
            }
            metadata.write(dir)?;

            Ok((copied, placeholders, metadata))
        })?;

        let source_removal = if prompt.confirm_remove_source(&preview) {
            match fs::remove_dir_all(&source_dir) {
                Ok(()) => SourceRemoval::Removed,
                Err(e) => {
                    log::warn!("failed to remove {}: {e}", source_dir.display());
                    SourceRemoval::Failed(e.to_string())
                }
            }
        } else {
            SourceRemoval::Kept
        };

        Ok(ImportOutcome {
            profile: Profile {
                name: name.to_string(),
                path: destination,
                metadata,
            },
            copied,
            placeholders,
            source_removal,
        })
    }

    /// Create `name`'s directory and fill it with `work`.
    ///
    /// The directory must not exist yet; it is removed again if `work` fails.
    fn build_profile_dir<T, F>(&self, name: &str, work: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        Partial::create_dir(&self.profile_dir(name), Entity::Profile)?.build(work)
    }

    fn ensure_storage_root(&self) -> Result<()> {
        let root = self.storage_root();
        fs::create_dir_all(root)
            .io_context(|| format!("Failed to create storage root: {}", root.display()))
    }
}

fn compare_by_recent_use(a: &Profile, b: &Profile) -> Ordering {
    match (a.metadata.last_used_at, b.metadata.last_used_at) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

fn write_placeholder(dir: &Path, file: &str) -> Result<()> {
    let path = dir.join(file);
    fs::write(&path, EMPTY_JSON_OBJECT)
        .io_context(|| format!("Failed to create {}", path.display()))
}

/// Expand `~`, make absolute and check the result is a directory
fn resolve_source(source: &str, home: &Path) -> Result<PathBuf> {
    let expanded = expand_home(source, home);
    let absolute = std::path::absolute(&expanded)
        .io_context(|| format!("Failed to resolve source path: {source}"))?;

    match fs::metadata(&absolute) {
        Ok(meta) if meta.is_dir() => Ok(absolute),
        Ok(_) => Err(Error::NotADirectory(absolute)),
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            Err(Error::not_found(Entity::SourceDirectory, source))
        }
        Err(e) => Err(Error::Io {
            context: format!("Failed to access source path: {}", absolute.display()),
            source: e,
        }),
    }
}

fn preview_import(
    source: &Path,
    destination: &Path,
    name: &str,
    description: &str,
) -> Result<ImportPreview> {
    let mut preview = ImportPreview {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        profile_name: name.to_string(),
        description: description.to_string(),
        has_claude_config: false,
        has_settings: false,
        has_metadata: false,
        other_files: Vec::new(),
        skipped_dirs: Vec::new(),
        destination_exists: destination.exists(),
    };

    let entries = fs::read_dir(source)
        .io_context(|| format!("Failed to read source directory: {}", source.display()))?;
    for entry in entries {
        let entry =
            entry.io_context(|| format!("Failed to read entry in {}", source.display()))?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            preview.skipped_dirs.push(file_name);
            continue;
        }
        if !path.is_file() {
            continue;
        }

        match file_name.as_str() {
            CLAUDE_CONFIG_FILE => preview.has_claude_config = true,
            CLAUDE_SETTINGS_FILE => preview.has_settings = true,
            METADATA_FILE => preview.has_metadata = true,
            _ => preview.other_files.push(file_name),
        }
    }
    preview.other_files.sort();
    preview.skipped_dirs.sort();

    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{setup_test_env, write_file};
    use tempfile::TempDir;

    /// Scripted answers that also record which questions were asked
    #[derive(Default)]
    struct Script {
        overwrite: bool,
        proceed: bool,
        remove_source: bool,
        asked: Vec<&'static str>,
    }

    impl ImportPrompt for Script {
        fn confirm_overwrite(&mut self, _: &ImportPreview) -> bool {
            self.asked.push("overwrite");
            self.overwrite
        }

        fn confirm_import(&mut self, _: &ImportPreview) -> bool {
            self.asked.push("import");
            self.proceed
        }

        fn confirm_remove_source(&mut self, _: &ImportPreview) -> bool {
            self.asked.push("remove");
            self.remove_source
        }
    }

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_name("work").is_ok());
        assert!(validate_name("my-profile").is_ok());
        assert!(validate_name("test_123").is_ok());
        assert!(validate_name(&"a".repeat(50)).is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
        assert!(validate_name("invalid name").is_err());
        assert!(validate_name("test/profile").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("emoji😊").is_err());
        assert!(validate_name("café").is_err());
        assert_eq!(validate_name("a.b").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_create_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        pm.create_profile("work", "Work profile", None).unwrap();

        let profile = pm.get_profile("work").unwrap();
        assert_eq!(profile.metadata.usage_count, 0);
        assert_eq!(profile.metadata.description, "Work profile");
        assert!(profile.metadata.last_used_at.is_none());
        assert!(profile.path.join(CLAUDE_CONFIG_FILE).is_file());
        assert_eq!(
            fs::read_to_string(profile.path.join(CLAUDE_SETTINGS_FILE)).unwrap(),
            "{}"
        );
        pm.validate_profile(&profile).unwrap();

        let metadata = pm.update_last_used("work").unwrap();
        assert_eq!(metadata.usage_count, 1);

        let profile = pm.get_profile("work").unwrap();
        assert_eq!(profile.metadata.usage_count, 1);
        assert!(profile.metadata.last_used_at.is_some());
    }

    #[test]
    fn test_create_duplicate_leaves_first_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        let first = pm.create_profile("work", "first", None).unwrap();
        fs::write(first.path.join(CLAUDE_SETTINGS_FILE), r#"{"a":1}"#).unwrap();

        let err = pm.create_profile("work", "second", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let again = pm.get_profile("work").unwrap();
        assert_eq!(again.metadata, first.metadata);
        assert_eq!(
            fs::read_to_string(again.path.join(CLAUDE_SETTINGS_FILE)).unwrap(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn test_create_with_template() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        let profile = pm.create_profile("safe", "", Some("restrictive")).unwrap();
        assert_eq!(profile.metadata.template_name.as_deref(), Some("restrictive"));

        let body = fs::read_to_string(profile.path.join(CLAUDE_SETTINGS_FILE)).unwrap();
        let settings: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(settings["permissions"]["defaultMode"], "default");
    }

    #[test]
    fn test_create_with_unknown_template_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        let err = pm.create_profile("work", "", Some("missing")).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: Entity::Template,
                ..
            }
        ));
        assert!(!pm.profile_dir("work").exists());
    }

    #[test]
    fn test_delete_active_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let (_, mut config, templates) = setup_test_env(&temp_dir);
        ProfileManager::new(&config, &templates)
            .create_profile("work", "", None)
            .unwrap();
        config.active_profile_name = Some("work".to_string());

        let pm = ProfileManager::new(&config, &templates);
        let err = pm.delete_profile("work").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtectedState);
        assert!(pm.profile_dir("work").join(METADATA_FILE).exists());
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let profile = pm.create_profile("old", "", None).unwrap();
        write_file(&profile.path.join("nested/deep.txt"), "x");

        pm.delete_profile("old").unwrap();
        assert!(!profile.path.exists());

        assert_eq!(pm.delete_profile("old").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(pm.delete_profile("../x").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_failed_build_removes_profile_dir() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        pm.ensure_storage_root().unwrap();

        let err = pm
            .build_profile_dir("work", |dir| {
                write_file(&dir.join(CLAUDE_CONFIG_FILE), "{}");
                ProfileMetadata::new("", None).write(dir)?;
                Err::<(), _>(Error::Io {
                    context: "Failed to copy file".to_string(),
                    source: std::io::Error::other("disk full"),
                })
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!pm.profile_dir("work").exists());
        assert!(pm.list_profiles().unwrap().is_empty());

        // The name is free again afterwards
        pm.create_profile("work", "", None).unwrap();
    }

    #[test]
    fn test_build_never_touches_existing_profile() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let profile = pm.create_profile("work", "kept", None).unwrap();

        let err = pm
            .build_profile_dir("work", |_| Ok::<(), Error>(()))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(pm.get_profile("work").unwrap().metadata, profile.metadata);
    }

    #[test]
    fn test_list_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        assert!(pm.list_profiles().unwrap().is_empty());

        let missing = Config::new(temp_dir.path().join("does-not-exist"));
        let pm = ProfileManager::new(&missing, &templates);
        assert!(pm.list_profiles().unwrap().is_empty());
    }

    #[test]
    fn test_list_order_and_skips() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        for name in ["zeta", "alpha", "recent", "older"] {
            pm.create_profile(name, "", None).unwrap();
        }
        let set_last_used = |name: &str, ts: &str| {
            let dir = pm.profile_dir(name);
            let mut metadata = ProfileMetadata::read(&dir).unwrap();
            metadata.last_used_at = Some(ts.parse().unwrap());
            metadata.write(&dir).unwrap();
        };
        set_last_used("older", "2025-01-01T00:00:00Z");
        set_last_used("recent", "2025-06-01T00:00:00Z");

        // Skipped: malformed metadata, missing metadata, bad name, plain file
        write_file(&config.storage_root.join("broken/.metadata.json"), "{");
        fs::create_dir_all(config.storage_root.join("empty")).unwrap();
        fs::create_dir_all(config.storage_root.join("bad name")).unwrap();
        write_file(&config.storage_root.join("stray.txt"), "x");

        let names: Vec<String> = pm
            .list_profiles()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["recent", "older", "alpha", "zeta"]);
    }

    #[test]
    fn test_get_missing_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        assert_eq!(pm.get_profile("ghost").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(pm.get_profile("a/b").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validate_profile_detects_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let profile = pm.create_profile("work", "", None).unwrap();

        fs::remove_file(profile.path.join(CLAUDE_CONFIG_FILE)).unwrap();
        let err = pm.validate_profile(&profile).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(err.to_string().contains(CLAUDE_CONFIG_FILE));
    }

    #[test]
    fn test_clone_copies_files_and_resets_usage() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);

        let source = pm.create_profile("src", "source", Some("permissive")).unwrap();
        write_file(&source.path.join("notes.md"), "# notes\n");
        write_file(&source.path.join("sub/inner.txt"), "nested");
        pm.update_last_used("src").unwrap();
        pm.update_last_used("src").unwrap();

        let clone = pm.clone_profile("src", "dst").unwrap();

        for file in ["notes.md", CLAUDE_SETTINGS_FILE, CLAUDE_CONFIG_FILE] {
            assert_eq!(
                fs::read(clone.path.join(file)).unwrap(),
                fs::read(source.path.join(file)).unwrap()
            );
        }
        assert!(!clone.path.join("sub").exists());

        let stored = pm.get_profile("dst").unwrap();
        assert_eq!(stored.metadata.usage_count, 0);
        assert!(stored.metadata.last_used_at.is_none());
        assert_eq!(stored.metadata.description, "Cloned from src");
        assert_eq!(stored.metadata.template_name.as_deref(), Some("permissive"));
        assert_eq!(pm.get_profile("src").unwrap().metadata.usage_count, 2);
    }

    #[test]
    fn test_clone_errors() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        pm.create_profile("a", "", None).unwrap();
        pm.create_profile("b", "", None).unwrap();

        assert_eq!(pm.clone_profile("missing", "c").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(pm.clone_profile("a", "b").unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(pm.clone_profile("a", "b c").unwrap_err().kind(), ErrorKind::Validation);
        assert!(!pm.profile_dir("c").exists());
    }

    #[test]
    fn test_rename() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        pm.create_profile("old-name", "", None).unwrap();

        pm.rename_profile("old-name", "new-name").unwrap();

        assert!(!pm.profile_exists("old-name"));
        assert!(pm.get_profile("new-name").is_ok());
    }

    #[test]
    fn test_rename_onto_existing_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (_, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let a = pm.create_profile("a", "first", None).unwrap();
        let b = pm.create_profile("b", "second", None).unwrap();

        let err = pm.rename_profile("a", "b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(pm.get_profile("a").unwrap(), a);
        assert_eq!(pm.get_profile("b").unwrap(), b);
    }

    #[test]
    fn test_rename_active_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let (_, mut config, templates) = setup_test_env(&temp_dir);
        ProfileManager::new(&config, &templates)
            .create_profile("work", "", None)
            .unwrap();
        config.active_profile_name = Some("work".to_string());

        let pm = ProfileManager::new(&config, &templates);
        let err = pm.rename_profile("work", "job").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtectedState);
        assert!(pm.profile_exists("work"));
        assert!(!pm.profile_exists("job"));
    }

    fn import_source(temp_dir: &TempDir) -> PathBuf {
        let source = temp_dir.path().join("old-claude");
        write_file(&source.join(CLAUDE_CONFIG_FILE), r#"{"oauth":"token"}"#);
        write_file(&source.join("history.jsonl"), "line\n");
        write_file(&source.join("projects/p.json"), "{}");
        write_file(
            &source.join(METADATA_FILE),
            r#"{"createdAt":"2024-01-01T00:00:00Z","usageCount":9,"templateName":"permissive","customFlags":["--debug"]}"#,
        );
        source
    }

    #[test]
    fn test_import() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let source = import_source(&temp_dir);

        let mut script = Script {
            proceed: true,
            ..Default::default()
        };
        let outcome = pm
            .import_profile(
                source.to_str().unwrap(),
                &paths.home,
                "imported",
                "From old setup",
                &mut script,
            )
            .unwrap();

        assert_eq!(script.asked, vec!["import", "remove"]);
        assert_eq!(outcome.placeholders, vec![CLAUDE_SETTINGS_FILE]);
        assert_eq!(outcome.source_removal, SourceRemoval::Kept);
        assert!(source.exists());

        let profile = pm.get_profile("imported").unwrap();
        assert_eq!(
            fs::read_to_string(profile.path.join(CLAUDE_CONFIG_FILE)).unwrap(),
            r#"{"oauth":"token"}"#
        );
        assert!(profile.path.join("history.jsonl").is_file());
        assert!(!profile.path.join("projects").exists());
        assert_eq!(profile.metadata.usage_count, 0);
        assert_eq!(profile.metadata.description, "From old setup");
        assert_eq!(profile.metadata.template_name.as_deref(), Some("permissive"));
        assert_eq!(profile.metadata.custom_flags, vec!["--debug".to_string()]);
        pm.validate_profile(&profile).unwrap();
    }

    #[test]
    fn test_import_expands_home_and_removes_source() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let source = import_source(&temp_dir);

        let outcome = pm
            .import_profile(
                "~/old-claude",
                &paths.home,
                "moved",
                "",
                &mut AutoConfirm {
                    overwrite: false,
                    remove_source: true,
                },
            )
            .unwrap();

        assert_eq!(outcome.source_removal, SourceRemoval::Removed);
        assert!(!source.exists());
        assert!(pm.profile_exists("moved"));
    }

    #[test]
    fn test_import_preview_contents() {
        let temp_dir = TempDir::new().unwrap();
        let source = import_source(&temp_dir);

        let preview =
            preview_import(&source, &temp_dir.path().join("dest"), "p", "").unwrap();
        assert!(preview.has_claude_config);
        assert!(!preview.has_settings);
        assert!(preview.has_metadata);
        assert_eq!(preview.other_files, vec!["history.jsonl".to_string()]);
        assert_eq!(preview.skipped_dirs, vec!["projects".to_string()]);
        assert!(!preview.destination_exists);
        assert_eq!(preview.files_to_copy(), 2);
    }

    #[test]
    fn test_import_declined_overwrite_keeps_destination() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let existing = pm.create_profile("work", "keep me", None).unwrap();
        let source = import_source(&temp_dir);

        let mut script = Script::default();
        let err = pm
            .import_profile(source.to_str().unwrap(), &paths.home, "work", "", &mut script)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(script.asked, vec!["overwrite"]);
        assert_eq!(pm.get_profile("work").unwrap(), existing);
    }

    #[test]
    fn test_import_cancel_after_overwrite_does_not_restore() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        pm.create_profile("work", "", None).unwrap();
        let source = import_source(&temp_dir);

        let mut script = Script {
            overwrite: true,
            proceed: false,
            ..Default::default()
        };
        let err = pm
            .import_profile(source.to_str().unwrap(), &paths.home, "work", "", &mut script)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(script.asked, vec!["overwrite", "import"]);
        assert!(!pm.profile_exists("work"));
        assert!(source.exists());
    }

    #[test]
    fn test_import_source_errors() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, config, templates) = setup_test_env(&temp_dir);
        let pm = ProfileManager::new(&config, &templates);
        let file = temp_dir.path().join("file.txt");
        write_file(&file, "x");
        let mut yes = AutoConfirm::default();

        let missing = temp_dir.path().join("nope");
        let err = pm
            .import_profile(missing.to_str().unwrap(), &paths.home, "p", "", &mut yes)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = pm
            .import_profile(file.to_str().unwrap(), &paths.home, "p", "", &mut yes)
            .unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));

        let inside = pm.create_profile("self", "", None).unwrap();
        let err = pm
            .import_profile(inside.path.to_str().unwrap(), &paths.home, "self", "", &mut yes)
            .unwrap_err();
        assert!(matches!(err, Error::SourceInsideDestination(_)));
        assert!(pm.profile_exists("self"));
    }
}
