//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`list`, `create`, `use`, etc.).
//! It serves as the coordination layer, interacting with:
//! - `crate::ui` for user interaction (output, prompts).
//! - `crate::config` for the global config.
//! - `crate::profiles` for profile management logic.
//! - `crate::backup` for archives.
//! - `crate::switch` and `crate::launcher` for activating and running profiles.
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anstyle::AnsiColor;
use anyhow::{Result, anyhow, bail};
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

use crate::backup::BackupManager;
use crate::config::Config;
use crate::diff::{KeyDiff, diff_settings, format_value, load_settings};
use crate::doctor::run_doctor;
use crate::error::{Entity, Error};
use crate::fs_utils::dir_size;
use crate::launcher::Launcher;
use crate::paths::Paths;
use crate::profiles::{
    AutoConfirm, ImportPreview, ImportPrompt, ProfileManager, SourceRemoval,
};
use crate::switch::switch_to_profile;
use crate::templates::TemplateManager;
use crate::ui::{Ui, format_relative, format_size};

/// Attach a next-step hint to core errors the user can act on
fn hinted(err: Error) -> anyhow::Error {
    let hint = match &err {
        Error::NotInitialized(_) => Some("Run 'cdp init' to set up cdp."),
        Error::NotFound {
            entity: Entity::Profile,
            ..
        } => Some("Use 'cdp list' to see available profiles."),
        Error::NotFound {
            entity: Entity::Template,
            ..
        } => Some("Use 'cdp templates' to see available templates."),
        Error::NotFound {
            entity: Entity::Backup,
            ..
        } => Some("Use 'cdp backup list' to see available backups."),
        Error::NotFound {
            entity: Entity::Executable,
            ..
        } => Some("Install Claude Code, or pass --claude-path."),
        Error::AlreadyExists {
            entity: Entity::Profile,
            ..
        } => Some("Choose a different name or delete the existing profile first."),
        Error::ActiveProfile { .. } => {
            Some("Switch to another profile first with 'cdp use <other-profile> --no-run'.")
        }
        Error::ExistsNoOverwrite(_) => Some("Pass --overwrite to replace it."),
        Error::Corrupted { .. } => Some("Run 'cdp doctor' for details."),
        _ => None,
    };

    match hint {
        Some(hint) => anyhow!("{err}\nHint: {hint}"),
        None => err.into(),
    }
}

fn load_config(paths: &Paths) -> Result<Config> {
    Config::load(&paths.config_file).map_err(hinted)
}

fn template_manager(paths: &Paths) -> TemplateManager {
    TemplateManager::new(paths.templates_dir.clone())
}

fn backup_manager(paths: &Paths, config: &Config) -> BackupManager {
    BackupManager::new(paths.backups_dir.clone(), config.storage_root.clone())
}

/// Create the config directory, storage root and default config
pub fn init(paths: &Paths, ui: &Ui) -> Result<()> {
    let (config, created) = Config::init(paths)?;

    if created {
        ui.ok("Initialized cdp");
    } else {
        ui.info("cdp is already initialized");
    }

    let mut table = ui.detail_table();
    table.add_row(vec![ui.cell("Config:"), ui.cell(paths.config_file.display().to_string())]);
    table.add_row(vec![
        ui.cell("Profiles:"),
        ui.cell(config.storage_root.display().to_string()),
    ]);
    ui.println(table.to_string());

    if created {
        ui.newline();
        ui.println("Create your first profile with:");
        ui.println(format!("  {} create <name>", ui.bold("cdp")));
    }

    Ok(())
}

pub fn create(
    paths: &Paths,
    ui: &Ui,
    name: &str,
    description: &str,
    template: Option<&str>,
) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);

    let profile = pm
        .create_profile(name, description, template)
        .map_err(hinted)?;

    match template {
        Some(template) => ui.ok(format!(
            "Created profile '{}' from template '{template}'",
            profile.name
        )),
        None => ui.ok(format!("Created profile '{}'", profile.name)),
    }
    ui.println(ui.dim(format!("  {}", profile.path.display())));

    Ok(())
}

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let profiles = ProfileManager::new(&config, &templates).list_profiles()?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} create <name>", ui.bold("cdp")));
        return Ok(());
    }

    let now = Utc::now();
    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Description"),
        ui.header_cell("Last used"),
        ui.header_cell("Uses"),
    ]);

    for profile in &profiles {
        let is_active = config.is_active(&profile.name);
        let name_cell = if is_active {
            ui.colored_cell(&profile.name, AnsiColor::Green)
        } else {
            ui.cell(&profile.name)
        };
        let last_used = profile
            .metadata
            .last_used_at
            .map(|ts| format_relative(ts, now))
            .unwrap_or_else(|| "never".to_string());

        table.add_row(vec![
            ui.cell(if is_active { ui.icon_active() } else { "" }),
            name_cell,
            ui.cell(&profile.metadata.description),
            ui.cell(last_used),
            ui.cell(profile.metadata.usage_count.to_string()),
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the active profile
pub fn current(paths: &Paths, ui: &Ui) -> Result<()> {
    let config = load_config(paths)?;

    let Some(name) = &config.active_profile_name else {
        ui.info("No active profile.");
        ui.println(format!("Activate one with: {} use <name>", ui.bold("cdp")));
        return Ok(());
    };

    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);

    ui.section("Current Profile");
    let mut table = ui.detail_table();
    table.add_row(vec![ui.cell("Profile:"), ui.header_cell(name)]);

    match pm.get_profile(name) {
        Ok(profile) => {
            table.add_row(vec![
                ui.cell("Directory:"),
                ui.cell(profile.path.display().to_string()),
            ]);
            if let Some(ts) = profile.metadata.last_used_at {
                table.add_row(vec![
                    ui.cell("Last used:"),
                    ui.cell(format_relative(ts, Utc::now())),
                ]);
            }
        }
        Err(e) => {
            table.add_row(vec![ui.cell("Status:"), ui.colored_cell(e.to_string(), AnsiColor::Red)]);
        }
    }
    ui.println(table.to_string());

    Ok(())
}

/// Show detailed information about a profile
pub fn info(paths: &Paths, ui: &Ui, name: &str) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);
    let profile = pm.get_profile(name).map_err(hinted)?;
    let metadata = &profile.metadata;

    ui.section(format!("Profile: {}", profile.name));
    ui.newline();

    let mut table = ui.detail_table();
    table.add_row(vec![
        ui.cell("Status:"),
        if config.is_active(name) {
            ui.colored_cell("active", AnsiColor::Green)
        } else {
            ui.cell("inactive")
        },
    ]);
    if !metadata.description.is_empty() {
        table.add_row(vec![ui.cell("Description:"), ui.cell(&metadata.description)]);
    }
    table.add_row(vec![
        ui.cell("Directory:"),
        ui.cell(profile.path.display().to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Created:"),
        ui.cell(
            metadata
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
    ]);
    table.add_row(vec![
        ui.cell("Last used:"),
        ui.cell(
            metadata
                .last_used_at
                .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string()),
        ),
    ]);
    table.add_row(vec![ui.cell("Uses:"), ui.cell(metadata.usage_count.to_string())]);
    if let Some(template) = &metadata.template_name {
        table.add_row(vec![ui.cell("Template:"), ui.cell(template)]);
    }
    if !metadata.custom_flags.is_empty() {
        table.add_row(vec![ui.cell("Claude flags:"), ui.cell(metadata.custom_flags.join(" "))]);
    }
    match dir_size(&profile.path) {
        Ok(size) => table.add_row(vec![ui.cell("Size:"), ui.cell(format_size(size))]),
        Err(e) => table.add_row(vec![
            ui.cell("Size:"),
            ui.colored_cell(format!("unknown ({e})"), AnsiColor::Yellow),
        ]),
    };
    table.add_row(vec![
        ui.cell("Health:"),
        match pm.validate_profile(&profile) {
            Ok(()) => ui.colored_cell("ok", AnsiColor::Green),
            Err(e) => ui.colored_cell(e.to_string(), AnsiColor::Red),
        },
    ]);
    ui.println(table.to_string());

    Ok(())
}

/// Activate a profile and, unless `no_run`, launch `claude` with it.
///
/// Returns the exit code the process should end with.
pub fn use_profile(
    paths: &Paths,
    ui: &Ui,
    name: &str,
    no_run: bool,
    claude_path: Option<PathBuf>,
    claude_args: &[String],
) -> Result<i32> {
    let mut config = load_config(paths)?;
    let templates = template_manager(paths);

    // Locate claude before touching the config so a missing install changes nothing
    let launcher = if no_run {
        None
    } else {
        Some(Launcher::locate(claude_path, &paths.home).map_err(hinted)?)
    };

    let profile = switch_to_profile(paths, &mut config, &templates, name).map_err(hinted)?;
    ui.ok(format!("Switched to profile '{}'", profile.name));

    let Some(launcher) = launcher else {
        return Ok(0);
    };

    ui.println(ui.dim(format!(
        "Launching {} with CLAUDE_CONFIG_DIR={}",
        launcher.executable().display(),
        profile.path.display()
    )));
    let status = launcher.run(&profile, claude_args)?;
    Ok(status.code().unwrap_or(1))
}

/// Ask before a destructive step; without a terminal only `force` agrees.
fn confirm_destructive(
    ui: &Ui,
    prompt: &str,
    help: Option<&str>,
    force: bool,
    what: &str,
) -> Result<bool> {
    if force {
        return Ok(true);
    }
    if !ui.interactive {
        bail!(
            "Refusing to {what} without confirmation\n\
             Hint: Pass --force to skip the prompt"
        );
    }
    ui.confirm(prompt, help, false)
}

/// Delete a profile
pub fn delete(paths: &Paths, ui: &Ui, name: &str, force: bool) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);

    // Surface not-found and active-profile errors before asking
    let profile = pm.get_profile(name).map_err(hinted)?;
    if config.is_active(name) {
        return Err(hinted(Error::ActiveProfile {
            name: name.to_string(),
            action: "delete",
        }));
    }

    if !confirm_destructive(
        ui,
        &format!("Are you sure you want to delete profile '{name}'?"),
        Some("This permanently deletes the profile directory and everything in it"),
        force,
        &format!("delete profile '{name}'"),
    )? {
        ui.warn("Deletion cancelled.");
        return Ok(());
    }

    pm.delete_profile(&profile.name).map_err(hinted)?;
    ui.ok(format!("Deleted profile '{name}'"));
    Ok(())
}

pub fn clone(paths: &Paths, ui: &Ui, source: &str, dest: &str) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let profile = ProfileManager::new(&config, &templates)
        .clone_profile(source, dest)
        .map_err(hinted)?;

    ui.ok(format!("Cloned profile '{source}' to '{}'", profile.name));
    Ok(())
}

/// Rename a profile
pub fn rename(paths: &Paths, ui: &Ui, old_name: &str, new_name: &str) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    ProfileManager::new(&config, &templates)
        .rename_profile(old_name, new_name)
        .map_err(hinted)?;

    ui.ok(format!("Renamed profile '{old_name}' to '{new_name}'"));
    Ok(())
}

/// Import confirmations asked on the terminal
struct InteractiveImport<'a> {
    ui: &'a Ui,
    remove_source: bool,
}

impl InteractiveImport<'_> {
    fn ask(&self, prompt: &str, help: Option<&str>, default: bool) -> bool {
        self.ui.confirm(prompt, help, default).unwrap_or_else(|e| {
            log::warn!("{e:#}");
            false
        })
    }
}

impl ImportPrompt for InteractiveImport<'_> {
    fn confirm_overwrite(&mut self, preview: &ImportPreview) -> bool {
        self.ask(
            &format!("Profile '{}' already exists. Overwrite it?", preview.profile_name),
            Some("The existing profile is deleted before importing"),
            false,
        )
    }

    fn confirm_import(&mut self, preview: &ImportPreview) -> bool {
        print_import_preview(self.ui, preview);
        self.ask("Proceed with import?", None, true)
    }

    fn confirm_remove_source(&mut self, preview: &ImportPreview) -> bool {
        self.remove_source
            && self.ask(
                &format!("Delete the original directory {}?", preview.source.display()),
                Some("The imported profile keeps its own copy"),
                false,
            )
    }
}

fn print_import_preview(ui: &Ui, preview: &ImportPreview) {
    let present = |found: bool| {
        if found {
            ui.colored_cell("found", AnsiColor::Green)
        } else {
            ui.colored_cell("missing, will create {}", AnsiColor::Yellow)
        }
    };

    ui.section("Import Preview");
    let mut table = ui.detail_table();
    table.add_row(vec![ui.cell("From:"), ui.cell(preview.source.display().to_string())]);
    table.add_row(vec![
        ui.cell("To:"),
        ui.cell(preview.destination.display().to_string()),
    ]);
    table.add_row(vec![ui.cell(".claude.json:"), present(preview.has_claude_config)]);
    table.add_row(vec![ui.cell("settings.json:"), present(preview.has_settings)]);
    if !preview.other_files.is_empty() {
        table.add_row(vec![ui.cell("Other files:"), ui.cell(preview.other_files.join(", "))]);
    }
    if !preview.skipped_dirs.is_empty() {
        table.add_row(vec![
            ui.cell("Skipped dirs:"),
            ui.colored_cell(preview.skipped_dirs.join(", "), AnsiColor::Yellow),
        ]);
    }
    table.add_row(vec![
        ui.cell("Files to copy:"),
        ui.cell(preview.files_to_copy().to_string()),
    ]);
    ui.println(table.to_string());
}

/// Import an existing Claude configuration directory
pub fn import(
    paths: &Paths,
    ui: &Ui,
    source: &str,
    name: &str,
    description: &str,
    yes: bool,
    remove_source: bool,
) -> Result<()> {
    if !yes && !ui.interactive {
        bail!(
            "Refusing to import without confirmation\n\
             Hint: Pass --yes to import without prompting"
        );
    }

    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);

    let mut auto = AutoConfirm {
        overwrite: true,
        remove_source,
    };
    let mut interactive = InteractiveImport { ui, remove_source };
    let prompt: &mut dyn ImportPrompt = if yes { &mut auto } else { &mut interactive };

    let outcome = match pm.import_profile(source, &paths.home, name, description, prompt) {
        Ok(outcome) => outcome,
        Err(Error::Cancelled(_)) => {
            ui.warn("Import cancelled.");
            return Ok(());
        }
        Err(e) => return Err(hinted(e)),
    };

    ui.ok(format!(
        "Imported '{}' ({} file(s) copied)",
        outcome.profile.name,
        outcome.copied.len()
    ));
    for file in &outcome.placeholders {
        ui.info(format!("Created empty {file}"));
    }
    match outcome.source_removal {
        SourceRemoval::Kept => {}
        SourceRemoval::Removed => ui.info(format!("Removed {source}")),
        SourceRemoval::Failed(reason) => {
            ui.warn(format!("Could not remove {source}: {reason}"));
        }
    }

    Ok(())
}

/// Compare two profiles' metadata and settings.json
pub fn diff(paths: &Paths, ui: &Ui, left: &str, right: &str) -> Result<()> {
    let config = load_config(paths)?;
    let templates = template_manager(paths);
    let pm = ProfileManager::new(&config, &templates);
    let left_profile = pm.get_profile(left).map_err(hinted)?;
    let right_profile = pm.get_profile(right).map_err(hinted)?;

    ui.section(format!("Comparing '{left}' and '{right}'"));
    ui.newline();

    let mut meta = ui.table();
    meta.set_header(vec![
        ui.header_cell(""),
        ui.header_cell(left),
        ui.header_cell(right),
    ]);
    let (l, r) = (&left_profile.metadata, &right_profile.metadata);
    let none = || "-".to_string();
    meta.add_row(vec![ui.cell("Description"), ui.cell(&l.description), ui.cell(&r.description)]);
    meta.add_row(vec![
        ui.cell("Template"),
        ui.cell(l.template_name.clone().unwrap_or_else(none)),
        ui.cell(r.template_name.clone().unwrap_or_else(none)),
    ]);
    meta.add_row(vec![
        ui.cell("Uses"),
        ui.cell(l.usage_count.to_string()),
        ui.cell(r.usage_count.to_string()),
    ]);
    meta.add_row(vec![
        ui.cell("Claude flags"),
        ui.cell(l.custom_flags.join(" ")),
        ui.cell(r.custom_flags.join(" ")),
    ]);
    ui.println(meta.to_string());
    ui.newline();

    let diffs = diff_settings(
        &load_settings(&left_profile.path)?,
        &load_settings(&right_profile.path)?,
    );
    if diffs.is_empty() {
        ui.ok("settings.json files are identical");
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Key"),
        ui.header_cell(left),
        ui.header_cell(right),
    ]);
    let missing = || ui.colored_cell("(missing)", AnsiColor::BrightBlack);
    for diff in &diffs {
        let row = match diff {
            KeyDiff::OnlyLeft { key, value } => {
                vec![ui.cell(key), ui.colored_cell(format_value(value), AnsiColor::Red), missing()]
            }
            KeyDiff::OnlyRight { key, value } => {
                vec![ui.cell(key), missing(), ui.colored_cell(format_value(value), AnsiColor::Green)]
            }
            KeyDiff::Changed {
                key,
                left: l,
                right: r,
            } => vec![
                ui.cell(key),
                ui.colored_cell(format_value(l), AnsiColor::Yellow),
                ui.colored_cell(format_value(r), AnsiColor::Yellow),
            ],
        };
        table.add_row(row);
    }
    ui.println(table.to_string());
    ui.newline();
    ui.info(format!("{} difference(s) in settings.json", diffs.len()));

    Ok(())
}

pub fn templates(paths: &Paths, ui: &Ui) -> Result<()> {
    let templates = template_manager(paths);

    let mut table = ui.table();
    table.set_header(vec![ui.header_cell("Template"), ui.header_cell("Keys")]);
    for name in templates.list_templates()? {
        let keys = match templates.load_template(&name) {
            Ok(template) => ui.cell(
                template
                    .content
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Err(e) => ui.colored_cell(e.to_string(), AnsiColor::Red),
        };
        table.add_row(vec![ui.cell(name), keys]);
    }

    ui.section("Templates");
    ui.println(table.to_string());
    ui.println(ui.dim(format!(
        "Custom templates: {}/<name>.json",
        templates.custom_dir().display()
    )));
    Ok(())
}

pub fn backup_create(paths: &Paths, ui: &Ui, name: &str) -> Result<()> {
    let config = load_config(paths)?;
    let manager = backup_manager(paths, &config);

    let pb = ui.spinner(format!("Backing up '{name}'..."));
    match manager.backup(name) {
        Ok(path) => {
            ui.spinner_finish_ok(&pb, format!("Backed up '{name}' to {}", path.display()));
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&pb, format!("Backup of '{name}' failed"));
            Err(hinted(e))
        }
    }
}

pub fn backup_list(paths: &Paths, ui: &Ui) -> Result<()> {
    let config = load_config(paths)?;
    let records = backup_manager(paths, &config).list()?;

    if records.is_empty() {
        ui.warn("No backups found.");
        ui.println(format!("Create one with: {} backup create <profile>", ui.bold("cdp")));
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Backup"),
        ui.header_cell("Profile"),
        ui.header_cell("Date"),
        ui.header_cell("Size"),
    ]);
    for record in &records {
        table.add_row(vec![
            ui.cell(&record.name),
            ui.cell(&record.profile_name),
            ui.cell(
                record
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            ui.cell(format_size(record.size_bytes)),
        ]);
    }

    ui.section("Backups");
    ui.println(table.to_string());
    ui.newline();
    ui.info(format!("{} backup(s) found", records.len()));

    Ok(())
}

/// A bare archive name refers to the backup directory; anything else is a path
fn resolve_archive(paths: &Paths, archive: &str) -> PathBuf {
    let path = Path::new(archive);
    if path.components().count() == 1 && !path.exists() {
        paths.backups_dir.join(archive)
    } else {
        paths.expand_home(archive)
    }
}

pub fn backup_restore(paths: &Paths, ui: &Ui, archive: &str, overwrite: bool) -> Result<()> {
    let config = load_config(paths)?;
    let manager = backup_manager(paths, &config);
    let archive_path = resolve_archive(paths, archive);

    let pb = ui.spinner(format!("Restoring {archive}..."));
    match manager.restore(&archive_path, overwrite) {
        Ok(name) => {
            ui.spinner_finish_ok(&pb, format!("Restored profile '{name}'"));
            if overwrite && config.is_active(&name) {
                ui.info(format!("'{name}' is the active profile"));
            }
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&pb, "Restore failed");
            Err(hinted(e))
        }
    }
}

pub fn backup_delete(paths: &Paths, ui: &Ui, archive: &str, force: bool) -> Result<()> {
    let config = load_config(paths)?;
    let manager = backup_manager(paths, &config);

    if !confirm_destructive(
        ui,
        &format!("Delete backup '{archive}'?"),
        None,
        force,
        &format!("delete backup '{archive}'"),
    )? {
        ui.warn("Deletion cancelled.");
        return Ok(());
    }

    manager.delete(archive).map_err(hinted)?;
    ui.ok(format!("Deleted backup '{archive}'"));
    Ok(())
}

/// Remove backups older than `days`
pub fn backup_clean(paths: &Paths, ui: &Ui, days: u32, force: bool) -> Result<()> {
    let config = load_config(paths)?;
    let manager = backup_manager(paths, &config);

    let prompt = if days == 0 {
        "Delete ALL backups?".to_string()
    } else {
        format!("Delete backups older than {days} day(s)?")
    };
    if !confirm_destructive(ui, &prompt, None, force, "clean backups")? {
        ui.warn("Cleanup cancelled.");
        return Ok(());
    }

    let removed = manager.cleanup(days)?;
    if removed > 0 {
        ui.ok(format!("Removed {removed} backup(s)"));
    } else {
        ui.ok(format!("No backups older than {days} day(s)"));
    }
    Ok(())
}

pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if !run_doctor(paths, ui) {
        bail!("Doctor found problems with the cdp setup");
    }
    ui.ok("Everything looks good");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{setup_test_env, setup_test_paths, write_file};
    use crate::ui::ColorMode;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    fn headless_ui() -> Ui {
        Ui {
            color_enabled: false,
            spinner_enabled: false,
            interactive: false,
        }
    }

    #[test]
    fn test_commands_require_init() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        let err = list(&paths, &ui).unwrap_err();
        assert!(err.to_string().contains("cdp init"));

        init(&paths, &ui).unwrap();
        assert!(list(&paths, &ui).is_ok());
        // Second init keeps the existing config
        init(&paths, &ui).unwrap();
    }

    #[test]
    fn test_create_list_info() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();

        create(&paths, &ui, "work", "Work stuff", Some("restrictive")).unwrap();
        assert!(list(&paths, &ui).is_ok());
        assert!(info(&paths, &ui, "work").is_ok());
        assert!(create(&paths, &ui, "work", "", None).is_err());

        let err = create(&paths, &ui, "other", "", Some("nope")).unwrap_err();
        assert!(err.to_string().contains("cdp templates"));
    }

    #[test]
    fn test_use_without_running() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        create(&paths, &ui, "work", "", None).unwrap();

        let code = use_profile(&paths, &ui, "work", true, None, &[]).unwrap();
        assert_eq!(code, 0);
        assert!(load_config(&paths).unwrap().is_active("work"));
        assert!(current(&paths, &ui).is_ok());

        assert!(use_profile(&paths, &ui, "nonexistent", true, None, &[]).is_err());
    }

    #[test]
    fn test_use_with_missing_claude_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        create(&paths, &ui, "work", "", None).unwrap();

        let missing = temp_dir.path().join("no-claude");
        assert!(use_profile(&paths, &ui, "work", false, Some(missing), &[]).is_err());
        assert!(load_config(&paths).unwrap().active_profile_name.is_none());
    }

    #[test]
    fn test_delete_active_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        create(&paths, &ui, "work", "", None).unwrap();
        create(&paths, &ui, "spare", "", None).unwrap();
        use_profile(&paths, &ui, "work", true, None, &[]).unwrap();

        let err = delete(&paths, &ui, "work", true).unwrap_err();
        assert!(err.to_string().contains("active profile"));

        delete(&paths, &ui, "spare", true).unwrap();
        assert!(!load_config(&paths).unwrap().profile_dir("spare").exists());
    }

    #[test]
    fn test_clone_rename_diff() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        create(&paths, &ui, "a", "", Some("permissive")).unwrap();

        clone(&paths, &ui, "a", "b").unwrap();
        rename(&paths, &ui, "b", "c").unwrap();
        assert!(diff(&paths, &ui, "a", "c").is_ok());

        let config = load_config(&paths).unwrap();
        write_file(&config.profile_dir("c").join("settings.json"), r#"{"model":"opus"}"#);
        assert!(diff(&paths, &ui, "a", "c").is_ok());
        assert!(diff(&paths, &ui, "a", "missing").is_err());
    }

    #[test]
    fn test_import_with_yes() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        write_file(&temp_dir.path().join(".claude/.claude.json"), "{}");

        import(&paths, &ui, "~/.claude", "main", "Imported", true, false).unwrap();

        let config = load_config(&paths).unwrap();
        let templates = template_manager(&paths);
        let profile = ProfileManager::new(&config, &templates)
            .get_profile("main")
            .unwrap();
        assert_eq!(profile.metadata.description, "Imported");
        assert!(temp_dir.path().join(".claude").exists());
    }

    #[test]
    fn test_backup_commands() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        create(&paths, &ui, "work", "", None).unwrap();

        backup_create(&paths, &ui, "work").unwrap();
        assert!(backup_list(&paths, &ui).is_ok());

        let config = load_config(&paths).unwrap();
        let records = backup_manager(&paths, &config).list().unwrap();
        assert_eq!(records.len(), 1);

        // Bare archive names resolve inside the backup directory
        let err = backup_restore(&paths, &ui, &records[0].name, false).unwrap_err();
        assert!(err.to_string().contains("--overwrite"));
        backup_restore(&paths, &ui, &records[0].name, true).unwrap();

        backup_delete(&paths, &ui, &records[0].name, true).unwrap();
        assert!(backup_delete(&paths, &ui, &records[0].name, true).is_err());
        backup_clean(&paths, &ui, 0, true).unwrap();
    }

    #[test]
    fn test_import_without_terminal_needs_yes() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = headless_ui();
        write_file(&temp_dir.path().join(".claude/.claude.json"), "{}");

        let err = import(&paths, &ui, "~/.claude", "main", "", false, false).unwrap_err();

        assert!(err.to_string().contains("--yes"));
        let config = load_config(&paths).unwrap();
        assert!(!config.profile_dir("main").exists());
        assert!(temp_dir.path().join(".claude/.claude.json").exists());
    }

    #[test]
    fn test_destructive_commands_without_terminal_need_force() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = headless_ui();
        create(&paths, &ui, "work", "", None).unwrap();
        backup_create(&paths, &ui, "work").unwrap();
        let config = load_config(&paths).unwrap();
        let records = backup_manager(&paths, &config).list().unwrap();

        let err = delete(&paths, &ui, "work", false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(config.profile_dir("work").is_dir());

        let err = backup_delete(&paths, &ui, &records[0].name, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(backup_clean(&paths, &ui, 0, false).is_err());
        assert!(records[0].archive_path.is_file());

        delete(&paths, &ui, "work", true).unwrap();
        assert!(!config.profile_dir("work").exists());
    }

    #[test]
    fn test_hinted_keeps_message() {
        let err = hinted(Error::not_found(Entity::Profile, "x"));
        let msg = err.to_string();
        assert!(msg.starts_with("profile 'x' does not exist"));
        assert!(msg.contains("Hint:"));

        let plain = hinted(Error::Cancelled("import"));
        assert!(plain.downcast_ref::<Error>().map(Error::kind) == Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_templates_and_doctor() {
        let temp_dir = TempDir::new().unwrap();
        let (paths, _, _) = setup_test_env(&temp_dir);
        let ui = test_ui();
        assert!(templates(&paths, &ui).is_ok());
        assert!(doctor(&paths, &ui).is_ok());
    }
}
