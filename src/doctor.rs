//! Diagnostic tool for cdp.
//!
//! This module implements the `cdp doctor` command, which checks the setup
//! for common issues:
//! - Readable global config.
//! - Existence of the storage root and backup directory.
//! - The active profile and every other profile having their required files.
//! - Templates that fail to parse.
//! - A reachable `claude` executable.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::fs;

use crate::config::Config;
use crate::launcher::find_executable;
use crate::paths::Paths;
use crate::profiles::ProfileManager;
use crate::templates::TemplateManager;
use crate::ui::Ui;

/// Run the doctor diagnostics. Returns whether every check passed.
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("cdp Doctor");
    ui.newline();

    let mut healthy = true;

    let config = match Config::load(&paths.config_file) {
        Ok(config) => Some(config),
        Err(e) => {
            ui.println(ui.bold("Checking Config..."));
            ui.println(format!("  {} {e}", ui.icon_err()));
            ui.newline();
            healthy = false;
            None
        }
    };
    let templates = TemplateManager::new(paths.templates_dir.clone());

    if let Some(config) = &config {
        healthy &= check_step(ui, "Config", || {
            ui.println(format!(
                "  {} Config readable: {}",
                ui.icon_ok(),
                paths.config_file.display()
            ));
            ui.println(format!("  {} Schema version {}", ui.icon_info(), config.schema_version));
            true
        });

        healthy &= check_step(ui, "Directories", || {
            let mut ok = true;
            if config.storage_root.is_dir() {
                ui.println(format!(
                    "  {} Storage root exists: {}",
                    ui.icon_ok(),
                    config.storage_root.display()
                ));
            } else {
                ui.println(format!(
                    "  {} Storage root missing: {}",
                    ui.icon_err(),
                    config.storage_root.display()
                ));
                ok = false;
            }

            if paths.backups_dir.is_dir() {
                ui.println(format!(
                    "  {} Backup directory exists: {}",
                    ui.icon_ok(),
                    paths.backups_dir.display()
                ));
            } else {
                // Created by the first backup
                ui.println(format!(
                    "  {} No backup directory yet: {}",
                    ui.icon_info(),
                    paths.backups_dir.display()
                ));
            }
            ok
        });

        healthy &= check_step(ui, "Active Profile", || {
            let Some(name) = &config.active_profile_name else {
                ui.println(format!("  {} No active profile set", ui.icon_info()));
                return true;
            };

            let pm = ProfileManager::new(config, &templates);
            match pm
                .get_profile(name)
                .and_then(|profile| pm.validate_profile(&profile))
            {
                Ok(()) => {
                    ui.println(format!("  {} Active profile '{name}' is valid", ui.icon_ok()));
                    true
                }
                Err(e) => {
                    ui.println(format!("  {} {e}", ui.icon_err()));
                    false
                }
            }
        });

        healthy &= check_step(ui, "Profiles", || check_profiles(config, &templates, ui));
    }

    healthy &= check_step(ui, "Templates", || {
        let names = match templates.list_templates() {
            Ok(names) => names,
            Err(e) => {
                ui.println(format!("  {} Failed to list templates: {e}", ui.icon_err()));
                return false;
            }
        };

        let mut ok = true;
        for name in names {
            match templates.load_template(&name) {
                Ok(_) => ui.println(format!("    {} {name}", ui.icon_ok())),
                Err(e) => {
                    ui.println(format!("    {} {name} ({e})", ui.icon_err()));
                    ok = false;
                }
            }
        }
        ok
    });

    // Not fatal: profiles can be managed without claude installed
    check_step(ui, "Claude Executable", || {
        match find_executable(std::env::var_os("PATH").as_deref(), &paths.home) {
            Some(path) => ui.println(format!("  {} Found: {}", ui.icon_ok(), path.display())),
            None => ui.println(format!(
                "  {} claude not found in PATH or common locations",
                ui.icon_warn()
            )),
        }
        true
    });

    healthy
}

/// Every directory under the storage root, not just the ones `list` shows
fn check_profiles(config: &Config, templates: &TemplateManager, ui: &Ui) -> bool {
    let entries = match fs::read_dir(&config.storage_root) {
        Ok(entries) => entries,
        Err(e) => {
            ui.println(format!("  {} Failed to read storage root: {e}", ui.icon_err()));
            return false;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    if names.is_empty() {
        ui.println(format!("  {} No profiles found", ui.icon_warn()));
        return true;
    }

    ui.println(format!("  Found {} profile directories:", names.len()));
    let pm = ProfileManager::new(config, templates);
    let mut all_valid = true;

    for name in names {
        match pm
            .get_profile(&name)
            .and_then(|profile| pm.validate_profile(&profile))
        {
            Ok(()) => ui.println(format!("    {} {name}", ui.icon_ok())),
            Err(e) => {
                ui.println(format!("    {} {name} ({e})", ui.icon_err()));
                all_valid = false;
            }
        }
    }
    all_valid
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {name}...")));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}
