//! Test utilities shared across test modules

use std::fs;

use crate::config::Config;
use crate::paths::Paths;
use crate::templates::TemplateManager;
use tempfile::TempDir;

/// Create a Paths struct rooted at a temporary home directory
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_home(temp_dir.path())
}

/// Initialized config plus a template manager, both inside `temp_dir`
pub fn setup_test_env(temp_dir: &TempDir) -> (Paths, Config, TemplateManager) {
    let paths = setup_test_paths(temp_dir);
    let (config, _) = Config::init(&paths).unwrap();
    let templates = TemplateManager::new(paths.templates_dir.clone());
    (paths, config, templates)
}

/// Write a file, creating parent directories as needed
pub fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
