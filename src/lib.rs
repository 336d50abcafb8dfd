pub mod backup;
pub mod commands;
pub mod config;
pub mod diff;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod launcher;
pub mod metadata;
pub mod paths;
pub mod profiles;
pub mod switch;
pub mod templates;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
