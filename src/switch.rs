//! Profile switching logic.
//!
//! Switching makes a profile the active one: it is validated, recorded in the
//! global config, and its usage statistics are bumped. Launching `claude`
//! against it is left to [`crate::launcher`].

use crate::config::Config;
use crate::error::Result;
use crate::paths::Paths;
use crate::profiles::{Profile, ProfileManager};
use crate::templates::TemplateManager;

/// Switch to a specific profile
///
/// The config is saved before usage is recorded. A failure to record usage
/// only produces a warning; the switch itself has already happened.
pub fn switch_to_profile(
    paths: &Paths,
    config: &mut Config,
    templates: &TemplateManager,
    name: &str,
) -> Result<Profile> {
    let profile = {
        let pm = ProfileManager::new(config, templates);
        let profile = pm.get_profile(name)?;
        pm.validate_profile(&profile)?;
        profile
    };

    let previous = config.active_profile_name.replace(name.to_string());
    if let Err(e) = config.write(&paths.config_file) {
        config.active_profile_name = previous;
        return Err(e);
    }
    log::debug!("active profile is now '{name}'");

    let pm = ProfileManager::new(config, templates);
    match pm.update_last_used(name) {
        Ok(metadata) => Ok(Profile {
            metadata,
            ..profile
        }),
        Err(e) => {
            log::warn!("failed to record usage for '{name}': {e}");
            Ok(profile)
        }
    }
}
