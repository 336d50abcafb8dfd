//! Running `claude` against a profile.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::error::{Entity, Error, IoContext, Result};
use crate::profiles::Profile;

pub const CLAUDE_EXECUTABLE: &str = "claude";
/// Tells Claude Code where to read and write its configuration
pub const CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";
pub const PROFILE_ENV: &str = "CLAUDE_PROFILE";

/// Install locations checked when `claude` is not on `PATH`
fn common_locations(home: &Path) -> [PathBuf; 5] {
    [
        PathBuf::from("/usr/local/bin/claude"),
        PathBuf::from("/usr/bin/claude"),
        PathBuf::from("/opt/homebrew/bin/claude"),
        home.join(".local/bin/claude"),
        home.join("bin/claude"),
    ]
}

/// Search `path_var` and then the common install locations
pub fn find_executable(path_var: Option<&OsStr>, home: &Path) -> Option<PathBuf> {
    path_var
        .into_iter()
        .flat_map(std::env::split_paths)
        .map(|dir| dir.join(CLAUDE_EXECUTABLE))
        .chain(common_locations(home))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, Clone)]
pub struct Launcher {
    executable: PathBuf,
}

impl Launcher {
    /// Use `executable` when given, otherwise search `PATH` and common locations
    pub fn locate(executable: Option<PathBuf>, home: &Path) -> Result<Self> {
        let executable = match executable {
            Some(path) if path.is_file() => path,
            Some(path) => {
                return Err(Error::not_found(
                    Entity::Executable,
                    path.display().to_string(),
                ));
            }
            None => find_executable(std::env::var_os("PATH").as_deref(), home)
                .ok_or_else(|| Error::not_found(Entity::Executable, CLAUDE_EXECUTABLE))?,
        };
        log::debug!("using {}", executable.display());

        Ok(Self { executable })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command for `profile`: its custom flags, then `args`, with stdio inherited
    pub fn command(&self, profile: &Profile, args: &[String]) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(&profile.metadata.custom_flags)
            .args(args)
            .env(CONFIG_DIR_ENV, &profile.path)
            .env(PROFILE_ENV, &profile.name);
        command
    }

    /// Run `claude` to completion and hand back its exit status
    pub fn run(&self, profile: &Profile, args: &[String]) -> Result<ExitStatus> {
        log::debug!(
            "running {} for profile '{}'",
            self.executable.display(),
            profile.name
        );
        self.command(profile, args)
            .status()
            .io_context(|| format!("Failed to execute {}", self.executable.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::metadata::ProfileMetadata;
    use crate::test_utils::write_file;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn profile(dir: &Path) -> Profile {
        let mut metadata = ProfileMetadata::new("", None);
        metadata.custom_flags = vec!["--verbose".to_string()];
        Profile {
            name: "work".to_string(),
            path: dir.join("work"),
            metadata,
        }
    }

    #[test]
    fn test_find_executable_on_path() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin2");
        write_file(&bin.join(CLAUDE_EXECUTABLE), "");
        let path_var = std::env::join_paths([temp.path().join("empty"), bin.clone()]).unwrap();

        let found = find_executable(Some(path_var.as_os_str()), temp.path()).unwrap();
        assert_eq!(found, bin.join(CLAUDE_EXECUTABLE));
    }

    #[test]
    fn test_find_executable_in_home_fallback() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join(".local/bin/claude");
        write_file(&local, "");

        let empty = OsString::new();
        let found = find_executable(Some(empty.as_os_str()), temp.path());
        // A system-wide install would win over the home fallback
        assert!(found.is_some());
    }

    #[test]
    fn test_locate_with_missing_override() {
        let temp = TempDir::new().unwrap();
        let err = Launcher::locate(Some(temp.path().join("nope")), temp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_command_environment_and_args() {
        let temp = TempDir::new().unwrap();
        let exe = temp.path().join("claude");
        write_file(&exe, "");
        let launcher = Launcher::locate(Some(exe.clone()), temp.path()).unwrap();
        let profile = profile(temp.path());

        let command = launcher.command(&profile, &["--resume".to_string()]);

        assert_eq!(command.get_program(), exe.as_os_str());
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args, vec![OsStr::new("--verbose"), OsStr::new("--resume")]);

        let envs: Vec<(&OsStr, Option<&OsStr>)> = command.get_envs().collect();
        assert!(envs.contains(&(
            OsStr::new(CONFIG_DIR_ENV),
            Some(profile.path.as_os_str())
        )));
        assert!(envs.contains(&(OsStr::new(PROFILE_ENV), Some(OsStr::new("work")))));
    }
}
