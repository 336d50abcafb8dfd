//! Typed errors for the profile and backup core.
//!
//! Every fallible core operation returns [`Result`]. Callers that only need
//! the broad category (to pick an exit message or match in tests) use
//! [`Error::kind`]; the CLI layer wraps these in `anyhow` for display.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What kind of thing an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Profile,
    Template,
    Backup,
    SourceDirectory,
    Executable,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Profile => "profile",
            Entity::Template => "template",
            Entity::Backup => "backup",
            Entity::SourceDirectory => "source directory",
            Entity::Executable => "executable",
        })
    }
}

/// Broad failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyExists,
    ProtectedState,
    Corruption,
    Io,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot import '{}' into the profile that contains it", .0.display())]
    SourceInsideDestination(PathBuf),

    #[error("{entity} '{name}' does not exist")]
    NotFound { entity: Entity, name: String },

    #[error("cdp is not initialized ({} missing), run 'cdp init' first", .0.display())]
    NotInitialized(PathBuf),

    #[error("{entity} '{name}' already exists")]
    AlreadyExists { entity: Entity, name: String },

    #[error("profile '{0}' already exists, restore with overwrite to replace it")]
    ExistsNoOverwrite(String),

    #[error("cannot {action} the active profile '{name}', switch to another profile first")]
    ActiveProfile { name: String, action: &'static str },

    #[error("profile '{name}' is corrupted: {reason}")]
    Corrupted { name: String, reason: String },

    #[error("invalid backup name '{0}', expected <profile>-<date>-<time>.tar.gz")]
    InvalidArchiveName(String),

    #[error("malformed JSON in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} cancelled")]
    Cancelled(&'static str),

    #[error("{cause} (cleanup of {} also failed: {source})", .path.display())]
    Cleanup {
        path: PathBuf,
        cause: Box<Error>,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn not_found(entity: Entity, name: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            name: name.into(),
        }
    }

    pub fn already_exists(entity: Entity, name: impl Into<String>) -> Self {
        Error::AlreadyExists {
            entity,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. }
            | Error::NotADirectory(_)
            | Error::SourceInsideDestination(_)
            | Error::InvalidArchiveName(_) => ErrorKind::Validation,
            Error::NotFound { .. } | Error::NotInitialized(_) => ErrorKind::NotFound,
            Error::AlreadyExists { .. } | Error::ExistsNoOverwrite(_) => ErrorKind::AlreadyExists,
            Error::ActiveProfile { .. } => ErrorKind::ProtectedState,
            Error::Corrupted { .. } | Error::Malformed { .. } => ErrorKind::Corruption,
            Error::Io { .. } => ErrorKind::Io,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            // The original failure decides the category, not the cleanup.
            Error::Cleanup { cause, .. } => cause.kind(),
        }
    }
}

/// `with_context` for plain `io::Result`s, producing [`Error::Io`].
pub trait IoContext<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|source| Error::Io {
            context: f().into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_error_keeps_original_kind() {
        let err = Error::Cleanup {
            path: PathBuf::from("/tmp/x"),
            cause: Box::new(Error::Cancelled("import")),
            source: io::Error::other("busy"),
        };
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        let msg = err.to_string();
        assert!(msg.contains("import cancelled"));
        assert!(msg.contains("busy"));
    }

    #[test]
    fn test_io_context() {
        let res: io::Result<()> = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        let err = res.io_context(|| "Failed to write thing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().starts_with("Failed to write thing: "));
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found(Entity::Template, "fancy");
        assert_eq!(err.to_string(), "template 'fancy' does not exist");
    }
}
