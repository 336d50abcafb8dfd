//! Filesystem utility functions
//!
//! Common helpers shared by the profile and backup managers, including the
//! [`Partial`] guard that removes a half-built directory or archive when the
//! operation creating it fails.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoContext, Result};

/// Recursively calculate the total size of a directory in bytes
///
/// Symbolic links are not followed.
pub fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

/// Copy the regular files directly inside `src` into `dst`.
///
/// Subdirectories are never descended into, and any file name for which
/// `skip` returns true is left behind. Returns the copied file names in
/// directory order.
pub fn copy_top_level_files<F>(src: &Path, dst: &Path, skip: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let mut copied = Vec::new();
    let entries = fs::read_dir(src)
        .io_context(|| format!("Failed to read directory: {}", src.display()))?;

    for entry in entries {
        let entry = entry.io_context(|| format!("Failed to read entry in {}", src.display()))?;
        let src_path = entry.path();
        if !src_path.is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if skip(&file_name) {
            continue;
        }

        let dst_path = dst.join(&file_name);
        fs::copy(&src_path, &dst_path).io_context(|| {
            format!(
                "Failed to copy file: {} -> {}",
                src_path.display(),
                dst_path.display()
            )
        })?;
        copied.push(file_name);
    }

    Ok(copied)
}

#[derive(Debug, Clone, Copy)]
enum ArtifactKind {
    Dir,
    File,
}

/// A directory or file that only survives if the work filling it succeeds.
///
/// [`Partial::build`] runs the work and either keeps the artifact or removes
/// it. A removal failure is chained into the returned [`Error::Cleanup`]. If
/// the guard is dropped while still armed (a panic mid-build), removal is
/// attempted on a best-effort basis.
#[derive(Debug)]
pub struct Partial {
    path: PathBuf,
    kind: ArtifactKind,
    armed: bool,
}

impl Partial {
    /// Create `path` as a new directory. Fails with `AlreadyExists` if it
    /// is already there, so a racing creator is never clobbered.
    pub fn create_dir(path: &Path, entity: crate::error::Entity) -> Result<Self> {
        match fs::create_dir(path) {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                kind: ArtifactKind::Dir,
                armed: true,
            }),
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => Err(Error::already_exists(
                entity,
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
            Err(e) => Err(Error::Io {
                context: format!("Failed to create directory: {}", path.display()),
                source: e,
            }),
        }
    }

    /// Take responsibility for a file the caller has just created
    pub fn adopt_file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: ArtifactKind::File,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `work` against the artifact, keeping it only on success.
    pub fn build<T, F>(mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let outcome = work(&self.path);
        self.armed = false;

        match outcome {
            Ok(value) => Ok(value),
            Err(cause) => {
                log::debug!("removing partial {}", self.path.display());
                match self.remove() {
                    Ok(()) => Err(cause),
                    Err(source) => Err(Error::Cleanup {
                        path: self.path.clone(),
                        cause: Box::new(cause),
                        source,
                    }),
                }
            }
        }
    }

    fn remove(&self) -> std::io::Result<()> {
        let result = match self.kind {
            ArtifactKind::Dir => fs::remove_dir_all(&self.path),
            ArtifactKind::File => fs::remove_file(&self.path),
        };
        match result {
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for Partial {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.remove();
        }
    }
}
