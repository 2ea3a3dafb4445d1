//! Single-writer guard for a provisioning run.

use crate::error::{ProvisionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::debug;
use std::fs::File;

/// Name of the lock file inside the scratch root.
pub const LOCK_FILE_NAME: &str = "envforge.lock";

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct ProvisionLock {
    file: File,
    path: Utf8PathBuf,
}

impl ProvisionLock {
    /// Take the lock at `dir/envforge.lock` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::AlreadyRunning`] if another process holds
    /// the lock and [`ProvisionError::Io`] if the file cannot be opened.
    pub fn acquire(dir: &Utf8Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(ProvisionError::AlreadyRunning { path });
        }
        debug!("acquired {path}");
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for ProvisionLock {
    fn drop(&mut self) {
        if FileExt::unlock(&self.file).is_err() {
            debug!("failed to release {}", self.path);
        }
    }
}
