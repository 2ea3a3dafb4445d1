//! Local packaging and measurement of a library unit.
//!
//! `cargo package --no-verify` builds the `.crate` archive from the local
//! sources without compiling it against the registry's published
//! dependency versions, so unreleased sibling versions in the workspace do
//! not break the gate.

use crate::error::{GateError, Result};
use crate::unit::{LibraryUnit, Workspace};
use camino::{Utf8Path, Utf8PathBuf};
use envforge_common::{CommandExecutor, command_line, failure_message};
use log::{debug, info};
use serde::Serialize;

/// A unit's archive and its measured size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedUnit {
    /// Unit name.
    pub name: String,
    /// Unit version, when known.
    pub version: Option<String>,
    /// Path of the compressed archive.
    pub archive: Utf8PathBuf,
    /// Archive size in bytes.
    pub size: u64,
}

impl PackagedUnit {
    /// Measure an archive that was packaged elsewhere.
    ///
    /// The unit is named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::PackagedArchiveMissing`] if `archive` is not a
    /// file.
    pub fn from_archive(archive: &Utf8Path) -> Result<Self> {
        Ok(Self {
            name: archive.file_stem().unwrap_or(archive.as_str()).to_owned(),
            version: None,
            archive: archive.to_owned(),
            size: measure(archive)?,
        })
    }
}

/// Runs `cargo package` for workspace units.
pub struct Packager<'a> {
    executor: &'a dyn CommandExecutor,
    workspace: &'a Workspace,
}

impl<'a> Packager<'a> {
    /// Create a packager for `workspace`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, workspace: &'a Workspace) -> Self {
        Self {
            executor,
            workspace,
        }
    }

    /// Arguments passed to `cargo` to package `unit`.
    #[must_use]
    pub fn package_args(&self, unit: &LibraryUnit) -> Vec<String> {
        let mut args = vec![
            "package".to_owned(),
            "--no-verify".to_owned(),
            "--allow-dirty".to_owned(),
            "--package".to_owned(),
            unit.name.clone(),
        ];
        if let Some(manifest) = self.workspace.manifest_path() {
            args.push("--manifest-path".to_owned());
            args.push(manifest.to_string());
        }
        args
    }

    /// Where cargo writes `unit`'s archive.
    #[must_use]
    pub fn archive_path(&self, unit: &LibraryUnit) -> Utf8PathBuf {
        self.workspace
            .target_directory()
            .join("package")
            .join(unit.archive_file_name())
    }

    /// Package the unit called `name` and measure the archive.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::UnitNotFound`] for an unknown unit,
    /// [`GateError::PackageFailed`] if cargo fails, and
    /// [`GateError::PackagedArchiveMissing`] if no archive was produced.
    pub fn package(&self, name: &str) -> Result<PackagedUnit> {
        let unit = self.workspace.unit(name)?;
        let args = self.package_args(unit);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        info!("packaging {} {}", unit.name, unit.version);

        let failed = |message: String| GateError::PackageFailed {
            unit: unit.name.clone(),
            message,
        };
        let output = self.executor.run("cargo", &arg_refs).map_err(|error| {
            failed(format!(
                "failed to run `{}`: {error}",
                command_line("cargo", &arg_refs)
            ))
        })?;
        if !output.status.success() {
            return Err(failed(failure_message(&output)));
        }

        let archive = self.archive_path(unit);
        let size = measure(&archive)?;
        debug!("{archive}: {size} bytes");
        Ok(PackagedUnit {
            name: unit.name.clone(),
            version: Some(unit.version.clone()),
            archive,
            size,
        })
    }
}

/// Size of the file at `archive` in bytes.
///
/// # Errors
///
/// Returns [`GateError::PackagedArchiveMissing`] if `archive` is not a
/// regular file.
pub fn measure(archive: &Utf8Path) -> Result<u64> {
    match std::fs::metadata(archive) {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(GateError::PackagedArchiveMissing {
            path: archive.to_owned(),
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(GateError::PackagedArchiveMissing {
                path: archive.to_owned(),
            })
        }
        Err(error) => Err(GateError::Io(error)),
    }
}
