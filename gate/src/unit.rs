//! Library units and the workspace they belong to.
//!
//! Units are looked up in `cargo metadata --no-deps`, so only workspace
//! members can be gated and no registry is contacted.

use crate::error::{GateError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cargo_metadata::{Metadata, MetadataCommand};
use serde::Serialize;

/// A packageable workspace member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryUnit {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

impl LibraryUnit {
    /// File name `cargo package` gives the unit's archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_gate::unit::LibraryUnit;
    ///
    /// let unit = LibraryUnit { name: "mountpoint-s3-crt".into(), version: "0.9.0".into() };
    /// assert_eq!(unit.archive_file_name(), "mountpoint-s3-crt-0.9.0.crate");
    /// ```
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.crate", self.name, self.version)
    }
}

/// The workspace a gate run packages from.
#[derive(Debug, Clone)]
pub struct Workspace {
    members: Vec<LibraryUnit>,
    target_directory: Utf8PathBuf,
    manifest_path: Option<Utf8PathBuf>,
}

impl Workspace {
    /// Describe a workspace directly.
    #[must_use]
    pub fn new(
        members: Vec<LibraryUnit>,
        target_directory: Utf8PathBuf,
        manifest_path: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            members,
            target_directory,
            manifest_path,
        }
    }

    /// Read the workspace with `cargo metadata --no-deps`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Metadata`] if cargo cannot describe the
    /// workspace.
    pub fn load(manifest_path: Option<&Utf8Path>) -> Result<Self> {
        let mut command = MetadataCommand::new();
        command.no_deps();
        if let Some(path) = manifest_path {
            command.manifest_path(path);
        }
        let metadata = command.exec().map_err(|error| GateError::Metadata {
            message: error.to_string(),
        })?;
        Ok(Self::from_metadata(&metadata, manifest_path))
    }

    /// Collect workspace members from parsed metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata, manifest_path: Option<&Utf8Path>) -> Self {
        let members = metadata
            .workspace_packages()
            .into_iter()
            .map(|package| LibraryUnit {
                name: package.name.to_string(),
                version: package.version.to_string(),
            })
            .collect();
        Self::new(
            members,
            metadata.target_directory.clone(),
            manifest_path.map(Utf8Path::to_owned),
        )
    }

    /// Find the member called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::UnitNotFound`] if no member has that name.
    pub fn unit(&self, name: &str) -> Result<&LibraryUnit> {
        self.members
            .iter()
            .find(|member| member.name == name)
            .ok_or_else(|| GateError::UnitNotFound {
                unit: name.to_owned(),
            })
    }

    /// Workspace members in metadata order.
    #[must_use]
    pub fn members(&self) -> &[LibraryUnit] {
        &self.members
    }

    /// Cargo's target directory.
    #[must_use]
    pub fn target_directory(&self) -> &Utf8Path {
        &self.target_directory
    }

    /// Explicit manifest path, if one was given.
    #[must_use]
    pub fn manifest_path(&self) -> Option<&Utf8Path> {
        self.manifest_path.as_deref()
    }
}
