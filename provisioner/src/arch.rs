//! Host architecture resolution.
//!
//! The architecture is queried once per provisioning run and then passed by
//! value to every step that needs an architecture-specific repository path or
//! download URL.

use crate::error::{ProvisionError, Result};
use envforge_common::{CommandExecutor, failure_message};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// CPU architectures the environment can be provisioned for.
///
/// `X86_64` is the primary architecture: its repositories live under the
/// primary path segment. Every other architecture is served from an
/// alternate segment.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::arch::{Architecture, RepositorySegment};
///
/// let arch: Architecture = "aarch64".parse().expect("supported");
/// assert_eq!(arch.repository_segment(), RepositorySegment::Alternate);
/// assert_eq!(arch.as_str(), "aarch64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Architecture {
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
    /// 64-bit ARM.
    #[serde(rename = "aarch64")]
    Aarch64,
}

/// Which repository path segment an architecture routes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositorySegment {
    /// The segment used by the primary architecture.
    Primary,
    /// The architecture-specific alternate segment.
    Alternate,
}

impl Architecture {
    /// Every supported architecture.
    pub const ALL: [Self; 2] = [Self::X86_64, Self::Aarch64];

    /// Return the canonical processor identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// Select the repository path segment for this architecture.
    #[must_use]
    pub const fn repository_segment(self) -> RepositorySegment {
        match self {
            Self::X86_64 => RepositorySegment::Primary,
            Self::Aarch64 => RepositorySegment::Alternate,
        }
    }

    /// Query the host processor identifier via `uname -m`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ArchitectureDetection`] if `uname` cannot be
    /// run, and [`ProvisionError::UnsupportedArchitecture`] if it reports an
    /// identifier outside [`Architecture::ALL`].
    pub fn detect(executor: &dyn CommandExecutor) -> Result<Self> {
        let output =
            executor
                .run("uname", &["-m"])
                .map_err(|error| ProvisionError::ArchitectureDetection {
                    reason: format!("failed to run `uname -m`: {error}"),
                })?;
        if !output.status.success() {
            return Err(ProvisionError::ArchitectureDetection {
                reason: failure_message(&output),
            });
        }
        String::from_utf8_lossy(&output.stdout).trim().parse()
    }
}

impl FromStr for Architecture {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            other => Err(ProvisionError::UnsupportedArchitecture {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
