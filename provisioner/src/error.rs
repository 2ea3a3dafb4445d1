//! Error types for the envforge provisioner.
//!
//! Every variant is fatal to the provisioning run. The variants named after
//! pipeline steps (`DescriptorRewrite`, `PackageInstall`, `ChecksumMismatch`,
//! `ArtifactDownload`) carry the failing step's diagnostic output so the
//! build log shows it verbatim.

use crate::artifact::download::DownloadError;
use crate::artifact::extraction::ExtractionError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while provisioning the build environment.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A repository descriptor could not be read, parsed, or written back,
    /// or still violates the descriptor invariants after rewriting.
    #[error("repository descriptor {path}: {reason}")]
    DescriptorRewrite {
        /// Path of the offending descriptor file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The package manager failed to resolve or install the package set.
    #[error("package installation failed for [{packages}]: {message}")]
    PackageInstall {
        /// Space-separated package names of the failed transaction.
        packages: String,
        /// Package manager diagnostic output.
        message: String,
    },

    /// The recomputed archive digest differs from the checksum sidecar.
    #[error("checksum mismatch for {artifact}: sidecar has {expected:?}, archive digest is {actual}")]
    ChecksumMismatch {
        /// Archive file name.
        artifact: String,
        /// Sidecar content as published.
        expected: String,
        /// Locally recomputed digest.
        actual: String,
    },

    /// The archive or its checksum sidecar could not be downloaded.
    #[error("artifact download failed: {0}")]
    ArtifactDownload(#[from] DownloadError),

    /// The host processor identifier could not be queried.
    #[error("architecture detection failed: {reason}")]
    ArchitectureDetection {
        /// Description of why detection failed.
        reason: String,
    },

    /// The host processor identifier is not a supported architecture.
    #[error("unsupported architecture \"{value}\"; expected one of: x86_64, aarch64")]
    UnsupportedArchitecture {
        /// The rejected identifier.
        value: String,
    },

    /// A release URL template could not be resolved.
    #[error("invalid artifact URL template {template:?}: {reason}")]
    InvalidUrlTemplate {
        /// The offending template.
        template: String,
        /// Description of the failure.
        reason: String,
    },

    /// The verified archive could not be extracted.
    #[error("artifact extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The verified archive does not contain exactly one expected binary.
    #[error("expected exactly one `{binary}` in {archive}, found {found}")]
    BinaryNotFound {
        /// Expected binary file name.
        binary: String,
        /// Archive file name.
        archive: String,
        /// Number of matching entries.
        found: usize,
    },

    /// The verified binary could not be copied into the install directory.
    #[error("failed to install {path}: {reason}")]
    InstallFailed {
        /// Destination path.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The entry point executable is not on the configured search path.
    #[error("entry point `{program}` not found on search path {search_path}")]
    EntrypointNotFound {
        /// Entry point program name.
        program: String,
        /// The search path that was consulted.
        search_path: String,
    },

    /// Another provisioning run holds the environment lock.
    #[error("another provisioning run holds {path}")]
    AlreadyRunning {
        /// Path of the lock file.
        path: Utf8PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ProvisionError`].
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_install_lists_packages_and_message() {
        let err = ProvisionError::PackageInstall {
            packages: "git devtoolset-10-gcc".to_owned(),
            message: "No package devtoolset-10-gcc available.".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("devtoolset-10-gcc"));
        assert!(msg.contains("No package"));
    }

    #[test]
    fn checksum_mismatch_shows_both_digests() {
        let err = ProvisionError::ChecksumMismatch {
            artifact: "sccache.tar.gz".to_owned(),
            expected: "a".repeat(64),
            actual: "b".repeat(64),
        };
        let msg = err.to_string();
        assert!(msg.contains(&"a".repeat(64)));
        assert!(msg.contains(&"b".repeat(64)));
    }

    #[test]
    fn download_error_converts_into_provision_error() {
        let err: ProvisionError = DownloadError::NotFound {
            url: "https://example.test/archive".to_owned(),
        }
        .into();
        assert!(matches!(err, ProvisionError::ArtifactDownload(_)));
        assert!(err.to_string().contains("https://example.test/archive"));
    }

    #[test]
    fn descriptor_rewrite_names_the_file() {
        let err = ProvisionError::DescriptorRewrite {
            path: Utf8PathBuf::from("/etc/yum.repos.d/CentOS-Base.repo"),
            reason: "entry outside of any section".to_owned(),
        };
        assert!(err.to_string().contains("CentOS-Base.repo"));
    }
}
