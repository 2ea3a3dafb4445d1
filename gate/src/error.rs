//! Error types for the size gate.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can fail a gate run.
#[derive(Debug, Error)]
pub enum GateError {
    /// The packaged archive is larger than the ceiling.
    #[error("{unit} packages to {size} bytes, over the {limit} byte limit")]
    SizeLimitExceeded {
        /// The gated unit.
        unit: String,
        /// Measured compressed size in bytes.
        size: u64,
        /// The ceiling in bytes.
        limit: u64,
    },

    /// `cargo package` could not be run or exited unsuccessfully.
    #[error("packaging {unit} failed: {message}")]
    PackageFailed {
        /// The unit being packaged.
        unit: String,
        /// Cargo's diagnostic output.
        message: String,
    },

    /// No workspace member has the requested name.
    #[error("library unit {unit} is not a member of this workspace")]
    UnitNotFound {
        /// The requested unit name.
        unit: String,
    },

    /// Workspace metadata could not be read.
    #[error("failed to read workspace metadata: {message}")]
    Metadata {
        /// Description of the failure.
        message: String,
    },

    /// Packaging reported success but left no archive behind.
    #[error("packaged archive not found at {path}")]
    PackagedArchiveMissing {
        /// Where the archive was expected.
        path: Utf8PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
