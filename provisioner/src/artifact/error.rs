//! Error types for artifact value validation.

use thiserror::Error;

/// Errors arising from artifact value construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    /// The value is not a lowercase 64-character hex SHA-256 digest.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtifactError`].
pub type Result<T> = std::result::Result<T, ArtifactError>;
