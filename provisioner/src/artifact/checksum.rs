//! Comparison of a recomputed archive digest with its published sidecar.
//!
//! The comparison is exact string equality. The only normalisation is the
//! removal of trailing `\n` and `\r` characters, which is what reading the
//! sidecar through shell command substitution has always done. Leading
//! whitespace, inner whitespace, case differences, a `sha256sum`-style file
//! name column, and prefix matches are all mismatches.

use super::sha256_digest::Sha256Digest;
use crate::error::{ProvisionError, Result};
use log::debug;

/// The published content of a checksum sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarChecksum(String);

impl SidecarChecksum {
    /// Wrap a downloaded sidecar body, dropping trailing line terminators.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_provisioner::artifact::checksum::SidecarChecksum;
    ///
    /// let sidecar = SidecarChecksum::from_body("abc\r\n");
    /// assert_eq!(sidecar.as_str(), "abc");
    /// ```
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let value = body.trim_end_matches(['\n', '\r']);
        if Sha256Digest::try_from(value).is_err() {
            debug!("checksum sidecar is not a bare lowercase SHA-256 digest: {value:?}");
        }
        Self(value.to_owned())
    }

    /// Return the published value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Require the recomputed `actual` digest to equal the sidecar exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ChecksumMismatch`] naming `artifact` when
    /// the values differ in any way.
    pub fn verify(&self, artifact: &str, actual: &Sha256Digest) -> Result<()> {
        if self.0 == actual.as_str() {
            return Ok(());
        }
        Err(ProvisionError::ChecksumMismatch {
            artifact: artifact.to_owned(),
            expected: self.0.clone(),
            actual: actual.to_string(),
        })
    }
}
