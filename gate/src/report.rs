//! Per-unit gate verdicts.

use crate::error::{GateError, Result};
use crate::limit::{MAX_PACKAGE_BYTES, enforce, within_limit};
use crate::package::PackagedUnit;
use serde::Serialize;

/// The outcome of gating one packaged unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateVerdict {
    /// The packaged unit.
    #[serde(flatten)]
    pub unit: PackagedUnit,
    /// The ceiling it was compared with.
    pub limit: u64,
    /// Whether the unit is within the ceiling.
    pub passed: bool,
}

impl GateVerdict {
    /// Compare `unit` with the ceiling.
    #[must_use]
    pub fn evaluate(unit: PackagedUnit) -> Self {
        let passed = within_limit(unit.size);
        Self {
            unit,
            limit: MAX_PACKAGE_BYTES,
            passed,
        }
    }

    /// Turn a failing verdict into its error.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::SizeLimitExceeded`] if the unit did not
    /// pass.
    pub fn check(&self) -> Result<()> {
        enforce(&self.unit.name, self.unit.size)
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let status = if self.passed { "ok" } else { "too large" };
        format!(
            "{}: {} of {} bytes ({status})",
            self.unit.name, self.unit.size, self.limit
        )
    }
}

/// Render verdicts as a JSON array.
///
/// # Errors
///
/// Returns the serialiser's error.
pub fn render_json(verdicts: &[GateVerdict]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(verdicts)
}

/// The first failing verdict's error, if any unit failed.
///
/// # Errors
///
/// Returns [`GateError::SizeLimitExceeded`] for the first failing unit.
pub fn first_failure(verdicts: &[GateVerdict]) -> Result<()> {
    verdicts.iter().try_for_each(GateVerdict::check)
}
