//! The distribution size ceiling.
//!
//! The value matches the registry's hard upload limit and is deliberately
//! not configurable: a unit that passes here will be accepted upstream.

use crate::error::{GateError, Result};

/// Largest accepted compressed archive, in bytes (10 MiB).
pub const MAX_PACKAGE_BYTES: u64 = 10_485_760;

/// Whether `size` is within the ceiling. The ceiling itself passes.
///
/// # Examples
///
/// ```
/// use envforge_gate::limit::{MAX_PACKAGE_BYTES, within_limit};
///
/// assert!(within_limit(MAX_PACKAGE_BYTES));
/// assert!(!within_limit(MAX_PACKAGE_BYTES + 1));
/// ```
#[must_use]
pub const fn within_limit(size: u64) -> bool {
    size <= MAX_PACKAGE_BYTES
}

/// Reject `unit` if `size` is over the ceiling.
///
/// # Errors
///
/// Returns [`GateError::SizeLimitExceeded`] when `size` exceeds
/// [`MAX_PACKAGE_BYTES`].
pub fn enforce(unit: &str, size: u64) -> Result<()> {
    if within_limit(size) {
        return Ok(());
    }
    Err(GateError::SizeLimitExceeded {
        unit: unit.to_owned(),
        size,
        limit: MAX_PACKAGE_BYTES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(0)]
    #[case::typical(2_400_000)]
    #[case::one_below(MAX_PACKAGE_BYTES - 1)]
    #[case::exactly_at_ceiling(MAX_PACKAGE_BYTES)]
    fn accepts_sizes_up_to_the_ceiling(#[case] size: u64) {
        assert!(enforce("unit", size).is_ok());
    }

    #[rstest]
    #[case::one_byte_over(MAX_PACKAGE_BYTES + 1)]
    #[case::far_over(u64::MAX)]
    fn rejects_sizes_over_the_ceiling(#[case] size: u64) {
        let err = enforce("unit", size).expect_err("over limit");
        assert!(matches!(
            err,
            GateError::SizeLimitExceeded { size: reported, limit: MAX_PACKAGE_BYTES, .. }
                if reported == size
        ));
    }

    #[test]
    fn ceiling_is_ten_mebibytes() {
        assert_eq!(MAX_PACKAGE_BYTES, 10 * 1024 * 1024);
    }
}
