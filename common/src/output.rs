//! Progress output helpers.

use std::io::Write;

/// Write a single line to `stderr`, ignoring write failures.
///
/// Progress output is best-effort: a closed pipe must never turn a
/// successful provisioning run into a failure.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
