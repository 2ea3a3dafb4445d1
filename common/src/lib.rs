//! Process plumbing shared by the envforge crates.
//!
//! - [`command`] - the [`CommandExecutor`] seam used for every external
//!   program (`uname`, `yum`, `cargo`)
//! - [`logging`] - the stderr log formatter used by the binaries
//! - [`output`] - best-effort progress output on stderr
//! - `testing` - stub executors and `Output` builders, available to unit
//!   tests and to downstream crates through the `test-support` feature

pub mod command;
pub mod logging;
pub mod output;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use command::{CommandExecutor, SystemCommandExecutor, command_line, failure_message};
pub use logging::{init_logging, verbosity_level};
pub use output::write_stderr_line;
