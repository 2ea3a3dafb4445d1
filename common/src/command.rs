//! External command execution.
//!
//! Every program the provisioner and the size gate shell out to goes through
//! [`CommandExecutor`], so tests can substitute scripted responses for the
//! package manager, `uname`, and `cargo`.

use log::debug;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use envforge_common::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("uname", &["-m"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output> {
        debug!("running {}", command_line(cmd, args));
        Command::new(cmd).args(args).output()
    }
}

/// Render a command and its arguments as a single shell-like line.
///
/// # Examples
///
/// ```
/// use envforge_common::command_line;
///
/// assert_eq!(command_line("yum", &["clean", "all"]), "yum clean all");
/// ```
#[must_use]
pub fn command_line(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Describe why a finished command failed.
///
/// Prefers the trimmed stderr, falls back to stdout (yum reports missing
/// packages there), and finally to the exit status.
#[must_use]
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_owned();
    }
    format!("exited with {}", output.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{exit_status, failure_output};
    use rstest::rstest;

    #[rstest]
    #[case::no_args("uname", &[], "uname")]
    #[case::with_args("yum", &["install", "-y", "git"], "yum install -y git")]
    fn command_line_joins_program_and_args(
        #[case] cmd: &str,
        #[case] args: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(command_line(cmd, args), expected);
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let output = failure_output("  No package foo available.\n");
        assert_eq!(failure_message(&output), "No package foo available.");
    }

    #[test]
    fn failure_message_falls_back_to_stdout() {
        let output = Output {
            status: exit_status(1),
            stdout: b"Error: Nothing to do\n".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(failure_message(&output), "Error: Nothing to do");
    }

    #[test]
    fn failure_message_reports_status_when_silent() {
        let output = Output {
            status: exit_status(3),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(failure_message(&output).contains('3'));
    }
}
