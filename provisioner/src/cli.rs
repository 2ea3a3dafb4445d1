//! CLI argument definitions for the `envforge` binary.
//!
//! Kept apart from the entrypoint so the parser can be tested without
//! running any stage.

use crate::arch::Architecture;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use envforge_common::verbosity_level;

/// Provision a reproducible CentOS 7 build environment.
#[derive(Parser, Debug, Default)]
#[command(name = "envforge")]
#[command(version, about)]
#[command(long_about = concat!(
    "Provision a reproducible CentOS 7 build environment.\n\n",
    "The base image's repository descriptors point at mirror.centos.org, which ",
    "no longer serves packages. envforge redirects them to vault.centos.org, ",
    "installs the compiler toolchains, fetches a pinned release binary after ",
    "checking it against its published SHA-256 sidecar, and records the build ",
    "environment for later processes.\n\n",
    "Without a subcommand, the configured entry point is run inside the build ",
    "environment.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Provision the image during a container build:\n",
    "    $ envforge provision\n\n",
    "  Preview the stages without touching the system:\n",
    "    $ envforge provision --dry-run --arch aarch64\n\n",
    "  Print the build environment as JSON:\n",
    "    $ envforge env --json\n\n",
    "  Run the entry point with arguments:\n",
    "    $ envforge exec -- --foreground my-bucket /mnt\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file [default: $ENVFORGE_CONFIG, then built-in values].
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run every provisioning stage.
    Provision(ProvisionArgs),

    /// Only redirect the repository descriptors.
    RewriteRepos(ArchArgs),

    /// Only fetch, verify, and install the pinned release.
    Fetch(ArchArgs),

    /// Print the build environment.
    Env(EnvArgs),

    /// Run the entry point inside the build environment (default).
    Exec(ExecArgs),
}

/// Architecture override shared by the stage subcommands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchArgs {
    /// Use this architecture instead of asking `uname -m`.
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<Architecture>,
}

/// Arguments for the provision command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionArgs {
    /// Architecture override.
    #[command(flatten)]
    pub arch: ArchArgs,

    /// Show the resolved stages and exit without changing anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the env command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvArgs {
    /// Output a JSON object instead of `KEY=VALUE` lines.
    #[arg(long, conflicts_with = "profile")]
    pub json: bool,

    /// Output the profile script that provisioning persists.
    #[arg(long)]
    pub profile: bool,
}

/// Arguments for the exec command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecArgs {
    /// Arguments passed to the entry point unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl Cli {
    /// The subcommand to run, defaulting to `exec` with no arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use envforge_provisioner::cli::{Cli, Command, ExecArgs};
    ///
    /// let cli = Cli::parse_from(["envforge"]);
    /// assert_eq!(cli.effective_command(), Command::Exec(ExecArgs::default()));
    /// ```
    #[must_use]
    pub fn effective_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Exec(ExecArgs::default()))
    }

    /// Maximum log level implied by `-v` and `-q`.
    ///
    /// Stage boundaries are shown by default; `-q` keeps warnings only.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        verbosity_level(self.verbosity, self.quiet)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
