//! Size gate binary for CI.
//!
//! Packages each named workspace unit with `cargo package --no-verify`,
//! measures the `.crate` archive, and exits nonzero when any unit is over
//! the registry ceiling. Logging defaults to `warn`, so passing units
//! produce no output unless `--json` or `-v` is given.

use camino::Utf8PathBuf;
use clap::Parser;
use envforge_common::{SystemCommandExecutor, init_logging, write_stderr_line};
use envforge_gate::Result;
use envforge_gate::package::{PackagedUnit, Packager};
use envforge_gate::report::{GateVerdict, first_failure, render_json};
use envforge_gate::unit::Workspace;
use log::{Level, LevelFilter, log};
use std::io::Write;

/// Reject library units whose packaged size exceeds 10 MiB.
#[derive(Parser, Debug, Default)]
#[command(name = "envforge-size-gate")]
#[command(version, about)]
struct GateCli {
    /// Workspace unit to package and gate (repeatable).
    #[arg(
        short,
        long = "package",
        value_name = "NAME",
        required_unless_present = "archive"
    )]
    packages: Vec<String>,

    /// Workspace manifest [default: discovered from the current directory].
    #[arg(long, value_name = "PATH")]
    manifest_path: Option<Utf8PathBuf>,

    /// Gate an already-packaged archive instead of running `cargo package`.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["packages", "manifest_path"])]
    archive: Option<Utf8PathBuf>,

    /// Print the verdicts as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbosity: u8,

    /// Only report errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = GateCli::parse();
    init_logging(cli.log_level());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut std::io::stdout());
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &GateCli, stdout: &mut dyn Write) -> Result<()> {
    let verdicts = match &cli.archive {
        Some(archive) => vec![GateVerdict::evaluate(PackagedUnit::from_archive(archive)?)],
        None => package_units(cli)?,
    };
    for verdict in &verdicts {
        log!(summary_level(verdict), "{}", verdict.summary());
    }
    if cli.json {
        let json = render_json(&verdicts).map_err(std::io::Error::from)?;
        writeln!(stdout, "{json}")?;
    }
    first_failure(&verdicts)
}

impl GateCli {
    /// `warn` by default, one step louder per `-v`, `error` when quiet.
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Passing verdicts are only shown with `-v`.
fn summary_level(verdict: &GateVerdict) -> Level {
    if verdict.passed {
        Level::Info
    } else {
        Level::Warn
    }
}

/// Package and measure each requested unit, in order.
fn package_units(cli: &GateCli) -> Result<Vec<GateVerdict>> {
    let workspace = Workspace::load(cli.manifest_path.as_deref())?;
    let executor = SystemCommandExecutor;
    let packager = Packager::new(&executor, &workspace);
    cli.packages
        .iter()
        .map(|name| packager.package(name).map(GateVerdict::evaluate))
        .collect()
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
