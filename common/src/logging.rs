//! Log output for the envforge binaries.
//!
//! Library code logs through the `log` facade. The binaries install a
//! `tracing-subscriber` formatter on stderr whose `tracing-log` bridge picks
//! those records up.

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;

/// Install the stderr log formatter at `level`.
///
/// Colour is only used when stderr is a terminal. A second call keeps the
/// subscriber that is already installed.
pub fn init_logging(level: log::LevelFilter) {
    let initialised = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_max_level(tracing_level(level))
        .with_target(false)
        .without_time()
        .try_init();
    if initialised.is_err() {
        // A subscriber is already installed; keep it.
    }
}

/// Map `-v`/`-q` counts onto a level: `info` by default, `debug` for one
/// `-v`, `trace` beyond that, and `warn` when quiet.
///
/// # Examples
///
/// ```
/// use envforge_common::verbosity_level;
///
/// assert_eq!(verbosity_level(0, false), log::LevelFilter::Info);
/// assert_eq!(verbosity_level(0, true), log::LevelFilter::Warn);
/// ```
#[must_use]
pub fn verbosity_level(verbosity: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Warn;
    }
    match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}
