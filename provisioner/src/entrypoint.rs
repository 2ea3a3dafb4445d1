//! The environment's designated executable.
//!
//! The entry point is looked up on the build environment's search path, not
//! on the provisioner's own `PATH`, so it resolves exactly as it will for
//! processes started inside the provisioned environment.

use crate::config::EntrypointConfig;
use crate::environment::BuildEnvironment;
use crate::error::{ProvisionError, Result};
use camino::Utf8PathBuf;
use log::debug;
use std::process::Command;

/// The designated executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    program: String,
}

impl Entrypoint {
    /// Build the entry point from configuration.
    #[must_use]
    pub fn new(config: &EntrypointConfig) -> Self {
        Self {
            program: config.program.clone(),
        }
    }

    /// Resolve the program on `env`'s search path.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::EntrypointNotFound`] if no executable of
    /// that name is reachable.
    pub fn resolve(&self, env: &BuildEnvironment) -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir()?;
        let not_found = || ProvisionError::EntrypointNotFound {
            program: self.program.clone(),
            search_path: env.search_path().to_owned(),
        };
        let path = which::which_in(&self.program, Some(env.search_path()), cwd)
            .map_err(|error| {
                debug!("entry point lookup failed: {error}");
                not_found()
            })?;
        Utf8PathBuf::from_path_buf(path).map_err(|_| not_found())
    }

    /// Build the command that runs the entry point with `args` inside `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::EntrypointNotFound`] if the program cannot
    /// be resolved.
    pub fn command(&self, env: &BuildEnvironment, args: &[String]) -> Result<Command> {
        let path = self.resolve(env)?;
        let mut command = Command::new(path.as_std_path());
        command.args(args);
        env.apply(&mut command);
        Ok(command)
    }

    /// Run the entry point and return its exit code.
    ///
    /// On Unix the current process is replaced, so this only returns on
    /// failure. Elsewhere the entry point runs as a child and its exit code
    /// is returned; a signal-terminated child yields 1.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::EntrypointNotFound`] if the program cannot
    /// be resolved and [`ProvisionError::Io`] if it cannot be started.
    pub fn run(&self, env: &BuildEnvironment, args: &[String]) -> Result<i32> {
        let mut command = self.command(env, args)?;
        debug!("running entry point {:?}", command.get_program());
        run_command(&mut command)
    }
}

#[cfg(unix)]
fn run_command(command: &mut Command) -> Result<i32> {
    use std::os::unix::process::CommandExt;

    Err(ProvisionError::Io(command.exec()))
}

#[cfg(not(unix))]
fn run_command(command: &mut Command) -> Result<i32> {
    let status = command.status()?;
    Ok(status.code().unwrap_or(1))
}
