//! Package set installation through the system package manager.
//!
//! A [`PackageSet`] is installed in one package manager invocation. With
//! the default `--setopt=skip_missing_names_on_install=False`, yum refuses
//! the whole transaction when any name cannot be resolved, so a failure
//! never leaves a partial toolchain behind. Installing packages that are
//! already present succeeds, which keeps reruns idempotent.

use crate::config::PackageConfig;
use crate::error::{ProvisionError, Result};
use envforge_common::{CommandExecutor, command_line, failure_message};
use log::{info, warn};
use std::fmt;

/// An ordered, duplicate-free list of package names.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::packages::PackageSet;
///
/// let set = PackageSet::new(["git", "make", "git"]).expect("valid names");
/// assert_eq!(set.names(), ["git", "make"]);
/// assert_eq!(set.to_string(), "git make");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet(Vec<String>);

impl PackageSet {
    /// Build a set, keeping the first occurrence of each name.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::PackageInstall`] for an empty name, a name
    /// with whitespace, or a name starting with `-`, which the package
    /// manager would read as an option.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
                return Err(ProvisionError::PackageInstall {
                    packages: name.to_owned(),
                    message: "not a valid package name".to_owned(),
                });
            }
            if !set.iter().any(|existing| existing == name) {
                set.push(name.to_owned());
            }
        }
        Ok(Self(set))
    }

    /// Package names in installation order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Whether the set contains no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Drives the package manager binary.
pub struct PackageManager<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
    install_args: Vec<String>,
    clean_args: Vec<String>,
}

impl<'a> PackageManager<'a> {
    /// Create a package manager driver from configuration.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, config: &PackageConfig) -> Self {
        Self {
            executor,
            program: config.manager.clone(),
            install_args: config.install_args.clone(),
            clean_args: config.clean_args.clone(),
        }
    }

    /// The install invocation for `set`, as `(program, args)`.
    #[must_use]
    pub fn install_command<'s>(&'s self, set: &'s PackageSet) -> (&'s str, Vec<&'s str>) {
        let args = self
            .install_args
            .iter()
            .chain(set.names())
            .map(String::as_str)
            .collect();
        (self.program.as_str(), args)
    }

    /// Install every package in `set` in a single invocation.
    ///
    /// An empty set is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::PackageInstall`] carrying the package
    /// manager's output when it cannot be run or exits unsuccessfully.
    pub fn install(&self, set: &PackageSet) -> Result<()> {
        if set.is_empty() {
            return Ok(());
        }
        let (program, args) = self.install_command(set);
        info!("installing packages: {set}");

        let failed = |message: String| ProvisionError::PackageInstall {
            packages: set.to_string(),
            message,
        };
        let output = self.executor.run(program, &args).map_err(|error| {
            failed(format!(
                "failed to run `{}`: {error}",
                command_line(program, &args)
            ))
        })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failed(failure_message(&output)))
        }
    }

    /// Drop cached package metadata. Failures are logged and ignored.
    ///
    /// Returns whether the cleanup succeeded.
    pub fn clean(&self) -> bool {
        let args: Vec<&str> = self.clean_args.iter().map(String::as_str).collect();
        let rendered = command_line(&self.program, &args);
        match self.executor.run(&self.program, &args) {
            Ok(output) if output.status.success() => {
                info!("cleaned package cache");
                true
            }
            Ok(output) => {
                warn!("`{rendered}` failed: {}", failure_message(&output));
                false
            }
            Err(error) => {
                warn!("failed to run `{rendered}`: {error}");
                false
            }
        }
    }
}
