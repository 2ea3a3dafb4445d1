//! The build environment handed to every downstream step.
//!
//! [`BuildEnvironment`] is computed once from configuration and the
//! inherited search paths, then only read. It is applied to child processes
//! explicitly and persisted as a profile script for processes started later,
//! instead of mutating the provisioner's own process environment.

use crate::config::EnvironmentConfig;
use crate::error::Result;
use camino::Utf8Path;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::process::Command;

/// Executable search path.
pub const PATH: &str = "PATH";
/// Dynamic library search path.
pub const LD_LIBRARY_PATH: &str = "LD_LIBRARY_PATH";
/// Designated C compiler.
pub const CC: &str = "CC";
/// Designated C++ compiler.
pub const CXX: &str = "CXX";

/// Immutable mapping from variable name to value.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::config::EnvironmentConfig;
/// use envforge_provisioner::environment::{BuildEnvironment, CC, PATH};
///
/// let env = BuildEnvironment::from_config(&EnvironmentConfig::default(), Some("/usr/bin"), None);
/// assert_eq!(env.get(CC), Some("/opt/rh/devtoolset-10/root/usr/bin/gcc"));
/// assert!(env.get(PATH).is_some_and(|path| path.ends_with(":/usr/bin")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    /// Compute the environment from configuration and the inherited
    /// `PATH` and `LD_LIBRARY_PATH` values.
    ///
    /// Configured directories come first, in order; inherited entries that
    /// repeat a configured directory are dropped.
    #[must_use]
    pub fn from_config(
        config: &EnvironmentConfig,
        inherited_path: Option<&str>,
        inherited_library_path: Option<&str>,
    ) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(
            PATH.to_owned(),
            join_search_path(&config.path_prefixes, inherited_path),
        );
        let library_path = join_search_path(&config.library_paths, inherited_library_path);
        if !library_path.is_empty() {
            vars.insert(LD_LIBRARY_PATH.to_owned(), library_path);
        }
        vars.insert(CC.to_owned(), config.cc.to_string());
        vars.insert(CXX.to_owned(), config.cxx.to_string());
        Self { vars }
    }

    /// Compute the environment, inheriting search paths from this process.
    #[must_use]
    pub fn capture(config: &EnvironmentConfig) -> Self {
        let path = std::env::var(PATH).ok();
        let library_path = std::env::var(LD_LIBRARY_PATH).ok();
        Self::from_config(config, path.as_deref(), library_path.as_deref())
    }

    /// Value of `name`, if defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The executable search path.
    #[must_use]
    pub fn search_path(&self) -> &str {
        self.get(PATH).unwrap_or_default()
    }

    /// Export every variable into `command`'s environment.
    pub fn apply(&self, command: &mut Command) {
        command.envs(self.iter());
    }

    /// Render `KEY=VALUE` lines.
    #[must_use]
    pub fn render_lines(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={value}\n"))
            .collect()
    }

    /// Render a JSON object.
    ///
    /// # Errors
    ///
    /// Returns the serialiser's error, which cannot occur for string maps.
    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render a POSIX shell script exporting every variable.
    #[must_use]
    pub fn render_profile_script(&self) -> String {
        let mut script = String::from("# Generated by envforge. Do not edit.\n");
        for (name, value) in self.iter() {
            script.push_str(&format!("export {name}={}\n", shell_quote(value)));
        }
        script
    }

    /// Persist the profile script at `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProvisionError::Io`] if the script cannot be
    /// written.
    pub fn write_profile(&self, path: &Utf8Path) -> Result<()> {
        let directory = path.parent().unwrap_or_else(|| Utf8Path::new("."));
        std::fs::create_dir_all(directory)?;
        let mut staged = tempfile::Builder::new()
            .prefix(".envforge-profile-")
            .tempfile_in(directory)?;
        staged.write_all(self.render_profile_script().as_bytes())?;
        set_readable(staged.as_file())?;
        staged.persist(path).map_err(|error| error.error)?;
        Ok(())
    }
}

fn join_search_path(prefixes: &[camino::Utf8PathBuf], inherited: Option<&str>) -> String {
    let mut entries: Vec<&str> = prefixes.iter().map(|prefix| prefix.as_str()).collect();
    for entry in inherited.unwrap_or_default().split(':') {
        if !entry.is_empty() && !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    entries.join(":")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn set_readable(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}
