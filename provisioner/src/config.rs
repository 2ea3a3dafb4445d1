//! Provisioning configuration.
//!
//! Every value the pipeline needs (mirror hosts, repository globs, package
//! sets, the pinned artifact release, environment variables, and the entry
//! point) lives in [`ProvisionConfig`]. All fields carry pinned defaults, so a
//! configuration file is optional; when present it is read from `--config`
//! or from the `ENVFORGE_CONFIG` environment variable and deserialised with
//! `deny_unknown_fields` so typos fail loudly instead of silently falling back.

use crate::error::{ProvisionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "ENVFORGE_CONFIG";

/// Complete provisioning configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Mirror host rewriting.
    pub mirror: MirrorConfig,
    /// Repository descriptor locations and path segments.
    pub repositories: RepositoryConfig,
    /// Package manager invocation and package sets.
    pub packages: PackageConfig,
    /// The pinned third-party tool release.
    pub artifact: ArtifactConfig,
    /// Build environment variables.
    pub environment: EnvironmentConfig,
    /// The executable run when the environment is invoked without arguments.
    pub entrypoint: EntrypointConfig,
}

/// Mirror host rewriting settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Host that no longer serves packages.
    pub defunct_host: String,
    /// Host that replaces it.
    pub fallback_host: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            defunct_host: "mirror.centos.org".to_owned(),
            fallback_host: "vault.centos.org".to_owned(),
        }
    }
}

/// Repository descriptor discovery and architecture path segments.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Directory holding the descriptor files.
    pub directory: Utf8PathBuf,
    /// File name glob for the base OS descriptors (first rewrite pass).
    pub base_pattern: String,
    /// File name glob for the descriptors added by the repository set.
    pub additional_pattern: String,
    /// Path segment that serves the primary architecture.
    pub primary_segment: String,
    /// Path segment that serves every other architecture.
    pub alternate_segment: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            directory: Utf8PathBuf::from("/etc/yum.repos.d"),
            base_pattern: "CentOS-*.repo".to_owned(),
            additional_pattern: "CentOS-SCLo-*.repo".to_owned(),
            primary_segment: "centos".to_owned(),
            alternate_segment: "altarch".to_owned(),
        }
    }
}

/// Package manager invocation and package sets.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Package manager executable.
    pub manager: String,
    /// Arguments preceding the package names for an install transaction.
    pub install_args: Vec<String>,
    /// Arguments for the best-effort cache cleanup.
    pub clean_args: Vec<String>,
    /// Packages that introduce the additional repository set.
    pub repository_set: Vec<String>,
    /// The toolchain package set.
    pub toolchain: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            manager: "yum".to_owned(),
            install_args: strings(&[
                "install",
                "-y",
                "--setopt=skip_missing_names_on_install=False",
            ]),
            clean_args: strings(&["clean", "all"]),
            repository_set: strings(&["centos-release-scl"]),
            toolchain: strings(&[
                // build tools
                "make",
                "cmake3",
                "fuse",
                "fuse-devel",
                "pkgconfig",
                "openssl-devel",
                "which",
                // version control
                "git",
                // compiler toolchains
                "devtoolset-10-gcc",
                "devtoolset-10-gcc-c++",
                "llvm-toolset-7.0-clang",
                // interpreter runtime
                "rh-python38",
                // packaging utilities
                "rpm-build",
                "tar",
                "gzip",
            ]),
        }
    }
}

/// The pinned third-party tool release.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Release name, available to the URL template as `{name}`.
    pub name: String,
    /// Release version, available to the URL template as `{version}`.
    pub version: String,
    /// Archive URL template; `{arch}` is replaced with the host architecture.
    pub archive_url: String,
    /// Suffix appended to the archive URL to locate the checksum sidecar.
    pub checksum_suffix: String,
    /// File name of the binary to install from the archive.
    pub binary: String,
    /// Directory the binary is installed into.
    pub install_dir: Utf8PathBuf,
    /// Parent directory for temporary downloads; the system temp dir if unset.
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            name: "sccache".to_owned(),
            version: "0.6.1".to_owned(),
            archive_url: concat!(
                "https://github.com/mozilla/sccache/releases/download/v{version}/",
                "{name}-v{version}-{arch}-unknown-linux-musl.tar.gz"
            )
            .to_owned(),
            checksum_suffix: ".sha256".to_owned(),
            binary: "sccache".to_owned(),
            install_dir: Utf8PathBuf::from("/usr/local/bin"),
            scratch_dir: None,
        }
    }
}

/// Build environment variables.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Directories prepended to `PATH`, highest priority first.
    pub path_prefixes: Vec<Utf8PathBuf>,
    /// Directories prepended to `LD_LIBRARY_PATH`, highest priority first.
    pub library_paths: Vec<Utf8PathBuf>,
    /// The designated C compiler.
    pub cc: Utf8PathBuf,
    /// The designated C++ compiler.
    pub cxx: Utf8PathBuf,
    /// Shell script the environment is persisted to for later processes.
    pub profile_script: Utf8PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path_prefixes: paths(&[
                "/opt/rh/devtoolset-10/root/usr/bin",
                "/opt/rh/llvm-toolset-7.0/root/usr/bin",
                "/opt/rh/rh-python38/root/usr/bin",
                "/usr/local/bin",
            ]),
            library_paths: paths(&[
                "/opt/rh/devtoolset-10/root/usr/lib64",
                "/opt/rh/llvm-toolset-7.0/root/usr/lib64",
            ]),
            cc: Utf8PathBuf::from("/opt/rh/devtoolset-10/root/usr/bin/gcc"),
            cxx: Utf8PathBuf::from("/opt/rh/devtoolset-10/root/usr/bin/g++"),
            profile_script: Utf8PathBuf::from("/etc/profile.d/envforge.sh"),
        }
    }
}

/// The designated entry point executable.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EntrypointConfig {
    /// Program name resolved on the configured search path.
    pub program: String,
}

impl Default for EntrypointConfig {
    fn default() -> Self {
        Self {
            program: "mount-s3".to_owned(),
        }
    }
}

impl ProvisionConfig {
    /// Load the configuration from `explicit`, then from
    /// [`CONFIG_ENV_VAR`], falling back to the pinned defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidConfig`] if the selected file cannot
    /// be read or does not parse.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from);
        match explicit.map(Utf8Path::to_owned).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidConfig`] on read or parse failure.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| ProvisionError::InvalidConfig {
                path: path.to_owned(),
                reason: error.to_string(),
            })?;
        Self::parse(&contents).map_err(|reason| ProvisionError::InvalidConfig {
            path: path.to_owned(),
            reason,
        })
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML parser's message on failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_provisioner::config::ProvisionConfig;
    ///
    /// let config = ProvisionConfig::parse("[artifact]\nversion = \"0.7.0\"\n")
    ///     .expect("valid config");
    /// assert_eq!(config.artifact.version, "0.7.0");
    /// assert_eq!(config.artifact.name, "sccache");
    /// ```
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        toml::from_str(contents).map_err(|error| error.to_string())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn paths(values: &[&str]) -> Vec<Utf8PathBuf> {
    values.iter().map(Utf8PathBuf::from).collect()
}
