//! Provisioning pipeline orchestration.
//!
//! Stages run in a fixed order, each consuming what the previous one
//! produced:
//!
//! 1. take the single-writer lock
//! 2. resolve the host architecture
//! 3. rewrite the base descriptors
//! 4. install the repository set, then rewrite again so the descriptors it
//!    added are covered
//! 5. route the added descriptors through the architecture's segment
//! 6. install the toolchain and clean the package cache
//! 7. fetch, verify, and install the pinned release
//! 8. compute and persist the build environment
//! 9. check that the entry point is reachable
//!
//! The architecture is resolved before any URL or path segment is chosen,
//! so nothing downstream can observe a different value.

use crate::arch::Architecture;
use crate::artifact::download::ArtifactDownloader;
use crate::artifact::extraction::ArtifactExtractor;
use crate::artifact::fetcher::{InstalledArtifact, VerifiedFetcher};
use crate::artifact::release::ArtifactRelease;
use crate::config::ProvisionConfig;
use crate::entrypoint::Entrypoint;
use crate::environment::BuildEnvironment;
use crate::error::Result;
use crate::lock::ProvisionLock;
use crate::output::ProvisionPlan;
use crate::packages::{PackageManager, PackageSet};
use crate::repo::{ArchitecturePatch, MirrorRewrite, RepositoryStore, RewriteSummary};
use camino::Utf8PathBuf;
use envforge_common::{CommandExecutor, write_stderr_line};
use log::{info, warn};
use std::io::Write;

/// External collaborators the pipeline drives.
#[derive(Clone, Copy)]
pub struct PipelineDeps<'a> {
    /// Runs `uname` and the package manager.
    pub executor: &'a dyn CommandExecutor,
    /// Fetches the release archive and sidecar.
    pub downloader: &'a dyn ArtifactDownloader,
    /// Unpacks the verified archive.
    pub extractor: &'a dyn ArtifactExtractor,
}

/// Descriptor counts from each rewrite stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryReport {
    /// First pass over the base descriptors.
    pub base: RewriteSummary,
    /// Second pass, after the repository set was installed.
    pub additional: RewriteSummary,
    /// Architecture patch, when the architecture needs one.
    pub patched: Option<RewriteSummary>,
}

/// Outcome of a complete provisioning run.
#[derive(Debug)]
pub struct ProvisionReport {
    /// Resolved host architecture.
    pub arch: Architecture,
    /// Descriptor rewrite counts.
    pub repositories: RepositoryReport,
    /// The installed release binary.
    pub artifact: InstalledArtifact,
    /// The persisted build environment.
    pub environment: BuildEnvironment,
    /// Resolved entry point, if it is already reachable.
    pub entrypoint: Option<Utf8PathBuf>,
}

/// Drives the provisioning stages against one configuration.
pub struct Provisioner<'a> {
    config: &'a ProvisionConfig,
    deps: PipelineDeps<'a>,
    quiet: bool,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner.
    #[must_use]
    pub fn new(config: &'a ProvisionConfig, deps: PipelineDeps<'a>) -> Self {
        Self {
            config,
            deps,
            quiet: false,
        }
    }

    /// Suppress progress lines on stderr.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage's error; later stages do not run.
    pub fn run(
        &self,
        requested: Option<Architecture>,
        stderr: &mut dyn Write,
    ) -> Result<ProvisionReport> {
        let _lock = ProvisionLock::acquire(&scratch_root(self.config))?;

        let arch = self.resolve_arch(requested)?;
        self.progress(stderr, format!("Provisioning for {arch}"));

        let repositories = self.rewrite_repositories(arch, true, stderr)?;
        self.install_toolchain(stderr)?;
        let artifact = self.fetch_artifact(arch, stderr)?;
        let environment = self.configure_environment(stderr)?;
        let entrypoint = self.check_entrypoint(&environment, stderr);

        self.progress(stderr, "Provisioning complete.");
        Ok(ProvisionReport {
            arch,
            repositories,
            artifact,
            environment,
            entrypoint,
        })
    }

    /// Use `requested` if given, otherwise query the host.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails or the host is unsupported.
    pub fn resolve_arch(&self, requested: Option<Architecture>) -> Result<Architecture> {
        let arch = match requested {
            Some(arch) => arch,
            None => Architecture::detect(self.deps.executor)?,
        };
        info!("architecture: {arch}");
        Ok(arch)
    }

    /// Rewrite descriptors in two passes and apply the architecture patch.
    ///
    /// With `install_repository_set`, the repository set is installed
    /// between the passes.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::DescriptorRewrite`](crate::error::ProvisionError::DescriptorRewrite) or
    /// [`ProvisionError::PackageInstall`](crate::error::ProvisionError::PackageInstall).
    pub fn rewrite_repositories(
        &self,
        arch: Architecture,
        install_repository_set: bool,
        stderr: &mut dyn Write,
    ) -> Result<RepositoryReport> {
        let repos = &self.config.repositories;
        let store = RepositoryStore::new(
            repos.directory.clone(),
            self.config.mirror.defunct_host.clone(),
        );
        let mirror = MirrorRewrite::new(&self.config.mirror);

        self.progress(stderr, format!("Rewriting {}...", repos.base_pattern));
        let base = store.rewrite(&repos.base_pattern, &mirror)?;
        info!("first pass: {} matched, {} changed", base.matched, base.changed);

        if install_repository_set {
            let set = PackageSet::new(&self.config.packages.repository_set)?;
            self.progress(stderr, format!("Installing repository set: {set}"));
            self.package_manager().install(&set)?;
        }

        self.progress(stderr, format!("Rewriting {}...", repos.additional_pattern));
        let mut additional = store.rewrite(&repos.base_pattern, &mirror)?;
        if repos.additional_pattern != repos.base_pattern {
            let extra = store.rewrite(&repos.additional_pattern, &mirror)?;
            additional.matched += extra.matched;
            additional.changed += extra.changed;
        }
        info!(
            "second pass: {} matched, {} changed",
            additional.matched, additional.changed
        );

        let patched = match ArchitecturePatch::select(arch, &self.config.mirror, repos) {
            Some(patch) => {
                self.progress(
                    stderr,
                    format!("Patching {} for {arch}...", repos.additional_pattern),
                );
                let summary = store.rewrite(&repos.additional_pattern, &patch)?;
                info!("architecture patch changed {} descriptor(s)", summary.changed);
                Some(summary)
            }
            None => None,
        };

        Ok(RepositoryReport {
            base,
            additional,
            patched,
        })
    }

    /// Install the toolchain package set, then clean the package cache.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::PackageInstall`](crate::error::ProvisionError::PackageInstall) if the install fails.
    /// Cleanup failures are only logged.
    pub fn install_toolchain(&self, stderr: &mut dyn Write) -> Result<()> {
        let set = PackageSet::new(&self.config.packages.toolchain)?;
        self.progress(
            stderr,
            format!("Installing {} toolchain package(s)...", set.names().len()),
        );
        let manager = self.package_manager();
        manager.install(&set)?;
        if !manager.clean() {
            warn!("package cache cleanup failed; continuing");
        }
        Ok(())
    }

    /// Fetch, verify, and install the pinned release for `arch`.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error; temporary files are removed either way.
    pub fn fetch_artifact(
        &self,
        arch: Architecture,
        stderr: &mut dyn Write,
    ) -> Result<InstalledArtifact> {
        let release = ArtifactRelease::from_config(&self.config.artifact);
        let resolved = release.resolve(arch)?;
        self.progress(
            stderr,
            format!("Fetching {} {}...", resolved.name, resolved.version),
        );
        let fetcher = VerifiedFetcher::new(
            self.deps.downloader,
            self.deps.extractor,
            Some(scratch_root(self.config)),
        );
        let installed = fetcher.fetch(resolved)?;
        self.progress(
            stderr,
            format!("Installed {} (sha256 {})", installed.path, installed.digest),
        );
        Ok(installed)
    }

    /// Compute the build environment and persist it as a profile script.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Io`](crate::error::ProvisionError::Io) if the script cannot be written.
    pub fn configure_environment(&self, stderr: &mut dyn Write) -> Result<BuildEnvironment> {
        let environment = BuildEnvironment::capture(&self.config.environment);
        let profile = &self.config.environment.profile_script;
        environment.write_profile(profile)?;
        self.progress(stderr, format!("Wrote build environment to {profile}"));
        Ok(environment)
    }

    /// Report whether the entry point is reachable on `environment`'s
    /// search path. An unreachable entry point only warns, because the
    /// application may be built into the environment later.
    pub fn check_entrypoint(
        &self,
        environment: &BuildEnvironment,
        stderr: &mut dyn Write,
    ) -> Option<Utf8PathBuf> {
        let entrypoint = Entrypoint::new(&self.config.entrypoint);
        match entrypoint.resolve(environment) {
            Ok(path) => {
                self.progress(stderr, format!("Entry point: {path}"));
                Some(path)
            }
            Err(error) => {
                warn!("{error}");
                None
            }
        }
    }

    fn package_manager(&self) -> PackageManager<'a> {
        PackageManager::new(self.deps.executor, &self.config.packages)
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// Resolve everything a run would do without side effects.
///
/// # Errors
///
/// Returns an error if a package set or the release URL template is
/// invalid.
pub fn plan<'c>(
    config: &'c ProvisionConfig,
    arch: Architecture,
    inherited_path: Option<&str>,
) -> Result<ProvisionPlan<'c>> {
    let repos = &config.repositories;
    Ok(ProvisionPlan {
        arch,
        repository_dir: &repos.directory,
        base_pattern: &repos.base_pattern,
        additional_pattern: &repos.additional_pattern,
        patch_architecture: ArchitecturePatch::select(arch, &config.mirror, repos).is_some(),
        repository_set: PackageSet::new(&config.packages.repository_set)?,
        toolchain: PackageSet::new(&config.packages.toolchain)?,
        artifact: ArtifactRelease::from_config(&config.artifact).resolve(arch)?,
        environment: BuildEnvironment::from_config(&config.environment, inherited_path, None),
        profile_script: &config.environment.profile_script,
        entrypoint: &config.entrypoint.program,
    })
}

/// Directory holding the run lock and the fetch scratch space.
#[must_use]
pub fn scratch_root(config: &ProvisionConfig) -> Utf8PathBuf {
    config.artifact.scratch_dir.clone().unwrap_or_else(|| {
        Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
