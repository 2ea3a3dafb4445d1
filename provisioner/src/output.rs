//! Human-readable summaries printed by the `envforge` binary.

use crate::arch::Architecture;
use crate::artifact::release::ResolvedArtifact;
use crate::environment::BuildEnvironment;
use crate::packages::PackageSet;
use camino::Utf8Path;

/// Everything a provisioning run would do, resolved but not executed.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::arch::Architecture;
/// use envforge_provisioner::config::ProvisionConfig;
/// use envforge_provisioner::pipeline::plan;
///
/// let config = ProvisionConfig::default();
/// let plan = plan(&config, Architecture::Aarch64, Some("/usr/bin")).expect("plan");
/// let text = plan.display_text();
/// assert!(text.contains("Dry run"));
/// assert!(text.contains("aarch64-unknown-linux-musl"));
/// ```
#[derive(Debug)]
pub struct ProvisionPlan<'a> {
    /// Resolved host architecture.
    pub arch: Architecture,
    /// Descriptor directory.
    pub repository_dir: &'a Utf8Path,
    /// Glob for the first rewrite pass.
    pub base_pattern: &'a str,
    /// Glob for the second rewrite pass and the architecture patch.
    pub additional_pattern: &'a str,
    /// Whether the architecture patch applies.
    pub patch_architecture: bool,
    /// Packages introducing the additional descriptors.
    pub repository_set: PackageSet,
    /// Toolchain packages.
    pub toolchain: PackageSet,
    /// The release to fetch.
    pub artifact: ResolvedArtifact,
    /// Variables the run would define.
    pub environment: BuildEnvironment,
    /// Where the environment would be persisted.
    pub profile_script: &'a Utf8Path,
    /// The entry point program.
    pub entrypoint: &'a str,
}

impl ProvisionPlan<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Architecture: {}", self.arch),
            format!("Repository descriptors: {}", self.repository_dir),
            String::new(),
            "Stages:".to_owned(),
            format!("  1. rewrite {}", self.base_pattern),
            format!("  2. install repository set: {}", self.repository_set),
            format!("  3. rewrite {} and {}", self.base_pattern, self.additional_pattern),
        ];
        if self.patch_architecture {
            lines.push(format!(
                "  4. route {} through the {} segment",
                self.additional_pattern, self.arch
            ));
        } else {
            lines.push("  4. no architecture patch (primary architecture)".to_owned());
        }
        lines.extend([
            format!("  5. install toolchain: {}", self.toolchain),
            "  6. clean package cache".to_owned(),
            format!(
                "  7. fetch {} {} to {}",
                self.artifact.name, self.artifact.version, self.artifact.install_path
            ),
            format!("       archive:  {}", self.artifact.archive_url),
            format!("       checksum: {}", self.artifact.checksum_url),
            format!("  8. write environment to {}", self.profile_script),
            format!("  9. check entry point `{}`", self.entrypoint),
            String::new(),
            "Environment:".to_owned(),
        ]);
        lines.extend(
            self.environment
                .iter()
                .map(|(name, value)| format!("  {name}={value}")),
        );
        lines.join("\n")
    }
}
