//! Descriptor rewrites and the invariants they must leave behind.

use super::descriptor::{LineKind, RepositoryDescriptor, commented_entry};
use crate::arch::{Architecture, RepositorySegment};
use crate::config::{MirrorConfig, RepositoryConfig};
use std::fmt;

/// An in-place edit of a parsed descriptor.
pub trait DescriptorRewrite: fmt::Display {
    /// Apply the edit and return how many lines changed.
    fn apply(&self, descriptor: &mut RepositoryDescriptor) -> usize;
}

/// Redirect a descriptor from the defunct mirror to the fallback mirror.
///
/// - Every occurrence of the defunct host, in any line, becomes the
///   fallback host.
/// - Every commented-out `baseurl` is uncommented and upgraded to `https`.
/// - Every active `mirrorlist` is commented out.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::config::MirrorConfig;
/// use envforge_provisioner::repo::descriptor::RepositoryDescriptor;
/// use envforge_provisioner::repo::rewrite::{DescriptorRewrite, MirrorRewrite};
///
/// let mut descriptor = RepositoryDescriptor::parse(
///     "[base]\nmirrorlist=http://mirrorlist.centos.org/?repo=os\n\
///      #baseurl=http://mirror.centos.org/centos/7/os/x86_64/\n",
/// )
/// .expect("parse");
/// MirrorRewrite::new(&MirrorConfig::default()).apply(&mut descriptor);
/// assert_eq!(
///     descriptor.to_string(),
///     "[base]\n#mirrorlist=http://mirrorlist.centos.org/?repo=os\n\
///      baseurl=https://vault.centos.org/centos/7/os/x86_64/\n",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRewrite {
    defunct_host: String,
    fallback_host: String,
}

impl MirrorRewrite {
    /// Build the rewrite from the mirror configuration.
    #[must_use]
    pub fn new(config: &MirrorConfig) -> Self {
        Self {
            defunct_host: config.defunct_host.clone(),
            fallback_host: config.fallback_host.clone(),
        }
    }

    fn rewrite_line(&self, text: &str, kind: &LineKind) -> Option<String> {
        let redirected = text.replace(&self.defunct_host, &self.fallback_host);
        let edited = match kind {
            LineKind::Comment => match commented_entry(&redirected) {
                Some((key, value)) if key == "baseurl" && is_http_url(&value) => {
                    format!("baseurl={}", upgrade_scheme(&value))
                }
                _ => redirected,
            },
            LineKind::Entry { key, .. } if key == "mirrorlist" => format!("#{redirected}"),
            _ => redirected,
        };
        (edited != text).then_some(edited)
    }
}

impl DescriptorRewrite for MirrorRewrite {
    fn apply(&self, descriptor: &mut RepositoryDescriptor) -> usize {
        let mut changed = 0;
        for line in descriptor.lines_mut() {
            if let Some(text) = self.rewrite_line(line.text(), line.kind()) {
                line.set_text(text);
                changed += 1;
            }
        }
        changed
    }
}

impl fmt::Display for MirrorRewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect {} to {}", self.defunct_host, self.fallback_host)
    }
}

/// Route fallback-mirror paths through an architecture's path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitecturePatch {
    from: String,
    to: String,
}

impl ArchitecturePatch {
    /// Select the patch `arch` needs, if any.
    ///
    /// The primary architecture is served from the primary segment already,
    /// so it needs no patch.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_provisioner::arch::Architecture;
    /// use envforge_provisioner::config::{MirrorConfig, RepositoryConfig};
    /// use envforge_provisioner::repo::rewrite::ArchitecturePatch;
    ///
    /// let mirror = MirrorConfig::default();
    /// let repos = RepositoryConfig::default();
    /// assert!(ArchitecturePatch::select(Architecture::X86_64, &mirror, &repos).is_none());
    /// assert!(ArchitecturePatch::select(Architecture::Aarch64, &mirror, &repos).is_some());
    /// ```
    #[must_use]
    pub fn select(
        arch: Architecture,
        mirror: &MirrorConfig,
        repositories: &RepositoryConfig,
    ) -> Option<Self> {
        match arch.repository_segment() {
            RepositorySegment::Primary => None,
            RepositorySegment::Alternate => Some(Self {
                from: format!("{}/{}/", mirror.fallback_host, repositories.primary_segment),
                to: format!("{}/{}/", mirror.fallback_host, repositories.alternate_segment),
            }),
        }
    }
}

impl DescriptorRewrite for ArchitecturePatch {
    fn apply(&self, descriptor: &mut RepositoryDescriptor) -> usize {
        let mut changed = 0;
        for line in descriptor.lines_mut() {
            if matches!(line.kind(), LineKind::Section(_)) || !line.text().contains(&self.from) {
                continue;
            }
            let text = line.text().replace(&self.from, &self.to);
            line.set_text(text);
            changed += 1;
        }
        changed
    }
}

impl fmt::Display for ArchitecturePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route {} through {}", self.from, self.to)
    }
}

/// Check a rewritten descriptor against the repository invariants.
///
/// # Errors
///
/// Returns a description of the first violation: a line that still names
/// `defunct_host`, or a section with more than one active source.
pub fn validate(descriptor: &RepositoryDescriptor, defunct_host: &str) -> Result<(), String> {
    if let Some((index, _)) = descriptor
        .lines()
        .iter()
        .enumerate()
        .find(|(_, line)| line.text().contains(defunct_host))
    {
        return Err(format!(
            "line {} still references {defunct_host}",
            index + 1
        ));
    }
    if let Some(section) = descriptor
        .sections()
        .into_iter()
        .find(|section| section.active_sources() > 1)
    {
        return Err(format!(
            "section [{}] has {} active baseurl/mirrorlist directives",
            section.name,
            section.active_sources()
        ));
    }
    Ok(())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn upgrade_scheme(value: &str) -> String {
    value
        .strip_prefix("http://")
        .map_or_else(|| value.to_owned(), |rest| format!("https://{rest}"))
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
