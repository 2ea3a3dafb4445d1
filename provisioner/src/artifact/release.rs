//! Pinned release description and per-architecture URL resolution.
//!
//! An [`ArtifactRelease`] is built from configuration and is independent of
//! the host. Resolving it with an [`Architecture`] yields a
//! [`ResolvedArtifact`] holding the concrete archive and sidecar URLs; the
//! fetcher consumes that value once.

use super::download::require_https;
use crate::arch::Architecture;
use crate::config::ArtifactConfig;
use crate::error::{ProvisionError, Result};
use camino::Utf8PathBuf;
use serde::Serialize;

/// A pinned third-party tool release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRelease {
    name: String,
    version: String,
    archive_url_template: String,
    checksum_suffix: String,
    binary: String,
    install_dir: Utf8PathBuf,
}

/// A release resolved against the host architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    /// Release name.
    pub name: String,
    /// Release version.
    pub version: String,
    /// Architecture the URLs were resolved for.
    pub arch: Architecture,
    /// Archive download URL.
    pub archive_url: String,
    /// Checksum sidecar download URL.
    pub checksum_url: String,
    /// Archive file name, the last path segment of the archive URL.
    pub archive_file_name: String,
    /// File name of the binary to install.
    pub binary: String,
    /// Final install location of the binary.
    pub install_path: Utf8PathBuf,
}

impl ArtifactRelease {
    /// Build the release description from configuration.
    #[must_use]
    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            archive_url_template: config.archive_url.clone(),
            checksum_suffix: config.checksum_suffix.clone(),
            binary: config.binary.clone(),
            install_dir: config.install_dir.clone(),
        }
    }

    /// Substitute `{name}`, `{version}`, and `{arch}` into the URL template.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidUrlTemplate`] for unknown or
    /// unterminated placeholders, for URLs that are not `https`, and for
    /// URLs without a file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_provisioner::arch::Architecture;
    /// use envforge_provisioner::artifact::release::ArtifactRelease;
    /// use envforge_provisioner::config::ArtifactConfig;
    ///
    /// let release = ArtifactRelease::from_config(&ArtifactConfig::default());
    /// let resolved = release.resolve(Architecture::Aarch64).expect("resolves");
    /// assert!(resolved.archive_url.contains("sccache-v0.6.1-aarch64"));
    /// assert_eq!(resolved.checksum_url, format!("{}.sha256", resolved.archive_url));
    /// ```
    pub fn resolve(&self, arch: Architecture) -> Result<ResolvedArtifact> {
        let archive_url = self.render(arch)?;
        require_https(&archive_url).map_err(|_| self.invalid("must resolve to an https URL"))?;

        let archive_file_name = archive_url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| self.invalid("URL has no file name"))?
            .to_owned();

        Ok(ResolvedArtifact {
            name: self.name.clone(),
            version: self.version.clone(),
            arch,
            checksum_url: format!("{archive_url}{}", self.checksum_suffix),
            archive_url,
            archive_file_name,
            binary: self.binary.clone(),
            install_path: self.install_dir.join(&self.binary),
        })
    }

    fn render(&self, arch: Architecture) -> Result<String> {
        let mut rendered = String::with_capacity(self.archive_url_template.len());
        let mut rest = self.archive_url_template.as_str();
        while let Some((literal, tail)) = rest.split_once('{') {
            rendered.push_str(literal);
            let (placeholder, after) = tail
                .split_once('}')
                .ok_or_else(|| self.invalid("unterminated placeholder"))?;
            let value = match placeholder {
                "name" => self.name.as_str(),
                "version" => self.version.as_str(),
                "arch" => arch.as_str(),
                other => return Err(self.invalid(&format!("unknown placeholder {{{other}}}"))),
            };
            rendered.push_str(value);
            rest = after;
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    fn invalid(&self, reason: &str) -> ProvisionError {
        ProvisionError::InvalidUrlTemplate {
            template: self.archive_url_template.clone(),
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn release() -> ArtifactRelease {
        ArtifactRelease::from_config(&ArtifactConfig::default())
    }

    fn with_template(template: &str) -> ArtifactRelease {
        ArtifactRelease::from_config(&ArtifactConfig {
            archive_url: template.to_owned(),
            ..ArtifactConfig::default()
        })
    }

    #[rstest]
    #[case::x86(
        Architecture::X86_64,
        "https://github.com/mozilla/sccache/releases/download/v0.6.1/sccache-v0.6.1-x86_64-unknown-linux-musl.tar.gz"
    )]
    #[case::arm(
        Architecture::Aarch64,
        "https://github.com/mozilla/sccache/releases/download/v0.6.1/sccache-v0.6.1-aarch64-unknown-linux-musl.tar.gz"
    )]
    fn resolves_default_release(
        release: ArtifactRelease,
        #[case] arch: Architecture,
        #[case] expected: &str,
    ) {
        let resolved = release.resolve(arch).expect("resolves");
        assert_eq!(resolved.archive_url, expected);
        assert_eq!(resolved.checksum_url, format!("{expected}.sha256"));
        assert_eq!(
            resolved.archive_file_name,
            format!("sccache-v0.6.1-{arch}-unknown-linux-musl.tar.gz")
        );
        assert_eq!(resolved.install_path, Utf8PathBuf::from("/usr/local/bin/sccache"));
    }

    #[rstest]
    #[case::plain_http("http://example.test/{name}-{arch}.tar.gz")]
    #[case::unknown_placeholder("https://example.test/{name}-{target}.tar.gz")]
    #[case::unterminated("https://example.test/{name-{arch}.tar.gz")]
    #[case::no_file_name("https://example.test/{arch}/")]
    fn rejects_bad_templates(#[case] template: &str) {
        let err = with_template(template)
            .resolve(Architecture::X86_64)
            .expect_err("invalid");
        assert!(matches!(err, ProvisionError::InvalidUrlTemplate { .. }));
    }
}
