//! Fetch, verify, install, and clean up a pinned release.
//!
//! All downloads and extracted files live in one scratch directory owned by
//! a [`tempfile::TempDir`]. The directory is released when the fetch
//! returns, whatever the outcome, so a failed run never leaves partial state
//! for the next invocation. Nothing is copied to the install directory until
//! the archive digest equals the published sidecar.

use super::checksum::SidecarChecksum;
use super::download::ArtifactDownloader;
use super::extraction::ArtifactExtractor;
use super::release::ResolvedArtifact;
use super::sha256_digest::Sha256Digest;
use crate::error::{ProvisionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of the per-fetch scratch directory.
const SCRATCH_PREFIX: &str = "envforge-fetch-";

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    /// Where the binary was installed.
    pub path: Utf8PathBuf,
    /// Verified digest of the downloaded archive.
    pub digest: Sha256Digest,
}

/// Downloads, verifies, and installs a resolved release.
pub struct VerifiedFetcher<'a> {
    downloader: &'a dyn ArtifactDownloader,
    extractor: &'a dyn ArtifactExtractor,
    scratch_root: Option<Utf8PathBuf>,
}

impl<'a> VerifiedFetcher<'a> {
    /// Create a fetcher. Scratch directories are created under
    /// `scratch_root`, or under the system temp directory when `None`.
    #[must_use]
    pub fn new(
        downloader: &'a dyn ArtifactDownloader,
        extractor: &'a dyn ArtifactExtractor,
        scratch_root: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            downloader,
            extractor,
            scratch_root,
        }
    }

    /// Fetch `artifact`, verify it against its sidecar, and install the
    /// binary.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::ArtifactDownload`] if either file cannot be fetched
    /// - [`ProvisionError::ChecksumMismatch`] if the digests differ; nothing is
    ///   installed
    /// - [`ProvisionError::Extraction`] or [`ProvisionError::BinaryNotFound`]
    ///   if the verified archive does not yield exactly one binary
    /// - [`ProvisionError::InstallFailed`] if the binary cannot be placed
    pub fn fetch(&self, artifact: ResolvedArtifact) -> Result<InstalledArtifact> {
        let scratch = self.scratch_dir()?;
        debug!("fetch scratch directory: {}", scratch.path().display());

        let outcome = self.fetch_in(scratch.path(), artifact);

        if let Err(error) = scratch.close() {
            warn!("failed to remove fetch scratch directory: {error}");
        }
        outcome
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn fetch_in(&self, scratch: &Path, artifact: ResolvedArtifact) -> Result<InstalledArtifact> {
        let archive_path = scratch.join(&artifact.archive_file_name);

        info!("downloading {}", artifact.archive_url);
        self.downloader
            .download_to_file(&artifact.archive_url, &archive_path)?;
        info!("downloading {}", artifact.checksum_url);
        let sidecar = SidecarChecksum::from_body(
            &self.downloader.download_text(&artifact.checksum_url)?,
        );

        let digest = Sha256Digest::of_file(&archive_path)?;
        sidecar.verify(&artifact.archive_file_name, &digest)?;
        info!("verified {} (sha256 {digest})", artifact.archive_file_name);

        let extract_dir = scratch.join("extract");
        std::fs::create_dir_all(&extract_dir)?;
        let files = self.extractor.extract(&archive_path, &extract_dir)?;
        let binary = find_binary(&files, &artifact)?;

        install_binary(&extract_dir.join(binary), &artifact.install_path)?;
        info!("installed {}", artifact.install_path);

        Ok(InstalledArtifact {
            path: artifact.install_path,
            digest,
        })
    }
}

/// Select the single extracted file named like the expected binary.
fn find_binary<'f>(files: &'f [PathBuf], artifact: &ResolvedArtifact) -> Result<&'f PathBuf> {
    let mut matches = files
        .iter()
        .filter(|path| path.file_name().is_some_and(|name| name == artifact.binary.as_str()));
    match (matches.next(), matches.count()) {
        (Some(path), 0) => Ok(path),
        (first, rest) => Err(ProvisionError::BinaryNotFound {
            binary: artifact.binary.clone(),
            archive: artifact.archive_file_name.clone(),
            found: usize::from(first.is_some()) + rest,
        }),
    }
}

/// Copy `source` next to `dest`, mark it executable, and rename it into
/// place so `dest` never holds a partial binary.
fn install_binary(source: &Path, dest: &Utf8Path) -> Result<()> {
    let failed = |error: std::io::Error| ProvisionError::InstallFailed {
        path: dest.to_owned(),
        reason: error.to_string(),
    };
    let install_dir = dest.parent().unwrap_or_else(|| Utf8Path::new("."));
    std::fs::create_dir_all(install_dir).map_err(failed)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".envforge-install-")
        .tempfile_in(install_dir)
        .map_err(failed)?;
    let mut reader = std::fs::File::open(source).map_err(failed)?;
    std::io::copy(&mut reader, staged.as_file_mut()).map_err(failed)?;
    staged.as_file().sync_all().map_err(failed)?;
    set_executable(staged.as_file()).map_err(failed)?;
    staged
        .persist(dest)
        .map_err(|error| failed(error.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
