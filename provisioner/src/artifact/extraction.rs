//! Archive extraction for verified release archives.
//!
//! Extracts `.tar.gz` and `.tar.zst` archives into a scratch directory with
//! path traversal protection. Link entries are skipped: the fetcher only
//! installs regular files.

use log::debug;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Trait for extracting release archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::artifact::extraction::TarExtractor;
///
/// let extractor = TarExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the paths of the extracted regular files, relative to
    /// `dest_dir`, in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::EmptyArchive`]
    /// if no regular files are found, [`ExtractionError::UnsupportedFormat`]
    /// for an unrecognised file extension, and [`ExtractionError::Io`] on
    /// I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no regular files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The archive's compression cannot be inferred from its name.
    #[error("unsupported archive format: {name}")]
    UnsupportedFormat {
        /// The archive file name.
        name: String,
    },
}

/// Compression wrapped around the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip, `.tar.gz` or `.tgz`.
    TarGz,
    /// Zstandard, `.tar.zst`.
    TarZst,
}

impl ArchiveFormat {
    /// Infer the format from an archive file name.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnsupportedFormat`] for other extensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use envforge_provisioner::artifact::extraction::ArchiveFormat;
    ///
    /// let format = ArchiveFormat::from_file_name("sccache-v0.6.1.tar.gz").expect("known");
    /// assert_eq!(format, ArchiveFormat::TarGz);
    /// ```
    pub fn from_file_name(name: &str) -> Result<Self, ExtractionError> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar.zst") {
            Ok(Self::TarZst)
        } else {
            Err(ExtractionError::UnsupportedFormat {
                name: name.to_owned(),
            })
        }
    }
}

/// Default extractor using the `tar`, `flate2`, and `zstd` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl ArtifactExtractor for TarExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let name = archive_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = std::fs::File::open(archive_path)?;
        match ArchiveFormat::from_file_name(&name)? {
            ArchiveFormat::TarGz => unpack(flate2::read::GzDecoder::new(file), dest_dir),
            ArchiveFormat::TarZst => unpack(zstd::Decoder::new(file)?, dest_dir),
        }
    }
}

fn unpack(reader: impl Read, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(false);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!("skipping link entry {}", entry_path.display());
            continue;
        }

        let dest_path = dest_dir.join(&entry_path);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        entry.unpack(&dest_path)?;

        if entry_type.is_file() {
            extracted.push(entry_path);
        }
    }

    if extracted.is_empty() {
        return Err(ExtractionError::EmptyArchive);
    }

    Ok(extracted)
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, name: &str, body: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, body).expect("append");
    }

    #[test]
    fn extracts_gzip_archive() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("tool.tar.gz");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        let output_file = std::fs::File::create(&archive_path).expect("create archive");
        let encoder = flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append_file(&mut builder, "tool-v1/tool", b"#!/bin/sh\n");
        append_file(&mut builder, "tool-v1/README.md", b"readme");
        let encoder = builder.into_inner().expect("tar finish");
        encoder.finish().expect("gzip finish");

        let files = TarExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        assert_eq!(
            files,
            vec![
                PathBuf::from("tool-v1/tool"),
                PathBuf::from("tool-v1/README.md")
            ]
        );
        assert!(dest_dir.join("tool-v1/tool").is_file());
    }

    #[test]
    fn extracts_zstd_archive() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("tool.tar.zst");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        let output_file = std::fs::File::create(&archive_path).expect("create archive");
        let encoder = zstd::Encoder::new(output_file, 0).expect("zstd encoder");
        let mut builder = tar::Builder::new(encoder);
        append_file(&mut builder, "tool", b"binary");
        let encoder = builder.into_inner().expect("tar finish");
        encoder.finish().expect("zstd finish");

        let files = TarExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        assert_eq!(files, vec![PathBuf::from("tool")]);
    }

    #[test]
    fn empty_archive_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("empty.tar.gz");

        let output_file = std::fs::File::create(&archive_path).expect("create");
        let encoder = flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
        let builder = tar::Builder::new(encoder);
        let encoder = builder.into_inner().expect("tar finish");
        encoder.finish().expect("gzip finish");

        let result = TarExtractor.extract(&archive_path, temp_dir.path());
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[rstest]
    #[case::gz("a.tar.gz", ArchiveFormat::TarGz)]
    #[case::tgz("a.tgz", ArchiveFormat::TarGz)]
    #[case::zst("a.tar.zst", ArchiveFormat::TarZst)]
    fn infers_format(#[case] name: &str, #[case] expected: ArchiveFormat) {
        assert_eq!(ArchiveFormat::from_file_name(name).expect("known"), expected);
    }

    #[test]
    fn rejects_zip_archives() {
        assert!(matches!(
            ArchiveFormat::from_file_name("a.zip"),
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/usr/local/bin/sccache")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(Path::new(bad_path));
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_nested_relative_paths() {
        assert!(validate_entry_path(Path::new("sccache-v0.6.1/sccache")).is_ok());
    }
}
