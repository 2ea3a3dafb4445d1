//! Descriptor discovery and atomic in-place rewriting.

use super::descriptor::RepositoryDescriptor;
use super::rewrite::{DescriptorRewrite, validate};
use crate::error::{ProvisionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::io::Write;

/// Counts reported by one pass over the descriptor directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Descriptor files matching the pattern.
    pub matched: usize,
    /// Descriptor files whose content changed and was written back.
    pub changed: usize,
}

/// The directory of repository descriptors.
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    directory: Utf8PathBuf,
    defunct_host: String,
}

impl RepositoryStore {
    /// Open the descriptors in `directory`, validating rewrites against
    /// `defunct_host`.
    #[must_use]
    pub fn new(directory: impl Into<Utf8PathBuf>, defunct_host: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            defunct_host: defunct_host.into(),
        }
    }

    /// The descriptor directory.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Descriptor files whose name matches `pattern`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::DescriptorRewrite`] if the pattern is not a
    /// valid glob or a directory entry cannot be read.
    pub fn matching(&self, pattern: &str) -> Result<Vec<Utf8PathBuf>> {
        let full = self.directory.join(pattern);
        let paths = glob::glob(full.as_str()).map_err(|error| ProvisionError::DescriptorRewrite {
            path: full.clone(),
            reason: format!("invalid pattern: {error}"),
        })?;

        let mut matches = Vec::new();
        for entry in paths {
            let path = entry.map_err(|error| ProvisionError::DescriptorRewrite {
                path: Utf8PathBuf::from_path_buf(error.path().to_path_buf())
                    .unwrap_or_else(|_| full.clone()),
                reason: error.error().to_string(),
            })?;
            let path = Utf8PathBuf::from_path_buf(path).map_err(|path| {
                ProvisionError::DescriptorRewrite {
                    path: full.clone(),
                    reason: format!("non UTF-8 descriptor path {}", path.display()),
                }
            })?;
            if path.is_file() {
                matches.push(path);
            }
        }
        matches.sort();
        Ok(matches)
    }

    /// Apply `rewrite` to every descriptor matching `pattern`.
    ///
    /// Finding no descriptors is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::DescriptorRewrite`] if a descriptor cannot
    /// be read, parsed, validated, or written back. Descriptors processed
    /// before the failure keep their rewritten content.
    pub fn rewrite(&self, pattern: &str, rewrite: &dyn DescriptorRewrite) -> Result<RewriteSummary> {
        let paths = self.matching(pattern)?;
        if paths.is_empty() {
            info!("no descriptors match {pattern} in {}", self.directory);
        }

        let mut summary = RewriteSummary {
            matched: paths.len(),
            changed: 0,
        };
        for path in &paths {
            if self.rewrite_file(path, rewrite)? {
                summary.changed += 1;
            }
        }
        Ok(summary)
    }

    fn rewrite_file(&self, path: &Utf8Path, rewrite: &dyn DescriptorRewrite) -> Result<bool> {
        let failed = |reason: String| ProvisionError::DescriptorRewrite {
            path: path.to_owned(),
            reason,
        };

        let original = std::fs::read_to_string(path).map_err(|error| failed(error.to_string()))?;
        let mut descriptor =
            RepositoryDescriptor::parse(&original).map_err(|error| failed(error.to_string()))?;
        let lines_changed = rewrite.apply(&mut descriptor);
        validate(&descriptor, &self.defunct_host).map_err(failed)?;

        let updated = descriptor.to_string();
        if updated == original {
            debug!("{path}: unchanged by {rewrite}");
            return Ok(false);
        }
        debug!("{path}: {rewrite} changed {lines_changed} line(s)");
        replace_contents(path, &updated).map_err(|error| failed(error.to_string()))?;
        Ok(true)
    }
}

/// Replace `path` with `contents` through a sibling temporary file, keeping
/// the original permissions.
fn replace_contents(path: &Utf8Path, contents: &str) -> std::io::Result<()> {
    let directory = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut staged = tempfile::Builder::new()
        .prefix(".envforge-repo-")
        .tempfile_in(directory)?;
    staged.write_all(contents.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.as_file().set_permissions(permissions)?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::repo::rewrite::MirrorRewrite;
    use crate::test_utils::{CENTOS_BASE_REPO, CENTOS_SCLO_REPO, write_file};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: RepositoryStore,
    }

    #[fixture]
    fn repos() -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        Fixture {
            _dir: dir,
            store: RepositoryStore::new(path, "mirror.centos.org"),
        }
    }

    fn mirror_rewrite() -> MirrorRewrite {
        MirrorRewrite::new(&MirrorConfig::default())
    }

    fn write(store: &RepositoryStore, name: &str, contents: &str) {
        write_file(store.directory().as_std_path(), name, contents.as_bytes()).expect("write");
    }

    #[rstest]
    fn no_matches_is_not_an_error(repos: Fixture) {
        let summary = repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("empty directory");
        assert_eq!(summary, RewriteSummary::default());
    }

    #[rstest]
    fn rewrites_only_matching_files(repos: Fixture) {
        write(&repos.store, "CentOS-Base.repo", CENTOS_BASE_REPO);
        write(&repos.store, "epel.repo", CENTOS_SCLO_REPO);

        let summary = repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("rewrite");
        assert_eq!(summary, RewriteSummary { matched: 1, changed: 1 });

        let untouched = std::fs::read_to_string(repos.store.directory().join("epel.repo"))
            .expect("read");
        assert_eq!(untouched, CENTOS_SCLO_REPO);
    }

    #[rstest]
    fn second_pass_changes_nothing(repos: Fixture) {
        write(&repos.store, "CentOS-Base.repo", CENTOS_BASE_REPO);
        repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("first pass");
        let summary = repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("second pass");
        assert_eq!(summary, RewriteSummary { matched: 1, changed: 0 });
    }

    #[cfg(unix)]
    #[rstest]
    fn preserves_permissions(repos: Fixture) {
        use std::os::unix::fs::PermissionsExt;

        write(&repos.store, "CentOS-Base.repo", CENTOS_BASE_REPO);
        let path = repos.store.directory().join("CentOS-Base.repo");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).expect("chmod");

        repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("rewrite");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[rstest]
    fn malformed_descriptor_is_fatal(repos: Fixture) {
        write(&repos.store, "CentOS-Broken.repo", "[base\nbaseurl=x\n");
        let err = repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect_err("malformed");
        assert!(matches!(
            err,
            ProvisionError::DescriptorRewrite { ref path, .. } if path.ends_with("CentOS-Broken.repo")
        ));
    }

    #[rstest]
    fn leaves_no_temporary_files(repos: Fixture) {
        write(&repos.store, "CentOS-Base.repo", CENTOS_BASE_REPO);
        repos
            .store
            .rewrite("CentOS-*.repo", &mirror_rewrite())
            .expect("rewrite");
        let names: Vec<_> = std::fs::read_dir(repos.store.directory())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("CentOS-Base.repo")]);
    }
}
