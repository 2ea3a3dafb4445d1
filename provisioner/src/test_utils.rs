//! Shared test utilities for the provisioner crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour suites under `tests/`.

use crate::artifact::download::{ArtifactDownloader, DownloadError};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// `CentOS-Base.repo` as shipped with CentOS 7, trimmed to two sections.
pub const CENTOS_BASE_REPO: &str = "\
# CentOS-Base.repo
#
# The mirror system uses the connecting IP address of the client and the
# update status of each mirror to pick mirrors that are updated to and
# geographically close to the client.

[base]
name=CentOS-$releasever - Base
mirrorlist=http://mirrorlist.centos.org/?release=$releasever&arch=$basearch&repo=os&infra=$infra
#baseurl=http://mirror.centos.org/centos/$releasever/os/$basearch/
gpgcheck=1
gpgkey=file:///etc/pki/rpm-gpg/RPM-GPG-KEY-CentOS-7

#released updates
[updates]
name=CentOS-$releasever - Updates
mirrorlist=http://mirrorlist.centos.org/?release=$releasever&arch=$basearch&repo=updates&infra=$infra
#baseurl=http://mirror.centos.org/centos/$releasever/updates/$basearch/
gpgcheck=1
gpgkey=file:///etc/pki/rpm-gpg/RPM-GPG-KEY-CentOS-7
";

/// `CentOS-SCLo-scl-rh.repo` as installed by `centos-release-scl`.
pub const CENTOS_SCLO_RH_REPO: &str = "\
# CentOS-SCLo-rh.repo
#
# Please see http://wiki.centos.org/SpecialInterestGroup/SCLo for more
# information

[centos-sclo-rh]
name=CentOS-7 - SCLo rh
baseurl=http://mirror.centos.org/centos/7/sclo/$basearch/rh/
# mirrorlist=http://mirrorlist.centos.org?arch=$basearch&release=7&repo=sclo-rh
gpgcheck=1
enabled=1
gpgkey=file:///etc/pki/rpm-gpg/RPM-GPG-KEY-CentOS-SIG-SCLo
";

/// `CentOS-SCLo-scl.repo` as installed by `centos-release-scl`.
pub const CENTOS_SCLO_REPO: &str = "\
# CentOS-SCLo-sclo.repo
#
# Please see http://wiki.centos.org/SpecialInterestGroup/SCLo for more
# information

[centos-sclo-sclo]
name=CentOS-7 - SCLo sclo
# baseurl=http://mirror.centos.org/centos/7/sclo/$basearch/sclo/
mirrorlist=http://mirrorlist.centos.org?arch=$basearch&release=7&repo=sclo-sclo
gpgcheck=1
enabled=1
gpgkey=file:///etc/pki/rpm-gpg/RPM-GPG-KEY-CentOS-SIG-SCLo
";

/// Build an in-memory `.tar.gz` archive from `(path, contents)` pairs.
///
/// # Errors
///
/// Returns any I/O error raised by the tar or gzip encoders.
pub fn tar_gz_archive(entries: &[(&str, &[u8])]) -> std::io::Result<Vec<u8>> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents)?;
    }
    builder.into_inner()?.finish()
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write `contents` to `dir/name`.
///
/// # Errors
///
/// Returns any I/O error raised while writing.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(dir.join(name))?;
    file.write_all(contents)
}

/// Scripted [`ArtifactDownloader`] serving fixed bodies by URL.
///
/// URLs without a scripted body answer with [`DownloadError::NotFound`].
/// Every request is recorded, in order.
#[derive(Debug, Default)]
pub struct ScriptedDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedDownloader {
    /// Create a downloader with no scripted URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_owned(), body.into());
        self
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn body(&self, url: &str) -> Result<&[u8], DownloadError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.bodies
            .get(url)
            .map(Vec::as_slice)
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_owned(),
            })
    }
}

impl ArtifactDownloader for ScriptedDownloader {
    fn download_text(&self, url: &str) -> Result<String, DownloadError> {
        let body = self.body(url)?;
        String::from_utf8(body.to_vec()).map_err(|error| DownloadError::HttpError {
            url: url.to_owned(),
            reason: error.to_string(),
        })
    }

    fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let body = self.body(url)?;
        std::fs::write(dest, body)?;
        Ok(())
    }
}
