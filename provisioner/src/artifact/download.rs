//! HTTPS download of release archives and checksum sidecars.
//!
//! The downloader is a trait so the fetcher can be exercised without
//! network access. The production implementation uses a shared `ureq` agent
//! that refuses plain HTTP and negotiates TLS through rustls, which never
//! offers anything older than TLS 1.2.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout shared by every download request.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for fetching release files over HTTPS.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::artifact::download::HttpDownloader;
///
/// let downloader = HttpDownloader;
/// // Use downloader.download_text(checksum_url) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactDownloader {
    /// Download `url` and return its body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the URL is not HTTPS, or the
    /// body is not valid UTF-8.
    fn download_text(&self, url: &str) -> Result<String, DownloadError>;

    /// Download `url` and stream its body into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the URL is not HTTPS, or the
    /// file cannot be written.
    fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from artifact downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested file was not found (HTTP 404).
    #[error("release file not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The URL does not use the `https` scheme.
    #[error("refusing to download over an insecure transport: {url}")]
    InsecureUrl {
        /// The rejected URL.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTPS downloader backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl ArtifactDownloader for HttpDownloader {
    fn download_text(&self, url: &str) -> Result<String, DownloadError> {
        require_https(url)?;
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        require_https(url)?;
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file)?;
        file.sync_all()?;
        Ok(())
    }
}

/// Reject anything but `https://` before a connection is attempted.
///
/// # Errors
///
/// Returns [`DownloadError::InsecureUrl`] for any other scheme.
pub fn require_https(url: &str) -> Result<(), DownloadError> {
    let scheme_ok = url
        .split_once("://")
        .is_some_and(|(scheme, rest)| scheme.eq_ignore_ascii_case("https") && !rest.is_empty());
    if scheme_ok {
        Ok(())
    } else {
        Err(DownloadError::InsecureUrl {
            url: url.to_owned(),
        })
    }
}

/// Shared `ureq` agent restricted to HTTPS.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .https_only(true)
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
