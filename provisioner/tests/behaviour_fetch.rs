//! Behaviour-driven tests for the checksum-verified release fetch.
//!
//! Downloads are served by a scripted downloader; extraction and install
//! run for real against temporary directories.

use camino::Utf8PathBuf;
use envforge_provisioner::arch::Architecture;
use envforge_provisioner::artifact::download::DownloadError;
use envforge_provisioner::artifact::extraction::TarExtractor;
use envforge_provisioner::artifact::fetcher::{InstalledArtifact, VerifiedFetcher};
use envforge_provisioner::artifact::release::{ArtifactRelease, ResolvedArtifact};
use envforge_provisioner::config::ArtifactConfig;
use envforge_provisioner::error::{ProvisionError, Result as ProvisionResult};
use envforge_provisioner::test_utils::{ScriptedDownloader, sha256_hex, tar_gz_archive};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

const BINARY: &[u8] = b"#!/bin/sh\necho sccache\n";

struct FetchWorld {
    _dir: TempDir,
    root: Utf8PathBuf,
    archive: Vec<u8>,
    artifact: RefCell<Option<ResolvedArtifact>>,
    sidecar: RefCell<Option<String>>,
    outcome: RefCell<Option<ProvisionResult<InstalledArtifact>>>,
}

#[fixture]
fn world() -> FetchWorld {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    FetchWorld {
        _dir: dir,
        root,
        archive: tar_gz_archive(&[("sccache", BINARY), ("LICENSE", &b"Apache-2.0\n"[..])])
            .expect("archive"),
        artifact: RefCell::new(None),
        sidecar: RefCell::new(None),
        outcome: RefCell::new(None),
    }
}

impl FetchWorld {
    fn artifact(&self) -> ResolvedArtifact {
        self.artifact.borrow().clone().expect("release resolved")
    }

    fn install_path(&self) -> Utf8PathBuf {
        self.artifact().install_path
    }

    fn scratch_root(&self) -> Utf8PathBuf {
        self.root.join("scratch")
    }

    fn error(&self) -> ProvisionError {
        match self.outcome.take().expect("fetch ran") {
            Ok(installed) => panic!("expected the fetch to fail, installed {installed:?}"),
            Err(err) => err,
        }
    }
}

/// Feature files spell control characters as escapes.
fn unescape(suffix: &str) -> String {
    suffix.replace("\\r", "\r").replace("\\n", "\n")
}

#[given("the release \"{name}\" version \"{version}\" for \"{arch}\"")]
fn given_release(world: &FetchWorld, name: String, version: String, arch: String) {
    let config = ArtifactConfig {
        name: name.clone(),
        version,
        binary: name,
        install_dir: world.root.join("bin"),
        scratch_dir: Some(world.scratch_root()),
        ..ArtifactConfig::default()
    };
    let arch: Architecture = arch.parse().expect("supported architecture");
    let resolved = ArtifactRelease::from_config(&config)
        .resolve(arch)
        .expect("release resolves");
    world.artifact.replace(Some(resolved));
}

#[given("the sidecar publishes the archive digest followed by \"{suffix}\"")]
fn given_digest_sidecar(world: &FetchWorld, suffix: String) {
    let body = format!("{}{}", sha256_hex(&world.archive), unescape(&suffix));
    world.sidecar.replace(Some(body));
}

#[given("the sidecar publishes \"{body}\"")]
fn given_literal_sidecar(world: &FetchWorld, body: String) {
    world.sidecar.replace(Some(body));
}

#[given("the sidecar is not published")]
fn given_no_sidecar(world: &FetchWorld) {
    world.sidecar.replace(None);
}

#[when("the release is fetched")]
fn when_fetched(world: &FetchWorld) {
    let artifact = world.artifact();
    let mut downloader =
        ScriptedDownloader::new().with_body(&artifact.archive_url, world.archive.clone());
    if let Some(body) = world.sidecar.borrow().as_deref() {
        downloader = downloader.with_body(&artifact.checksum_url, body);
    }
    let fetcher = VerifiedFetcher::new(&downloader, &TarExtractor, Some(world.scratch_root()));
    let outcome = fetcher.fetch(artifact.clone());

    assert_eq!(
        downloader.requests(),
        [artifact.archive_url, artifact.checksum_url],
        "archive is requested before its sidecar"
    );
    world.outcome.replace(Some(outcome));
}

#[then("the binary is installed")]
fn then_installed(world: &FetchWorld) {
    let installed = world
        .outcome
        .take()
        .expect("fetch ran")
        .expect("fetch succeeds");
    assert_eq!(installed.path, world.install_path());
    assert_eq!(installed.digest.to_string(), sha256_hex(&world.archive));
    let contents = std::fs::read(world.install_path()).expect("binary readable");
    assert_eq!(contents, BINARY);
    assert!(!world.root.join("bin/LICENSE").exists());
}

#[then("the fetch fails with a checksum mismatch")]
fn then_checksum_mismatch(world: &FetchWorld) {
    let err = world.error();
    assert!(
        matches!(err, ProvisionError::ChecksumMismatch { ref actual, .. } if *actual == sha256_hex(&world.archive)),
        "{err}"
    );
}

#[then("the fetch fails with a download error")]
fn then_download_error(world: &FetchWorld) {
    let err = world.error();
    assert!(
        matches!(
            err,
            ProvisionError::ArtifactDownload(DownloadError::NotFound { ref url }) if url.ends_with(".sha256")
        ),
        "{err}"
    );
}

#[then("no binary is installed")]
fn then_not_installed(world: &FetchWorld) {
    assert!(!world.install_path().exists());
}

#[then("the scratch directory is empty")]
fn then_scratch_empty(world: &FetchWorld) {
    let leftovers: Vec<_> = std::fs::read_dir(world.scratch_root())
        .expect("scratch root exists")
        .filter_map(|entry| entry.ok().map(|e| e.file_name()))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "A matching sidecar installs the binary"
)]
fn scenario_matching_sidecar(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "A sidecar with a CRLF line ending is accepted"
)]
fn scenario_crlf_sidecar(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "A mismatched sidecar installs nothing"
)]
fn scenario_mismatch(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "A sidecar in sha256sum format does not match"
)]
fn scenario_sha256sum_format(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "A missing sidecar fails the download"
)]
fn scenario_missing_sidecar(world: FetchWorld) {
    let _ = world;
}
