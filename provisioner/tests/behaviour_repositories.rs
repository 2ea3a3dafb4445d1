//! Behaviour-driven tests for repository descriptor rewriting.

use camino::Utf8PathBuf;
use envforge_provisioner::arch::Architecture;
use envforge_provisioner::config::{MirrorConfig, RepositoryConfig};
use envforge_provisioner::repo::descriptor::RepositoryDescriptor;
use envforge_provisioner::repo::{ArchitecturePatch, MirrorRewrite, RepositoryStore, RewriteSummary};
use envforge_provisioner::test_utils::{
    CENTOS_BASE_REPO, CENTOS_SCLO_REPO, CENTOS_SCLO_RH_REPO, write_file,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

const DESCRIPTORS: [&str; 3] = [
    "CentOS-Base.repo",
    "CentOS-SCLo-scl-rh.repo",
    "CentOS-SCLo-scl.repo",
];

struct RepositoryWorld {
    dir: TempDir,
    mirror: MirrorConfig,
    repositories: RepositoryConfig,
    last: RefCell<Option<RewriteSummary>>,
    patched: RefCell<bool>,
}

#[fixture]
fn world() -> RepositoryWorld {
    let dir = tempfile::tempdir().expect("temp dir");
    let directory = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    RepositoryWorld {
        dir,
        mirror: MirrorConfig::default(),
        repositories: RepositoryConfig {
            directory,
            ..RepositoryConfig::default()
        },
        last: RefCell::new(None),
        patched: RefCell::new(false),
    }
}

impl RepositoryWorld {
    fn store(&self) -> RepositoryStore {
        RepositoryStore::new(
            self.repositories.directory.clone(),
            self.mirror.defunct_host.clone(),
        )
    }

    fn descriptor(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("descriptor readable")
    }
}

#[given("the stock CentOS 7 descriptors")]
fn given_stock_descriptors(world: &RepositoryWorld) {
    for (name, contents) in DESCRIPTORS
        .into_iter()
        .zip([CENTOS_BASE_REPO, CENTOS_SCLO_RH_REPO, CENTOS_SCLO_REPO])
    {
        write_file(world.dir.path(), name, contents.as_bytes()).expect("write descriptor");
    }
}

#[when("the descriptors matching \"{pattern}\" are rewritten")]
fn when_rewritten(world: &RepositoryWorld, pattern: String) {
    let summary = world
        .store()
        .rewrite(&pattern, &MirrorRewrite::new(&world.mirror))
        .expect("rewrite succeeds");
    world.last.replace(Some(summary));
}

#[when("the added descriptors are patched for \"{arch}\"")]
fn when_patched(world: &RepositoryWorld, arch: String) {
    let arch: Architecture = arch.parse().expect("supported architecture");
    let Some(patch) = ArchitecturePatch::select(arch, &world.mirror, &world.repositories) else {
        world.patched.replace(false);
        return;
    };
    let summary = world
        .store()
        .rewrite(&world.repositories.additional_pattern, &patch)
        .expect("patch succeeds");
    world.patched.replace(true);
    world.last.replace(Some(summary));
}

#[then("{count} descriptors were changed")]
fn then_changed(world: &RepositoryWorld, count: usize) {
    let summary = world.last.borrow().expect("a rewrite ran");
    assert_eq!(summary.changed, count, "{summary:?}");
}

#[then("no descriptor names \"{host}\"")]
fn then_host_absent(world: &RepositoryWorld, host: String) {
    for name in DESCRIPTORS {
        let text = world.descriptor(name);
        assert!(!text.contains(&host), "{name} still names {host}:\n{text}");
    }
}

#[then("\"{name}\" contains \"{expected}\"")]
fn then_contains(world: &RepositoryWorld, name: String, expected: String) {
    let text = world.descriptor(&name);
    assert!(text.contains(&expected), "{name}:\n{text}");
}

#[then("every section has exactly one active source")]
fn then_single_source(world: &RepositoryWorld) {
    for name in DESCRIPTORS {
        let descriptor =
            RepositoryDescriptor::parse(&world.descriptor(name)).expect("descriptor parses");
        for section in descriptor.sections() {
            assert_eq!(section.active_sources(), 1, "{name} [{}]", section.name);
        }
    }
}

#[then("no patch was applied")]
fn then_not_patched(world: &RepositoryWorld) {
    assert!(!*world.patched.borrow());
    assert!(world.descriptor("CentOS-SCLo-scl.repo").contains("vault.centos.org/centos/"));
}

#[scenario(
    path = "tests/features/repositories.feature",
    name = "Base descriptors are redirected to the archive host"
)]
fn scenario_redirect(world: RepositoryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/repositories.feature",
    name = "Rewriting an already rewritten directory changes nothing"
)]
fn scenario_idempotent(world: RepositoryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/repositories.feature",
    name = "The alternate architecture routes added descriptors through altarch"
)]
fn scenario_alternate_patch(world: RepositoryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/repositories.feature",
    name = "The primary architecture needs no patch"
)]
fn scenario_primary_no_patch(world: RepositoryWorld) {
    let _ = world;
}
