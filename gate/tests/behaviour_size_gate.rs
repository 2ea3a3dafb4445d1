//! Behaviour-driven tests for the package size gate.
//!
//! `cargo package` is replaced by a stub executor; each scenario writes the
//! archive cargo would have produced into a temporary target directory.

use camino::Utf8PathBuf;
use envforge_common::testing::{ExpectedCall, StubExecutor, failure_output, success_output};
use envforge_gate::package::Packager;
use envforge_gate::report::GateVerdict;
use envforge_gate::unit::{LibraryUnit, Workspace};
use envforge_gate::{GateError, Result as GateResult};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

struct GateWorld {
    dir: TempDir,
    unit: RefCell<Option<LibraryUnit>>,
    calls: RefCell<Vec<ExpectedCall>>,
    outcome: RefCell<Option<GateResult<GateVerdict>>>,
}

#[fixture]
fn world() -> GateWorld {
    GateWorld {
        dir: tempfile::tempdir().expect("temp dir"),
        unit: RefCell::new(None),
        calls: RefCell::new(Vec::new()),
        outcome: RefCell::new(None),
    }
}

impl GateWorld {
    fn target_directory(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("target")).expect("utf8 temp dir")
    }

    fn unit(&self) -> LibraryUnit {
        self.unit.borrow().clone().expect("unit configured")
    }

    fn package_call(&self, result: std::io::Result<std::process::Output>) -> ExpectedCall {
        let unit = self.unit();
        ExpectedCall::new(
            "cargo",
            &["package", "--no-verify", "--allow-dirty", "--package", &unit.name],
            result,
        )
    }

    fn gate(&self, name: &str) {
        let workspace = Workspace::new(vec![self.unit()], self.target_directory(), None);
        let executor = StubExecutor::new(self.calls.take());
        let outcome = Packager::new(&executor, &workspace)
            .package(name)
            .map(GateVerdict::evaluate)
            .and_then(|verdict| verdict.check().map(|()| verdict));
        executor.assert_finished();
        self.outcome.replace(Some(outcome));
    }

    fn error(&self) -> GateError {
        match self.outcome.take().expect("gate ran") {
            Ok(verdict) => panic!("expected the gate to fail, got {verdict:?}"),
            Err(err) => err,
        }
    }
}

#[given("a workspace unit \"{name}\" at version \"{version}\"")]
fn given_unit(world: &GateWorld, name: String, version: String) {
    world.unit.replace(Some(LibraryUnit { name, version }));
}

#[given("cargo packages it to {size} bytes")]
fn given_packaged_size(world: &GateWorld, size: u64) {
    let package_dir = world.target_directory().join("package");
    std::fs::create_dir_all(&package_dir).expect("package dir");
    let archive = std::fs::File::create(package_dir.join(world.unit().archive_file_name()))
        .expect("archive");
    archive.set_len(size).expect("archive size");
    let call = world.package_call(Ok(success_output()));
    world.calls.borrow_mut().push(call);
}

#[given("cargo fails to package it")]
fn given_packaging_fails(world: &GateWorld) {
    let call = world.package_call(Ok(failure_output(
        "error: failed to select a version for the requirement `mountpoint-s3-crt-sys = \"^0.9.0\"`",
    )));
    world.calls.borrow_mut().push(call);
}

#[when("the unit is gated")]
fn when_gated(world: &GateWorld) {
    world.gate(&world.unit().name);
}

#[when("the unit \"{name}\" is gated")]
fn when_named_unit_gated(world: &GateWorld, name: String) {
    world.gate(&name);
}

#[then("the gate passes")]
fn then_passes(world: &GateWorld) {
    let outcome = world.outcome.take().expect("gate ran");
    let verdict = outcome.expect("gate passes");
    assert!(verdict.passed);
}

#[then("the gate fails because the unit is too large")]
fn then_too_large(world: &GateWorld) {
    assert!(matches!(
        world.error(),
        GateError::SizeLimitExceeded {
            size: 10_485_761,
            limit: 10_485_760,
            ..
        }
    ));
}

#[then("the gate fails because packaging failed")]
fn then_packaging_failed(world: &GateWorld) {
    assert!(matches!(
        world.error(),
        GateError::PackageFailed { ref message, .. } if message.contains("failed to select a version")
    ));
}

#[then("the gate fails because the unit is unknown")]
fn then_unknown(world: &GateWorld) {
    assert!(matches!(world.error(), GateError::UnitNotFound { .. }));
}

#[scenario(
    path = "tests/features/size_gate.feature",
    name = "A unit exactly at the ceiling passes"
)]
fn scenario_at_ceiling(world: GateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/size_gate.feature",
    name = "A unit one byte over the ceiling fails"
)]
fn scenario_one_over(world: GateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/size_gate.feature",
    name = "Packaging failure fails the gate"
)]
fn scenario_packaging_failure(world: GateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/size_gate.feature",
    name = "Units outside the workspace are rejected"
)]
fn scenario_unknown_unit(world: GateWorld) {
    let _ = world;
}
