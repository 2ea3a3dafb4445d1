//! envforge size gate library.
//!
//! Packages a workspace library unit locally, measures the compressed
//! `.crate` archive, and rejects it when it exceeds the registry's hard
//! ceiling. Used by the `envforge-size-gate` binary, one process per unit.
//!
//! # Modules
//!
//! - [`error`] - gate failures
//! - [`limit`] - the fixed size ceiling
//! - [`package`] - `cargo package` invocation and measurement
//! - [`report`] - per-unit verdicts and their rendering
//! - [`unit`] - workspace unit lookup through `cargo metadata`

pub mod error;
pub mod limit;
pub mod package;
pub mod report;
pub mod unit;

pub use error::{GateError, Result};
pub use limit::MAX_PACKAGE_BYTES;
