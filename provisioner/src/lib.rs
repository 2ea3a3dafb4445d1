//! envforge provisioner library.
//!
//! Turns a stock CentOS 7 image into a reproducible build environment:
//! repository descriptors are redirected from the retired mirror to the
//! vault, the toolchain is installed in one package transaction, a pinned
//! release binary is fetched and checked against its published SHA-256
//! sidecar, and the resulting build environment is persisted for later
//! processes. The `envforge` binary drives these stages; the library is
//! usable on its own for testing or custom pipelines.
//!
//! # Modules
//!
//! - [`arch`] - host architecture detection and repository path segments
//! - [`artifact`] - release resolution, download, verification, installation
//! - [`cli`] - command-line argument definitions
//! - [`config`] - TOML configuration with pinned defaults
//! - [`entrypoint`] - lookup and execution of the designated executable
//! - [`environment`] - the immutable build environment
//! - [`error`] - semantic error types
//! - [`lock`] - single-writer guard for a provisioning run
//! - [`output`] - dry-run summaries
//! - [`packages`] - package set installation
//! - [`pipeline`] - stage orchestration
//! - [`repo`] - repository descriptor parsing and rewriting

pub mod arch;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod entrypoint;
pub mod environment;
pub mod error;
pub mod lock;
pub mod output;
pub mod packages;
pub mod pipeline;
pub mod repo;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
