//! Pinned release artifacts: resolution, download, verification, and
//! installation.
//!
//! # Sub-modules
//!
//! - [`release`] resolves the configured URL template for an architecture.
//! - [`download`] fetches archives and sidecars over HTTPS.
//! - [`sha256_digest`] and [`checksum`] compute and compare digests.
//! - [`extraction`] unpacks archives with path traversal protection.
//! - [`fetcher`] ties the above together inside a scoped scratch directory.

pub mod checksum;
pub mod download;
pub mod error;
pub mod extraction;
pub mod fetcher;
pub mod release;
pub mod sha256_digest;
