//! Repository descriptor rewriting.
//!
//! - [`descriptor`] - line-preserving INI model of a `.repo` file
//! - [`rewrite`] - the mirror redirect, the architecture patch, and the
//!   invariants every rewritten descriptor must satisfy
//! - [`store`] - glob discovery and atomic write-back

pub mod descriptor;
pub mod rewrite;
pub mod store;

pub use descriptor::{DescriptorParseError, RepositoryDescriptor};
pub use rewrite::{ArchitecturePatch, DescriptorRewrite, MirrorRewrite};
pub use store::{RepositoryStore, RewriteSummary};
