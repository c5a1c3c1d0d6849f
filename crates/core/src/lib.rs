//! # Zipgate Core
//!
//! Domain types and error definitions for the Zipgate staging gate.
//! This crate does no I/O. It defines the domain model that the security,
//! staging and remote crates implement against.
//!
//! ## Design Philosophy
//!
//! Every failure a caller can observe is a variant of [`Error`], and every
//! variant a caller can act on carries resolution guidance. Staged content is
//! a tagged [`StagedContent`] so "which field is set" checks never happen.

pub mod credential;
pub mod error;
pub mod secret;
pub mod staged;

// Re-export key types at crate root for ergonomics
pub use credential::Credential;
pub use error::{Error, PathEscapeError, Result, ZiplineError, ZiplineErrorKind};
pub use secret::{SecretFinding, SecretKind};
pub use staged::{DiskArtifact, StagedContent, StagingStrategy};
