//! Security module for Zipgate — path sandboxing, secret scanning, and masking.
//!
//! Provides:
//! - **Path sandbox**: Confine caller-supplied relative paths to a root
//! - **Secret scanner**: Flag credential-like content and environment files
//! - **Masking**: Redact the credential from logs and user-facing errors

pub mod mask;
pub mod path;
pub mod secrets;

pub use mask::{mask_token, LogArg, MaskedMakeWriter, Masker, REDACTION_MARKER};
pub use path::{is_within, resolve, resolve_bare, ResolvedPath};
pub use secrets::{is_env_file, SecretScanner};
