//! Error types for the Zipgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; [`Error`] aggregates them.

use serde::Serialize;
use thiserror::Error;

use crate::secret::SecretKind;

/// The top-level error type for all Zipgate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Local validation (raised before any network call) ---
    #[error("Path rejected: {0}")]
    PathEscape(#[from] PathEscapeError),

    #[error("Secret detected in content ({kind}): {pattern}")]
    SecretDetected {
        kind: SecretKind,
        pattern: &'static str,
    },

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Remote errors ---
    #[error("{0}")]
    Zipline(#[from] ZiplineError),

    #[error("Transport error: {0}")]
    Transport(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O and serialization ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Human-actionable remediation text for this error, if it has one.
    pub fn resolution_guidance(&self) -> Option<&str> {
        match self {
            Error::PathEscape(_) => Some(
                "Pass a bare filename relative to your sandbox, without '..' segments, \
                 drive letters or leading slashes.",
            ),
            Error::SecretDetected { .. } => Some(
                "Remove the credential from the content (or stop uploading environment files) \
                 and retry.",
            ),
            Error::PayloadTooLarge { .. } => Some(
                "Reduce the file below the configured payload ceiling or split it into \
                 smaller files before uploading.",
            ),
            Error::InvalidInput(_) => {
                Some("Check the argument against the command's usage and retry.")
            }
            Error::Zipline(e) => Some(e.resolution_guidance),
            Error::Transport(_) => {
                Some("Check that the Zipline URL is reachable from this host, then retry.")
            }
            Error::Config { .. } => {
                Some("Fix ~/.zipgate/config.toml or the ZIPLINE_* environment variables.")
            }
            Error::Io(_) => Some("Check that the file exists and is readable by the current user."),
            Error::Serialization(_) | Error::Internal(_) => None,
        }
    }

    /// True for local validation failures that must never be retried.
    pub fn is_fatal_validation(&self) -> bool {
        matches!(
            self,
            Error::PathEscape(_)
                | Error::SecretDetected { .. }
                | Error::PayloadTooLarge { .. }
                | Error::InvalidInput(_)
        )
    }
}

// --- Bounded context errors ---

/// A caller-supplied path tried to leave (or could not be confined to) its root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathEscapeError {
    #[error("Path is empty")]
    Empty,

    #[error("Path contains a NUL byte")]
    NulByte,

    #[error("Absolute path '{path}' is not allowed")]
    Absolute { path: String },

    #[error("Path traversal detected in '{path}'")]
    Traversal { path: String },

    #[error("Path '{path}' resolves outside its root")]
    OutsideRoot { path: String },

    #[error("Nested path '{path}' is not allowed, use a bare filename")]
    Nested { path: String },
}

/// The closed set of remote failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZiplineErrorKind {
    UnauthorizedAccess,
    ForbiddenOperation,
    ResourceNotFound,
    PayloadTooLarge,
    RateLimitExceeded,
    InternalZiplineError,
}

impl ZiplineErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            Self::ForbiddenOperation => "FORBIDDEN_OPERATION",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InternalZiplineError => "INTERNAL_ZIPLINE_ERROR",
        }
    }

    pub fn resolution_guidance(self) -> &'static str {
        match self {
            Self::UnauthorizedAccess => {
                "Check that ZIPLINE_TOKEN holds a valid, unexpired token; regenerate it from \
                 the Zipline dashboard if it was revoked."
            }
            Self::ForbiddenOperation => {
                "The token's account lacks permission for this operation; use an account with \
                 the required role or ask a Zipline administrator to grant it."
            }
            Self::ResourceNotFound => {
                "The file or folder id does not exist; list your uploaded files to discover \
                 valid ids, then retry with one of them."
            }
            Self::PayloadTooLarge => {
                "The server refused the upload size; compress or split the file, or raise the \
                 server's upload limit."
            }
            Self::RateLimitExceeded => {
                "Too many requests; wait a few seconds before retrying and lower the number of \
                 concurrent requests."
            }
            Self::InternalZiplineError => {
                "Zipline returned an unexpected status; check the server's health and logs, \
                 then retry the operation."
            }
        }
    }
}

impl std::fmt::Display for ZiplineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A remote failure mapped from a transport status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ZiplineError {
    pub kind: ZiplineErrorKind,
    pub http_status: u16,
    pub message: String,
    /// Raw response body, kept verbatim for diagnostics. Mask before surfacing.
    pub response_body: Option<String>,
    pub resolution_guidance: &'static str,
}

impl ZiplineError {
    pub fn new(kind: ZiplineErrorKind, http_status: u16, response_body: Option<String>) -> Self {
        let message = match kind {
            ZiplineErrorKind::UnauthorizedAccess => {
                format!("Zipline rejected the credential (HTTP {http_status})")
            }
            ZiplineErrorKind::ForbiddenOperation => {
                format!("Operation not permitted for this account (HTTP {http_status})")
            }
            ZiplineErrorKind::ResourceNotFound => {
                format!("Requested resource was not found (HTTP {http_status})")
            }
            ZiplineErrorKind::PayloadTooLarge => {
                format!("Payload exceeds the server's upload limit (HTTP {http_status})")
            }
            ZiplineErrorKind::RateLimitExceeded => {
                format!("Rate limit exceeded (HTTP {http_status})")
            }
            ZiplineErrorKind::InternalZiplineError => {
                format!("Unexpected Zipline response: HTTP {http_status}")
            }
        };
        Self {
            kind,
            http_status,
            message,
            response_body,
            resolution_guidance: kind.resolution_guidance(),
        }
    }
}
