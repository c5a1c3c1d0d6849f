//! Secret classification shared by the scanner and the error taxonomy.

use serde::{Deserialize, Serialize};

/// Class of credential-like content the scanner can flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    EnvFile,
    ApiKey,
    Password,
    GenericSecret,
    Token,
    PrivateKey,
}

impl SecretKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvFile => "env_file",
            Self::ApiKey => "api_key",
            Self::Password => "password",
            Self::GenericSecret => "generic_secret",
            Self::Token => "token",
            Self::PrivateKey => "private_key",
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single scan. Never carries the matched value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretFinding {
    pub detected: bool,
    pub kind: Option<SecretKind>,
    pub pattern_label: Option<&'static str>,
    pub message: String,
}

impl SecretFinding {
    pub fn clean() -> Self {
        Self {
            detected: false,
            kind: None,
            pattern_label: None,
            message: "No secrets detected".into(),
        }
    }

    pub fn detected(kind: SecretKind, pattern_label: &'static str) -> Self {
        Self {
            detected: true,
            kind: Some(kind),
            pattern_label: Some(pattern_label),
            message: format!("Potential {pattern_label} detected ({kind})"),
        }
    }

    /// Convert a positive finding into the fatal error; `None` when clean.
    pub fn into_error(self) -> Option<crate::Error> {
        match (self.detected, self.kind, self.pattern_label) {
            (true, Some(kind), Some(pattern)) => Some(crate::Error::SecretDetected { kind, pattern }),
            _ => None,
        }
    }
}
