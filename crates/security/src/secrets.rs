//! Secret scanner — flags credential-like content before it leaves the host.
//!
//! Heuristic, pattern-based detection over text content and filenames.
//! Binary content is exempt. A finding only ever names the pattern class
//! that matched; the matched value itself is never returned.

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;
use zipgate_core::{SecretFinding, SecretKind};

/// Bytes inspected for a NUL when deciding whether content is binary.
const BINARY_PROBE_BYTES: usize = 1024;

/// Read size for streaming file scans.
const SCAN_CHUNK_BYTES: usize = 64 * 1024;

/// Tail of each chunk rescanned with the next one so a match cannot hide
/// across a chunk boundary.
const SCAN_OVERLAP_BYTES: usize = 1024;

/// A compiled detection pattern with its static label.
struct SecretPattern {
    kind: SecretKind,
    label: &'static str,
    regex: Regex,
}

/// Declared order is match priority: the first hit wins.
static PATTERNS: LazyLock<Vec<SecretPattern>> = LazyLock::new(|| {
    [
        (
            SecretKind::ApiKey,
            "API key assignment",
            r#"(?i)(api[_-]?key|apikey|x-api-key)["']?\s*[:=]\s*["']?[a-z0-9_.-]{8,}"#,
        ),
        (
            SecretKind::Password,
            "password assignment",
            r#"(?i)(password|passwd|pwd)["']?\s*[:=]\s*["']?[^\s"']{4,}"#,
        ),
        (
            SecretKind::GenericSecret,
            "secret assignment",
            r#"(?i)(client[_-]?secret|secret[_-]?key|secret)["']?\s*[:=]\s*["']?[a-z0-9_+/=.-]{8,}"#,
        ),
        (
            SecretKind::Token,
            "access token",
            r#"(?i)((access|auth|refresh|bearer)[_-]?token["']?\s*[:=]\s*["']?[a-z0-9_.-]{8,}|token["']?\s*[:=]\s*["']?[a-z0-9_.-]{16,}|bearer\s+[a-z0-9_.=-]{16,})"#,
        ),
        (
            SecretKind::PrivateKey,
            "private key block",
            r"(?i)-----BEGIN ([a-z0-9]+ )*PRIVATE KEY-----",
        ),
    ]
    .into_iter()
    .map(|(kind, label, pattern)| SecretPattern {
        kind,
        label,
        regex: Regex::new(pattern).expect("built-in secret pattern must compile"),
    })
    .collect()
});

/// Stateless scanner over the built-in pattern set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretScanner;

impl SecretScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan in-memory content. The filename check always runs first.
    pub fn scan(&self, content: &[u8], filename: &str) -> SecretFinding {
        if is_env_file(filename) {
            return env_file_finding();
        }
        if looks_binary(content) {
            return SecretFinding::clean();
        }
        match std::str::from_utf8(content) {
            Ok(text) => first_match(text, PATTERNS.len())
                .map(finding_for)
                .unwrap_or_else(SecretFinding::clean),
            Err(_) => SecretFinding::clean(),
        }
    }

    /// Scan a file in bounded memory. Blocking; call from `spawn_blocking`.
    ///
    /// Classifies exactly as [`scan`](Self::scan) would over the whole file:
    /// the earliest declared pattern seen in any chunk wins.
    pub fn scan_file(&self, path: &Path, filename: &str) -> std::io::Result<SecretFinding> {
        if is_env_file(filename) {
            return Ok(env_file_finding());
        }

        let mut file = std::fs::File::open(path)?;
        let mut chunk = vec![0u8; SCAN_CHUNK_BYTES];
        let mut pending: Vec<u8> = Vec::with_capacity(SCAN_CHUNK_BYTES + SCAN_OVERLAP_BYTES);
        let mut probed = false;
        let mut best: Option<usize> = None;

        loop {
            let n = read_full(&mut file, &mut chunk)?;
            let eof = n < chunk.len();
            pending.extend_from_slice(&chunk[..n]);

            if !probed {
                if looks_binary(&pending) {
                    return Ok(SecretFinding::clean());
                }
                probed = true;
            }

            let valid = match std::str::from_utf8(&pending) {
                Ok(text) => text.len(),
                // A multi-byte character split by the chunk boundary.
                Err(e) if e.error_len().is_none() && !eof => e.valid_up_to(),
                Err(_) => return Ok(SecretFinding::clean()),
            };
            let Ok(text) = std::str::from_utf8(&pending[..valid]) else {
                return Ok(SecretFinding::clean());
            };

            if let Some(index) = first_match(text, best.unwrap_or(PATTERNS.len())) {
                if index == 0 {
                    return Ok(finding_for(index));
                }
                best = Some(index);
            }
            if eof {
                return Ok(best.map(finding_for).unwrap_or_else(SecretFinding::clean));
            }

            let mut keep_from = valid.saturating_sub(SCAN_OVERLAP_BYTES);
            while !text.is_char_boundary(keep_from) {
                keep_from += 1;
            }
            pending.drain(..keep_from);
        }
    }
}

/// Environment-file naming convention: `.env`, `.env.*`, `*.env`.
pub fn is_env_file(filename: &str) -> bool {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase();
    base.starts_with(".env") || base.ends_with(".env")
}

fn env_file_finding() -> SecretFinding {
    SecretFinding::detected(SecretKind::EnvFile, "environment file")
}

fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_PROBE_BYTES).any(|&b| b == 0)
}

/// Index of the first pattern matching `text`, looking only below `limit`.
fn first_match(text: &str, limit: usize) -> Option<usize> {
    PATTERNS[..limit].iter().position(|p| p.regex.is_match(text))
}

fn finding_for(index: usize) -> SecretFinding {
    let pattern = &PATTERNS[index];
    SecretFinding::detected(pattern.kind, pattern.label)
}

/// Fill `buf` unless EOF comes first; returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
