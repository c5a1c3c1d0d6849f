//! Path sandbox — confines caller-supplied relative paths to a root.
//!
//! Purely textual: nothing here touches the filesystem, so a candidate can be
//! validated before the directory it points into even exists. Case
//! sensitivity follows the host OS.

use std::path::{Component, Path, PathBuf};

use zipgate_core::PathEscapeError;

/// A normalized absolute path guaranteed to sit under the root it was
/// resolved against. Only [`resolve`] and [`resolve_bare`] construct one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Final component as UTF-8, used as the upload filename.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Resolve a relative `candidate` against `root`.
///
/// Checks, in order:
/// 1. Non-empty, not whitespace-only
/// 2. No NUL bytes
/// 3. Not absolute (`/x`, `\x`, `C:\x`, `C:/x`)
/// 4. No `..` segments (`\` and `/` are both separators)
/// 5. Joined result stays under the canonicalized root
pub fn resolve(candidate: &str, root: &Path) -> Result<ResolvedPath, PathEscapeError> {
    let segments = segments(candidate)?;
    let root = normalize(root);

    let mut joined = root.clone();
    for segment in &segments {
        joined.push(segment);
    }
    let joined = normalize(&joined);

    if !is_within(&joined, &root) {
        return Err(PathEscapeError::OutsideRoot {
            path: candidate.into(),
        });
    }

    Ok(ResolvedPath(joined))
}

/// Like [`resolve`], but only a single bare filename is accepted.
pub fn resolve_bare(candidate: &str, root: &Path) -> Result<ResolvedPath, PathEscapeError> {
    match segments(candidate)?.len() {
        0 => Err(PathEscapeError::Empty),
        1 => resolve(candidate, root),
        _ => Err(PathEscapeError::Nested {
            path: candidate.into(),
        }),
    }
}

/// Non-failing confinement check: is `path` equal to or below `root`?
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Lexically collapse `.`, `..` and duplicate or trailing separators.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn segments(candidate: &str) -> Result<Vec<&str>, PathEscapeError> {
    if candidate.trim().is_empty() {
        return Err(PathEscapeError::Empty);
    }
    if candidate.contains('\0') {
        return Err(PathEscapeError::NulByte);
    }
    if is_absolute_form(candidate) {
        return Err(PathEscapeError::Absolute {
            path: candidate.into(),
        });
    }

    let mut out = Vec::new();
    for segment in candidate.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(PathEscapeError::Traversal {
                    path: candidate.into(),
                });
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn is_absolute_form(candidate: &str) -> bool {
    if candidate.starts_with('/') || candidate.starts_with('\\') {
        return true;
    }
    // Drive letters, including the drive-relative `C:name` form.
    let bytes = candidate.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
