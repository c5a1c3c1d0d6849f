//! Per-caller sandbox directories under the temporary root.
//!
//! Layout: `<tmp-root>/users/<sha256(credential)>/<bare-filename>` and
//! `<tmp-root>/locks/<id>.lock`. Manager spills sit next to the caller's
//! files as `.staging-<uuid>`. Directories are owner-only.

use std::path::{Path, PathBuf};

use uuid::Uuid;
use zipgate_core::{Credential, PathEscapeError};
use zipgate_security::path::{normalize, resolve_bare, ResolvedPath};

const USERS_DIR: &str = "users";
const LOCKS_DIR: &str = "locks";

/// Name prefix of manager-owned spill files inside a sandbox.
pub const SPILL_PREFIX: &str = ".staging-";

pub fn users_dir(tmp_root: &Path) -> PathBuf {
    normalize(tmp_root).join(USERS_DIR)
}

pub fn locks_dir(tmp_root: &Path) -> PathBuf {
    normalize(tmp_root).join(LOCKS_DIR)
}

/// The confinement directory of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    path: PathBuf,
}

impl SandboxRoot {
    /// Derive the caller's sandbox from the credential's one-way hash.
    pub fn for_credential(tmp_root: &Path, credential: &Credential) -> Self {
        Self {
            path: users_dir(tmp_root).join(credential.fingerprint()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a caller-visible bare filename inside this sandbox.
    pub fn resolve(&self, filename: &str) -> Result<ResolvedPath, PathEscapeError> {
        resolve_bare(filename, &self.path)
    }

    /// A fresh spill location that no caller filename maps to.
    pub fn spill_path(&self) -> PathBuf {
        self.path.join(format!("{SPILL_PREFIX}{}", Uuid::new_v4()))
    }

    /// Create the directory (owner-only) if it does not exist yet.
    pub async fn ensure(&self) -> std::io::Result<()> {
        create_private_dir(&self.path).await
    }
}

/// `mkdir -p` with `0o700` on Unix.
pub async fn create_private_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(path).await
}

/// Write `bytes` to a new or truncated file readable only by the owner.
pub async fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    write_private(options, path, bytes).await
}

/// Like [`write_private_file`], but fails with `AlreadyExists` instead of
/// touching a file that is already there.
pub async fn write_new_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    write_private(options, path, bytes).await
}

async fn write_private(
    mut options: tokio::fs::OpenOptions,
    path: &Path,
    bytes: &[u8],
) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_named_by_fingerprint_not_token() {
        let cred = Credential::new("raw-token-value").unwrap();
        let root = SandboxRoot::for_credential(Path::new("/tmp/zg"), &cred);
        let rendered = root.path().to_string_lossy();
        assert!(!rendered.contains("raw-token-value"));
        assert_eq!(
            root.path(),
            Path::new("/tmp/zg/users").join(cred.fingerprint())
        );
    }

    #[test]
    fn resolve_confines_to_sandbox() {
        let cred = Credential::new("t").unwrap();
        let root = SandboxRoot::for_credential(Path::new("/tmp/zg"), &cred);
        assert!(root.resolve("a.txt").unwrap().as_path().starts_with(root.path()));
        assert!(root.resolve("../other/a.txt").is_err());
        assert!(root.resolve("nested/a.txt").is_err());
    }

    #[tokio::test]
    async fn ensure_creates_owner_only_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cred = Credential::new("t").unwrap();
        let root = SandboxRoot::for_credential(tmp.path(), &cred);

        root.ensure().await.unwrap();
        root.ensure().await.unwrap();
        assert!(root.path().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(root.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[tokio::test]
    async fn private_file_is_owner_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f.txt");
        write_private_file(&path, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn new_private_file_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("taken.txt");
        std::fs::write(&path, b"original").unwrap();

        let err = write_new_private_file(&path, b"other").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn spill_paths_are_unique_and_inside_the_sandbox() {
        let root = SandboxRoot::for_credential(Path::new("/tmp/zg"), &Credential::new("t").unwrap());
        let a = root.spill_path();
        let b = root.spill_path();
        assert_ne!(a, b);
        assert!(a.starts_with(root.path()));
        assert!(a.file_name().unwrap().to_string_lossy().starts_with(SPILL_PREFIX));
    }
}
