//! Staged content — the short-lived, owned representation of validated input.

use std::path::{Path, PathBuf};

/// Which strategy produced a [`StagedContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStrategy {
    Memory,
    Disk,
}

/// A file on disk referenced by staged content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskArtifact {
    pub path: PathBuf,
    /// `true` when the staging manager created the file and must unlink it on
    /// release. Caller-owned files are never removed.
    pub owned: bool,
    pub len: u64,
}

/// Content that passed validation and is ready for a remote operation.
#[derive(Debug, PartialEq, Eq)]
pub enum StagedContent {
    InMemory(Vec<u8>),
    OnDisk(DiskArtifact),
}

impl StagedContent {
    pub fn strategy(&self) -> StagingStrategy {
        match self {
            Self::InMemory(_) => StagingStrategy::Memory,
            Self::OnDisk(_) => StagingStrategy::Disk,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Self::InMemory(buf) => buf.len() as u64,
            Self::OnDisk(artifact) => artifact.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::InMemory(buf) => Some(buf),
            Self::OnDisk(_) => None,
        }
    }

    pub fn disk_path(&self) -> Option<&Path> {
        match self {
            Self::InMemory(_) => None,
            Self::OnDisk(artifact) => Some(&artifact.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_variant_exposes_bytes() {
        let staged = StagedContent::InMemory(b"hello".to_vec());
        assert_eq!(staged.strategy(), StagingStrategy::Memory);
        assert_eq!(staged.len(), 5);
        assert_eq!(staged.as_bytes(), Some(&b"hello"[..]));
        assert!(staged.disk_path().is_none());
    }

    #[test]
    fn disk_variant_exposes_path() {
        let staged = StagedContent::OnDisk(DiskArtifact {
            path: PathBuf::from("/tmp/big.bin"),
            owned: false,
            len: 10 * 1024 * 1024,
        });
        assert_eq!(staged.strategy(), StagingStrategy::Disk);
        assert_eq!(staged.disk_path(), Some(Path::new("/tmp/big.bin")));
        assert!(staged.as_bytes().is_none());
        assert!(!staged.is_empty());
    }
}
