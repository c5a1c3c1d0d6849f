//! Caller-visible file operations inside one sandbox.
//!
//! Every name goes through the bare-filename resolver, and every write is
//! size-checked and scanned before a byte reaches disk.

use serde::Serialize;
use zipgate_core::{Error, Result};
use zipgate_security::SecretScanner;

use crate::sandbox::{write_private_file, SandboxRoot, SPILL_PREFIX};

/// One file in a sandbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxEntry {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct SandboxFiles {
    root: SandboxRoot,
    scanner: SecretScanner,
    max_bytes: u64,
}

impl SandboxFiles {
    pub fn new(root: SandboxRoot, max_bytes: u64) -> Self {
        Self {
            root,
            scanner: SecretScanner::new(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let target = self.root.resolve(filename)?;
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        if let Some(err) = self.scanner.scan(bytes, filename).into_error() {
            return Err(err);
        }

        self.root.ensure().await?;
        write_private_file(target.as_path(), bytes).await?;
        tracing::debug!(size, "Wrote sandbox file");
        Ok(())
    }

    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let target = self.root.resolve(filename)?;
        Ok(tokio::fs::read(target.as_path()).await?)
    }

    /// Regular files in the sandbox, sorted by name. In-flight spills are
    /// not listed. Empty if the sandbox has not been created yet.
    pub async fn list(&self) -> Result<Vec<SandboxEntry>> {
        let mut dir = match tokio::fs::read_dir(self.root.path()).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !metadata.is_file() || name.starts_with(SPILL_PREFIX) {
                continue;
            }
            entries.push(SandboxEntry {
                name,
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Remove a file. Returns `false` if it did not exist.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let target = self.root.resolve(filename)?;
        match tokio::fs::remove_file(target.as_path()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
