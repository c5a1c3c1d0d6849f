//! Staging manager — materializes validated content in memory or on disk.
//!
//! Files strictly below the memory threshold are read into an owned buffer;
//! larger files are referenced in place. Anything above the payload ceiling
//! is rejected before a single byte is read, and every staged variant passes
//! the secret scanner before it is handed out.

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use zipgate_config::GateConfig;
use zipgate_core::{DiskArtifact, Error, Result, SecretFinding, StagedContent};
use zipgate_security::{ResolvedPath, SecretScanner};

use crate::handle::{wipe, StagedHandle};
use crate::lock::LockMarker;
use crate::sandbox::{locks_dir, write_new_private_file, SandboxRoot};

/// Size limits that pick the staging strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingLimits {
    /// Strictly smaller payloads are staged in memory.
    pub memory_threshold_bytes: u64,
    /// Larger payloads are rejected outright.
    pub max_payload_bytes: u64,
}

impl From<&GateConfig> for StagingLimits {
    fn from(config: &GateConfig) -> Self {
        Self {
            memory_threshold_bytes: config.staging.memory_threshold_bytes,
            max_payload_bytes: config.staging.max_payload_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StagingManager {
    limits: StagingLimits,
    scanner: SecretScanner,
    locks_dir: PathBuf,
}

impl StagingManager {
    pub fn new(config: &GateConfig) -> Self {
        Self::with_limits(
            StagingLimits::from(config),
            locks_dir(&config.staging.tmp_root),
        )
    }

    pub fn with_limits(limits: StagingLimits, locks_dir: PathBuf) -> Self {
        Self {
            limits,
            scanner: SecretScanner::new(),
            locks_dir,
        }
    }

    pub fn limits(&self) -> StagingLimits {
        self.limits
    }

    /// Fail with `PayloadTooLarge` when `size` exceeds the ceiling.
    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.limits.max_payload_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.limits.max_payload_bytes,
            });
        }
        Ok(())
    }

    /// Stage an existing file. Disk-staged files stay caller-owned.
    pub async fn stage(&self, path: &ResolvedPath, size_bytes: u64) -> Result<StagedHandle> {
        self.check_size(size_bytes)?;
        let filename = path.file_name().unwrap_or_default().to_string();

        let buffer = if size_bytes < self.limits.memory_threshold_bytes {
            let buffer = try_allocate(size_bytes);
            if buffer.is_none() {
                warn!(size_bytes, "Buffer allocation failed, staging on disk instead");
            }
            buffer
        } else {
            None
        };

        let handle = match buffer {
            Some(mut buf) => {
                if let Err(e) = read_into(path, &mut buf).await {
                    wipe(&mut buf);
                    return Err(e.into());
                }
                let read = buf.len() as u64;
                let handle = StagedHandle::new(StagedContent::InMemory(buf));
                // The file may have grown since its size was taken.
                self.check_size(read)?;
                handle
            }
            None => StagedHandle::new(StagedContent::OnDisk(DiskArtifact {
                path: path.as_path().to_path_buf(),
                owned: false,
                len: size_bytes,
            })),
        };

        self.vet(handle, &filename).await
    }

    /// Stage caller-supplied bytes to be uploaded as `filename`.
    ///
    /// Below the threshold the bytes stay in memory; otherwise they are
    /// written to a fresh spill file in the caller's sandbox. `filename`
    /// only names the content: a sandbox file of the same name is never
    /// read, replaced or removed.
    pub async fn stage_bytes(
        &self,
        root: &SandboxRoot,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<StagedHandle> {
        let size = bytes.len() as u64;
        let mut handle = StagedHandle::new(StagedContent::InMemory(bytes));
        self.check_size(size)?;
        // The name must still be one the caller could use in the sandbox.
        root.resolve(filename)?;

        // Scan while the bytes are still in memory; the spill below writes
        // exactly what was scanned.
        let finding = match handle.content() {
            Some(content) => self.scan(content, filename).await?,
            None => return Err(Error::Internal("staged bytes released early".into())),
        };
        if let Some(err) = finding.into_error() {
            release_quietly(&mut handle).await;
            return Err(err);
        }

        if size < self.limits.memory_threshold_bytes {
            return Ok(handle);
        }

        root.ensure().await?;
        let lock = LockMarker::acquire(&self.locks_dir).await?;
        let spill = root.spill_path();
        let bytes = handle.content().and_then(StagedContent::as_bytes).unwrap_or_default();
        if let Err(e) = write_new_private_file(&spill, bytes).await {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                discard_partial_spill(&spill).await;
            }
            return Err(e.into());
        }
        handle.replace(StagedContent::OnDisk(DiskArtifact {
            path: spill,
            owned: true,
            len: size,
        }));
        if let Err(e) = lock.release().await {
            warn!(error = %e, "Failed to remove lock marker");
        }

        debug!(size, "Spilled staged bytes to the sandbox");
        Ok(handle)
    }

    /// Scan staged content; release it and fail on a positive finding.
    async fn vet(&self, mut handle: StagedHandle, filename: &str) -> Result<StagedHandle> {
        let finding = match handle.content() {
            Some(content) => self.scan(content, filename).await?,
            None => return Err(Error::Internal("staged content released early".into())),
        };
        match finding.into_error() {
            Some(err) => {
                release_quietly(&mut handle).await;
                Err(err)
            }
            None => Ok(handle),
        }
    }

    async fn scan(&self, content: &StagedContent, filename: &str) -> Result<SecretFinding> {
        match content {
            StagedContent::InMemory(buf) => Ok(self.scanner.scan(buf, filename)),
            StagedContent::OnDisk(artifact) => {
                let scanner = self.scanner;
                let path = artifact.path.clone();
                let filename = filename.to_string();
                tokio::task::spawn_blocking(move || scanner.scan_file(&path, &filename))
                    .await
                    .map_err(|e| Error::Internal(format!("secret scan task failed: {e}")))?
                    .map_err(Error::from)
            }
        }
    }
}

/// Reserve exactly `size` bytes, or `None` if the allocator refuses.
fn try_allocate(size: u64) -> Option<Vec<u8>> {
    let size = usize::try_from(size).ok()?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size).ok()?;
    Some(buf)
}

async fn read_into(path: &ResolvedPath, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let mut file = tokio::fs::File::open(path.as_path()).await?;
    file.read_to_end(buf).await?;
    Ok(())
}

/// Remove what a failed spill write left behind. Logged, never raised.
async fn discard_partial_spill(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!(error = %e, "Failed to remove partial spill");
        }
        _ => {}
    }
}

async fn release_quietly(handle: &mut StagedHandle) {
    if let Err(e) = handle.release().await {
        warn!(error = %e, "Failed to release rejected content");
    }
}
