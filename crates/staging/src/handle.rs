//! Exclusive ownership of one staged resource.
//!
//! `Unstaged -> Staged(Memory|Disk) -> Released`. There is no way back from
//! `Released`, releasing twice is a no-op, and dropping a staged handle
//! releases it synchronously so a cancelled operation leaves nothing behind.

use zipgate_core::{StagedContent, StagingStrategy};

#[derive(Debug)]
enum StageState {
    Staged(StagedContent),
    Released,
}

#[derive(Debug)]
pub struct StagedHandle {
    state: StageState,
}

impl StagedHandle {
    pub(crate) fn new(content: StagedContent) -> Self {
        Self {
            state: StageState::Staged(content),
        }
    }

    /// The staged content, or `None` once released.
    pub fn content(&self) -> Option<&StagedContent> {
        match &self.state {
            StageState::Staged(content) => Some(content),
            StageState::Released => None,
        }
    }

    pub fn strategy(&self) -> Option<StagingStrategy> {
        self.content().map(StagedContent::strategy)
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, StageState::Released)
    }

    /// Swap in new content, wiping what was there. Used when a buffer is
    /// spilled to a manager-owned file.
    pub(crate) fn replace(&mut self, content: StagedContent) {
        let previous = std::mem::replace(&mut self.state, StageState::Staged(content));
        if let StageState::Staged(StagedContent::InMemory(mut buf)) = previous {
            wipe(&mut buf);
        }
    }

    /// Release the staged resource. Idempotent.
    pub async fn release(&mut self) -> std::io::Result<()> {
        match std::mem::replace(&mut self.state, StageState::Released) {
            StageState::Released => Ok(()),
            StageState::Staged(StagedContent::InMemory(mut buf)) => {
                wipe(&mut buf);
                Ok(())
            }
            StageState::Staged(StagedContent::OnDisk(artifact)) if artifact.owned => {
                tracing::debug!(path = %artifact.path.display(), "Removing staged artifact");
                ignore_missing(tokio::fs::remove_file(&artifact.path).await)
            }
            // Caller-owned files are never touched.
            StageState::Staged(StagedContent::OnDisk(_)) => Ok(()),
        }
    }

    fn release_blocking(&mut self) -> std::io::Result<()> {
        match std::mem::replace(&mut self.state, StageState::Released) {
            StageState::Staged(StagedContent::InMemory(mut buf)) => {
                wipe(&mut buf);
                Ok(())
            }
            StageState::Staged(StagedContent::OnDisk(artifact)) if artifact.owned => {
                ignore_missing(std::fs::remove_file(&artifact.path))
            }
            _ => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn disk_path(&self) -> Option<&std::path::Path> {
        self.content().and_then(StagedContent::disk_path)
    }
}

impl Drop for StagedHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release_blocking() {
            tracing::warn!(error = %e, "Failed to release staged content on drop");
        }
    }
}

/// Zero and free a buffer.
pub(crate) fn wipe(buf: &mut Vec<u8>) {
    buf.fill(0);
    buf.clear();
    buf.shrink_to_fit();
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipgate_core::DiskArtifact;

    #[tokio::test]
    async fn memory_release_clears_buffer() {
        let mut handle = StagedHandle::new(StagedContent::InMemory(b"secret-ish".to_vec()));
        assert_eq!(handle.strategy(), Some(StagingStrategy::Memory));

        handle.release().await.unwrap();
        assert!(handle.is_released());
        assert!(handle.content().is_none());
    }

    #[tokio::test]
    async fn double_release_is_noop() {
        let mut handle = StagedHandle::new(StagedContent::InMemory(vec![1, 2, 3]));
        handle.release().await.unwrap();
        handle.release().await.unwrap();
        assert!(handle.is_released());
    }

    #[tokio::test]
    async fn owned_artifact_removed_on_release() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("spill.bin");
        std::fs::write(&path, b"data").unwrap();

        let mut handle = StagedHandle::new(StagedContent::OnDisk(DiskArtifact {
            path: path.clone(),
            owned: true,
            len: 4,
        }));
        assert_eq!(handle.disk_path(), Some(path.as_path()));
        handle.release().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn caller_owned_file_survives_release() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mine.bin");
        std::fs::write(&path, b"data").unwrap();

        let mut handle = StagedHandle::new(StagedContent::OnDisk(DiskArtifact {
            path: path.clone(),
            owned: false,
            len: 4,
        }));
        handle.release().await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn drop_removes_owned_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("spill.bin");
        std::fs::write(&path, b"data").unwrap();

        let handle = StagedHandle::new(StagedContent::OnDisk(DiskArtifact {
            path: path.clone(),
            owned: true,
            len: 4,
        }));
        drop(handle);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_owned_artifact_is_not_an_error() {
        let mut handle = StagedHandle::new(StagedContent::OnDisk(DiskArtifact {
            path: "/nonexistent/zipgate/spill.bin".into(),
            owned: true,
            len: 0,
        }));
        assert!(handle.release().await.is_ok());
    }

    #[test]
    fn replace_wipes_previous_buffer() {
        let mut handle = StagedHandle::new(StagedContent::InMemory(vec![7; 16]));
        handle.replace(StagedContent::InMemory(vec![1]));
        assert_eq!(handle.content().unwrap().len(), 1);
    }
}
