//! Lock markers — timestamped files that mark an in-progress disk write.
//!
//! A marker normally lives only for the duration of one staging write. A
//! crash leaves it behind; the orphan sweep removes markers whose embedded
//! timestamp is older than the staleness threshold.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sandbox::create_private_dir;

pub const LOCK_EXTENSION: &str = "lock";

#[derive(Debug)]
pub struct LockMarker {
    path: PathBuf,
    released: bool,
}

impl LockMarker {
    /// Create a fresh marker in `locks_dir` stamped with the current time.
    pub async fn acquire(locks_dir: &Path) -> std::io::Result<Self> {
        create_private_dir(locks_dir).await?;
        let path = locks_dir.join(format!("{}.{LOCK_EXTENSION}", Uuid::new_v4()));
        tokio::fs::write(&path, Utc::now().to_rfc3339()).await?;
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for LockMarker {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Timestamp embedded in a marker's contents.
pub fn parse_timestamp(content: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(content.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
