//! Cleanup supervisor — scoped staging and the startup orphan sweep.
//!
//! `with_staged` is the only way the rest of the gate touches staged content:
//! the handle never escapes the closure, and it is released whether the
//! operation succeeds, fails, panics or is cancelled (the last two through
//! the handle's `Drop`).

use std::time::{Duration, SystemTime};

use tracing::{info, Level};
use zipgate_config::GateConfig;
use zipgate_core::{Error, Result, StagedContent};
use zipgate_security::{LogArg, Masker, ResolvedPath};

use crate::handle::StagedHandle;
use crate::manager::StagingManager;
use crate::sandbox::SandboxRoot;
use crate::sweep::{sweep, SweepPolicy, SweepReport};

#[derive(Debug, Clone)]
pub struct CleanupSupervisor {
    manager: StagingManager,
    masker: Masker,
    policy: SweepPolicy,
    sweep_timeout: Duration,
}

impl CleanupSupervisor {
    pub fn new(config: &GateConfig, masker: Masker) -> Self {
        Self {
            manager: StagingManager::new(config),
            masker,
            policy: SweepPolicy::from(config),
            sweep_timeout: config.sweep_timeout(),
        }
    }

    /// Build from explicit parts.
    pub fn with_parts(
        manager: StagingManager,
        masker: Masker,
        policy: SweepPolicy,
        sweep_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            masker,
            policy,
            sweep_timeout,
        }
    }

    pub fn manager(&self) -> &StagingManager {
        &self.manager
    }

    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    /// Stage the file at `path`, run `op` on it, then release.
    ///
    /// A release failure is logged and never replaces `op`'s result.
    pub async fn with_staged<T, F>(&self, path: &ResolvedPath, size_bytes: u64, op: F) -> Result<T>
    where
        F: AsyncFnOnce(&StagedContent) -> Result<T>,
    {
        let handle = self.manager.stage(path, size_bytes).await?;
        self.run(handle, op).await
    }

    /// Like [`with_staged`](Self::with_staged) for caller-supplied bytes
    /// destined for `filename` in the caller's sandbox.
    pub async fn with_staged_bytes<T, F>(
        &self,
        root: &SandboxRoot,
        filename: &str,
        bytes: Vec<u8>,
        op: F,
    ) -> Result<T>
    where
        F: AsyncFnOnce(&StagedContent) -> Result<T>,
    {
        let handle = self.manager.stage_bytes(root, filename, bytes).await?;
        self.run(handle, op).await
    }

    async fn run<T, F>(&self, mut handle: StagedHandle, op: F) -> Result<T>
    where
        F: AsyncFnOnce(&StagedContent) -> Result<T>,
    {
        let outcome = match handle.content() {
            Some(content) => op(content).await,
            None => Err(Error::Internal("staged content released early".into())),
        };
        if let Err(e) = handle.release().await {
            self.masker.secure_log(
                Level::WARN,
                "Failed to release staged content",
                &[LogArg::text(e.to_string())],
            );
        }
        outcome
    }

    /// Remove stale sandboxes and lock markers.
    ///
    /// Bounded by the sweep timeout and never fails: whatever went wrong is
    /// in the report and the log.
    pub async fn reclaim_orphans(&self) -> SweepReport {
        let policy = self.policy.clone();
        let masker = self.masker.clone();
        let task = tokio::task::spawn_blocking(move || sweep(&policy, SystemTime::now(), &masker));

        match tokio::time::timeout(self.sweep_timeout, task).await {
            Ok(Ok(report)) => {
                info!(
                    sandboxes = report.sandboxes_removed,
                    locks = report.locks_removed,
                    failures = report.failures,
                    "Orphan sweep finished"
                );
                report
            }
            Ok(Err(e)) => {
                self.masker.secure_log(
                    Level::WARN,
                    "Orphan sweep task failed",
                    &[LogArg::text(e.to_string())],
                );
                SweepReport {
                    failures: 1,
                    ..SweepReport::default()
                }
            }
            Err(_) => {
                self.masker.secure_log(
                    Level::WARN,
                    "Orphan sweep timed out",
                    &[LogArg::text(format!("{}s", self.sweep_timeout.as_secs()))],
                );
                SweepReport {
                    timed_out: true,
                    ..SweepReport::default()
                }
            }
        }
    }
}
