//! Orphan sweep — reclaims sandboxes and lock markers left by crashes.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Level;
use zipgate_config::GateConfig;
use zipgate_security::{LogArg, Masker};

use crate::lock::{parse_timestamp, LOCK_EXTENSION};
use crate::sandbox::{locks_dir, users_dir};

/// Age thresholds for the sweep.
#[derive(Debug, Clone)]
pub struct SweepPolicy {
    pub tmp_root: PathBuf,
    pub sandbox_max_age: Duration,
    pub lock_stale_after: Duration,
}

impl From<&GateConfig> for SweepPolicy {
    fn from(config: &GateConfig) -> Self {
        Self {
            tmp_root: config.staging.tmp_root.clone(),
            sandbox_max_age: config.sandbox_max_age(),
            lock_stale_after: config.lock_stale_after(),
        }
    }
}

/// What one sweep removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sandboxes_removed: usize,
    pub locks_removed: usize,
    pub failures: usize,
    pub timed_out: bool,
}

/// Run one sweep as of `now`. Blocking; failures are logged and counted,
/// never returned.
pub fn sweep(policy: &SweepPolicy, now: SystemTime, masker: &Masker) -> SweepReport {
    let mut report = SweepReport::default();
    sweep_sandboxes(policy, now, masker, &mut report);
    sweep_locks(policy, now, masker, &mut report);
    report
}

fn sweep_sandboxes(policy: &SweepPolicy, now: SystemTime, masker: &Masker, report: &mut SweepReport) {
    let dir = users_dir(&policy.tmp_root);
    for entry in entries(&dir, masker, report) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if age(now, modified) <= policy.sandbox_max_age {
            continue;
        }
        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => report.sandboxes_removed += 1,
            Err(e) => record_failure(masker, report, "Failed to remove stale sandbox", &entry.path(), e),
        }
    }
}

fn sweep_locks(policy: &SweepPolicy, now: SystemTime, masker: &Masker, report: &mut SweepReport) {
    let dir = locks_dir(&policy.tmp_root);
    let now_utc: DateTime<Utc> = now.into();
    for entry in entries(&dir, masker, report) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
            continue;
        }

        let embedded = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| parse_timestamp(&content));
        let lock_age = match embedded {
            Some(ts) => (now_utc - ts).to_std().unwrap_or(Duration::ZERO),
            // Unreadable marker: fall back to the file's mtime.
            None => match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => age(now, modified),
                Err(_) => continue,
            },
        };
        if lock_age <= policy.lock_stale_after {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => report.locks_removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => record_failure(masker, report, "Failed to remove stale lock", &path, e),
        }
    }
}

fn entries(dir: &Path, masker: &Masker, report: &mut SweepReport) -> Vec<std::fs::DirEntry> {
    match std::fs::read_dir(dir) {
        Ok(iter) => iter.filter_map(|e| e.ok()).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            record_failure(masker, report, "Failed to list sweep directory", dir, e);
            Vec::new()
        }
    }
}

fn age(now: SystemTime, then: SystemTime) -> Duration {
    now.duration_since(then).unwrap_or(Duration::ZERO)
}

fn record_failure(
    masker: &Masker,
    report: &mut SweepReport,
    message: &str,
    path: &Path,
    error: std::io::Error,
) {
    report.failures += 1;
    masker.secure_log(
        Level::WARN,
        message,
        &[
            LogArg::text(path.display().to_string()),
            LogArg::text(error.to_string()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn policy(tmp: &Path) -> SweepPolicy {
        SweepPolicy {
            tmp_root: tmp.to_path_buf(),
            sandbox_max_age: 24 * HOUR,
            lock_stale_after: Duration::from_secs(30 * 60),
        }
    }

    #[test]
    fn missing_directories_are_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let report = sweep(&policy(&tmp.path().join("absent")), SystemTime::now(), &Masker::default());
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn fresh_sandboxes_kept_stale_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = tmp.path().join("users").join("abc123");
        std::fs::create_dir_all(&sandbox).unwrap();
        std::fs::write(sandbox.join("a.txt"), b"x").unwrap();

        let report = sweep(&policy(tmp.path()), SystemTime::now(), &Masker::default());
        assert_eq!(report.sandboxes_removed, 0);
        assert!(sandbox.exists());

        let later = SystemTime::now() + 25 * HOUR;
        let report = sweep(&policy(tmp.path()), later, &Masker::default());
        assert_eq!(report.sandboxes_removed, 1);
        assert!(!sandbox.exists());
    }

    #[test]
    fn stray_files_in_users_dir_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let users = tmp.path().join("users");
        std::fs::create_dir_all(&users).unwrap();
        std::fs::write(users.join("stray.txt"), b"x").unwrap();

        let report = sweep(&policy(tmp.path()), SystemTime::now() + 48 * HOUR, &Masker::default());
        assert_eq!(report.sandboxes_removed, 0);
        assert!(users.join("stray.txt").exists());
    }

    #[test]
    fn locks_judged_by_embedded_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let locks = tmp.path().join("locks");
        std::fs::create_dir_all(&locks).unwrap();

        let stale = locks.join("old.lock");
        let fresh = locks.join("new.lock");
        std::fs::write(&stale, (Utc::now() - chrono::Duration::minutes(45)).to_rfc3339()).unwrap();
        std::fs::write(&fresh, (Utc::now() - chrono::Duration::minutes(5)).to_rfc3339()).unwrap();
        std::fs::write(locks.join("readme.txt"), b"not a lock").unwrap();

        let report = sweep(&policy(tmp.path()), SystemTime::now(), &Masker::default());
        assert_eq!(report.locks_removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(locks.join("readme.txt").exists());
    }

    #[test]
    fn unparsable_lock_falls_back_to_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let locks = tmp.path().join("locks");
        std::fs::create_dir_all(&locks).unwrap();
        let garbage = locks.join("garbage.lock");
        std::fs::write(&garbage, b"???").unwrap();

        let report = sweep(&policy(tmp.path()), SystemTime::now(), &Masker::default());
        assert_eq!(report.locks_removed, 0);

        let report = sweep(&policy(tmp.path()), SystemTime::now() + HOUR, &Masker::default());
        assert_eq!(report.locks_removed, 1);
        assert!(!garbage.exists());
    }
}
