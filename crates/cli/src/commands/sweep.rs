//! `zipgate sweep` — reclaim stale sandboxes and lock markers.

use zipgate_config::GateConfig;
use zipgate_core::Result;
use zipgate_security::Masker;
use zipgate_staging::CleanupSupervisor;

pub async fn run(config: &GateConfig, masker: Masker) -> Result<()> {
    let report = CleanupSupervisor::new(config, masker).reclaim_orphans().await;

    println!("🧹 Sweep of {}", config.staging.tmp_root.display());
    println!("  Sandboxes removed: {}", report.sandboxes_removed);
    println!("  Locks removed:     {}", report.locks_removed);
    if report.failures > 0 {
        println!("  ⚠️  {} item(s) could not be removed, see the log", report.failures);
    }
    if report.timed_out {
        println!("  ⚠️  Sweep timed out before finishing");
    }
    Ok(())
}
