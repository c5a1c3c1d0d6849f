//! `zipgate files` / `zipgate rm` — inspect and tidy the caller's sandbox.

use zipgate_core::Result;
use zipgate_remote::{FileGate, RemoteStore};

pub async fn list<S: RemoteStore>(gate: &FileGate<S>) -> Result<()> {
    let entries = gate.files().list().await?;
    if entries.is_empty() {
        println!("  Sandbox is empty.");
        return Ok(());
    }
    for entry in &entries {
        println!("  {:>12}  {}", entry.size, entry.name);
    }
    Ok(())
}

pub async fn remove<S: RemoteStore>(gate: &FileGate<S>, name: &str) -> Result<()> {
    if gate.files().delete(name).await? {
        println!("🗑️  Removed '{name}' from the sandbox");
    } else {
        println!("  '{name}' is not in the sandbox");
    }
    Ok(())
}
