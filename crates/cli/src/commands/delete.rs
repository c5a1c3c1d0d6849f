//! `zipgate delete` — delete an uploaded file.

use zipgate_core::Result;
use zipgate_remote::{FileGate, RemoteStore};

pub async fn run<S: RemoteStore>(gate: &FileGate<S>, id: &str) -> Result<()> {
    let removed = gate.delete_file(id).await?;
    println!("🗑️  Deleted {} ({})", removed.name, removed.id);
    Ok(())
}
