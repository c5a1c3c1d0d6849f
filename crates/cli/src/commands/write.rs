//! `zipgate write` — copy a local file into the caller's sandbox.

use std::path::Path;

use zipgate_core::{Error, Result};
use zipgate_remote::{FileGate, RemoteStore};

pub async fn run<S: RemoteStore>(gate: &FileGate<S>, name: &str, src: &Path) -> Result<()> {
    let bytes = read_bounded(src, gate.files().max_bytes()).await?;
    gate.files().write(name, &bytes).await?;
    println!("✅ Wrote {} bytes to sandbox file '{name}'", bytes.len());
    Ok(())
}

/// Read `src` unless its size already exceeds `limit`.
pub async fn read_bounded(src: &Path, limit: u64) -> Result<Vec<u8>> {
    let size = tokio::fs::metadata(src).await?.len();
    if size > limit {
        return Err(Error::PayloadTooLarge { size, limit });
    }
    Ok(tokio::fs::read(src).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oversized_source_rejected_before_read() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("big.bin");
        std::fs::write(&src, vec![0u8; 32]).unwrap();

        let err = read_bounded(&src, 16).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { size: 32, limit: 16 }));
        assert_eq!(read_bounded(&src, 32).await.unwrap().len(), 32);
    }
}
