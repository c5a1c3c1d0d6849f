//! `zipgate upload` — upload a sandbox file, or a local file's bytes.

use std::path::Path;

use zipgate_core::Result;
use zipgate_remote::{FileGate, RemoteStore, UploadResponse};

use super::write::read_bounded;

pub async fn run<S: RemoteStore>(gate: &FileGate<S>, name: &str, from: Option<&Path>) -> Result<()> {
    let response = match from {
        Some(src) => {
            let bytes = read_bounded(src, gate.files().max_bytes()).await?;
            gate.upload_content(name, bytes).await?
        }
        None => gate.upload_file(name).await?,
    };
    print!("{}", render(&response));
    Ok(())
}

fn render(response: &UploadResponse) -> String {
    let mut out = String::new();
    for file in &response.files {
        match &file.url {
            Some(url) => out.push_str(&format!("✅ Uploaded {} → {url}\n", file.id)),
            None => out.push_str(&format!("✅ Uploaded {}\n", file.id)),
        }
    }
    out
}
