//! `FileGate` — the staging gate in front of a remote store.
//!
//! Every upload is resolved inside the caller's sandbox, size-checked,
//! staged, scanned and released through the cleanup supervisor before the
//! result is returned. Listings are cached; any successful mutation clears
//! the cache.

use tracing::info;
use zipgate_config::GateConfig;
use zipgate_core::{Credential, Error, Result, StagedContent};
use zipgate_security::Masker;
use zipgate_staging::{CleanupSupervisor, SandboxFiles, SandboxRoot, SweepReport};

use crate::cache::{generate_key, TtlCache};
use crate::client::ZiplineClient;
use crate::store::{FilePage, ListQuery, RemoteFile, RemoteStore, UploadResponse};

const LIST_KEY_PREFIX: &str = "files?";

pub struct FileGate<S> {
    store: S,
    supervisor: CleanupSupervisor,
    files: SandboxFiles,
    cache: TtlCache<FilePage>,
}

impl FileGate<ZiplineClient> {
    /// Gate backed by the Zipline server named in `config`.
    pub fn connect(config: &GateConfig) -> Result<Self> {
        let credential = config.credential().ok_or_else(|| Error::Config {
            message: "no Zipline token configured (set ZIPLINE_TOKEN)".into(),
        })?;
        let client = ZiplineClient::new(&config.remote, credential.clone())?;
        Ok(Self::new(config, credential, client))
    }
}

impl<S: RemoteStore> FileGate<S> {
    pub fn new(config: &GateConfig, credential: Credential, store: S) -> Self {
        let sandbox = SandboxRoot::for_credential(&config.staging.tmp_root, &credential);
        let masker = Masker::new(Some(credential));
        Self {
            store,
            supervisor: CleanupSupervisor::new(config, masker),
            files: SandboxFiles::new(sandbox, config.staging.max_payload_bytes),
            cache: TtlCache::new(config.cache_ttl()),
        }
    }

    /// Reclaim leftovers from earlier runs. Call once before serving requests.
    pub async fn start(&self) -> SweepReport {
        self.supervisor.reclaim_orphans().await
    }

    pub fn files(&self) -> &SandboxFiles {
        &self.files
    }

    pub fn masker(&self) -> &Masker {
        self.supervisor.masker()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload a file that already sits in the caller's sandbox.
    pub async fn upload_file(&self, candidate: &str) -> Result<UploadResponse> {
        let path = self.files.root().resolve(candidate)?;
        let size = tokio::fs::metadata(path.as_path()).await?.len();
        let filename = path.file_name().unwrap_or(candidate).to_string();

        let response = self
            .supervisor
            .with_staged(&path, size, async |content: &StagedContent| {
                info!(size, strategy = ?content.strategy(), "Uploading staged file");
                self.store.upload(&filename, content).await
            })
            .await?;

        self.cache.invalidate(None);
        Ok(response)
    }

    /// Upload caller-supplied bytes under `filename`.
    pub async fn upload_content(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        let response = self
            .supervisor
            .with_staged_bytes(self.files.root(), filename, bytes, async |content: &StagedContent| {
                self.store.upload(filename, content).await
            })
            .await?;

        self.cache.invalidate(None);
        Ok(response)
    }

    pub async fn list_files(&self, query: &ListQuery) -> Result<FilePage> {
        let key = format!("{LIST_KEY_PREFIX}{}", generate_key(query.params()));
        self.cache
            .get_or_fetch(&key, || self.store.list_files(query))
            .await
    }

    pub async fn delete_file(&self, id: &str) -> Result<RemoteFile> {
        validate_file_id(id)?;
        let removed = self.store.delete_file(id).await?;
        self.cache.invalidate(None);
        Ok(removed)
    }
}

/// Remote ids are opaque tokens; anything that could reshape the request
/// path is rejected before it is sent.
pub fn validate_file_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("'{id}' is not a valid file id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_are_validated_locally() {
        assert!(validate_file_id("clx9a1b2c3").is_ok());
        assert!(validate_file_id("a_b-c").is_ok());
        for bad in ["", "../admin", "a/b", "id?x=1", "a b"] {
            assert!(
                matches!(validate_file_id(bad), Err(Error::InvalidInput(_))),
                "{bad:?} accepted"
            );
        }
    }
}
