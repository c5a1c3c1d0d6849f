//! Zipline REST client.
//!
//! - `authorization` header carries the raw token (Zipline does not use Bearer)
//! - At most `max_concurrent_requests` requests in flight
//! - Every non-success status goes through [`map_status`]
//! - Disk-staged uploads are streamed from the file, never buffered

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, Level};
use zipgate_config::RemoteConfig;
use zipgate_core::{Credential, Error, Result, StagedContent};
use zipgate_security::{LogArg, Masker};

use crate::status::map_status;
use crate::store::{FilePage, ListQuery, RemoteFile, RemoteStore, UploadResponse};

const FILES_PATH: &str = "/api/user/files";
const UPLOAD_PATH: &str = "/api/upload";

pub struct ZiplineClient {
    base_url: String,
    credential: Credential,
    client: reqwest::Client,
    permits: Semaphore,
    masker: Masker,
}

impl ZiplineClient {
    pub fn new(config: &RemoteConfig, credential: Credential) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            masker: Masker::new(Some(credential.clone())),
            credential,
            client,
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Internal(format!("request limiter closed: {e}")))?;

        debug!(operation, "Sending Zipline request");
        let response = request
            .header(AUTHORIZATION, self.credential.expose())
            .send()
            .await
            .map_err(|e| self.transport(operation, &e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            let err = map_status(status, body);
            self.masker.secure_log(
                Level::WARN,
                "Zipline request failed",
                &[
                    LogArg::text(operation),
                    LogArg::text(err.kind.code()),
                    LogArg::text(status.to_string()),
                ],
            );
            return Err(err.into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| self.transport(operation, &e))
    }

    fn transport(&self, operation: &str, error: &reqwest::Error) -> Error {
        Error::Transport(
            self.masker
                .mask_sensitive_data(&format!("{operation} request failed: {error}")),
        )
    }
}

#[async_trait]
impl RemoteStore for ZiplineClient {
    async fn list_files(&self, query: &ListQuery) -> Result<FilePage> {
        let request = self.client.get(self.url(FILES_PATH)).query(&query.query_pairs());
        self.send(request, "list").await
    }

    async fn upload(&self, filename: &str, content: &StagedContent) -> Result<UploadResponse> {
        let part = match content {
            StagedContent::InMemory(buf) => Part::bytes(buf.clone()),
            StagedContent::OnDisk(artifact) => {
                let file = tokio::fs::File::open(&artifact.path).await?;
                Part::stream_with_length(reqwest::Body::from(file), artifact.len)
            }
        };
        let part = part
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| Error::Internal(format!("invalid upload part: {e}")))?;
        let form = Form::new().part("file", part);

        let request = self.client.post(self.url(UPLOAD_PATH)).multipart(form);
        self.send(request, "upload").await
    }

    async fn delete_file(&self, id: &str) -> Result<RemoteFile> {
        let request = self.client.delete(self.url(&format!("{FILES_PATH}/{id}")));
        self.send(request, "delete").await
    }
}
